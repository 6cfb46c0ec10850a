//! Sorter and sorted-row replay.

use crate::adapter::{StoreAdapter, StoreIterator};
use crate::error::{CoreError, CoreResult};
use crate::row::Row;
use crate::schema::RowType;
use crate::sort::{DuplicateHandling, SortOrdering};
use arbordb_codec::{pack_values, unpack_values, FieldType, SortKey, Value};
use arbordb_storage::{KeyspaceId, KvPair};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Sorts rows of one row type by a fixed ordering.
#[derive(Debug)]
pub struct Sorter {
    adapter: StoreAdapter,
    row_type: Arc<RowType>,
    fields: Vec<(usize, FieldType, bool)>,
    duplicates: DuplicateHandling,
    sequence_ascending: bool,
}

impl Sorter {
    /// Creates a sorter.
    ///
    /// Ordering columns are checked here, before any row is buffered.
    ///
    /// # Errors
    ///
    /// Returns `IllegalArgument` if an ordering column is out of range or
    /// of a type without an order.
    pub fn new(
        adapter: StoreAdapter,
        row_type: Arc<RowType>,
        ordering: &SortOrdering,
        duplicates: DuplicateHandling,
    ) -> CoreResult<Self> {
        let fields = ordering
            .fields()
            .iter()
            .map(|field| {
                let ty = row_type.fields().get(field.column).copied().ok_or_else(|| {
                    CoreError::illegal_argument(format!(
                        "sort column {} outside {} fields of {}",
                        field.column,
                        row_type.field_count(),
                        row_type.name()
                    ))
                })?;
                if !ty.is_orderable() {
                    return Err(CoreError::illegal_argument(format!(
                        "cannot sort on column {} of type {ty}",
                        field.column
                    )));
                }
                Ok((field.column, ty, field.ascending))
            })
            .collect::<CoreResult<Vec<_>>>()?;
        let sequence_ascending = ordering.fields().first().map_or(true, |f| f.ascending);
        Ok(Self {
            adapter,
            row_type,
            fields,
            duplicates,
            sequence_ascending,
        })
    }

    /// Encodes the ordering columns of `row`, plus the sequence number when
    /// duplicates are preserved.
    ///
    /// # Errors
    ///
    /// Returns `EncodingMismatch` if the row is of another row type or a
    /// value does not match its column type.
    pub fn evaluate_to_key(&self, row: &Row, sequence: u64) -> CoreResult<SortKey> {
        if !Arc::ptr_eq(row.row_type(), &self.row_type) && **row.row_type() != *self.row_type {
            return Err(CoreError::encoding_mismatch(format!(
                "sorter for {} got a row of {}",
                self.row_type.name(),
                row.row_type().name()
            )));
        }
        let mut key = SortKey::with_capacity(self.fields.len() * 9 + 9);
        for &(column, ty, ascending) in &self.fields {
            let value = row.value(column).unwrap_or(&Value::Null);
            key.append_directed(value, ty, ascending)?;
        }
        if self.duplicates == DuplicateHandling::Preserve {
            let sequence = i64::try_from(sequence)
                .map_err(|_| CoreError::illegal_argument("sort input too large"))?;
            key.append_directed(&Value::Int(sequence), FieldType::Integer, self.sequence_ascending)?;
        }
        Ok(key)
    }

    /// Encodes every field of `row` as the stored payload.
    ///
    /// # Errors
    ///
    /// Returns a codec error if the values cannot be serialized.
    pub fn evaluate_to_target(&self, row: &Row) -> CoreResult<Vec<u8>> {
        Ok(pack_values(row.values())?)
    }

    /// Spills `rows` and returns them in order.
    ///
    /// The temporary keyspace is dropped when the returned iterator is
    /// dropped, or right away if spilling fails.
    ///
    /// # Errors
    ///
    /// Returns the first error from the input, from key encoding, or from
    /// the temporary store.
    /// Returns `IllegalArgument` if no temporary keyspace is left.
    pub fn sort<I>(&self, rows: I) -> CoreResult<SortedRows>
    where
        I: IntoIterator<Item = CoreResult<Row>>,
    {
        let keyspace = self.adapter.allocate_temp_keyspace()?;
        let spilled = self
            .spill(keyspace, rows)
            .and_then(|count| Ok((count, self.adapter.temp_range_iter(keyspace)?)));
        match spilled {
            Ok((count, iter)) => {
                debug!(%keyspace, rows = count, table = self.row_type.name(), "sort input spilled");
                Ok(SortedRows {
                    adapter: self.adapter.clone(),
                    keyspace,
                    row_type: Arc::clone(&self.row_type),
                    iter: Some(iter),
                    released: false,
                })
            }
            Err(err) => {
                if let Err(cleanup) = self.adapter.drop_temp_keyspace(keyspace) {
                    warn!(%keyspace, error = %cleanup, "failed to drop sort keyspace");
                }
                Err(err)
            }
        }
    }

    fn spill<I>(&self, keyspace: KeyspaceId, rows: I) -> CoreResult<u64>
    where
        I: IntoIterator<Item = CoreResult<Row>>,
    {
        let batch_size = self.adapter.config().sort_batch_size.max(1);
        let mut batch: Vec<KvPair> = Vec::with_capacity(batch_size);
        let mut sequence = 0u64;
        for row in rows {
            let row = row?;
            let key = self.evaluate_to_key(&row, sequence)?;
            let value = self.evaluate_to_target(&row)?;
            batch.push((Bytes::from(key.into_bytes()), Bytes::from(value)));
            sequence += 1;
            if batch.len() >= batch_size {
                self.flush(keyspace, &mut batch)?;
            }
        }
        self.flush(keyspace, &mut batch)?;
        Ok(sequence)
    }

    fn flush(&self, keyspace: KeyspaceId, batch: &mut Vec<KvPair>) -> CoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let rows = batch.len() as u64;
        self.adapter.temp_write_batch(keyspace, std::mem::take(batch))?;
        self.adapter.stats().record_sort_rows(rows);
        trace!(%keyspace, rows, "sort batch written");
        Ok(())
    }
}

/// Sorted rows replayed from a temporary keyspace.
///
/// Dropping the iterator drops the keyspace; a failure there is logged.
/// Use [`SortedRows::close`] to observe it instead.
#[derive(Debug)]
pub struct SortedRows {
    adapter: StoreAdapter,
    keyspace: KeyspaceId,
    row_type: Arc<RowType>,
    iter: Option<StoreIterator>,
    released: bool,
}

impl SortedRows {
    /// Returns the temporary keyspace holding the rows.
    #[must_use]
    pub const fn keyspace(&self) -> KeyspaceId {
        self.keyspace
    }

    /// Drops the temporary keyspace.
    ///
    /// # Errors
    ///
    /// Returns `StoreAccess` if the keyspace cannot be dropped.
    pub fn close(mut self) -> CoreResult<()> {
        self.release()
    }

    fn release(&mut self) -> CoreResult<()> {
        self.iter = None;
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.adapter.drop_temp_keyspace(self.keyspace)
    }
}

impl Iterator for SortedRows {
    type Item = CoreResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        let iter = self.iter.as_mut()?;
        match iter.advance() {
            Ok(Some((_, value))) => Some(
                unpack_values(&value)
                    .map_err(CoreError::from)
                    .and_then(|values| Row::new(Arc::clone(&self.row_type), values)),
            ),
            Ok(None) => {
                self.iter = None;
                None
            }
            Err(err) => {
                self.iter = None;
                Some(Err(err))
            }
        }
    }
}

impl Drop for SortedRows {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            warn!(keyspace = %self.keyspace, error = %err, "failed to drop sort keyspace");
        }
    }
}
