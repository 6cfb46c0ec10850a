//! Row maintenance.
//!
//! [`GroupWriter`] stores group rows and keeps the table and spatial
//! indexes registered with it in step. Group index entries span several
//! tables, so callers that own the join write them explicitly through
//! [`GroupWriter::write_group_index_entry`].

use crate::adapter::StoreAdapter;
use crate::error::{CoreError, CoreResult};
use crate::hkey::HKey;
use crate::index_entry::encode_entry;
use crate::pack::RowPacker;
use crate::schema::{Group, IndexDef, IndexKind};
use crate::types::TableId;
use arbordb_codec::Value;
use std::sync::Arc;
use tracing::trace;

/// Writes and deletes rows of one group.
#[derive(Debug, Clone)]
pub struct GroupWriter {
    adapter: StoreAdapter,
    group: Arc<Group>,
    packer: Arc<dyn RowPacker>,
    indexes: Vec<Arc<IndexDef>>,
}

impl GroupWriter {
    /// Creates a writer using the group's row format.
    pub fn new(adapter: StoreAdapter, group: Arc<Group>) -> Self {
        let packer = group.format().packer();
        Self {
            adapter,
            group,
            packer,
            indexes: Vec::new(),
        }
    }

    /// Registers an index maintained on every write.
    ///
    /// # Errors
    ///
    /// Returns `IllegalArgument` for a group index or an index over a
    /// table outside this group.
    pub fn with_index(mut self, index: Arc<IndexDef>) -> CoreResult<Self> {
        if matches!(index.kind(), IndexKind::Group { .. }) {
            return Err(CoreError::illegal_argument(format!(
                "group index {} is written with write_group_index_entry",
                index.name()
            )));
        }
        self.group.table(index.table())?;
        self.indexes.push(index);
        Ok(self)
    }

    /// Returns the maintained indexes.
    #[must_use]
    pub fn indexes(&self) -> &[Arc<IndexDef>] {
        &self.indexes
    }

    /// Stores a row and its index entries, returning its HKey.
    ///
    /// Writing over an existing row replaces it and moves its index
    /// entries.
    ///
    /// # Errors
    ///
    /// Returns `IllegalArgument` if the values do not fit the table and
    /// `StoreAccess` if a write fails.
    pub fn write_row(&self, table: TableId, values: &[Value]) -> CoreResult<HKey> {
        let row_type = self.group.table(table)?;
        let hkey = self.group.hkey_for(table, values)?;
        let key = hkey.encode(&self.group)?;
        let payload = self.packer.pack_row(row_type, values)?;

        if let Some(previous) = self.adapter.get(self.group.keyspace(), &key, "group write")? {
            let old = self.packer.expand_row(row_type, &previous)?;
            self.remove_index_entries(table, &old, &hkey)?;
        }
        self.adapter.put(self.group.keyspace(), &key, &payload, "group write")?;
        for index in self.indexes_of(table) {
            let columns = index_values(index, values)?;
            let (entry, value) = encode_entry(index, &self.group, &columns, &hkey, None)?;
            self.adapter.put(index.keyspace(), &entry, &value, "index write")?;
        }
        trace!(group = self.group.name(), %hkey, "row written");
        Ok(hkey)
    }

    /// Deletes the row addressed by `values` and its index entries.
    ///
    /// `values` is a full row; its key columns locate the stored row, whose
    /// own values drive index cleanup. Descendant rows are left in place.
    /// Returns whether the row existed.
    ///
    /// # Errors
    ///
    /// Returns `IllegalArgument` if the values do not fit the table and
    /// `StoreAccess` if a write fails.
    pub fn delete_row(&self, table: TableId, values: &[Value]) -> CoreResult<bool> {
        let row_type = self.group.table(table)?;
        let hkey = self.group.hkey_for(table, values)?;
        let key = hkey.encode(&self.group)?;
        let Some(stored) = self.adapter.get(self.group.keyspace(), &key, "group delete")? else {
            return Ok(false);
        };
        let stored = self.packer.expand_row(row_type, &stored)?;
        self.remove_index_entries(table, &stored, &hkey)?;
        let removed = self
            .adapter
            .delete(self.group.keyspace(), &key, "group delete")?;
        trace!(group = self.group.name(), %hkey, "row deleted");
        Ok(removed)
    }

    /// Writes one group index entry for a joined row.
    ///
    /// `tables` is the bitmap of group tables present in the joined row.
    ///
    /// # Errors
    ///
    /// Returns `IllegalArgument` if `index` is not a group index, `tables`
    /// names a table the index does not span, or the values do not fit;
    /// `StoreAccess` if the write fails.
    pub fn write_group_index_entry(
        &self,
        index: &IndexDef,
        values: &[Value],
        hkey: &HKey,
        tables: u64,
    ) -> CoreResult<()> {
        let IndexKind::Group { tables: spanned } = index.kind() else {
            return Err(CoreError::illegal_argument(format!(
                "{} is not a group index",
                index.name()
            )));
        };
        if tables & !spanned != 0 {
            return Err(CoreError::illegal_argument(format!(
                "table bitmap {tables:#x} exceeds group index {} ({spanned:#x})",
                index.name()
            )));
        }
        let (key, value) = encode_entry(index, &self.group, values, hkey, Some(tables))?;
        self.adapter.put(index.keyspace(), &key, &value, "group index write")
    }

    fn indexes_of(&self, table: TableId) -> impl Iterator<Item = &Arc<IndexDef>> + '_ {
        self.indexes.iter().filter(move |index| index.table() == table)
    }

    fn remove_index_entries(&self, table: TableId, values: &[Value], hkey: &HKey) -> CoreResult<()> {
        for index in self.indexes_of(table) {
            let columns = index_values(index, values)?;
            let (entry, _) = encode_entry(index, &self.group, &columns, hkey, None)?;
            self.adapter.delete(index.keyspace(), &entry, "index delete")?;
        }
        Ok(())
    }
}

fn index_values(index: &IndexDef, values: &[Value]) -> CoreResult<Vec<Value>> {
    index
        .columns()
        .iter()
        .map(|&column| {
            values.get(column).cloned().ok_or_else(|| {
                CoreError::illegal_argument(format!(
                    "index {} column {column} missing from row",
                    index.name()
                ))
            })
        })
        .collect()
}
