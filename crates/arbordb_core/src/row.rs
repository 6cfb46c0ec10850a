//! Rows produced by cursors.

use crate::error::CoreResult;
use crate::hkey::HKey;
use crate::schema::{IndexDef, RowType};
use crate::types::TableId;
use arbordb_codec::Value;
use std::sync::Arc;

/// A typed tuple of one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    row_type: Arc<RowType>,
    values: Vec<Value>,
}

impl Row {
    /// Creates a row, checking the values against the row type.
    ///
    /// # Errors
    ///
    /// Returns `IllegalArgument` on an arity or type mismatch.
    pub fn new(row_type: Arc<RowType>, values: Vec<Value>) -> CoreResult<Self> {
        row_type.check_values(&values)?;
        Ok(Self { row_type, values })
    }

    /// Returns the row type.
    #[must_use]
    pub fn row_type(&self) -> &Arc<RowType> {
        &self.row_type
    }

    /// Returns the owning table.
    #[must_use]
    pub fn table_id(&self) -> TableId {
        self.row_type.table_id()
    }

    /// Returns the field values.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns one field value.
    #[must_use]
    pub fn value(&self, field: usize) -> Option<&Value> {
        self.values.get(field)
    }

    /// Consumes the row, returning its values.
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// A row read from a group keyspace, with its position in the table tree.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow {
    row: Row,
    hkey: HKey,
}

impl GroupRow {
    pub(crate) const fn new(row: Row, hkey: HKey) -> Self {
        Self { row, hkey }
    }

    /// Returns the row.
    #[must_use]
    pub const fn row(&self) -> &Row {
        &self.row
    }

    /// Returns the row's HKey.
    #[must_use]
    pub const fn hkey(&self) -> &HKey {
        &self.hkey
    }

    /// Returns the owning table.
    #[must_use]
    pub fn table_id(&self) -> TableId {
        self.row.table_id()
    }

    /// Returns the field values.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        self.row.values()
    }

    /// Splits the row from its HKey.
    #[must_use]
    pub fn into_parts(self) -> (Row, HKey) {
        (self.row, self.hkey)
    }
}

/// An entry read from a secondary index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRow {
    index: Arc<IndexDef>,
    values: Vec<Value>,
    hkey: HKey,
    tables: Option<u64>,
}

impl IndexRow {
    pub(crate) const fn new(
        index: Arc<IndexDef>,
        values: Vec<Value>,
        hkey: HKey,
        tables: Option<u64>,
    ) -> Self {
        Self {
            index,
            values,
            hkey,
            tables,
        }
    }

    /// Returns the index the entry was read from.
    #[must_use]
    pub const fn index(&self) -> &Arc<IndexDef> {
        &self.index
    }

    /// Returns the indexed column values, in index column order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns the HKey of the addressed row.
    #[must_use]
    pub const fn hkey(&self) -> &HKey {
        &self.hkey
    }

    /// Returns the bitmap of tables present, for group-index entries.
    #[must_use]
    pub const fn tables(&self) -> Option<u64> {
        self.tables
    }

    /// Returns true if the entry carries no table bitmap.
    #[must_use]
    pub const fn is_key_empty(&self) -> bool {
        self.tables.is_none()
    }
}
