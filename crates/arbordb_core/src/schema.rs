//! Groups, row types and index definitions.
//!
//! A group is a tree of tables stored in one keyspace. Each table gets an
//! ordinal (its position in the group, starting at 1) which prefixes every
//! HKey segment the table contributes. Ordinals are capped so that a set of
//! tables fits in a `u64` bitmap, which group-index entries carry.

use crate::error::{CoreError, CoreResult};
use crate::hkey::{HKey, HKeySegment};
use crate::pack::RowFormat;
use crate::types::{IndexId, TableId};
use arbordb_codec::{FieldType, Value};
use arbordb_storage::KeyspaceId;
use std::sync::Arc;

/// Maximum number of tables in one group.
pub const MAX_GROUP_TABLES: usize = 63;

/// Schema of one table within a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowType {
    table: TableId,
    name: String,
    ordinal: u8,
    depth: usize,
    parent: Option<TableId>,
    fields: Vec<FieldType>,
    pk_columns: Vec<usize>,
    /// For each depth `0..=depth`, this table's columns holding that
    /// ancestor's primary key. The last entry is `pk_columns`.
    hkey_columns: Vec<Vec<usize>>,
}

impl RowType {
    /// Returns the table ID.
    #[must_use]
    pub const fn table_id(&self) -> TableId {
        self.table
    }

    /// Returns the table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the table's ordinal within its group.
    #[must_use]
    pub const fn ordinal(&self) -> u8 {
        self.ordinal
    }

    /// Returns the table's bit in a group table bitmap.
    #[must_use]
    pub const fn table_bit(&self) -> u64 {
        1 << self.ordinal
    }

    /// Returns the depth of the table (the root is 0).
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the parent table, if any.
    #[must_use]
    pub const fn parent(&self) -> Option<TableId> {
        self.parent
    }

    /// Returns the declared field types.
    #[must_use]
    pub fn fields(&self) -> &[FieldType] {
        &self.fields
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Returns the primary key columns.
    #[must_use]
    pub fn pk_columns(&self) -> &[usize] {
        &self.pk_columns
    }

    /// Returns the columns holding each ancestor's primary key, root first.
    #[must_use]
    pub fn hkey_columns(&self) -> &[Vec<usize>] {
        &self.hkey_columns
    }

    /// Returns the primary key column types in key order.
    pub fn pk_types(&self) -> impl Iterator<Item = FieldType> + '_ {
        self.pk_columns.iter().map(|&c| self.fields[c])
    }

    /// Checks that `values` has one member of each declared field type.
    ///
    /// # Errors
    ///
    /// Returns `IllegalArgument` on an arity or type mismatch.
    pub fn check_values(&self, values: &[Value]) -> CoreResult<()> {
        if values.len() != self.fields.len() {
            return Err(CoreError::illegal_argument(format!(
                "table {} has {} fields, got {} values",
                self.name,
                self.fields.len(),
                values.len()
            )));
        }
        for (i, (ty, value)) in self.fields.iter().zip(values).enumerate() {
            if !ty.accepts(value) {
                return Err(CoreError::illegal_argument(format!(
                    "field {i} of table {} is {ty}, got {} value",
                    self.name,
                    value.kind()
                )));
            }
        }
        Ok(())
    }

    /// Flattened types of every hkey column, root first.
    fn hkey_types(&self) -> Vec<FieldType> {
        self.hkey_columns
            .iter()
            .flatten()
            .map(|&c| self.fields[c].storage_type())
            .collect()
    }
}

/// A tree of tables sharing one keyspace.
#[derive(Debug)]
pub struct Group {
    name: String,
    keyspace: KeyspaceId,
    format: RowFormat,
    /// Indexed by `ordinal - 1`.
    tables: Vec<Arc<RowType>>,
}

impl Group {
    /// Starts building a group.
    pub fn builder(name: impl Into<String>, keyspace: KeyspaceId) -> GroupBuilder {
        GroupBuilder::new(name, keyspace)
    }

    /// Returns the group name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the keyspace holding the group's rows.
    #[must_use]
    pub const fn keyspace(&self) -> KeyspaceId {
        self.keyspace
    }

    /// Returns the physical row format.
    #[must_use]
    pub const fn format(&self) -> RowFormat {
        self.format
    }

    /// Returns every table in ordinal order.
    #[must_use]
    pub fn tables(&self) -> &[Arc<RowType>] {
        &self.tables
    }

    /// Looks up a table by ID.
    ///
    /// # Errors
    ///
    /// Returns `IllegalArgument` if the table is not in this group.
    pub fn table(&self, table: TableId) -> CoreResult<&Arc<RowType>> {
        self.tables
            .iter()
            .find(|t| t.table == table)
            .ok_or_else(|| {
                CoreError::illegal_argument(format!("{table} is not in group {}", self.name))
            })
    }

    /// Looks up a table by the ordinal found in a stored key.
    ///
    /// # Errors
    ///
    /// Returns a codec error if no table has this ordinal.
    pub fn table_by_ordinal(&self, ordinal: u8) -> CoreResult<&Arc<RowType>> {
        usize::from(ordinal)
            .checked_sub(1)
            .and_then(|i| self.tables.get(i))
            .ok_or_else(|| {
                CoreError::corrupt(format!("no table with ordinal {ordinal} in group {}", self.name))
            })
    }

    /// Returns the bitmap with one bit set per listed table.
    ///
    /// # Errors
    ///
    /// Returns `IllegalArgument` if a table is not in this group.
    pub fn table_mask(&self, tables: &[TableId]) -> CoreResult<u64> {
        tables
            .iter()
            .try_fold(0u64, |mask, &t| Ok(mask | self.table(t)?.table_bit()))
    }

    /// Returns `table` and its ancestors, root first.
    ///
    /// # Errors
    ///
    /// Returns `IllegalArgument` if the table is not in this group.
    pub fn lineage(&self, table: TableId) -> CoreResult<Vec<&Arc<RowType>>> {
        let mut chain = vec![self.table(table)?];
        while let Some(parent) = chain.last().and_then(|t| t.parent) {
            chain.push(self.table(parent)?);
        }
        chain.reverse();
        Ok(chain)
    }

    /// Builds the HKey of a row of `table` from its field values.
    ///
    /// # Errors
    ///
    /// Returns `IllegalArgument` if the table is unknown or the values do
    /// not match its row type.
    pub fn hkey_for(&self, table: TableId, values: &[Value]) -> CoreResult<HKey> {
        let row_type = self.table(table)?;
        row_type.check_values(values)?;
        let lineage = self.lineage(table)?;
        let segments = lineage
            .iter()
            .zip(&row_type.hkey_columns)
            .map(|(ancestor, columns)| {
                HKeySegment::new(
                    ancestor.ordinal,
                    columns.iter().map(|&c| values[c].clone()).collect(),
                )
            })
            .collect();
        Ok(HKey::from_segments(segments))
    }
}

/// Builder for [`Group`].
///
/// Tables are added root first; a child names its parent and the columns
/// that carry the parent's HKey values.
#[derive(Debug)]
pub struct GroupBuilder {
    name: String,
    keyspace: KeyspaceId,
    format: RowFormat,
    tables: Vec<RowType>,
}

impl GroupBuilder {
    /// Creates a builder for an empty group.
    pub fn new(name: impl Into<String>, keyspace: KeyspaceId) -> Self {
        Self {
            name: name.into(),
            keyspace,
            format: RowFormat::default(),
            tables: Vec::new(),
        }
    }

    /// Sets the physical row format.
    #[must_use]
    pub fn format(mut self, format: RowFormat) -> Self {
        self.format = format;
        self
    }

    /// Adds the root table.
    ///
    /// # Errors
    ///
    /// Returns `IllegalArgument` if a root already exists or the key is invalid.
    pub fn root(
        &mut self,
        name: impl Into<String>,
        fields: Vec<FieldType>,
        pk_columns: Vec<usize>,
    ) -> CoreResult<TableId> {
        if !self.tables.is_empty() {
            return Err(CoreError::illegal_argument(format!(
                "group {} already has a root table",
                self.name
            )));
        }
        let name = name.into();
        check_pk(&name, &fields, &pk_columns)?;
        self.push(RowType {
            table: TableId::new(0),
            name,
            ordinal: 0,
            depth: 0,
            parent: None,
            fields,
            hkey_columns: vec![pk_columns.clone()],
            pk_columns,
        })
    }

    /// Adds a child of `parent`.
    ///
    /// `parent_columns` lists the child's columns holding the parent's HKey
    /// values, in HKey order (root key columns first).
    ///
    /// # Errors
    ///
    /// Returns `IllegalArgument` if the parent is unknown, the key is
    /// invalid, or the parent columns do not match the parent's HKey.
    pub fn child(
        &mut self,
        parent: TableId,
        name: impl Into<String>,
        fields: Vec<FieldType>,
        pk_columns: Vec<usize>,
        parent_columns: Vec<usize>,
    ) -> CoreResult<TableId> {
        let name = name.into();
        let parent_type = self
            .tables
            .iter()
            .find(|t| t.table == parent)
            .ok_or_else(|| CoreError::illegal_argument(format!("unknown parent {parent}")))?;
        check_pk(&name, &fields, &pk_columns)?;

        let expected = parent_type.hkey_types();
        if parent_columns.len() != expected.len() {
            return Err(CoreError::illegal_argument(format!(
                "table {name} needs {} parent columns, got {}",
                expected.len(),
                parent_columns.len()
            )));
        }
        for (&column, ty) in parent_columns.iter().zip(&expected) {
            let found = fields.get(column).ok_or_else(|| {
                CoreError::illegal_argument(format!("parent column {column} out of range in {name}"))
            })?;
            if found.storage_type() != *ty {
                return Err(CoreError::illegal_argument(format!(
                    "parent column {column} of {name} is {found}, parent key is {ty}"
                )));
            }
        }

        let mut remaining = parent_columns.as_slice();
        let mut hkey_columns = Vec::with_capacity(parent_type.hkey_columns.len() + 1);
        for ancestor in &parent_type.hkey_columns {
            let (head, tail) = remaining.split_at(ancestor.len());
            hkey_columns.push(head.to_vec());
            remaining = tail;
        }
        hkey_columns.push(pk_columns.clone());

        let row_type = RowType {
            table: TableId::new(0),
            name,
            ordinal: 0,
            depth: parent_type.depth + 1,
            parent: Some(parent),
            fields,
            pk_columns,
            hkey_columns,
        };
        self.push(row_type)
    }

    /// Finishes the group.
    ///
    /// # Errors
    ///
    /// Returns `IllegalArgument` if no root table was added.
    pub fn build(self) -> CoreResult<Arc<Group>> {
        if self.tables.is_empty() {
            return Err(CoreError::illegal_argument(format!(
                "group {} has no root table",
                self.name
            )));
        }
        Ok(Arc::new(Group {
            name: self.name,
            keyspace: self.keyspace,
            format: self.format,
            tables: self.tables.into_iter().map(Arc::new).collect(),
        }))
    }

    fn push(&mut self, mut row_type: RowType) -> CoreResult<TableId> {
        if self.tables.len() >= MAX_GROUP_TABLES {
            return Err(CoreError::illegal_argument(format!(
                "group {} is limited to {MAX_GROUP_TABLES} tables",
                self.name
            )));
        }
        let ordinal = u8::try_from(self.tables.len() + 1)
            .map_err(|_| CoreError::illegal_argument("table ordinal overflow"))?;
        row_type.ordinal = ordinal;
        row_type.table = TableId::new(u32::from(ordinal));
        let table = row_type.table;
        self.tables.push(row_type);
        Ok(table)
    }
}

fn check_pk(name: &str, fields: &[FieldType], pk_columns: &[usize]) -> CoreResult<()> {
    if pk_columns.is_empty() {
        return Err(CoreError::illegal_argument(format!("table {name} has no primary key")));
    }
    for &column in pk_columns {
        let ty = fields.get(column).ok_or_else(|| {
            CoreError::illegal_argument(format!("key column {column} out of range in {name}"))
        })?;
        if !ty.is_orderable() {
            return Err(CoreError::illegal_argument(format!(
                "key column {column} of {name} has unorderable type {ty}"
            )));
        }
    }
    Ok(())
}

/// What an index covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// Columns of a single table.
    Table,
    /// Columns drawn from several tables of one group. Entries carry the
    /// bitmap of tables present in the joined row.
    Group {
        /// Bitmap of the tables the index spans.
        tables: u64,
    },
    /// Two-dimensional point index on a pair of numeric columns.
    Spatial,
}

/// Definition of a secondary index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDef {
    id: IndexId,
    name: String,
    keyspace: KeyspaceId,
    table: TableId,
    kind: IndexKind,
    columns: Vec<usize>,
    column_types: Vec<FieldType>,
}

impl IndexDef {
    /// Defines an index on columns of one table.
    ///
    /// # Errors
    ///
    /// Returns `IllegalArgument` if a column is out of range or unorderable.
    pub fn table_index(
        id: IndexId,
        name: impl Into<String>,
        keyspace: KeyspaceId,
        row_type: &RowType,
        columns: Vec<usize>,
    ) -> CoreResult<Self> {
        Self::build(id, name.into(), keyspace, row_type, IndexKind::Table, columns)
    }

    /// Defines a group index whose entries address rows of `row_type`.
    ///
    /// `tables` is the bitmap of group tables the index spans; it must
    /// include `row_type` itself.
    ///
    /// # Errors
    ///
    /// Returns `IllegalArgument` if `tables` omits the row type or a column
    /// is invalid.
    pub fn group_index(
        id: IndexId,
        name: impl Into<String>,
        keyspace: KeyspaceId,
        row_type: &RowType,
        columns: Vec<usize>,
        tables: u64,
    ) -> CoreResult<Self> {
        if tables & row_type.table_bit() == 0 {
            return Err(CoreError::illegal_argument(format!(
                "group index tables must include {}",
                row_type.name()
            )));
        }
        Self::build(id, name.into(), keyspace, row_type, IndexKind::Group { tables }, columns)
    }

    /// Defines a spatial index on two `DOUBLE` columns.
    ///
    /// # Errors
    ///
    /// Returns `IllegalArgument` if either column is not a `DOUBLE`.
    pub fn spatial_index(
        id: IndexId,
        name: impl Into<String>,
        keyspace: KeyspaceId,
        row_type: &RowType,
        x: usize,
        y: usize,
    ) -> CoreResult<Self> {
        let name = name.into();
        for column in [x, y] {
            if row_type.fields().get(column) != Some(&FieldType::Double) {
                return Err(CoreError::illegal_argument(format!(
                    "spatial index {name} needs DOUBLE columns, column {column} is not"
                )));
            }
        }
        Self::build(id, name, keyspace, row_type, IndexKind::Spatial, vec![x, y])
    }

    fn build(
        id: IndexId,
        name: String,
        keyspace: KeyspaceId,
        row_type: &RowType,
        kind: IndexKind,
        columns: Vec<usize>,
    ) -> CoreResult<Self> {
        if columns.is_empty() {
            return Err(CoreError::illegal_argument(format!("index {name} has no columns")));
        }
        let column_types = columns
            .iter()
            .map(|&c| match row_type.fields().get(c) {
                Some(ty) if ty.is_orderable() => Ok(ty.storage_type()),
                Some(ty) => Err(CoreError::illegal_argument(format!(
                    "index {name} column {c} has unorderable type {ty}"
                ))),
                None => Err(CoreError::illegal_argument(format!(
                    "index {name} column {c} out of range"
                ))),
            })
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(Self {
            id,
            name,
            keyspace,
            table: row_type.table_id(),
            kind,
            columns,
            column_types,
        })
    }

    /// Returns the index ID.
    #[must_use]
    pub const fn id(&self) -> IndexId {
        self.id
    }

    /// Returns the index name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the keyspace holding the index entries.
    #[must_use]
    pub const fn keyspace(&self) -> KeyspaceId {
        self.keyspace
    }

    /// Returns the table whose rows the entries address.
    #[must_use]
    pub const fn table(&self) -> TableId {
        self.table
    }

    /// Returns the index kind.
    #[must_use]
    pub const fn kind(&self) -> IndexKind {
        self.kind
    }

    /// Returns the indexed columns of the addressed table.
    #[must_use]
    pub fn columns(&self) -> &[usize] {
        &self.columns
    }

    /// Returns the encoding type of each indexed column.
    #[must_use]
    pub fn column_types(&self) -> &[FieldType] {
        &self.column_types
    }

    /// Returns true for indexes over a single table, spatial ones included.
    #[must_use]
    pub const fn is_table_index(&self) -> bool {
        !matches!(self.kind, IndexKind::Group { .. })
    }

    /// Returns true for spatial indexes.
    #[must_use]
    pub const fn is_spatial(&self) -> bool {
        matches!(self.kind, IndexKind::Spatial)
    }

    /// Encodes leading index column values as a key prefix, the form
    /// [`IterationHelper::set_key`](crate::cursor::IterationHelper::set_key)
    /// and `set_stop` take.
    ///
    /// # Errors
    ///
    /// Returns `IllegalArgument` if there are more values than columns and
    /// `EncodingMismatch` if a value does not match its column type.
    pub fn key_prefix(&self, values: &[Value]) -> CoreResult<Vec<u8>> {
        let mut key = Vec::new();
        crate::index_entry::encode_prefix(self, values, &mut key)?;
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbordb_codec::Collation;

    fn parent_child() -> (Arc<Group>, TableId, TableId) {
        let mut builder = Group::builder("pc", KeyspaceId::new(1));
        let p = builder.root("p", vec![FieldType::Integer], vec![0]).unwrap();
        let c = builder
            .child(p, "c", vec![FieldType::Integer, FieldType::Integer], vec![0], vec![1])
            .unwrap();
        (builder.build().unwrap(), p, c)
    }

    #[test]
    fn ordinals_start_at_one() {
        let (group, p, c) = parent_child();
        assert_eq!(group.table(p).unwrap().ordinal(), 1);
        assert_eq!(group.table(c).unwrap().ordinal(), 2);
        assert_eq!(group.table(c).unwrap().depth(), 1);
        assert!(group.table_by_ordinal(0).is_err());
        assert!(group.table_by_ordinal(3).is_err());
    }

    #[test]
    fn hkey_for_child_uses_parent_columns() {
        let (group, _, c) = parent_child();
        let hkey = group.hkey_for(c, &[Value::Int(10), Value::Int(1)]).unwrap();
        assert_eq!(hkey.segment_count(), 2);
        assert_eq!(hkey.segments()[0].values(), &[Value::Int(1)]);
        assert_eq!(hkey.segments()[1].values(), &[Value::Int(10)]);
    }

    #[test]
    fn lineage_is_root_first() {
        let (group, p, c) = parent_child();
        let names: Vec<_> = group.lineage(c).unwrap().iter().map(|t| t.name()).collect();
        assert_eq!(names, ["p", "c"]);
        assert_eq!(group.lineage(p).unwrap().len(), 1);
    }

    #[test]
    fn grandchild_splits_parent_columns() {
        let mut builder = Group::builder("g", KeyspaceId::new(1));
        let a = builder.root("a", vec![FieldType::Integer], vec![0]).unwrap();
        let b = builder
            .child(a, "b", vec![FieldType::Integer, FieldType::Integer], vec![0], vec![1])
            .unwrap();
        let c = builder
            .child(
                b,
                "c",
                vec![FieldType::Integer, FieldType::Integer, FieldType::Integer],
                vec![0],
                vec![2, 1],
            )
            .unwrap();
        let group = builder.build().unwrap();
        assert_eq!(group.table(c).unwrap().hkey_columns(), &[vec![2], vec![1], vec![0]]);
    }

    #[test]
    fn builder_rejects_bad_definitions() {
        let mut builder = Group::builder("bad", KeyspaceId::new(1));
        assert!(matches!(
            builder.root("p", vec![FieldType::Blob], vec![0]),
            Err(CoreError::IllegalArgument { .. })
        ));
        let p = builder.root("p", vec![FieldType::Integer], vec![0]).unwrap();
        assert!(builder.root("q", vec![FieldType::Integer], vec![0]).is_err());
        assert!(builder
            .child(p, "c", vec![FieldType::Integer, FieldType::Text(Collation::Binary)], vec![0], vec![1])
            .is_err());
        assert!(builder
            .child(p, "c", vec![FieldType::Integer], vec![0], vec![])
            .is_err());
        assert!(builder
            .child(TableId::new(9), "c", vec![FieldType::Integer], vec![0], vec![0])
            .is_err());

        assert!(Group::builder("empty", KeyspaceId::new(2)).build().is_err());
    }

    #[test]
    fn check_values_reports_arity_and_type() {
        let (group, p, _) = parent_child();
        let row_type = group.table(p).unwrap();
        assert!(row_type.check_values(&[Value::Int(1)]).is_ok());
        assert!(row_type.check_values(&[Value::Null]).is_ok());
        assert!(row_type.check_values(&[]).is_err());
        assert!(row_type.check_values(&[Value::text("x")]).is_err());
    }

    #[test]
    fn table_mask_sets_ordinal_bits() {
        let (group, p, c) = parent_child();
        assert_eq!(group.table_mask(&[p]).unwrap(), 0b10);
        assert_eq!(group.table_mask(&[p, c]).unwrap(), 0b110);
    }

    #[test]
    fn index_definitions_validate_columns() {
        let (group, p, c) = parent_child();
        let child = group.table(c).unwrap();
        let index = IndexDef::table_index(IndexId::new(1), "c_pid", KeyspaceId::new(2), child, vec![1])
            .unwrap();
        assert!(index.is_table_index());
        assert_eq!(index.column_types(), &[FieldType::Integer]);

        assert!(IndexDef::table_index(IndexId::new(2), "bad", KeyspaceId::new(3), child, vec![5]).is_err());

        let parent_bit = group.table(p).unwrap().table_bit();
        assert!(IndexDef::group_index(IndexId::new(3), "g", KeyspaceId::new(4), child, vec![0], parent_bit)
            .is_err());
        let both = group.table_mask(&[p, c]).unwrap();
        let gi = IndexDef::group_index(IndexId::new(3), "g", KeyspaceId::new(4), child, vec![0], both)
            .unwrap();
        assert!(!gi.is_table_index());

        assert!(IndexDef::spatial_index(IndexId::new(4), "s", KeyspaceId::new(5), child, 0, 1).is_err());
    }
}
