//! Fixtures shared by the unit tests of this crate.

use crate::adapter::StoreAdapter;
use crate::config::Config;
use crate::error::CoreResult;
use crate::maintenance::GroupWriter;
use crate::row::Row;
use crate::schema::{Group, IndexDef, RowType};
use crate::types::{IndexId, TableId};
use arbordb_codec::{FieldType, Value};
use arbordb_storage::{InMemoryStore, KeyspaceId};
use std::sync::Arc;

/// `P(id)` with child `C(id, pid)` in keyspace 1.
pub(crate) fn parent_child_group() -> (Arc<Group>, TableId, TableId) {
    let mut builder = Group::builder("pc", KeyspaceId::new(1));
    let parent = builder.root("p", vec![FieldType::Integer], vec![0]).unwrap();
    let child = builder
        .child(
            parent,
            "c",
            vec![FieldType::Integer, FieldType::Integer],
            vec![0],
            vec![1],
        )
        .unwrap();
    (builder.build().unwrap(), parent, child)
}

/// Index on `C.pid` in keyspace 2.
pub(crate) fn child_pid_index(group: &Group, child: TableId) -> Arc<IndexDef> {
    Arc::new(
        IndexDef::table_index(
            IndexId::new(1),
            "c_pid",
            KeyspaceId::new(2),
            group.table(child).unwrap(),
            vec![1],
        )
        .unwrap(),
    )
}

pub(crate) struct PopulatedGroup {
    pub(crate) adapter: StoreAdapter,
    pub(crate) group: Arc<Group>,
    pub(crate) parent: TableId,
}

/// P{1, 2} and C{(10, 1), (11, 1), (20, 2)}.
pub(crate) fn populated_group() -> PopulatedGroup {
    let (group, parent, child) = parent_child_group();
    let adapter = StoreAdapter::new(Arc::new(InMemoryStore::new()), Config::default());
    let writer = GroupWriter::new(adapter.clone(), Arc::clone(&group));
    for id in [1, 2] {
        writer.write_row(parent, &[Value::Int(id)]).unwrap();
    }
    for (id, pid) in [(10, 1), (11, 1), (20, 2)] {
        writer.write_row(child, &[Value::Int(id), Value::Int(pid)]).unwrap();
    }
    adapter.stats().reset();
    PopulatedGroup {
        adapter,
        group,
        parent,
    }
}

/// One table with one index over it, written through a [`GroupWriter`].
pub(crate) struct IndexedTable {
    pub(crate) adapter: StoreAdapter,
    pub(crate) group: Arc<Group>,
    pub(crate) index: Arc<IndexDef>,
    table: TableId,
}

impl IndexedTable {
    /// Root table `name` in `keyspace`, keyed on column 0, indexed by
    /// `index` in `keyspace + 1`. `rows` are written and the stats reset.
    fn build(
        keyspace: u32,
        fields: Vec<FieldType>,
        index: impl FnOnce(KeyspaceId, &Arc<RowType>) -> CoreResult<IndexDef>,
        rows: impl IntoIterator<Item = Vec<Value>>,
        config: Config,
    ) -> Self {
        let mut builder = Group::builder("t", KeyspaceId::new(keyspace));
        let table = builder.root("t", fields, vec![0]).unwrap();
        let group = builder.build().unwrap();
        let index = Arc::new(
            index(KeyspaceId::new(keyspace + 1), group.table(table).unwrap()).unwrap(),
        );
        let adapter = StoreAdapter::new(Arc::new(InMemoryStore::new()), config);
        let writer = GroupWriter::new(adapter.clone(), Arc::clone(&group))
            .with_index(Arc::clone(&index))
            .unwrap();
        for values in rows {
            writer.write_row(table, &values).unwrap();
        }
        adapter.stats().reset();
        Self {
            adapter,
            group,
            index,
            table,
        }
    }

    pub(crate) fn row(&self, values: Vec<Value>) -> Row {
        Row::new(Arc::clone(self.group.table(self.table).unwrap()), values).unwrap()
    }
}

/// `T(id, v)` with one row per value, ids counting from 1, indexed on `v`.
pub(crate) fn int_index_with_config(values: &[i64], config: Config) -> IndexedTable {
    IndexedTable::build(
        10,
        vec![FieldType::Integer, FieldType::Integer],
        |keyspace, row_type| {
            IndexDef::table_index(IndexId::new(1), "t_v", keyspace, row_type, vec![1])
        },
        (1..).zip(values).map(|(id, &v)| vec![Value::Int(id), Value::Int(v)]),
        config,
    )
}

pub(crate) fn int_index_fixture(values: &[i64]) -> IndexedTable {
    int_index_with_config(values, Config::default())
}

/// Index key prefix for `v`.
pub(crate) fn int_key(fixture: &IndexedTable, v: i64) -> Vec<u8> {
    fixture.index.key_prefix(&[Value::Int(v)]).unwrap()
}

/// `S(id, x, y)` with a spatial index on `(x, y)`.
pub(crate) fn spatial_fixture(points: &[(f64, f64)]) -> IndexedTable {
    IndexedTable::build(
        20,
        vec![FieldType::Integer, FieldType::Double, FieldType::Double],
        |keyspace, row_type| {
            IndexDef::spatial_index(IndexId::new(2), "s_xy", keyspace, row_type, 1, 2)
        },
        (1..)
            .zip(points)
            .map(|(id, &(x, y))| vec![Value::Int(id), Value::Double(x), Value::Double(y)]),
        Config::default(),
    )
}
