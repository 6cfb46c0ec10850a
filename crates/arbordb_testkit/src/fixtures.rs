//! Test fixtures.
//!
//! Provides ready-made groups and indexes over any [`OrderedStore`], so
//! the same scenario can run against a plain in-memory store or a
//! [`FailingStore`](crate::FailingStore).

use arbordb_codec::{FieldType, Value};
use arbordb_core::{
    Config, Group, GroupWriter, HKey, IndexDef, IndexId, IndexKeyRange, Row, StoreAdapter, TableId,
};
use arbordb_storage::{InMemoryStore, KeyspaceId, OrderedStore};
use std::sync::Arc;

/// Keyspace of the orders group.
pub const ORDERS_KEYSPACE: KeyspaceId = KeyspaceId::new(1);
/// Keyspace of the index on `order.customer_id`.
pub const ORDER_CUSTOMER_KEYSPACE: KeyspaceId = KeyspaceId::new(2);

/// Three-level group `customer(id)`, `order(id, customer_id)`,
/// `item(id, order_id, customer_id)`, with an index on
/// `order.customer_id`.
#[derive(Debug, Clone)]
pub struct OrdersFixture {
    /// Adapter over the fixture's store.
    pub adapter: StoreAdapter,
    /// The group.
    pub group: Arc<Group>,
    /// Root table.
    pub customer: TableId,
    /// Child of `customer`.
    pub order: TableId,
    /// Child of `order`.
    pub item: TableId,
    /// Index on `order.customer_id`.
    pub order_customer: Arc<IndexDef>,
}

impl OrdersFixture {
    /// Creates the empty schema over `store`.
    pub fn new(store: Arc<dyn OrderedStore>, config: Config) -> Self {
        let mut builder = Group::builder("orders", ORDERS_KEYSPACE);
        let customer = builder
            .root("customer", vec![FieldType::Integer], vec![0])
            .expect("customer table");
        let order = builder
            .child(
                customer,
                "order",
                vec![FieldType::Integer, FieldType::Integer],
                vec![0],
                vec![1],
            )
            .expect("order table");
        let item = builder
            .child(
                order,
                "item",
                vec![FieldType::Integer, FieldType::Integer, FieldType::Integer],
                vec![0],
                vec![2, 1],
            )
            .expect("item table");
        let group = builder.build().expect("orders group");
        let order_customer = Arc::new(
            IndexDef::table_index(
                IndexId::new(1),
                "order_customer",
                ORDER_CUSTOMER_KEYSPACE,
                group.table(order).expect("order row type"),
                vec![1],
            )
            .expect("order_customer index"),
        );
        Self {
            adapter: StoreAdapter::new(store, config),
            group,
            customer,
            order,
            item,
            order_customer,
        }
    }

    /// The worked example: customers {1, 2}; orders {(10, 1), (11, 1),
    /// (20, 2)}; items {(100, 10, 1), (101, 10, 1), (200, 20, 2)}.
    #[must_use]
    pub fn populated() -> Self {
        Self::populated_in(Arc::new(InMemoryStore::new()), Config::default())
    }

    /// The worked example over `store`.
    pub fn populated_in(store: Arc<dyn OrderedStore>, config: Config) -> Self {
        let fixture = Self::new(store, config);
        for id in [1, 2] {
            fixture.add_customer(id);
        }
        for (id, customer) in [(10, 1), (11, 1), (20, 2)] {
            fixture.add_order(id, customer);
        }
        for (id, order, customer) in [(100, 10, 1), (101, 10, 1), (200, 20, 2)] {
            fixture.add_item(id, order, customer);
        }
        fixture.adapter.stats().reset();
        fixture
    }

    /// Returns a writer maintaining the fixture's index.
    #[must_use]
    pub fn writer(&self) -> GroupWriter {
        GroupWriter::new(self.adapter.clone(), Arc::clone(&self.group))
            .with_index(Arc::clone(&self.order_customer))
            .expect("index over group table")
    }

    /// Writes a customer.
    pub fn add_customer(&self, id: i64) -> HKey {
        self.writer()
            .write_row(self.customer, &[Value::Int(id)])
            .expect("write customer")
    }

    /// Writes an order.
    pub fn add_order(&self, id: i64, customer: i64) -> HKey {
        self.writer()
            .write_row(self.order, &[Value::Int(id), Value::Int(customer)])
            .expect("write order")
    }

    /// Writes an item.
    pub fn add_item(&self, id: i64, order: i64, customer: i64) -> HKey {
        self.writer()
            .write_row(
                self.item,
                &[Value::Int(id), Value::Int(order), Value::Int(customer)],
            )
            .expect("write item")
    }

    /// HKey of customer `id`.
    #[must_use]
    pub fn customer_key(&self, id: i64) -> HKey {
        self.group
            .hkey_for(self.customer, &[Value::Int(id)])
            .expect("customer hkey")
    }

    /// HKey of order `id` of `customer`.
    #[must_use]
    pub fn order_key(&self, id: i64, customer: i64) -> HKey {
        self.group
            .hkey_for(self.order, &[Value::Int(id), Value::Int(customer)])
            .expect("order hkey")
    }
}

/// Table `t(id, v)` with an index on `v`.
#[derive(Debug, Clone)]
pub struct IntIndexFixture {
    /// Adapter over the fixture's store.
    pub adapter: StoreAdapter,
    /// Single-table group.
    pub group: Arc<Group>,
    /// The table.
    pub table: TableId,
    /// Index on `v`.
    pub index: Arc<IndexDef>,
}

impl IntIndexFixture {
    /// Stores one row per value over a fresh in-memory store. Row ids count
    /// from 1 in input order.
    #[must_use]
    pub fn new(values: &[i64]) -> Self {
        Self::in_store(Arc::new(InMemoryStore::new()), Config::default(), values)
    }

    /// Stores one row per value over `store`.
    pub fn in_store(store: Arc<dyn OrderedStore>, config: Config, values: &[i64]) -> Self {
        let mut builder = Group::builder("t", KeyspaceId::new(10));
        let table = builder
            .root("t", vec![FieldType::Integer, FieldType::Integer], vec![0])
            .expect("t table");
        let group = builder.build().expect("t group");
        let index = Arc::new(
            IndexDef::table_index(
                IndexId::new(1),
                "t_v",
                KeyspaceId::new(11),
                group.table(table).expect("t row type"),
                vec![1],
            )
            .expect("t_v index"),
        );
        let adapter = StoreAdapter::new(store, config);
        let writer = GroupWriter::new(adapter.clone(), Arc::clone(&group))
            .with_index(Arc::clone(&index))
            .expect("index over group table");
        for (id, v) in (1..).zip(values) {
            writer
                .write_row(table, &[Value::Int(id), Value::Int(*v)])
                .expect("write t row");
        }
        adapter.stats().reset();
        Self {
            adapter,
            group,
            table,
            index,
        }
    }

    /// Index key for `v`, as taken by the iteration helper.
    #[must_use]
    pub fn key(&self, v: i64) -> Vec<u8> {
        self.index.key_prefix(&[Value::Int(v)]).expect("int key")
    }

    /// A row of `t`.
    #[must_use]
    pub fn row(&self, id: i64, v: i64) -> Row {
        Row::new(
            Arc::clone(self.group.table(self.table).expect("t row type")),
            vec![Value::Int(id), Value::Int(v)],
        )
        .expect("t row")
    }

    /// The whole index.
    #[must_use]
    pub fn range(&self) -> IndexKeyRange {
        IndexKeyRange::new(Arc::clone(&self.index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn populated_orders_has_eight_rows() {
        let fixture = OrdersFixture::populated();
        let mut cursor =
            arbordb_core::GroupCursor::new(fixture.adapter.clone(), Arc::clone(&fixture.group));
        cursor.open().unwrap();
        let mut rows = 0;
        while cursor.next().unwrap().is_some() {
            rows += 1;
        }
        assert_eq!(rows, 8);
    }

    #[test]
    fn int_fixture_keys_are_ordered() {
        let fixture = IntIndexFixture::new(&[1, 2]);
        assert!(fixture.key(1) < fixture.key(2));
        assert_eq!(fixture.row(1, 1).values()[1], Value::Int(1));
    }
}
