//! Property-based test generators using proptest.

use arbordb_codec::{Collation, FieldType, Value};
use arbordb_core::Direction;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// Strategy for orderable field types.
pub fn orderable_type_strategy() -> impl Strategy<Value = FieldType> {
    prop_oneof![
        Just(FieldType::Boolean),
        Just(FieldType::Integer),
        Just(FieldType::Double),
        Just(FieldType::Text(Collation::Binary)),
        Just(FieldType::Varbinary),
    ]
}

/// Strategy for values of `ty`, NULL included.
pub fn value_strategy(ty: FieldType) -> BoxedStrategy<Value> {
    let non_null = match ty {
        FieldType::Boolean => any::<bool>().prop_map(Value::Bool).boxed(),
        FieldType::Integer => any::<i64>().prop_map(Value::Int).boxed(),
        FieldType::Double => any::<f64>()
            .prop_filter("NaN has no order", |d| !d.is_nan())
            .prop_map(Value::Double)
            .boxed(),
        FieldType::Text(_) => "[a-zA-Z0-9 ]{0,12}".prop_map(Value::Text).boxed(),
        FieldType::Varbinary | FieldType::Blob => prop::collection::vec(any::<u8>(), 0..16)
            .prop_map(Value::Bytes)
            .boxed(),
    };
    prop_oneof![1 => Just(Value::Null), 8 => non_null].boxed()
}

/// Strategy for a type together with two of its values.
pub fn typed_pair_strategy() -> impl Strategy<Value = (FieldType, Value, Value)> {
    orderable_type_strategy()
        .prop_flat_map(|ty| (Just(ty), value_strategy(ty), value_strategy(ty)))
}

/// Strategy for a customer/order tree: customer id to its order ids.
pub fn orders_tree_strategy() -> impl Strategy<Value = BTreeMap<i64, BTreeSet<i64>>> {
    prop::collection::btree_map(
        -20i64..20,
        prop::collection::btree_set(0i64..100, 0..6),
        1..8,
    )
}

/// Strategy for distinct index values, unsorted.
pub fn index_values_strategy() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::btree_set(-1000i64..1000, 1..40)
        .prop_map(|set| set.into_iter().collect::<Vec<_>>())
        .prop_shuffle()
}

/// Strategy for traversal directions.
pub fn direction_strategy() -> impl Strategy<Value = Direction> {
    prop_oneof![
        Just(Direction::Eq),
        Just(Direction::Gt),
        Just(Direction::GtEq),
        Just(Direction::Lt),
        Just(Direction::LtEq),
    ]
}
