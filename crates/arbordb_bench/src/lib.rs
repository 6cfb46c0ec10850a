//! Benchmark utilities.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use arbordb_codec::{Collation, FieldType, Value};
use arbordb_core::{CoreResult, Group, Row, RowType};
use arbordb_storage::KeyspaceId;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

const SEED: u64 = 0x5EED;

/// Distinct integers `0..count` in a fixed shuffled order.
#[must_use]
pub fn shuffled_values(count: usize) -> Vec<i64> {
    let mut values: Vec<i64> = (0..count as i64).collect();
    values.shuffle(&mut StdRng::seed_from_u64(SEED));
    values
}

/// Row type `event(id INTEGER, kind TEXT, score DOUBLE)`.
#[must_use]
pub fn event_type() -> Arc<RowType> {
    let mut builder = Group::builder("events", KeyspaceId::new(100));
    let table = builder
        .root(
            "event",
            vec![
                FieldType::Integer,
                FieldType::Text(Collation::Binary),
                FieldType::Double,
            ],
            vec![0],
        )
        .expect("event table");
    let group = builder.build().expect("events group");
    Arc::clone(group.table(table).expect("event row type"))
}

/// `count` events with random kinds and scores.
#[must_use]
pub fn events(row_type: &Arc<RowType>, count: usize) -> Vec<CoreResult<Row>> {
    let mut rng = StdRng::seed_from_u64(SEED);
    (0..count as i64)
        .map(|id| {
            let kind = format!("kind-{}", rng.gen_range(0..16));
            let score = rng.gen_range(-1000.0..1000.0);
            Row::new(
                Arc::clone(row_type),
                vec![Value::Int(id), Value::text(kind), Value::Double(score)],
            )
        })
        .collect()
}
