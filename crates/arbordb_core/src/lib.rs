//! # ArborDB Core
//!
//! Storage adapter and cursor layer for ArborDB.
//!
//! Tables related as parent and child form a **group** stored in one
//! keyspace, addressed by hierarchical keys ([`HKey`]). Secondary indexes
//! live in keyspaces of their own. This crate turns scan requests into
//! physical iteration over those keyspaces and turns raw entries back into
//! typed rows.
//!
//! This crate provides:
//! - [`HKey`] and the [`Group`] schema
//! - [`GroupCursor`]: full, subtree and single-row group scans
//! - [`IterationHelper`]: direction-aware positioning that reuses store
//!   iterators across calls
//! - [`ValueIndexCursor`] and [`SpatialIndexCursor`] behind
//!   [`open_index_cursor`]
//! - [`Sorter`]: external sort through a temporary keyspace
//! - [`GroupWriter`]: row and index maintenance
//!
//! ## Layering
//!
//! ```text
//!   GroupCursor   ValueIndexCursor / SpatialIndexCursor   Sorter
//!        │                     │                            │
//!        │              IterationHelper                     │
//!        └─────────────┬───────┴────────────────────────────┘
//!                 StoreAdapter  (session, stats, error context)
//!                      │
//!                 OrderedStore  (arbordb_storage)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use arbordb_codec::{FieldType, Value};
//! use arbordb_core::{Config, Group, GroupCursor, GroupWriter, StoreAdapter};
//! use arbordb_storage::{InMemoryStore, KeyspaceId};
//! use std::sync::Arc;
//!
//! let mut builder = Group::builder("orders", KeyspaceId::new(1));
//! let customer = builder.root("customer", vec![FieldType::Integer], vec![0]).unwrap();
//! let order = builder
//!     .child(customer, "order", vec![FieldType::Integer, FieldType::Integer], vec![0], vec![1])
//!     .unwrap();
//! let group = builder.build().unwrap();
//!
//! let adapter = StoreAdapter::new(Arc::new(InMemoryStore::new()), Config::default());
//! let writer = GroupWriter::new(adapter.clone(), Arc::clone(&group));
//! writer.write_row(customer, &[Value::Int(1)]).unwrap();
//! writer.write_row(order, &[Value::Int(10), Value::Int(1)]).unwrap();
//!
//! let mut cursor = GroupCursor::new(adapter, group);
//! cursor.open().unwrap();
//! let mut seen = 0;
//! while let Some(_row) = cursor.next().unwrap() {
//!     seen += 1;
//! }
//! assert_eq!(seen, 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod adapter;
mod config;
pub mod cursor;
mod error;
mod hkey;
mod index_entry;
mod maintenance;
mod pack;
mod row;
mod schema;
pub mod sort;
mod stats;
mod types;

#[cfg(test)]
mod test_support;

pub use adapter::{StoreAdapter, StoreIterator};
pub use config::Config;
pub use cursor::{
    open_index_cursor, Bindings, BoundValue, ColumnSelector, CursorState, Direction, GroupCursor,
    IndexBound, IndexCursor, IndexKeyRange, IndexOrdering, IndexScanSelector, IterationHelper,
    KeyBuffer, Nudge, NudgeGuard, RangeShape, ScanMode, SpatialIndexCursor, ValueIndexCursor,
};
pub use error::{CoreError, CoreResult};
pub use hkey::{HKey, HKeySegment};
pub use maintenance::GroupWriter;
pub use pack::{CborRowPacker, RowFormat, RowPacker, TupleRowPacker};
pub use row::{GroupRow, IndexRow, Row};
pub use schema::{Group, GroupBuilder, IndexDef, IndexKind, RowType, MAX_GROUP_TABLES};
pub use sort::{DuplicateHandling, SortField, SortOrdering, SortedRows, Sorter};
pub use stats::{CursorStats, StatsSnapshot};
pub use types::{IndexId, SessionId, TableId};
