//! # ArborDB Testkit
//!
//! Test utilities for ArborDB.
//!
//! This crate provides:
//! - Fixtures: a parent/child group and a single-table integer index
//! - Property-based test generators using proptest
//! - [`FailingStore`], a store wrapper that injects faults and counts
//!   iterator creations
//! - [`init_tracing`] for log output in tests
//!
//! Cross-crate integration tests live in this crate's `tests/` directory.
//!
//! ## Usage
//!
//! ```rust
//! use arbordb_core::GroupCursor;
//! use arbordb_testkit::prelude::*;
//! use std::sync::Arc;
//!
//! let fixture = OrdersFixture::populated();
//! let mut cursor = GroupCursor::new(fixture.adapter.clone(), Arc::clone(&fixture.group));
//! cursor.open().unwrap();
//! assert!(cursor.next().unwrap().is_some());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faults;
pub mod fixtures;
pub mod generators;
pub mod logging;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faults::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::logging::*;
}

pub use faults::*;
pub use fixtures::*;
pub use generators::*;
pub use logging::*;
