//! # ArborDB Storage
//!
//! Ordered key-value store contract and implementations for ArborDB.
//!
//! This crate is the lowest layer of ArborDB. Stores are **ordered byte
//! maps** partitioned into keyspaces - they do not interpret the keys or
//! values they hold.
//!
//! ## Design Principles
//!
//! - Keys compare as unsigned bytes, lexicographically
//! - Every group and every index lives in its own keyspace
//! - Range iterators step lazily, one entry per `advance`
//! - Creating an iterator is the expensive operation; callers cache them
//! - Must be `Send + Sync` for concurrent access
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - Map-backed store for tests, temporary sort runs and
//!   ephemeral data
//!
//! ## Example
//!
//! ```rust
//! use arbordb_storage::{InMemoryStore, KeyRange, KeyspaceId, OrderedStore};
//!
//! let store = InMemoryStore::new();
//! let ks = KeyspaceId::new(1);
//! store.put(ks, b"a", b"1").unwrap();
//! store.put(ks, b"b", b"2").unwrap();
//!
//! let mut iter = store.range_iter(ks, KeyRange::all(), false).unwrap();
//! let (key, _) = iter.advance().unwrap().unwrap();
//! assert_eq!(&key[..], b"a");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod memory;
mod store;

pub use error::{StorageError, StorageResult};
pub use memory::InMemoryStore;
pub use store::{prefix_end, KeyRange, KeyspaceId, KvIterator, KvPair, OrderedStore};
