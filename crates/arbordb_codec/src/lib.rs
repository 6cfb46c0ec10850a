//! # ArborDB Codec
//!
//! Typed values and their byte encodings for ArborDB.
//!
//! This crate provides:
//! - [`Value`] and [`FieldType`], the type-system surface seen by cursors
//! - Collating encoding: byte strings whose order matches value order, used
//!   for HKeys, index keys, scan bounds and external sort keys
//! - [`SortKey`], an append-only composite collating key
//! - Row payloads: a row's full field list as CBOR
//!
//! ## Order law
//!
//! For any orderable type `t` and values `a`, `b` of `t`:
//! `compare(t, a, b) == encode(a).cmp(&encode(b))`, and decoding an encoding
//! yields the original value where the encoding is reversible.
//!
//! ## Usage
//!
//! ```
//! use arbordb_codec::{write_collating, FieldType, Value};
//!
//! let mut three = Vec::new();
//! write_collating(FieldType::Integer, &Value::Int(3), &mut three).unwrap();
//! let mut five = Vec::new();
//! write_collating(FieldType::Integer, &Value::Int(5), &mut five).unwrap();
//! assert!(three < five);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod collate;
mod error;
mod payload;
mod sort_key;
mod value;

pub use collate::{
    compare, evaluate_comparison, read_collating, read_collating_directed, write_collating,
    write_collating_directed, Comparison, NULL_MARKER, VALUE_MARKER,
};
pub use error::{CodecError, CodecResult};
pub use payload::{pack_values, unpack_values};
pub use sort_key::{SortKey, SortKeyField};
pub use value::{Collation, FieldType, Value};
