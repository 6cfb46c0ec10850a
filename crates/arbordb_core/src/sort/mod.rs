//! # External Merge Sorter
//!
//! Sorts rows no index delivers in the requested order. Rows are encoded
//! into byte-comparable sort keys, spilled into a temporary keyspace of an
//! ordered store in batches, and replayed in key order. The store does the
//! merging, so memory use is bounded by the batch size.
//!
//! ## Duplicates
//!
//! The temporary keyspace holds each key once. With
//! [`DuplicateHandling::Preserve`] every key gets a trailing sequence
//! number, so rows that tie on every ordering column still get distinct
//! keys. The sequence field runs in the direction of the first ordering
//! field, keeping an all-descending ordering all-descending. With
//! [`DuplicateHandling::Suppress`] tied rows collapse to the last one
//! written.

mod sorter;

pub use sorter::{SortedRows, Sorter};

/// One ordering column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SortField {
    /// Column of the input row type.
    pub column: usize,
    /// Sort direction.
    pub ascending: bool,
}

/// Ordering columns, most significant first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortOrdering {
    fields: Vec<SortField>,
}

impl SortOrdering {
    /// Creates an empty ordering.
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Appends an ascending column.
    #[must_use]
    pub fn asc(mut self, column: usize) -> Self {
        self.fields.push(SortField {
            column,
            ascending: true,
        });
        self
    }

    /// Appends a descending column.
    #[must_use]
    pub fn desc(mut self, column: usize) -> Self {
        self.fields.push(SortField {
            column,
            ascending: false,
        });
        self
    }

    /// Returns the ordering columns.
    #[must_use]
    pub fn fields(&self) -> &[SortField] {
        &self.fields
    }
}

/// What to do with rows that tie on every ordering column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DuplicateHandling {
    /// Emit every row.
    #[default]
    Preserve,
    /// Emit one row per distinct key.
    Suppress,
}
