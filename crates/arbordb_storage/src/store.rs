//! Ordered store trait definition.

use crate::error::StorageResult;
use bytes::Bytes;
use std::cmp::Ordering;
use std::fmt;
use std::ops::Bound;

/// A key/value pair returned by a range iterator.
pub type KvPair = (Bytes, Bytes);

/// Identifier of one physical keyspace.
///
/// A group's rows share one keyspace; every secondary index has its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyspaceId(pub u32);

impl KeyspaceId {
    /// Creates a new keyspace ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for KeyspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ks:{}", self.0)
    }
}

/// A range of keys within one keyspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    /// Lower bound.
    pub start: Bound<Vec<u8>>,
    /// Upper bound.
    pub end: Bound<Vec<u8>>,
}

impl KeyRange {
    /// Creates a range from explicit bounds.
    #[must_use]
    pub const fn new(start: Bound<Vec<u8>>, end: Bound<Vec<u8>>) -> Self {
        Self { start, end }
    }

    /// The whole keyspace.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            start: Bound::Unbounded,
            end: Bound::Unbounded,
        }
    }

    /// Every key that starts with `prefix`, including `prefix` itself.
    #[must_use]
    pub fn prefix(prefix: &[u8]) -> Self {
        let end = match prefix_end(prefix) {
            Some(end) => Bound::Excluded(end),
            None => Bound::Unbounded,
        };
        Self {
            start: Bound::Included(prefix.to_vec()),
            end,
        }
    }

    /// Exactly one key.
    #[must_use]
    pub fn exact(key: &[u8]) -> Self {
        Self {
            start: Bound::Included(key.to_vec()),
            end: Bound::Included(key.to_vec()),
        }
    }

    /// Returns true if no key can fall within this range.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let (start, start_inclusive) = match &self.start {
            Bound::Included(k) => (k, true),
            Bound::Excluded(k) => (k, false),
            Bound::Unbounded => return false,
        };
        let (end, end_inclusive) = match &self.end {
            Bound::Included(k) => (k, true),
            Bound::Excluded(k) => (k, false),
            Bound::Unbounded => return false,
        };
        match start.cmp(end) {
            Ordering::Greater => true,
            Ordering::Equal => !(start_inclusive && end_inclusive),
            Ordering::Less => false,
        }
    }

    /// Returns true if `key` falls within this range.
    #[must_use]
    pub fn contains(&self, key: &[u8]) -> bool {
        let above_start = match &self.start {
            Bound::Included(s) => key >= s.as_slice(),
            Bound::Excluded(s) => key > s.as_slice(),
            Bound::Unbounded => true,
        };
        let below_end = match &self.end {
            Bound::Included(e) => key <= e.as_slice(),
            Bound::Excluded(e) => key < e.as_slice(),
            Bound::Unbounded => true,
        };
        above_start && below_end
    }
}

/// Returns the smallest key that is greater than every key starting with
/// `prefix`, or `None` if no such key exists (empty or all-`0xFF` prefix).
#[must_use]
pub fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < 0xFF {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}

/// A lazily-stepping iterator over a key range.
///
/// Each call to [`advance`](KvIterator::advance) performs one physical step.
/// Iterators see the snapshot of the keyspace taken when they were created.
pub trait KvIterator: Send {
    /// Returns the next entry in scan order, or `None` when exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the session was cancelled.
    fn advance(&mut self) -> StorageResult<Option<KvPair>>;

    /// Hint that the caller will soon call `advance`.
    ///
    /// Stores with asynchronous I/O may start fetching eagerly. The default
    /// does nothing.
    fn prefetch(&mut self) {}
}

/// An ordered key-value store partitioned into keyspaces.
///
/// # Invariants
///
/// - Forward iteration yields keys in ascending unsigned-byte order
/// - Reverse iteration yields the same keys in descending order
/// - An empty or inverted range yields no entries and never fails
/// - Stores must be `Send + Sync`; cursors on different threads may share one
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For tests and temporary keyspaces
pub trait OrderedStore: Send + Sync {
    /// Creates an iterator over `range` within `keyspace`.
    ///
    /// This is the expensive operation on a distributed store.
    ///
    /// # Errors
    ///
    /// Returns an error if the iterator cannot be created.
    fn range_iter(
        &self,
        keyspace: KeyspaceId,
        range: KeyRange,
        reverse: bool,
    ) -> StorageResult<Box<dyn KvIterator>>;

    /// Reads one key.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn get(&self, keyspace: KeyspaceId, key: &[u8]) -> StorageResult<Option<Bytes>>;

    /// Inserts or replaces one key.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn put(&self, keyspace: KeyspaceId, key: &[u8], value: &[u8]) -> StorageResult<()>;

    /// Removes one key, returning whether it was present.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn delete(&self, keyspace: KeyspaceId, key: &[u8]) -> StorageResult<bool>;

    /// Writes several entries at once.
    ///
    /// The default implementation issues one `put` per entry.
    ///
    /// # Errors
    ///
    /// Returns an error if any write fails.
    fn write_batch(&self, keyspace: KeyspaceId, batch: Vec<KvPair>) -> StorageResult<()> {
        for (key, value) in batch {
            self.put(keyspace, &key, &value)?;
        }
        Ok(())
    }

    /// Removes every key in `keyspace`.
    ///
    /// # Errors
    ///
    /// Returns an error if the keyspace cannot be dropped.
    fn drop_keyspace(&self, keyspace: KeyspaceId) -> StorageResult<()>;

    /// Returns the number of keys in `keyspace`.
    ///
    /// # Errors
    ///
    /// Returns an error if the count cannot be determined.
    fn len(&self, keyspace: KeyspaceId) -> StorageResult<usize>;

    /// Returns true if `keyspace` holds no keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the count cannot be determined.
    fn is_empty(&self, keyspace: KeyspaceId) -> StorageResult<bool> {
        Ok(self.len(keyspace)? == 0)
    }
}
