//! In-memory ordered store.

use crate::error::StorageResult;
use crate::store::{KeyRange, KeyspaceId, KvIterator, KvPair, OrderedStore};
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Arc;

type Snapshot = Arc<BTreeMap<Bytes, Bytes>>;

/// An in-memory ordered store.
///
/// Each keyspace is a copy-on-write [`BTreeMap`]. Iterators capture the
/// keyspace snapshot current at creation, so writes made afterwards are not
/// visible to them.
///
/// This store is suitable for:
/// - Unit and integration tests
/// - Temporary keyspaces used by external sorting
/// - Ephemeral data that doesn't need persistence
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use arbordb_storage::{InMemoryStore, KeyspaceId, OrderedStore};
///
/// let store = InMemoryStore::new();
/// let ks = KeyspaceId::new(1);
/// store.put(ks, b"key", b"value").unwrap();
/// assert_eq!(store.len(ks).unwrap(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    keyspaces: RwLock<HashMap<KeyspaceId, Snapshot>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every entry in `keyspace`, in key order.
    ///
    /// Useful for testing and debugging.
    #[must_use]
    pub fn entries(&self, keyspace: KeyspaceId) -> Vec<KvPair> {
        self.snapshot(keyspace)
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Clears every keyspace.
    pub fn clear(&self) {
        self.keyspaces.write().clear();
    }

    fn snapshot(&self, keyspace: KeyspaceId) -> Snapshot {
        self.keyspaces
            .read()
            .get(&keyspace)
            .cloned()
            .unwrap_or_default()
    }
}

impl OrderedStore for InMemoryStore {
    fn range_iter(
        &self,
        keyspace: KeyspaceId,
        range: KeyRange,
        reverse: bool,
    ) -> StorageResult<Box<dyn KvIterator>> {
        Ok(Box::new(MemoryRangeIter {
            snapshot: self.snapshot(keyspace),
            range,
            reverse,
            exhausted: false,
        }))
    }

    fn get(&self, keyspace: KeyspaceId, key: &[u8]) -> StorageResult<Option<Bytes>> {
        Ok(self
            .keyspaces
            .read()
            .get(&keyspace)
            .and_then(|map| map.get(key).cloned()))
    }

    fn put(&self, keyspace: KeyspaceId, key: &[u8], value: &[u8]) -> StorageResult<()> {
        let mut keyspaces = self.keyspaces.write();
        let map = keyspaces.entry(keyspace).or_default();
        Arc::make_mut(map).insert(Bytes::copy_from_slice(key), Bytes::copy_from_slice(value));
        Ok(())
    }

    fn delete(&self, keyspace: KeyspaceId, key: &[u8]) -> StorageResult<bool> {
        let mut keyspaces = self.keyspaces.write();
        match keyspaces.get_mut(&keyspace) {
            Some(map) if map.contains_key(key) => Ok(Arc::make_mut(map).remove(key).is_some()),
            _ => Ok(false),
        }
    }

    fn write_batch(&self, keyspace: KeyspaceId, batch: Vec<KvPair>) -> StorageResult<()> {
        let mut keyspaces = self.keyspaces.write();
        let map = Arc::make_mut(keyspaces.entry(keyspace).or_default());
        for (key, value) in batch {
            map.insert(key, value);
        }
        Ok(())
    }

    fn drop_keyspace(&self, keyspace: KeyspaceId) -> StorageResult<()> {
        self.keyspaces.write().remove(&keyspace);
        Ok(())
    }

    fn len(&self, keyspace: KeyspaceId) -> StorageResult<usize> {
        Ok(self
            .keyspaces
            .read()
            .get(&keyspace)
            .map_or(0, |map| map.len()))
    }
}

/// Range iterator over a keyspace snapshot.
///
/// The remaining range shrinks by one key per step, so each `advance` is a
/// single `O(log n)` probe of the snapshot.
struct MemoryRangeIter {
    snapshot: Snapshot,
    range: KeyRange,
    reverse: bool,
    exhausted: bool,
}

impl KvIterator for MemoryRangeIter {
    fn advance(&mut self) -> StorageResult<Option<KvPair>> {
        if self.exhausted || self.range.is_empty() {
            self.exhausted = true;
            return Ok(None);
        }

        let bounds: (Bound<&[u8]>, Bound<&[u8]>) = (
            self.range.start.as_ref().map(Vec::as_slice),
            self.range.end.as_ref().map(Vec::as_slice),
        );
        let mut entries = self.snapshot.range::<[u8], _>(bounds);
        let next = if self.reverse {
            entries.next_back()
        } else {
            entries.next()
        };

        match next {
            Some((key, value)) => {
                let pair = (key.clone(), value.clone());
                if self.reverse {
                    self.range.end = Bound::Excluded(key.to_vec());
                } else {
                    self.range.start = Bound::Excluded(key.to_vec());
                }
                Ok(Some(pair))
            }
            None => {
                self.exhausted = true;
                Ok(None)
            }
        }
    }
}
