//! Fault injection.
//!
//! [`FailingStore`] wraps another store and fails chosen operations on
//! demand. It also counts iterator creations and steps, which lets tests
//! assert how much physical work a cursor did without trusting the
//! cursor's own statistics.

use arbordb_storage::{
    InMemoryStore, KeyRange, KeyspaceId, KvIterator, KvPair, OrderedStore, StorageError,
    StorageResult,
};
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Kind of failure to inject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// A retryable failure.
    Transient,
    /// A permanent corruption report.
    Corrupted,
    /// The store has been closed.
    Closed,
}

impl Fault {
    /// Builds the store error for this fault.
    #[must_use]
    pub fn to_error(self) -> StorageError {
        match self {
            Self::Transient => StorageError::transient("injected"),
            Self::Corrupted => StorageError::Corrupted("injected".to_string()),
            Self::Closed => StorageError::Closed,
        }
    }
}

#[derive(Debug, Default)]
struct Plan {
    next_iterator: Option<Fault>,
    step: Option<(u64, Fault)>,
    writes: Option<Fault>,
}

#[derive(Debug, Default)]
struct Counters {
    iterators: AtomicU64,
    steps: AtomicU64,
}

/// A store wrapper that fails on demand.
pub struct FailingStore {
    inner: Arc<dyn OrderedStore>,
    plan: Arc<Mutex<Plan>>,
    counters: Arc<Counters>,
}

impl FailingStore {
    /// Wraps `inner`.
    pub fn new(inner: Arc<dyn OrderedStore>) -> Self {
        Self {
            inner,
            plan: Arc::new(Mutex::new(Plan::default())),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Wraps a fresh [`InMemoryStore`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStore::new()))
    }

    /// Fails the next iterator creation once.
    pub fn fail_next_iterator(&self, fault: Fault) {
        self.plan.lock().next_iterator = Some(fault);
    }

    /// Lets `steps` more advances succeed, then fails the next one once.
    ///
    /// Steps are counted across all iterators of this store.
    pub fn fail_step_after(&self, steps: u64, fault: Fault) {
        self.plan.lock().step = Some((steps, fault));
    }

    /// Fails every write until [`FailingStore::heal`].
    pub fn fail_writes(&self, fault: Fault) {
        self.plan.lock().writes = Some(fault);
    }

    /// Clears every pending fault.
    pub fn heal(&self) {
        *self.plan.lock() = Plan::default();
    }

    /// Returns the number of iterators created so far.
    #[must_use]
    pub fn iterators_created(&self) -> u64 {
        self.counters.iterators.load(Ordering::Relaxed)
    }

    /// Returns the number of successful advances so far.
    #[must_use]
    pub fn steps(&self) -> u64 {
        self.counters.steps.load(Ordering::Relaxed)
    }

    fn check_write(&self) -> StorageResult<()> {
        match self.plan.lock().writes {
            Some(fault) => Err(fault.to_error()),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for FailingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailingStore")
            .field("plan", &*self.plan.lock())
            .field("iterators", &self.iterators_created())
            .field("steps", &self.steps())
            .finish_non_exhaustive()
    }
}

impl OrderedStore for FailingStore {
    fn range_iter(
        &self,
        keyspace: KeyspaceId,
        range: KeyRange,
        reverse: bool,
    ) -> StorageResult<Box<dyn KvIterator>> {
        if let Some(fault) = self.plan.lock().next_iterator.take() {
            return Err(fault.to_error());
        }
        let inner = self.inner.range_iter(keyspace, range, reverse)?;
        self.counters.iterators.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(FailingIterator {
            inner,
            plan: Arc::clone(&self.plan),
            counters: Arc::clone(&self.counters),
        }))
    }

    fn get(&self, keyspace: KeyspaceId, key: &[u8]) -> StorageResult<Option<Bytes>> {
        self.inner.get(keyspace, key)
    }

    fn put(&self, keyspace: KeyspaceId, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.check_write()?;
        self.inner.put(keyspace, key, value)
    }

    fn delete(&self, keyspace: KeyspaceId, key: &[u8]) -> StorageResult<bool> {
        self.check_write()?;
        self.inner.delete(keyspace, key)
    }

    fn write_batch(&self, keyspace: KeyspaceId, batch: Vec<KvPair>) -> StorageResult<()> {
        self.check_write()?;
        self.inner.write_batch(keyspace, batch)
    }

    fn drop_keyspace(&self, keyspace: KeyspaceId) -> StorageResult<()> {
        self.check_write()?;
        self.inner.drop_keyspace(keyspace)
    }

    fn len(&self, keyspace: KeyspaceId) -> StorageResult<usize> {
        self.inner.len(keyspace)
    }
}

struct FailingIterator {
    inner: Box<dyn KvIterator>,
    plan: Arc<Mutex<Plan>>,
    counters: Arc<Counters>,
}

impl KvIterator for FailingIterator {
    fn advance(&mut self) -> StorageResult<Option<KvPair>> {
        {
            let mut plan = self.plan.lock();
            match plan.step {
                Some((0, fault)) => {
                    plan.step = None;
                    return Err(fault.to_error());
                }
                Some((remaining, fault)) => plan.step = Some((remaining - 1, fault)),
                None => {}
            }
        }
        let step = self.inner.advance()?;
        if step.is_some() {
            self.counters.steps.fetch_add(1, Ordering::Relaxed);
        }
        Ok(step)
    }

    fn prefetch(&mut self) {
        self.inner.prefetch();
    }
}
