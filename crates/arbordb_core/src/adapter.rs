//! Store adapter.
//!
//! Every store call made by cursors and sorters goes through a
//! [`StoreAdapter`]. It ties the store handle to a session, counts iterator
//! creations and physical steps, and turns store failures into
//! [`CoreError::StoreAccess`] carrying the session and what was being done.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::stats::CursorStats;
use crate::types::SessionId;
use arbordb_storage::{
    InMemoryStore, KeyRange, KeyspaceId, KvIterator, KvPair, OrderedStore, StorageError,
};
use bytes::Bytes;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

struct AdapterInner {
    store: Arc<dyn OrderedStore>,
    temp_store: Arc<dyn OrderedStore>,
    session: SessionId,
    config: Config,
    stats: CursorStats,
    next_temp_keyspace: AtomicU32,
}

/// Session-scoped handle to an ordered store.
///
/// Cloning is cheap; clones share the session, configuration and statistics.
#[derive(Clone)]
pub struct StoreAdapter {
    inner: Arc<AdapterInner>,
}

impl StoreAdapter {
    /// Creates an adapter with a fresh session and an in-memory store for
    /// temporary sort keyspaces.
    pub fn new(store: Arc<dyn OrderedStore>, config: Config) -> Self {
        Self::with_temp_store(store, Arc::new(InMemoryStore::new()), config)
    }

    /// Creates an adapter whose sorters spill to `temp_store`.
    pub fn with_temp_store(
        store: Arc<dyn OrderedStore>,
        temp_store: Arc<dyn OrderedStore>,
        config: Config,
    ) -> Self {
        let next_temp_keyspace = AtomicU32::new(config.temp_keyspace_base);
        Self {
            inner: Arc::new(AdapterInner {
                store,
                temp_store,
                session: SessionId::new(),
                config,
                stats: CursorStats::new(),
                next_temp_keyspace,
            }),
        }
    }

    /// Returns the session ID.
    #[must_use]
    pub fn session(&self) -> SessionId {
        self.inner.session
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Returns the statistics shared by every cursor on this adapter.
    #[must_use]
    pub fn stats(&self) -> &CursorStats {
        &self.inner.stats
    }

    /// Creates an iterator over `range` of `keyspace`.
    ///
    /// # Errors
    ///
    /// Returns `StoreAccess` if the store cannot create the iterator.
    pub fn range_iter(
        &self,
        keyspace: KeyspaceId,
        range: KeyRange,
        reverse: bool,
        context: &'static str,
    ) -> CoreResult<StoreIterator> {
        self.open_iter(self.inner.store.as_ref(), keyspace, range, reverse, context)
    }

    /// Reads one key.
    ///
    /// # Errors
    ///
    /// Returns `StoreAccess` if the read fails.
    pub fn get(
        &self,
        keyspace: KeyspaceId,
        key: &[u8],
        context: &'static str,
    ) -> CoreResult<Option<Bytes>> {
        self.inner
            .store
            .get(keyspace, key)
            .map_err(|e| self.store_error(context, e))
    }

    /// Writes one key.
    ///
    /// # Errors
    ///
    /// Returns `StoreAccess` if the write fails.
    pub fn put(
        &self,
        keyspace: KeyspaceId,
        key: &[u8],
        value: &[u8],
        context: &'static str,
    ) -> CoreResult<()> {
        self.inner
            .store
            .put(keyspace, key, value)
            .map_err(|e| self.store_error(context, e))
    }

    /// Removes one key, returning whether it was present.
    ///
    /// # Errors
    ///
    /// Returns `StoreAccess` if the write fails.
    pub fn delete(&self, keyspace: KeyspaceId, key: &[u8], context: &'static str) -> CoreResult<bool> {
        self.inner
            .store
            .delete(keyspace, key)
            .map_err(|e| self.store_error(context, e))
    }

    /// Reserves a keyspace of the temporary store that no other sort uses.
    ///
    /// # Errors
    ///
    /// Returns `IllegalArgument` once the keyspace IDs above
    /// `temp_keyspace_base` are used up.
    pub(crate) fn allocate_temp_keyspace(&self) -> CoreResult<KeyspaceId> {
        self.inner
            .next_temp_keyspace
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |next| next.checked_add(1))
            .map(KeyspaceId::new)
            .map_err(|_| {
                CoreError::illegal_argument(format!(
                    "temporary keyspaces exhausted for session {}",
                    self.inner.session
                ))
            })
    }

    pub(crate) fn temp_write_batch(
        &self,
        keyspace: KeyspaceId,
        batch: Vec<KvPair>,
    ) -> CoreResult<()> {
        self.inner
            .temp_store
            .write_batch(keyspace, batch)
            .map_err(|e| self.store_error("sort spill", e))
    }

    pub(crate) fn temp_range_iter(&self, keyspace: KeyspaceId) -> CoreResult<StoreIterator> {
        self.open_iter(
            self.inner.temp_store.as_ref(),
            keyspace,
            KeyRange::all(),
            false,
            "sort replay",
        )
    }

    pub(crate) fn drop_temp_keyspace(&self, keyspace: KeyspaceId) -> CoreResult<()> {
        self.inner
            .temp_store
            .drop_keyspace(keyspace)
            .map_err(|e| self.store_error("sort cleanup", e))
    }

    pub(crate) fn store_error(&self, context: &str, source: StorageError) -> CoreError {
        CoreError::StoreAccess {
            session: self.inner.session,
            context: context.to_string(),
            source,
        }
    }

    fn open_iter(
        &self,
        store: &dyn OrderedStore,
        keyspace: KeyspaceId,
        range: KeyRange,
        reverse: bool,
        context: &'static str,
    ) -> CoreResult<StoreIterator> {
        debug!(%keyspace, reverse, context, "creating store iterator");
        let inner = store
            .range_iter(keyspace, range, reverse)
            .map_err(|e| self.store_error(context, e))?;
        self.inner.stats.record_iterator();
        Ok(StoreIterator {
            inner,
            adapter: self.clone(),
            keyspace,
            context,
        })
    }
}

impl fmt::Debug for StoreAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreAdapter")
            .field("session", &self.inner.session)
            .field("config", &self.inner.config)
            .field("stats", &self.inner.stats.snapshot())
            .finish_non_exhaustive()
    }
}

/// A store iterator that reports its steps and errors through its adapter.
pub struct StoreIterator {
    inner: Box<dyn KvIterator>,
    adapter: StoreAdapter,
    keyspace: KeyspaceId,
    context: &'static str,
}

impl StoreIterator {
    /// Takes one physical step.
    ///
    /// # Errors
    ///
    /// Returns `StoreAccess` if the store fails.
    pub fn advance(&mut self) -> CoreResult<Option<KvPair>> {
        self.adapter.stats().record_step();
        let step = self
            .inner
            .advance()
            .map_err(|e| self.adapter.store_error(self.context, e))?;
        trace!(keyspace = %self.keyspace, found = step.is_some(), "store step");
        Ok(step)
    }

    /// Forwards a prefetch hint to the store.
    pub fn prefetch(&mut self) {
        self.inner.prefetch();
    }
}

impl fmt::Debug for StoreIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreIterator")
            .field("keyspace", &self.keyspace)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
