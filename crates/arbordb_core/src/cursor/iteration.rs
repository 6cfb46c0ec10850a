//! # Iteration Helper
//!
//! Directional traversal over one index keyspace with iterator reuse.
//!
//! Creating a store iterator is the expensive operation on a distributed
//! store, so the helper keeps the last one and reuses it as long as the
//! traversal continues in the same sense from where it left off.
//!
//! ## Reuse rule
//!
//! The cached iterator is reused when the requested direction equals the
//! cached one and the key buffer's generation is the one recorded after the
//! last step. A cached `GTEQ` (`LTEQ`) iterator also serves `GT` (`LT`)
//! once it has returned the current key, so continuing it cannot re-see
//! it. An iterator that has not stepped yet, such as one built by
//! `preload`, is rebuilt with the nudge instead.
//!
//! ## Bounds
//!
//! | Direction | Start                        | End                       | Order   |
//! |-----------|------------------------------|---------------------------|---------|
//! | `EQ`      | `Included(key)`              | `Included(key ‖ FF)`      | forward |
//! | `GTEQ`    | `Included(key)`              | stop                      | forward |
//! | `GT`      | `Included(key ‖ FF)` (deeper)| stop                      | forward |
//! | `LTEQ`    | stop                         | `Included(key ‖ FF)`      | reverse |
//! | `LT`      | stop                         | `Excluded(key)` (left)    | reverse |
//!
//! An empty key leaves the near side unbounded. The optional stop key is a
//! prefix: an inclusive stop admits every entry it prefixes.

use crate::adapter::{StoreAdapter, StoreIterator};
use crate::cursor::key::{deeper, Direction, KeyBuffer, Nudge};
use crate::cursor::CursorState;
use crate::error::{CoreError, CoreResult};
use crate::index_entry::decode_entry;
use crate::row::IndexRow;
use crate::schema::{Group, IndexDef};
use arbordb_storage::KeyRange;
use bytes::Bytes;
use std::ops::Bound;
use std::sync::Arc;
use tracing::{debug, trace};

/// Per-cursor traversal state over one index.
#[derive(Debug)]
pub struct IterationHelper {
    adapter: StoreAdapter,
    group: Arc<Group>,
    index: Arc<IndexDef>,
    key: KeyBuffer,
    value: Bytes,
    stop: Option<Vec<u8>>,
    iter: Option<StoreIterator>,
    last_direction: Option<Direction>,
    last_end_inclusive: bool,
    last_generation: u64,
    nudge: Option<Nudge>,
    positioned: bool,
    /// The cached iterator has returned the entry under the key.
    stepped: bool,
}

impl IterationHelper {
    /// Creates a helper with an empty key.
    pub fn new(adapter: StoreAdapter, group: Arc<Group>, index: Arc<IndexDef>) -> Self {
        Self {
            adapter,
            group,
            index,
            key: KeyBuffer::new(),
            value: Bytes::new(),
            stop: None,
            iter: None,
            last_direction: None,
            last_end_inclusive: false,
            last_generation: 0,
            nudge: None,
            positioned: false,
            stepped: false,
        }
    }

    /// Returns the index this helper walks.
    #[must_use]
    pub const fn index(&self) -> &Arc<IndexDef> {
        &self.index
    }

    /// Starts an iteration scope.
    ///
    /// Nothing is acquired yet; the iterator is built lazily on the first
    /// traversal or preload.
    pub fn open_iteration(&mut self) {
        trace!(index = %self.index.id(), "iteration opened");
    }

    /// Ends the iteration scope, releasing the store iterator.
    ///
    /// # Errors
    ///
    /// Never fails with the in-process store; the signature leaves room for
    /// stores that release remote resources.
    pub fn close_iteration(&mut self) -> CoreResult<()> {
        trace!(index = %self.index.id(), "iteration closed");
        self.clear();
        Ok(())
    }

    /// Returns the current raw key.
    #[must_use]
    pub fn key(&self) -> &[u8] {
        self.key.as_slice()
    }

    /// Returns the current raw value.
    #[must_use]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Returns the current key generation.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.key.generation()
    }

    /// Returns the direction of the cached iterator.
    #[must_use]
    pub const fn last_direction(&self) -> Option<Direction> {
        self.last_direction
    }

    /// Returns the nudge applied when the cached iterator was built.
    #[must_use]
    pub const fn last_nudge(&self) -> Option<Nudge> {
        self.nudge
    }

    /// Seeds the key. Invalidates the cached iterator.
    pub fn set_key(&mut self, key: &[u8]) {
        self.key.set(key);
        self.positioned = false;
    }

    /// Sets the far-side prefix bound. Changing it drops the cached iterator.
    pub fn set_stop(&mut self, stop: Option<Vec<u8>>) {
        if self.stop != stop {
            self.stop = stop;
            self.invalidate();
        }
    }

    /// Moves one entry in `direction` from the current key.
    ///
    /// Returns `false` once no entry remains within the bounds.
    ///
    /// # Errors
    ///
    /// Returns `StoreAccess` if building or advancing the iterator fails.
    /// The cached iterator is dropped so a retry starts fresh.
    pub fn traverse(&mut self, direction: Direction, end_inclusive: bool) -> CoreResult<bool> {
        if !self.cached_iterator_serves(direction, end_inclusive) {
            self.build_iterator(direction, end_inclusive)?;
        }
        let step = match self.iter.as_mut() {
            Some(iter) => iter.advance(),
            None => return Ok(false),
        };
        match step {
            Ok(Some((key, value))) => {
                self.key.set(&key);
                self.value = value;
                self.last_generation = self.key.generation();
                self.positioned = true;
                self.stepped = true;
                Ok(true)
            }
            Ok(None) => {
                self.positioned = false;
                Ok(false)
            }
            Err(err) => {
                self.invalidate();
                self.positioned = false;
                Err(err)
            }
        }
    }

    /// Builds the iterator for `direction` ahead of the next traversal and
    /// passes a prefetch hint to the store.
    ///
    /// # Errors
    ///
    /// Returns `StoreAccess` if the iterator cannot be created.
    pub fn preload(&mut self, direction: Direction, end_inclusive: bool) -> CoreResult<()> {
        if !self.cached_iterator_serves(direction, end_inclusive) {
            self.build_iterator(direction, end_inclusive)?;
        }
        if let Some(iter) = self.iter.as_mut() {
            iter.prefetch();
        }
        Ok(())
    }

    /// Decodes the entry the last successful traversal landed on.
    ///
    /// # Errors
    ///
    /// Returns `CursorLifecycle` if no traversal has succeeded since the
    /// last seed, or a codec error for a malformed entry.
    pub fn row(&self) -> CoreResult<IndexRow> {
        if !self.positioned {
            return Err(CoreError::lifecycle("row", CursorState::Idle));
        }
        decode_entry(&self.index, &self.group, self.key.as_slice(), &self.value)
    }

    /// Forgets the key, value and cached iterator.
    ///
    /// The stop bound is kept.
    pub fn clear(&mut self) {
        self.key.clear();
        self.value = Bytes::new();
        self.positioned = false;
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.iter = None;
        self.last_direction = None;
        self.nudge = None;
        self.stepped = false;
    }

    fn cached_iterator_serves(&mut self, direction: Direction, end_inclusive: bool) -> bool {
        let Some(last) = self.last_direction else {
            return false;
        };
        if self.iter.is_none()
            || self.last_end_inclusive != end_inclusive
            || self.last_generation != self.key.generation()
        {
            return false;
        }
        if last == direction {
            return true;
        }
        let narrows = self.stepped
            && matches!(
                (last, direction),
                (Direction::GtEq, Direction::Gt) | (Direction::LtEq, Direction::Lt)
            );
        if narrows {
            self.last_direction = Some(direction);
        }
        narrows
    }

    fn build_iterator(&mut self, direction: Direction, end_inclusive: bool) -> CoreResult<()> {
        self.iter = None;
        self.stepped = false;
        let far = self.far_bound(direction.is_reverse(), end_inclusive);
        let empty = self.key.is_empty();
        let (range, nudge) = match direction {
            Direction::Eq => {
                let start = Bound::Included(self.key.as_slice().to_vec());
                let guard = self.key.nudge(Nudge::Deeper);
                (KeyRange::new(start, guard.as_bound()), Some(guard.nudge()))
            }
            Direction::GtEq if empty => (KeyRange::new(Bound::Unbounded, far), None),
            Direction::GtEq => {
                let start = Bound::Included(self.key.as_slice().to_vec());
                (KeyRange::new(start, far), None)
            }
            Direction::LtEq | Direction::Lt if empty => {
                (KeyRange::new(far, Bound::Unbounded), None)
            }
            Direction::Gt if empty => (KeyRange::new(Bound::Unbounded, far), None),
            Direction::Gt => {
                let guard = self.key.nudge(Nudge::Deeper);
                (KeyRange::new(guard.as_bound(), far), Some(guard.nudge()))
            }
            Direction::LtEq => {
                let guard = self.key.nudge(Nudge::Deeper);
                (KeyRange::new(far, guard.as_bound()), Some(guard.nudge()))
            }
            Direction::Lt => {
                let guard = self.key.nudge(Nudge::Left);
                (KeyRange::new(far, guard.as_bound()), Some(guard.nudge()))
            }
        };
        debug!(
            index = %self.index.id(),
            keyspace = %self.index.keyspace(),
            %direction,
            ?nudge,
            "building index iterator"
        );
        let iter = self.adapter.range_iter(
            self.index.keyspace(),
            range,
            direction.is_reverse(),
            "index traversal",
        )?;
        self.iter = Some(iter);
        self.last_direction = Some(direction);
        self.last_end_inclusive = end_inclusive;
        self.last_generation = self.key.generation();
        self.nudge = nudge;
        Ok(())
    }

    /// The bound on the side the scan walks towards.
    fn far_bound(&self, reverse: bool, end_inclusive: bool) -> Bound<Vec<u8>> {
        match (&self.stop, reverse, end_inclusive) {
            (None, _, _) => Bound::Unbounded,
            (Some(stop), false, true) => Bound::Included(deeper(stop)),
            (Some(stop), false, false) => Bound::Excluded(stop.clone()),
            (Some(stop), true, true) => Bound::Included(stop.clone()),
            (Some(stop), true, false) => Bound::Included(deeper(stop)),
        }
    }
}
