//! Cursor statistics.
//!
//! Counters shared by every cursor and sorter opened through one adapter.
//! The iterator counter is what makes the reuse guarantees of the iteration
//! helper observable: a forward scan of N entries creates one iterator and
//! takes N + 1 store steps.

use std::sync::atomic::{AtomicU64, Ordering};

/// Cursor statistics and counters.
///
/// All counters are atomic and can be read while cursors are running.
#[derive(Debug, Default)]
pub struct CursorStats {
    /// Store iterators created.
    iterators_created: AtomicU64,
    /// Physical steps taken on store iterators.
    store_steps: AtomicU64,
    /// Rows handed to callers by cursors.
    rows_returned: AtomicU64,
    /// Index entries read but rejected by a scan selector or box filter.
    rows_filtered: AtomicU64,
    /// Rows written to temporary sort keyspaces.
    sort_rows_written: AtomicU64,
}

impl CursorStats {
    /// Creates a new stats instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_iterator(&self) {
        self.iterators_created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_step(&self) {
        self.store_steps.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_row(&self) {
        self.rows_returned.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_filtered(&self) {
        self.rows_filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sort_rows(&self, rows: u64) {
        self.sort_rows_written.fetch_add(rows, Ordering::Relaxed);
    }

    /// Returns the number of store iterators created.
    pub fn iterators_created(&self) -> u64 {
        self.iterators_created.load(Ordering::Relaxed)
    }

    /// Returns the number of physical store steps.
    pub fn store_steps(&self) -> u64 {
        self.store_steps.load(Ordering::Relaxed)
    }

    /// Returns the number of rows returned by cursors.
    pub fn rows_returned(&self) -> u64 {
        self.rows_returned.load(Ordering::Relaxed)
    }

    /// Returns the number of index entries filtered out.
    pub fn rows_filtered(&self) -> u64 {
        self.rows_filtered.load(Ordering::Relaxed)
    }

    /// Returns the number of rows written by sorters.
    pub fn sort_rows_written(&self) -> u64 {
        self.sort_rows_written.load(Ordering::Relaxed)
    }

    /// Returns a point-in-time copy of every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            iterators_created: self.iterators_created(),
            store_steps: self.store_steps(),
            rows_returned: self.rows_returned(),
            rows_filtered: self.rows_filtered(),
            sort_rows_written: self.sort_rows_written(),
        }
    }

    /// Resets every counter to zero.
    pub fn reset(&self) {
        self.iterators_created.store(0, Ordering::Relaxed);
        self.store_steps.store(0, Ordering::Relaxed);
        self.rows_returned.store(0, Ordering::Relaxed);
        self.rows_filtered.store(0, Ordering::Relaxed);
        self.sort_rows_written.store(0, Ordering::Relaxed);
    }
}

/// A snapshot of cursor statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Store iterators created.
    pub iterators_created: u64,
    /// Physical store steps.
    pub store_steps: u64,
    /// Rows returned by cursors.
    pub rows_returned: u64,
    /// Index entries filtered out.
    pub rows_filtered: u64,
    /// Rows written by sorters.
    pub sort_rows_written: u64,
}

impl StatsSnapshot {
    /// Returns the counter deltas from `earlier` to `self`.
    #[must_use]
    pub const fn since(&self, earlier: &Self) -> Self {
        Self {
            iterators_created: self.iterators_created.saturating_sub(earlier.iterators_created),
            store_steps: self.store_steps.saturating_sub(earlier.store_steps),
            rows_returned: self.rows_returned.saturating_sub(earlier.rows_returned),
            rows_filtered: self.rows_filtered.saturating_sub(earlier.rows_filtered),
            sort_rows_written: self.sort_rows_written.saturating_sub(earlier.sort_rows_written),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_new_is_zero() {
        let stats = CursorStats::new();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn stats_record_and_reset() {
        let stats = CursorStats::new();
        stats.record_iterator();
        stats.record_step();
        stats.record_step();
        stats.record_row();
        stats.record_filtered();
        stats.record_sort_rows(5);

        let snap = stats.snapshot();
        assert_eq!(snap.iterators_created, 1);
        assert_eq!(snap.store_steps, 2);
        assert_eq!(snap.rows_returned, 1);
        assert_eq!(snap.rows_filtered, 1);
        assert_eq!(snap.sort_rows_written, 5);

        stats.reset();
        assert_eq!(stats.store_steps(), 0);
    }

    #[test]
    fn snapshot_delta() {
        let stats = CursorStats::new();
        stats.record_step();
        let before = stats.snapshot();
        stats.record_step();
        stats.record_iterator();
        let delta = stats.snapshot().since(&before);
        assert_eq!(delta.store_steps, 1);
        assert_eq!(delta.iterators_created, 1);
    }
}
