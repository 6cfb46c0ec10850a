//! Value index cursor.

use crate::adapter::StoreAdapter;
use crate::cursor::key::{deeper, Direction};
use crate::cursor::{
    Bindings, ColumnSelector, CursorState, IndexBound, IndexCursor, IndexKeyRange, IndexOrdering,
    IndexScanSelector, IterationHelper, RangeShape,
};
use crate::error::{CoreError, CoreResult};
use crate::index_entry::encode_prefix;
use crate::row::{IndexRow, Row};
use crate::schema::Group;
use arbordb_codec::Value;
use std::sync::Arc;
use tracing::debug;

/// Cursor over a bounded range of a value index, in one direction.
///
/// Group-index entries whose table bitmap fails the scan selector are
/// skipped; table-index entries are always returned.
#[derive(Debug)]
pub struct ValueIndexCursor {
    adapter: StoreAdapter,
    helper: IterationHelper,
    range: IndexKeyRange,
    ascending: bool,
    selector: IndexScanSelector,
    bindings: Bindings,
    state: CursorState,
    /// Direction of the first traversal after a seed.
    pending: Option<Direction>,
    /// Encoded start bound and its inclusivity, resolved at open.
    start: Option<(Vec<u8>, bool)>,
    end_inclusive: bool,
}

impl ValueIndexCursor {
    /// Creates a closed cursor.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedOperation` for spatial indexes or mixed
    /// orderings, and `IllegalArgument` for bounds wider than the index.
    pub fn new(
        adapter: StoreAdapter,
        group: Arc<Group>,
        range: IndexKeyRange,
        ordering: &IndexOrdering,
        selector: IndexScanSelector,
    ) -> CoreResult<Self> {
        let index = Arc::clone(range.index());
        if index.is_spatial() {
            return Err(CoreError::unsupported(format!(
                "value scan of spatial index {}",
                index.name()
            )));
        }
        let ascending = ordering.direction()?;
        for bound in [range.lo_bound(), range.hi_bound()].into_iter().flatten() {
            if bound.values().len() > index.column_types().len() {
                return Err(CoreError::illegal_argument(format!(
                    "bound has {} values, index {} has {} columns",
                    bound.values().len(),
                    index.name(),
                    index.column_types().len()
                )));
            }
        }
        Ok(Self {
            helper: IterationHelper::new(adapter.clone(), group, index),
            adapter,
            range,
            ascending,
            selector,
            bindings: Bindings::default(),
            state: CursorState::Closed,
            pending: None,
            start: None,
            end_inclusive: true,
        })
    }

    /// Returns true if the cursor walks the index in ascending order.
    #[must_use]
    pub const fn is_ascending(&self) -> bool {
        self.ascending
    }

    fn encode_bound(&self, bound: Option<&IndexBound>) -> CoreResult<Option<(Vec<u8>, bool)>> {
        match bound {
            Some(bound) if !bound.values().is_empty() => {
                let values = bound.resolve(&self.bindings)?;
                let mut key = Vec::new();
                encode_prefix(self.range.index(), &values, &mut key)?;
                Ok(Some((key, bound.is_inclusive())))
            }
            _ => Ok(None),
        }
    }

    fn seed_from_bounds(&mut self) -> CoreResult<()> {
        let (start, stop) = if self.ascending {
            (self.range.lo_bound(), self.range.hi_bound())
        } else {
            (self.range.hi_bound(), self.range.lo_bound())
        };
        let start = self.encode_bound(start)?;
        let stop = self.encode_bound(stop)?;

        self.end_inclusive = stop.as_ref().map_or(true, |(_, inclusive)| *inclusive);
        self.helper.set_stop(stop.map(|(key, _)| key));
        self.start = start;
        self.seek_start();
        Ok(())
    }

    fn seek_start(&mut self) {
        self.helper.clear();
        let inclusive = match &self.start {
            Some((key, inclusive)) => {
                self.helper.set_key(key);
                *inclusive
            }
            None => true,
        };
        self.pending = Some(self.seek_direction(inclusive));
    }

    const fn seek_direction(&self, inclusive: bool) -> Direction {
        match (self.ascending, inclusive) {
            (true, true) => Direction::GtEq,
            (true, false) => Direction::Gt,
            (false, true) => Direction::LtEq,
            (false, false) => Direction::Lt,
        }
    }

    /// Returns true if seeding at `key` would surface entries outside the
    /// start bound.
    fn before_start(&self, key: &[u8]) -> bool {
        let Some((start, inclusive)) = &self.start else {
            return false;
        };
        match (self.ascending, *inclusive) {
            (true, true) => key < start.as_slice(),
            (true, false) => key < deeper(start).as_slice(),
            (false, true) => key > deeper(start).as_slice(),
            (false, false) => key >= start.as_slice(),
        }
    }

    fn accepts(&self, row: &IndexRow) -> bool {
        self.range.index().is_table_index()
            || self.selector.matches_all()
            || row.tables().is_some_and(|tables| self.selector.matches(tables))
    }
}

impl IndexCursor for ValueIndexCursor {
    fn open(&mut self) -> CoreResult<()> {
        if self.state != CursorState::Closed {
            return Err(CoreError::lifecycle("open", self.state));
        }
        self.helper.open_iteration();
        self.seed_from_bounds()?;
        self.state = CursorState::Active;
        debug!(
            index = %self.range.index().id(),
            ascending = self.ascending,
            "index cursor opened"
        );
        if self.adapter.config().preload_on_open {
            if let Some(direction) = self.pending {
                self.helper.preload(direction, self.end_inclusive)?;
            }
        }
        Ok(())
    }

    fn next(&mut self) -> CoreResult<Option<IndexRow>> {
        match self.state {
            CursorState::Closed => return Err(CoreError::lifecycle("next", self.state)),
            CursorState::Idle => return Ok(None),
            CursorState::Active => {}
        }
        let onward = if self.ascending {
            Direction::Gt
        } else {
            Direction::Lt
        };
        loop {
            let direction = self.pending.unwrap_or(onward);
            let found = self.helper.traverse(direction, self.end_inclusive)?;
            self.pending = None;
            if !found {
                self.state = CursorState::Idle;
                return Ok(None);
            }
            let row = self.helper.row()?;
            if self.accepts(&row) {
                self.adapter.stats().record_row();
                return Ok(Some(row));
            }
            self.adapter.stats().record_filtered();
        }
    }

    fn jump(&mut self, row: &Row, columns: ColumnSelector) -> CoreResult<()> {
        if self.state == CursorState::Closed {
            return Err(CoreError::lifecycle("jump", self.state));
        }
        let index = self.range.index();
        if row.table_id() != index.table() {
            return Err(CoreError::illegal_argument(format!(
                "cannot jump index {} to a row of {}",
                index.name(),
                row.table_id()
            )));
        }
        let count = columns.leading_count(index.columns().len());
        let values = index.columns()[..count]
            .iter()
            .map(|&c| row.value(c).cloned().unwrap_or(Value::Null))
            .collect::<Vec<_>>();
        let mut key = Vec::new();
        encode_prefix(index, &values, &mut key)?;

        if self.before_start(&key) {
            self.seek_start();
        } else {
            self.helper.clear();
            self.helper.set_key(&key);
            self.pending = Some(self.seek_direction(true));
        }
        self.state = CursorState::Active;
        Ok(())
    }

    fn close(&mut self) -> CoreResult<()> {
        let result = self.helper.close_iteration();
        self.state = CursorState::Closed;
        self.pending = None;
        self.start = None;
        debug!(index = %self.range.index().id(), "index cursor closed");
        result
    }

    fn rebind(&mut self, bindings: Bindings) {
        self.bindings = bindings;
    }

    fn state(&self) -> CursorState {
        self.state
    }

    fn shape(&self) -> RangeShape {
        RangeShape::Ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::BoundValue;
    use crate::test_support::{int_index_fixture, int_index_with_config, IndexedTable};

    fn cursor(fixture: &IndexedTable, range: IndexKeyRange, ascending: bool) -> ValueIndexCursor {
        let ordering = if ascending {
            IndexOrdering::ascending(1)
        } else {
            IndexOrdering::descending(1)
        };
        ValueIndexCursor::new(
            fixture.adapter.clone(),
            Arc::clone(&fixture.group),
            range,
            &ordering,
            IndexScanSelector::All,
        )
        .unwrap()
    }

    fn int_row(fixture: &IndexedTable, id: i64, v: i64) -> Row {
        fixture.row(vec![Value::Int(id), Value::Int(v)])
    }

    fn drain(cursor: &mut ValueIndexCursor) -> Vec<i64> {
        let mut out = Vec::new();
        while let Some(row) = cursor.next().unwrap() {
            out.push(row.values()[0].as_int().unwrap());
        }
        out
    }

    #[test]
    fn full_scan_both_directions() {
        let fixture = int_index_fixture(&[5, 1, 7, 3]);
        let mut asc = cursor(&fixture, IndexKeyRange::new(Arc::clone(&fixture.index)), true);
        asc.open().unwrap();
        assert_eq!(drain(&mut asc), vec![1, 3, 5, 7]);
        assert_eq!(asc.state(), CursorState::Idle);
        assert!(asc.next().unwrap().is_none());
        asc.close().unwrap();

        let mut desc = cursor(&fixture, IndexKeyRange::new(Arc::clone(&fixture.index)), false);
        desc.open().unwrap();
        assert_eq!(drain(&mut desc), vec![7, 5, 3, 1]);
    }

    #[test]
    fn bounded_scans() {
        let fixture = int_index_fixture(&[1, 3, 5, 7]);
        let range = IndexKeyRange::new(Arc::clone(&fixture.index))
            .lo(IndexBound::exclusive([Value::Int(1)]))
            .hi(IndexBound::inclusive([Value::Int(5)]));

        let mut asc = cursor(&fixture, range.clone(), true);
        asc.open().unwrap();
        assert_eq!(drain(&mut asc), vec![3, 5]);

        let mut desc = cursor(&fixture, range, false);
        desc.open().unwrap();
        assert_eq!(drain(&mut desc), vec![5, 3]);
    }

    #[test]
    fn whole_scan_uses_one_iterator() {
        let fixture = int_index_fixture(&[1, 3, 5, 7, 9, 11]);
        let mut cursor = cursor(&fixture, IndexKeyRange::new(Arc::clone(&fixture.index)), true);
        cursor.open().unwrap();
        assert_eq!(drain(&mut cursor).len(), 6);
        let stats = fixture.adapter.stats().snapshot();
        assert_eq!(stats.iterators_created, 1);
        assert_eq!(stats.store_steps, 7);
        assert_eq!(stats.rows_returned, 6);
    }

    #[test]
    fn parameters_resolve_at_open() {
        let fixture = int_index_fixture(&[1, 3, 5, 7]);
        let range = IndexKeyRange::new(Arc::clone(&fixture.index))
            .lo(IndexBound::inclusive([BoundValue::Parameter(0)]));
        let mut cursor = cursor(&fixture, range, true);
        assert!(matches!(cursor.open(), Err(CoreError::IllegalArgument { .. })));
        assert_eq!(cursor.state(), CursorState::Closed);

        cursor.rebind(Bindings::new(vec![Value::Int(5)]));
        cursor.open().unwrap();
        assert_eq!(drain(&mut cursor), vec![5, 7]);

        cursor.rebind(Bindings::new(vec![Value::Int(2)]));
        cursor.close().unwrap();
        cursor.open().unwrap();
        assert_eq!(drain(&mut cursor), vec![3, 5, 7]);
    }

    #[test]
    fn jump_repositions_and_reactivates() {
        let fixture = int_index_fixture(&[1, 3, 5, 7]);
        let mut cursor = cursor(&fixture, IndexKeyRange::new(Arc::clone(&fixture.index)), true);
        cursor.open().unwrap();
        assert_eq!(drain(&mut cursor), vec![1, 3, 5, 7]);
        assert_eq!(cursor.state(), CursorState::Idle);

        cursor.jump(&int_row(&fixture, 4, 5), ColumnSelector::all()).unwrap();
        assert_eq!(cursor.state(), CursorState::Active);
        assert_eq!(drain(&mut cursor), vec![5, 7]);

        cursor.jump(&int_row(&fixture, 9, 4), ColumnSelector::all()).unwrap();
        assert_eq!(drain(&mut cursor), vec![5, 7]);
    }

    #[test]
    fn jump_before_start_clamps_to_bound() {
        let fixture = int_index_fixture(&[1, 3, 5, 7]);
        let range = IndexKeyRange::new(Arc::clone(&fixture.index))
            .lo(IndexBound::exclusive([Value::Int(3)]));
        let mut asc = cursor(&fixture, range.clone(), true);
        asc.open().unwrap();
        asc.jump(&int_row(&fixture, 1, 1), ColumnSelector::all()).unwrap();
        assert_eq!(drain(&mut asc), vec![5, 7]);

        let mut desc = cursor(&fixture, range.hi(IndexBound::inclusive([Value::Int(5)])), false);
        desc.open().unwrap();
        desc.jump(&int_row(&fixture, 4, 7), ColumnSelector::all()).unwrap();
        assert_eq!(drain(&mut desc), vec![5]);
    }

    #[test]
    fn lifecycle_errors() {
        let fixture = int_index_fixture(&[1]);
        let mut cursor = cursor(&fixture, IndexKeyRange::new(Arc::clone(&fixture.index)), true);
        assert!(matches!(cursor.next(), Err(CoreError::CursorLifecycle { .. })));
        assert!(matches!(
            cursor.jump(&int_row(&fixture, 1, 1), ColumnSelector::all()),
            Err(CoreError::CursorLifecycle { .. })
        ));
        cursor.open().unwrap();
        assert!(matches!(cursor.open(), Err(CoreError::CursorLifecycle { .. })));
        cursor.close().unwrap();
        assert!(matches!(cursor.next(), Err(CoreError::CursorLifecycle { .. })));
    }

    #[test]
    fn construction_rejects_bad_requests() {
        let fixture = int_index_fixture(&[1]);
        let mixed = ValueIndexCursor::new(
            fixture.adapter.clone(),
            Arc::clone(&fixture.group),
            IndexKeyRange::new(Arc::clone(&fixture.index)),
            &IndexOrdering::columns(vec![true, false]),
            IndexScanSelector::All,
        );
        assert!(matches!(mixed, Err(CoreError::UnsupportedOperation { .. })));

        let wide = ValueIndexCursor::new(
            fixture.adapter.clone(),
            Arc::clone(&fixture.group),
            IndexKeyRange::new(Arc::clone(&fixture.index))
                .lo(IndexBound::inclusive([Value::Int(1), Value::Int(2)])),
            &IndexOrdering::ascending(1),
            IndexScanSelector::All,
        );
        assert!(matches!(wide, Err(CoreError::IllegalArgument { .. })));
    }

    #[test]
    fn preload_disabled_defers_iterator() {
        let fixture = int_index_with_config(
            &[1, 3],
            crate::Config::new().preload_on_open(false),
        );
        let mut cursor = cursor(&fixture, IndexKeyRange::new(Arc::clone(&fixture.index)), true);
        cursor.open().unwrap();
        assert_eq!(fixture.adapter.stats().iterators_created(), 0);
        assert_eq!(drain(&mut cursor), vec![1, 3]);
        assert_eq!(fixture.adapter.stats().iterators_created(), 1);
    }
}
