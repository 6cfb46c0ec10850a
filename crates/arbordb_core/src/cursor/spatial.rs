//! Spatial index cursor.
//!
//! Entries of a spatial index are keyed by `(x, y)`. An in-box scan walks
//! the `x` range through the iteration helper and filters on `y`. A
//! near-point scan reads the whole index and returns entries by increasing
//! distance from the query point.

use crate::adapter::StoreAdapter;
use crate::cursor::key::Direction;
use crate::cursor::{
    Bindings, ColumnSelector, CursorState, IndexBound, IndexCursor, IndexKeyRange,
    IterationHelper, RangeShape,
};
use crate::error::{CoreError, CoreResult};
use crate::index_entry::encode_prefix;
use crate::row::{IndexRow, Row};
use crate::schema::Group;
use arbordb_codec::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct Interval {
    lo: f64,
    lo_inclusive: bool,
    hi: f64,
    hi_inclusive: bool,
}

impl Interval {
    fn contains(&self, v: f64) -> bool {
        let above = if self.lo_inclusive { v >= self.lo } else { v > self.lo };
        let below = if self.hi_inclusive { v <= self.hi } else { v < self.hi };
        above && below
    }
}

/// Cursor over a two-dimensional point index.
#[derive(Debug)]
pub struct SpatialIndexCursor {
    adapter: StoreAdapter,
    helper: IterationHelper,
    range: IndexKeyRange,
    shape: RangeShape,
    bindings: Bindings,
    state: CursorState,
    pending: Option<Direction>,
    end_inclusive: bool,
    y_filter: Option<Interval>,
    ranked: VecDeque<IndexRow>,
}

impl SpatialIndexCursor {
    /// Creates a closed cursor.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedOperation` if the index is not spatial and
    /// `IllegalArgument` if a bound does not name both coordinates.
    pub fn new(adapter: StoreAdapter, group: Arc<Group>, range: IndexKeyRange) -> CoreResult<Self> {
        let index = Arc::clone(range.index());
        if !index.is_spatial() {
            return Err(CoreError::unsupported(format!(
                "spatial scan of value index {}",
                index.name()
            )));
        }
        let shape = range.shape();
        let bounds = match shape {
            RangeShape::InBox => vec![range.lo_bound(), range.hi_bound()],
            _ => vec![range.lo_bound()],
        };
        if bounds.iter().any(|b| b.map_or(true, |b| b.values().len() != 2)) {
            return Err(CoreError::illegal_argument(format!(
                "spatial scan of {} needs (x, y) bounds",
                index.name()
            )));
        }
        Ok(Self {
            helper: IterationHelper::new(adapter.clone(), group, index),
            adapter,
            range,
            shape,
            bindings: Bindings::default(),
            state: CursorState::Closed,
            pending: None,
            end_inclusive: true,
            y_filter: None,
            ranked: VecDeque::new(),
        })
    }

    fn point(&self, bound: Option<&IndexBound>) -> CoreResult<(f64, f64)> {
        let values = match bound {
            Some(bound) => bound.resolve(&self.bindings)?,
            None => Vec::new(),
        };
        match values.as_slice() {
            [x, y] => match (x.as_double(), y.as_double()) {
                (Some(x), Some(y)) => Ok((x, y)),
                _ => Err(CoreError::illegal_argument("spatial bounds must be numeric")),
            },
            _ => Err(CoreError::illegal_argument("spatial bounds need two values")),
        }
    }

    fn x_key(&self, x: f64) -> CoreResult<Vec<u8>> {
        let mut key = Vec::new();
        encode_prefix(self.range.index(), &[Value::Double(x)], &mut key)?;
        Ok(key)
    }

    fn open_box(&mut self) -> CoreResult<()> {
        let lo_bound = self.range.lo_bound();
        let hi_bound = self.range.hi_bound();
        let lo_inclusive = lo_bound.map_or(true, IndexBound::is_inclusive);
        let hi_inclusive = hi_bound.map_or(true, IndexBound::is_inclusive);
        let (x0, y0) = self.point(lo_bound)?;
        let (x1, y1) = self.point(hi_bound)?;
        let start = self.x_key(x0)?;
        let stop = self.x_key(x1)?;

        self.helper.clear();
        self.helper.set_stop(Some(stop));
        self.helper.set_key(&start);
        self.end_inclusive = hi_inclusive;
        self.pending = Some(if lo_inclusive {
            Direction::GtEq
        } else {
            Direction::Gt
        });
        self.y_filter = Some(Interval {
            lo: y0,
            lo_inclusive,
            hi: y1,
            hi_inclusive,
        });
        Ok(())
    }

    fn open_near(&mut self) -> CoreResult<()> {
        let (px, py) = self.point(self.range.lo_bound())?;
        self.helper.clear();
        self.helper.set_stop(None);
        let mut ranked = Vec::new();
        let mut direction = Direction::GtEq;
        while self.helper.traverse(direction, true)? {
            direction = Direction::Gt;
            let row = self.helper.row()?;
            if let Some((x, y)) = coordinates(&row) {
                let distance = (x - px).powi(2) + (y - py).powi(2);
                ranked.push((distance, row));
            }
        }
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0));
        self.ranked = ranked.into_iter().map(|(_, row)| row).collect();
        Ok(())
    }

    fn next_in_box(&mut self) -> CoreResult<Option<IndexRow>> {
        loop {
            let direction = self.pending.unwrap_or(Direction::Gt);
            let found = self.helper.traverse(direction, self.end_inclusive)?;
            self.pending = None;
            if !found {
                return Ok(None);
            }
            let row = self.helper.row()?;
            let inside = match (coordinates(&row), &self.y_filter) {
                (Some((_, y)), Some(filter)) => filter.contains(y),
                _ => false,
            };
            if inside {
                return Ok(Some(row));
            }
            self.adapter.stats().record_filtered();
        }
    }
}

fn coordinates(row: &IndexRow) -> Option<(f64, f64)> {
    match row.values() {
        [x, y] => Some((x.as_double()?, y.as_double()?)),
        _ => None,
    }
}

impl IndexCursor for SpatialIndexCursor {
    fn open(&mut self) -> CoreResult<()> {
        if self.state != CursorState::Closed {
            return Err(CoreError::lifecycle("open", self.state));
        }
        self.helper.open_iteration();
        match self.shape {
            RangeShape::NearPoint => self.open_near()?,
            _ => self.open_box()?,
        }
        self.state = CursorState::Active;
        debug!(index = %self.range.index().id(), shape = ?self.shape, "spatial cursor opened");
        Ok(())
    }

    fn next(&mut self) -> CoreResult<Option<IndexRow>> {
        match self.state {
            CursorState::Closed => return Err(CoreError::lifecycle("next", self.state)),
            CursorState::Idle => return Ok(None),
            CursorState::Active => {}
        }
        let row = match self.shape {
            RangeShape::NearPoint => self.ranked.pop_front(),
            _ => self.next_in_box()?,
        };
        match &row {
            Some(_) => self.adapter.stats().record_row(),
            None => self.state = CursorState::Idle,
        }
        Ok(row)
    }

    fn jump(&mut self, _row: &Row, _columns: ColumnSelector) -> CoreResult<()> {
        Err(CoreError::unsupported("jump on a spatial index cursor"))
    }

    fn close(&mut self) -> CoreResult<()> {
        let result = self.helper.close_iteration();
        self.ranked.clear();
        self.pending = None;
        self.y_filter = None;
        self.state = CursorState::Closed;
        result
    }

    fn rebind(&mut self, bindings: Bindings) {
        self.bindings = bindings;
    }

    fn state(&self) -> CursorState {
        self.state
    }

    fn shape(&self) -> RangeShape {
        self.shape
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{spatial_fixture, IndexedTable};

    fn cursor(fixture: &IndexedTable, range: IndexKeyRange) -> SpatialIndexCursor {
        SpatialIndexCursor::new(fixture.adapter.clone(), Arc::clone(&fixture.group), range).unwrap()
    }

    fn drain(cursor: &mut SpatialIndexCursor) -> Vec<(f64, f64)> {
        let mut out = Vec::new();
        while let Some(row) = cursor.next().unwrap() {
            out.push(coordinates(&row).unwrap());
        }
        out
    }

    fn point(x: f64, y: f64) -> [Value; 2] {
        [Value::Double(x), Value::Double(y)]
    }

    #[test]
    fn in_box_filters_both_axes() {
        let fixture = spatial_fixture(&[(0.0, 0.0), (1.0, 5.0), (2.0, 2.0), (3.0, 1.0), (9.0, 1.0)]);
        let range = IndexKeyRange::new(Arc::clone(&fixture.index))
            .lo(IndexBound::inclusive(point(0.5, 0.5)))
            .hi(IndexBound::inclusive(point(3.0, 3.0)));
        let mut cursor = cursor(&fixture, range);
        cursor.open().unwrap();
        assert_eq!(drain(&mut cursor), vec![(2.0, 2.0), (3.0, 1.0)]);
        assert_eq!(cursor.state(), CursorState::Idle);
    }

    #[test]
    fn near_point_orders_by_distance() {
        let fixture = spatial_fixture(&[(0.0, 0.0), (5.0, 5.0), (1.0, 1.0), (-2.0, 0.0)]);
        let range = IndexKeyRange::new(Arc::clone(&fixture.index))
            .lo(IndexBound::inclusive(point(1.0, 0.5)));
        let mut cursor = cursor(&fixture, range);
        cursor.open().unwrap();
        assert_eq!(
            drain(&mut cursor),
            vec![(1.0, 1.0), (0.0, 0.0), (-2.0, 0.0), (5.0, 5.0)]
        );
        cursor.close().unwrap();
        assert_eq!(cursor.state(), CursorState::Closed);
    }

    #[test]
    fn jump_is_unsupported() {
        let fixture = spatial_fixture(&[(0.0, 0.0)]);
        let range = IndexKeyRange::new(Arc::clone(&fixture.index))
            .lo(IndexBound::inclusive(point(0.0, 0.0)));
        let mut cursor = cursor(&fixture, range);
        cursor.open().unwrap();
        let row = fixture.row(vec![Value::Int(1), Value::Double(0.0), Value::Double(0.0)]);
        assert!(matches!(
            cursor.jump(&row, ColumnSelector::all()),
            Err(CoreError::UnsupportedOperation { .. })
        ));
    }

    #[test]
    fn bounds_must_name_two_coordinates() {
        let fixture = spatial_fixture(&[]);
        let range = IndexKeyRange::new(Arc::clone(&fixture.index))
            .lo(IndexBound::inclusive([Value::Double(0.0)]));
        assert!(matches!(
            SpatialIndexCursor::new(fixture.adapter.clone(), Arc::clone(&fixture.group), range),
            Err(CoreError::IllegalArgument { .. })
        ));
    }
}
