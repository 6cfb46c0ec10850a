//! # Cursors
//!
//! Pull-based cursors over group and index keyspaces.
//!
//! ## Lifecycle
//!
//! ```text
//!            open()            next() exhausted
//!  Closed ──────────▶ Active ───────────────────▶ Idle
//!    ▲                  │  ▲        jump()         │
//!    │     close()      │  └───────────────────────┘
//!    └──────────────────┴──────────────────────────┘
//! ```
//!
//! `next` is legal in `Active` and `Idle`; calling it on a closed cursor is
//! a [`CoreError::CursorLifecycle`] error.

mod group;
mod index;
mod iteration;
mod key;
mod spatial;

pub use group::{GroupCursor, ScanMode};
pub use index::ValueIndexCursor;
pub use iteration::IterationHelper;
pub use key::{Direction, KeyBuffer, Nudge, NudgeGuard};
pub use spatial::SpatialIndexCursor;

use crate::adapter::StoreAdapter;
use crate::error::{CoreError, CoreResult};
use crate::row::{IndexRow, Row};
use crate::schema::{Group, IndexDef};
use arbordb_codec::Value;
use std::fmt;
use std::sync::Arc;

/// Cursor lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CursorState {
    /// Not open; `rebind` of a group cursor is legal here.
    Closed,
    /// Open and possibly positioned.
    Active,
    /// Open and exhausted.
    Idle,
}

impl fmt::Display for CursorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Closed => "closed",
            Self::Active => "active",
            Self::Idle => "idle",
        })
    }
}

/// Values for the parameters referenced by index bounds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    values: Vec<Value>,
}

impl Bindings {
    /// Creates bindings; parameter `i` is `values[i]`.
    #[must_use]
    pub const fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Returns the value bound to parameter `i`.
    #[must_use]
    pub fn get(&self, i: usize) -> Option<&Value> {
        self.values.get(i)
    }
}

/// One column of an index bound.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    /// A constant.
    Literal(Value),
    /// A parameter resolved against the cursor's bindings at open or jump.
    Parameter(usize),
}

impl BoundValue {
    /// Resolves the bound value.
    ///
    /// # Errors
    ///
    /// Returns `IllegalArgument` if the parameter is unbound.
    pub fn resolve(&self, bindings: &Bindings) -> CoreResult<Value> {
        match self {
            Self::Literal(value) => Ok(value.clone()),
            Self::Parameter(i) => bindings
                .get(*i)
                .cloned()
                .ok_or_else(|| CoreError::illegal_argument(format!("parameter {i} is not bound"))),
        }
    }
}

impl From<Value> for BoundValue {
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}

/// A bound on the leading columns of an index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexBound {
    values: Vec<BoundValue>,
    inclusive: bool,
}

impl IndexBound {
    /// A bound that admits entries equal to it on the bound columns.
    pub fn inclusive(values: impl IntoIterator<Item = impl Into<BoundValue>>) -> Self {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            inclusive: true,
        }
    }

    /// A bound that rejects entries equal to it on the bound columns.
    pub fn exclusive(values: impl IntoIterator<Item = impl Into<BoundValue>>) -> Self {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            inclusive: false,
        }
    }

    /// Returns the bound columns.
    #[must_use]
    pub fn values(&self) -> &[BoundValue] {
        &self.values
    }

    /// Returns true for an inclusive bound.
    #[must_use]
    pub const fn is_inclusive(&self) -> bool {
        self.inclusive
    }

    /// Resolves every column against `bindings`.
    ///
    /// # Errors
    ///
    /// Returns `IllegalArgument` if a parameter is unbound.
    pub fn resolve(&self, bindings: &Bindings) -> CoreResult<Vec<Value>> {
        self.values.iter().map(|v| v.resolve(bindings)).collect()
    }
}

/// Shape of a requested key range, which selects the cursor realization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeShape {
    /// A value range walked in key order.
    Ordered,
    /// Spatial: entries ordered by distance from a point.
    NearPoint,
    /// Spatial: entries inside a box.
    InBox,
}

/// Key range requested from an index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexKeyRange {
    index: Arc<IndexDef>,
    lo: Option<IndexBound>,
    hi: Option<IndexBound>,
}

impl IndexKeyRange {
    /// The whole index.
    #[must_use]
    pub const fn new(index: Arc<IndexDef>) -> Self {
        Self {
            index,
            lo: None,
            hi: None,
        }
    }

    /// Sets the lower bound. For spatial indexes this is the query point or
    /// the box's low corner.
    #[must_use]
    pub fn lo(mut self, bound: IndexBound) -> Self {
        self.lo = Some(bound);
        self
    }

    /// Sets the upper bound. For spatial indexes this is the box's high
    /// corner.
    #[must_use]
    pub fn hi(mut self, bound: IndexBound) -> Self {
        self.hi = Some(bound);
        self
    }

    /// Returns the index.
    #[must_use]
    pub const fn index(&self) -> &Arc<IndexDef> {
        &self.index
    }

    /// Returns the lower bound.
    #[must_use]
    pub const fn lo_bound(&self) -> Option<&IndexBound> {
        self.lo.as_ref()
    }

    /// Returns the upper bound.
    #[must_use]
    pub const fn hi_bound(&self) -> Option<&IndexBound> {
        self.hi.as_ref()
    }

    /// Classifies the range.
    #[must_use]
    pub fn shape(&self) -> RangeShape {
        match (self.index.is_spatial(), &self.hi) {
            (false, _) => RangeShape::Ordered,
            (true, None) => RangeShape::NearPoint,
            (true, Some(_)) => RangeShape::InBox,
        }
    }
}

/// Per-column scan directions of an index scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexOrdering {
    ascending: Vec<bool>,
}

impl IndexOrdering {
    /// Every column ascending.
    #[must_use]
    pub fn ascending(columns: usize) -> Self {
        Self {
            ascending: vec![true; columns.max(1)],
        }
    }

    /// Every column descending.
    #[must_use]
    pub fn descending(columns: usize) -> Self {
        Self {
            ascending: vec![false; columns.max(1)],
        }
    }

    /// Explicit per-column directions.
    #[must_use]
    pub const fn columns(ascending: Vec<bool>) -> Self {
        Self { ascending }
    }

    /// Returns whether the whole scan runs ascending.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedOperation` for mixed directions; those orders are
    /// produced by sorting instead.
    pub fn direction(&self) -> CoreResult<bool> {
        let first = self.ascending.first().copied().unwrap_or(true);
        if self.ascending.iter().all(|&a| a == first) {
            Ok(first)
        } else {
            Err(CoreError::unsupported(
                "index scans with mixed column directions",
            ))
        }
    }
}

/// Index columns taken from a row when jumping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSelector {
    mask: u64,
}

impl ColumnSelector {
    /// Every column.
    #[must_use]
    pub const fn all() -> Self {
        Self { mask: u64::MAX }
    }

    /// The first `n` columns.
    #[must_use]
    pub const fn leading(n: u32) -> Self {
        Self {
            mask: match 1u64.checked_shl(n) {
                Some(bit) => bit - 1,
                None => u64::MAX,
            },
        }
    }

    /// Returns true if column `i` is selected.
    #[must_use]
    pub const fn is_selected(&self, i: usize) -> bool {
        i < 64 && self.mask & (1 << i) != 0
    }

    /// Number of leading selected columns out of `total`.
    ///
    /// A jump key must be a prefix, so selection stops at the first gap.
    #[must_use]
    pub fn leading_count(&self, total: usize) -> usize {
        (0..total).take_while(|&i| self.is_selected(i)).count()
    }
}

/// Which group-index entries a scan accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexScanSelector {
    /// Every entry.
    #[default]
    All,
    /// Entries whose table bitmap contains every table in `required`.
    Tables {
        /// Bitmap of tables that must be present.
        required: u64,
    },
}

impl IndexScanSelector {
    /// Returns true if the selector accepts every entry unconditionally.
    #[must_use]
    pub const fn matches_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Tests an entry's table bitmap.
    #[must_use]
    pub const fn matches(&self, tables: u64) -> bool {
        match self {
            Self::All => true,
            Self::Tables { required } => tables & *required == *required,
        }
    }
}

/// An open-able cursor over one index.
pub trait IndexCursor: Send + fmt::Debug {
    /// Opens the cursor at the start of its range.
    ///
    /// # Errors
    ///
    /// Returns `CursorLifecycle` if already open, `IllegalArgument` for an
    /// unbound parameter, or `StoreAccess` if preloading fails.
    fn open(&mut self) -> CoreResult<()>;

    /// Returns the next accepted entry, or `None` when exhausted.
    ///
    /// # Errors
    ///
    /// Returns `CursorLifecycle` when closed, or `StoreAccess` on store
    /// failure.
    fn next(&mut self) -> CoreResult<Option<IndexRow>>;

    /// Repositions at the entry derived from `row`'s indexed columns.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedOperation` for spatial cursors and
    /// `CursorLifecycle` when closed.
    fn jump(&mut self, row: &Row, columns: ColumnSelector) -> CoreResult<()>;

    /// Releases the store iterator. The cursor ends up closed even if the
    /// release fails.
    ///
    /// # Errors
    ///
    /// Returns the release failure.
    fn close(&mut self) -> CoreResult<()>;

    /// Replaces the parameter bindings used at the next open or jump.
    fn rebind(&mut self, bindings: Bindings);

    /// Returns the lifecycle state.
    fn state(&self) -> CursorState;

    /// Returns the range shape the cursor serves.
    fn shape(&self) -> RangeShape;
}

/// Builds the cursor realization matching `range`'s shape.
///
/// # Errors
///
/// Returns `UnsupportedOperation` for mixed orderings or `IllegalArgument`
/// for bounds that do not fit the index.
pub fn open_index_cursor(
    adapter: StoreAdapter,
    group: Arc<Group>,
    range: IndexKeyRange,
    ordering: &IndexOrdering,
    selector: IndexScanSelector,
) -> CoreResult<Box<dyn IndexCursor>> {
    match range.shape() {
        RangeShape::Ordered => Ok(Box::new(ValueIndexCursor::new(
            adapter, group, range, ordering, selector,
        )?)),
        RangeShape::NearPoint | RangeShape::InBox => {
            Ok(Box::new(SpatialIndexCursor::new(adapter, group, range)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{int_index_fixture, spatial_fixture};

    #[test]
    fn bound_values_resolve_parameters() {
        let bindings = Bindings::new(vec![Value::Int(4)]);
        assert_eq!(BoundValue::Parameter(0).resolve(&bindings).unwrap(), Value::Int(4));
        assert_eq!(BoundValue::Literal(Value::Int(1)).resolve(&bindings).unwrap(), Value::Int(1));
        assert!(matches!(
            BoundValue::Parameter(1).resolve(&bindings),
            Err(CoreError::IllegalArgument { .. })
        ));
    }

    #[test]
    fn ordering_rejects_mixed_directions() {
        assert!(IndexOrdering::ascending(2).direction().unwrap());
        assert!(!IndexOrdering::descending(1).direction().unwrap());
        assert!(matches!(
            IndexOrdering::columns(vec![true, false]).direction(),
            Err(CoreError::UnsupportedOperation { .. })
        ));
    }

    #[test]
    fn column_selector_prefix() {
        assert_eq!(ColumnSelector::leading(2).leading_count(3), 2);
        assert_eq!(ColumnSelector::all().leading_count(3), 3);
        assert_eq!(ColumnSelector::leading(0).leading_count(3), 0);
        assert!(ColumnSelector::leading(64).is_selected(63));
    }

    #[test]
    fn scan_selector_bitmap_test() {
        let selector = IndexScanSelector::Tables { required: 0b110 };
        assert!(selector.matches(0b110));
        assert!(selector.matches(0b111));
        assert!(!selector.matches(0b010));
        assert!(IndexScanSelector::All.matches(0));
        assert!(IndexScanSelector::All.matches_all());
    }

    #[test]
    fn factory_selects_by_shape() {
        let fixture = int_index_fixture(&[1]);
        let range = IndexKeyRange::new(Arc::clone(&fixture.index));
        assert_eq!(range.shape(), RangeShape::Ordered);
        let cursor = open_index_cursor(
            fixture.adapter.clone(),
            Arc::clone(&fixture.group),
            range,
            &IndexOrdering::ascending(1),
            IndexScanSelector::All,
        )
        .unwrap();
        assert_eq!(cursor.shape(), RangeShape::Ordered);
        assert_eq!(cursor.state(), CursorState::Closed);

        let spatial = spatial_fixture(&[(0.0, 0.0)]);
        let near = IndexKeyRange::new(Arc::clone(&spatial.index))
            .lo(IndexBound::inclusive([Value::Double(0.0), Value::Double(0.0)]));
        assert_eq!(near.shape(), RangeShape::NearPoint);
        let boxed = near
            .clone()
            .hi(IndexBound::inclusive([Value::Double(1.0), Value::Double(1.0)]));
        assert_eq!(boxed.shape(), RangeShape::InBox);

        let cursor = open_index_cursor(
            spatial.adapter.clone(),
            Arc::clone(&spatial.group),
            boxed,
            &IndexOrdering::ascending(2),
            IndexScanSelector::All,
        )
        .unwrap();
        assert_eq!(cursor.shape(), RangeShape::InBox);
    }
}
