//! Group cursor.

use crate::adapter::{StoreAdapter, StoreIterator};
use crate::cursor::CursorState;
use crate::error::{CoreError, CoreResult};
use crate::hkey::HKey;
use crate::pack::RowPacker;
use crate::row::{GroupRow, Row};
use crate::schema::Group;
use arbordb_storage::{KeyRange, KvPair};
use std::sync::Arc;
use tracing::debug;

/// What a group cursor scans.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanMode {
    /// Every row of the group.
    Full,
    /// The anchor row and all of its descendants.
    Subtree(HKey),
    /// At most the one row whose HKey is the anchor.
    SingleRow(HKey),
}

impl ScanMode {
    /// Maps a rebind request to a mode.
    #[must_use]
    pub fn from_anchor(anchor: Option<HKey>, deep: bool) -> Self {
        match (anchor, deep) {
            (None, _) => Self::Full,
            (Some(hkey), true) => Self::Subtree(hkey),
            (Some(hkey), false) => Self::SingleRow(hkey),
        }
    }
}

/// Cursor over a group keyspace in hierarchical pre-order.
#[derive(Debug)]
pub struct GroupCursor {
    adapter: StoreAdapter,
    group: Arc<Group>,
    packer: Arc<dyn RowPacker>,
    mode: ScanMode,
    state: CursorState,
    iter: Option<StoreIterator>,
    current: Option<KvPair>,
    stepped: bool,
}

impl GroupCursor {
    /// Creates a closed full-scan cursor using the group's row format.
    pub fn new(adapter: StoreAdapter, group: Arc<Group>) -> Self {
        let packer = group.format().packer();
        Self::with_packer(adapter, group, packer)
    }

    /// Creates a closed full-scan cursor with an explicit packer.
    pub fn with_packer(adapter: StoreAdapter, group: Arc<Group>, packer: Arc<dyn RowPacker>) -> Self {
        Self {
            adapter,
            group,
            packer,
            mode: ScanMode::Full,
            state: CursorState::Closed,
            iter: None,
            current: None,
            stepped: false,
        }
    }

    /// Returns the scan mode the next open uses.
    #[must_use]
    pub const fn mode(&self) -> &ScanMode {
        &self.mode
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> CursorState {
        self.state
    }

    /// Sets the scan mode for the next open.
    ///
    /// # Errors
    ///
    /// Returns `CursorLifecycle` unless the cursor is closed.
    pub fn rebind(&mut self, anchor: Option<HKey>, deep: bool) -> CoreResult<()> {
        if self.state != CursorState::Closed {
            return Err(CoreError::lifecycle("rebind", self.state));
        }
        self.mode = ScanMode::from_anchor(anchor, deep);
        Ok(())
    }

    /// Opens the cursor.
    ///
    /// # Errors
    ///
    /// Returns `CursorLifecycle` if already open, `IllegalArgument` if the
    /// anchor does not encode in this group, or `StoreAccess` if the store
    /// iterator cannot be created.
    pub fn open(&mut self) -> CoreResult<()> {
        if self.state != CursorState::Closed {
            return Err(CoreError::lifecycle("open", self.state));
        }
        let range = match &self.mode {
            ScanMode::Full => KeyRange::all(),
            ScanMode::Subtree(anchor) => KeyRange::prefix(&anchor.encode(&self.group)?),
            ScanMode::SingleRow(anchor) => KeyRange::exact(&anchor.encode(&self.group)?),
        };
        let iter = self
            .adapter
            .range_iter(self.group.keyspace(), range, false, "group scan")?;
        debug!(group = self.group.name(), mode = ?self.mode, "group cursor opened");
        self.iter = Some(iter);
        self.current = None;
        self.stepped = false;
        self.state = CursorState::Active;
        Ok(())
    }

    /// Takes one physical step, returning false once exhausted.
    ///
    /// A single-row scan never takes a second step.
    ///
    /// # Errors
    ///
    /// Returns `CursorLifecycle` when closed or `StoreAccess` on store
    /// failure.
    pub fn advance(&mut self) -> CoreResult<bool> {
        match self.state {
            CursorState::Closed => return Err(CoreError::lifecycle("advance", self.state)),
            CursorState::Idle => return Ok(false),
            CursorState::Active => {}
        }
        if self.stepped && matches!(self.mode, ScanMode::SingleRow(_)) {
            self.go_idle();
            return Ok(false);
        }
        let step = match self.iter.as_mut() {
            Some(iter) => iter.advance()?,
            None => None,
        };
        self.stepped = true;
        match step {
            Some(pair) => {
                self.current = Some(pair);
                Ok(true)
            }
            None => {
                self.go_idle();
                Ok(false)
            }
        }
    }

    /// Advances and materializes the next row.
    ///
    /// # Errors
    ///
    /// Returns `CursorLifecycle` when closed, `StoreAccess` on store
    /// failure, or a codec error for an undecodable entry.
    pub fn next(&mut self) -> CoreResult<Option<GroupRow>> {
        if !self.advance()? {
            return Ok(None);
        }
        let Some((key, value)) = self.current.as_ref() else {
            return Ok(None);
        };
        let hkey = HKey::decode(key, &self.group)?;
        let ordinal = hkey
            .ordinal()
            .ok_or_else(|| CoreError::corrupt("empty key in group keyspace"))?;
        let row_type = Arc::clone(self.group.table_by_ordinal(ordinal)?);
        let values = self.packer.expand_row(&row_type, value)?;
        let row = Row::new(row_type, values)?;
        self.adapter.stats().record_row();
        Ok(Some(GroupRow::new(row, hkey)))
    }

    /// Releases the store iterator.
    ///
    /// # Errors
    ///
    /// Never fails with the in-process store.
    pub fn close(&mut self) -> CoreResult<()> {
        self.iter = None;
        self.current = None;
        self.stepped = false;
        self.state = CursorState::Closed;
        debug!(group = self.group.name(), "group cursor closed");
        Ok(())
    }

    fn go_idle(&mut self) {
        self.current = None;
        self.iter = None;
        self.state = CursorState::Idle;
    }
}
