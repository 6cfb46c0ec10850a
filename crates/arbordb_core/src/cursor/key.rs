//! Traversal directions and the generation-tracked key buffer.

use std::fmt;
use std::ops::{Bound, Deref};

/// Byte appended by a deeper nudge. Sorts after every extension of the key
/// because no ordinal and no ascending collating encoding starts with it.
pub(crate) const DEEPER_BYTE: u8 = 0xFF;

/// Direction of a traversal relative to the current key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Entries prefixed by the key.
    Eq,
    /// Entries after the key and all of its extensions.
    Gt,
    /// Entries from the key onwards.
    GtEq,
    /// Entries before the key, walking backwards.
    Lt,
    /// Entries up to the key and its extensions, walking backwards.
    LtEq,
}

impl Direction {
    /// Returns true for directions that include the key itself.
    #[must_use]
    pub const fn is_exact(self) -> bool {
        matches!(self, Self::Eq | Self::GtEq | Self::LtEq)
    }

    /// Returns true for directions that walk backwards.
    #[must_use]
    pub const fn is_reverse(self) -> bool {
        matches!(self, Self::Lt | Self::LtEq)
    }

    /// The exclusive direction continuing a scan in the same sense.
    #[must_use]
    pub const fn onward(self) -> Self {
        if self.is_reverse() {
            Self::Lt
        } else {
            Self::Gt
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Eq => "EQ",
            Self::Gt => "GT",
            Self::GtEq => "GTEQ",
            Self::Lt => "LT",
            Self::LtEq => "LTEQ",
        })
    }
}

/// How a key was perturbed to express a bound the store cannot express
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Nudge {
    /// Just below the key: an exclusive upper bound.
    Left,
    /// Just past the key's deepest extension: the key with
    /// [`DEEPER_BYTE`] appended, as an inclusive bound.
    Deeper,
}

/// Key bytes plus a generation counter bumped on every overwrite.
///
/// A cached iterator is only valid for the generation it was built at, so
/// comparing two integers tells whether someone re-seeded the key.
#[derive(Debug, Clone, Default)]
pub struct KeyBuffer {
    bytes: Vec<u8>,
    generation: u64,
}

impl KeyBuffer {
    /// Creates an empty buffer at generation zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the key.
    pub fn set(&mut self, key: &[u8]) {
        self.bytes.clear();
        self.bytes.extend_from_slice(key);
        self.generation += 1;
    }

    /// Empties the key.
    pub fn clear(&mut self) {
        self.bytes.clear();
        self.generation += 1;
    }

    /// Returns the key bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns true if the key is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns the current generation.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Applies `nudge` until the returned guard is dropped.
    ///
    /// Nudging does not bump the generation: the key is restored to its
    /// original length when the guard goes out of scope.
    pub fn nudge(&mut self, nudge: Nudge) -> NudgeGuard<'_> {
        let restore_len = self.bytes.len();
        if nudge == Nudge::Deeper {
            self.bytes.push(DEEPER_BYTE);
        }
        NudgeGuard {
            buffer: self,
            restore_len,
            nudge,
        }
    }
}

/// A nudged view of a [`KeyBuffer`]; restores the buffer on drop.
#[derive(Debug)]
pub struct NudgeGuard<'a> {
    buffer: &'a mut KeyBuffer,
    restore_len: usize,
    nudge: Nudge,
}

impl NudgeGuard<'_> {
    /// Returns the nudge applied.
    #[must_use]
    pub const fn nudge(&self) -> Nudge {
        self.nudge
    }

    /// Returns the store bound the nudged key stands for.
    #[must_use]
    pub fn as_bound(&self) -> Bound<Vec<u8>> {
        match self.nudge {
            Nudge::Left => Bound::Excluded(self.buffer.bytes.clone()),
            Nudge::Deeper => Bound::Included(self.buffer.bytes.clone()),
        }
    }
}

impl Deref for NudgeGuard<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buffer.bytes
    }
}

impl Drop for NudgeGuard<'_> {
    fn drop(&mut self) {
        self.buffer.bytes.truncate(self.restore_len);
    }
}

/// `key ‖ DEEPER_BYTE` without touching a buffer.
pub(crate) fn deeper(key: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(key.len() + 1);
    out.extend_from_slice(key);
    out.push(DEEPER_BYTE);
    out
}
