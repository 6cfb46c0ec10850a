//! # Hierarchical Keys
//!
//! An [`HKey`] locates a row in its group's table tree: one segment per
//! ancestor, root first, each holding the table ordinal and that ancestor's
//! primary key values.
//!
//! ## Encoding
//!
//! ```text
//! ┌─────────┬──────────────────────┬─────────┬──────────────────────┬───
//! │ ordinal │ collating pk values  │ ordinal │ collating pk values  │ ...
//! │ (1 B)   │ (ascending)          │ (1 B)   │ (ascending)          │
//! └─────────┴──────────────────────┴─────────┴──────────────────────┴───
//! ```
//!
//! Every segment encoding is prefix-free, so the encoded key of a parent is
//! a strict prefix of its children's keys and byte order equals pre-order:
//! a row sorts after its ancestors and before its descendants, and siblings
//! sort by primary key.
//!
//! Ordinals are never `0xFF` and ascending collating values never start with
//! `0xFF`, so `key ‖ 0xFF` sorts after every descendant of `key`.

use crate::error::{CoreError, CoreResult};
use crate::schema::Group;
use arbordb_codec::{read_collating, write_collating, Value};
use std::fmt;

/// One level of an [`HKey`].
#[derive(Debug, Clone, PartialEq)]
pub struct HKeySegment {
    ordinal: u8,
    values: Vec<Value>,
}

impl HKeySegment {
    /// Creates a segment for the table with `ordinal`.
    #[must_use]
    pub const fn new(ordinal: u8, values: Vec<Value>) -> Self {
        Self { ordinal, values }
    }

    /// Returns the table ordinal.
    #[must_use]
    pub const fn ordinal(&self) -> u8 {
        self.ordinal
    }

    /// Returns the primary key values.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

/// A hierarchical key.
///
/// # Invariants
///
/// - A row's HKey has `depth + 1` segments
/// - A descendant's HKey strictly extends its ancestor's
/// - `truncate(k + 1)` of a row's HKey is the HKey of its depth-`k` ancestor
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HKey {
    segments: Vec<HKeySegment>,
}

impl HKey {
    /// Creates an empty HKey, which prefixes every key of a group.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Creates an HKey from segments, root first.
    #[must_use]
    pub const fn from_segments(segments: Vec<HKeySegment>) -> Self {
        Self { segments }
    }

    /// Returns the segments, root first.
    #[must_use]
    pub fn segments(&self) -> &[HKeySegment] {
        &self.segments
    }

    /// Returns the number of segments.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Returns true if the HKey has no segments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the ordinal of the owning table, if any.
    #[must_use]
    pub fn ordinal(&self) -> Option<u8> {
        self.segments.last().map(HKeySegment::ordinal)
    }

    /// Returns the HKey made of the first `segments` segments.
    #[must_use]
    pub fn truncate(&self, segments: usize) -> Self {
        Self {
            segments: self.segments[..segments.min(self.segments.len())].to_vec(),
        }
    }

    /// Returns the parent's HKey, or `None` for a root row or empty key.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        match self.segments.len() {
            0 | 1 => None,
            n => Some(self.truncate(n - 1)),
        }
    }

    /// Returns this HKey extended by one segment.
    #[must_use]
    pub fn child(&self, ordinal: u8, values: Vec<Value>) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend_from_slice(&self.segments);
        segments.push(HKeySegment::new(ordinal, values));
        Self { segments }
    }

    /// Returns true if every segment of `self` leads `other`.
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.segments.len() <= other.segments.len()
            && self.segments.iter().zip(&other.segments).all(|(a, b)| a == b)
    }

    /// Encodes the HKey into physical key bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if a segment names an unknown table or a value does
    /// not match the key column's type.
    pub fn encode(&self, group: &Group) -> CoreResult<Vec<u8>> {
        let mut out = Vec::with_capacity(self.segments.len() * 10);
        self.encode_into(group, &mut out)?;
        Ok(out)
    }

    /// Appends the encoded HKey to `out`.
    ///
    /// # Errors
    ///
    /// See [`HKey::encode`].
    pub fn encode_into(&self, group: &Group, out: &mut Vec<u8>) -> CoreResult<()> {
        for segment in &self.segments {
            let table = group.table_by_ordinal(segment.ordinal).map_err(|_| {
                CoreError::illegal_argument(format!(
                    "HKey segment names unknown ordinal {}",
                    segment.ordinal
                ))
            })?;
            let types: Vec<_> = table.pk_types().collect();
            if types.len() != segment.values.len() {
                return Err(CoreError::illegal_argument(format!(
                    "HKey segment for {} has {} values, key has {} columns",
                    table.name(),
                    segment.values.len(),
                    types.len()
                )));
            }
            out.push(segment.ordinal);
            for (ty, value) in types.iter().zip(&segment.values) {
                write_collating(ty.storage_type(), value, out)?;
            }
        }
        Ok(())
    }

    /// Decodes an HKey from the start of `input`, consuming exactly the
    /// bytes it occupies.
    ///
    /// Decoding stops when `input` is exhausted.
    ///
    /// # Errors
    ///
    /// Returns a codec error if the bytes do not form a valid path through
    /// the group's table tree.
    pub fn decode(bytes: &[u8], group: &Group) -> CoreResult<Self> {
        let mut input = bytes;
        let mut segments: Vec<HKeySegment> = Vec::new();
        while let Some((&ordinal, rest)) = input.split_first() {
            input = rest;
            let table = group.table_by_ordinal(ordinal)?;
            let expected_parent = match segments.last() {
                Some(segment) => Some(group.table_by_ordinal(segment.ordinal)?.table_id()),
                None => None,
            };
            if table.parent() != expected_parent {
                return Err(CoreError::corrupt(format!(
                    "table {} cannot appear at depth {}",
                    table.name(),
                    segments.len()
                )));
            }
            let values = table
                .pk_types()
                .map(|ty| read_collating(ty.storage_type(), &mut input))
                .collect::<Result<Vec<_>, _>>()?;
            segments.push(HKeySegment::new(ordinal, values));
        }
        Ok(Self { segments })
    }
}

impl fmt::Display for HKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}:(", segment.ordinal)?;
            for (j, value) in segment.values.iter().enumerate() {
                if j > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{value}")?;
            }
            f.write_str(")")?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::parent_child_group;

    fn key(values: &[(u8, i64)]) -> HKey {
        HKey::from_segments(
            values
                .iter()
                .map(|&(ordinal, v)| HKeySegment::new(ordinal, vec![Value::Int(v)]))
                .collect(),
        )
    }

    #[test]
    fn encode_decode_roundtrip() {
        let (group, _, _) = parent_child_group();
        let hkey = key(&[(1, 1), (2, 10)]);
        let bytes = hkey.encode(&group).unwrap();
        assert_eq!(HKey::decode(&bytes, &group).unwrap(), hkey);
    }

    #[test]
    fn parent_encoding_prefixes_child() {
        let (group, _, _) = parent_child_group();
        let parent = key(&[(1, 1)]).encode(&group).unwrap();
        let child = key(&[(1, 1), (2, 10)]).encode(&group).unwrap();
        assert!(child.starts_with(&parent));
        assert!(child.len() > parent.len());
    }

    #[test]
    fn byte_order_is_preorder() {
        let (group, _, _) = parent_child_group();
        let ordered = [
            key(&[(1, 1)]),
            key(&[(1, 1), (2, 10)]),
            key(&[(1, 1), (2, 11)]),
            key(&[(1, 2)]),
            key(&[(1, 2), (2, 20)]),
        ];
        let encoded: Vec<_> = ordered.iter().map(|k| k.encode(&group).unwrap()).collect();
        for pair in encoded.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn deeper_marker_sorts_after_descendants() {
        let (group, _, _) = parent_child_group();
        let mut marker = key(&[(1, 1)]).encode(&group).unwrap();
        marker.push(0xFF);
        let child = key(&[(1, 1), (2, i64::MAX)]).encode(&group).unwrap();
        let next = key(&[(1, 2)]).encode(&group).unwrap();
        assert!(child < marker);
        assert!(marker < next);
    }

    #[test]
    fn truncate_parent_and_prefix() {
        let hkey = key(&[(1, 1), (2, 10)]);
        assert_eq!(hkey.truncate(1), key(&[(1, 1)]));
        assert_eq!(hkey.truncate(5), hkey);
        assert_eq!(hkey.parent(), Some(key(&[(1, 1)])));
        assert_eq!(key(&[(1, 1)]).parent(), None);
        assert!(key(&[(1, 1)]).is_prefix_of(&hkey));
        assert!(!key(&[(1, 2)]).is_prefix_of(&hkey));
        assert!(HKey::new().is_prefix_of(&hkey));
        assert_eq!(key(&[(1, 1)]).child(2, vec![Value::Int(10)]), hkey);
    }

    #[test]
    fn decode_rejects_bad_paths() {
        let (group, _, _) = parent_child_group();
        let orphan = key(&[(2, 10)]).encode(&group).unwrap();
        assert!(HKey::decode(&orphan, &group).is_err());
        assert!(HKey::decode(&[9], &group).is_err());
        let mut truncated = key(&[(1, 1)]).encode(&group).unwrap();
        truncated.pop();
        assert!(HKey::decode(&truncated, &group).is_err());
    }

    #[test]
    fn encode_rejects_unknown_ordinal_and_arity() {
        let (group, _, _) = parent_child_group();
        assert!(key(&[(7, 1)]).encode(&group).is_err());
        let wide = HKey::from_segments(vec![HKeySegment::new(1, vec![Value::Int(1), Value::Int(2)])]);
        assert!(wide.encode(&group).is_err());
    }

    #[test]
    fn display() {
        assert_eq!(key(&[(1, 1), (2, 10)]).to_string(), "{1:(1),2:(10)}");
    }
}
