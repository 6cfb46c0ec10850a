//! Index entry layout.
//!
//! ```text
//! key:   collating(index column 0) ‖ ... ‖ collating(index column n-1) ‖ hkey
//! value: table bitmap as u64 big-endian (group indexes), empty otherwise
//! ```
//!
//! Index columns are always encoded ascending; descending scans walk the
//! keyspace in reverse. Because every collating value and HKey segment is
//! prefix-free, a key made of the first `k` column encodings prefixes every
//! entry whose first `k` columns equal those values.

use crate::error::{CoreError, CoreResult};
use crate::hkey::HKey;
use crate::row::IndexRow;
use crate::schema::{Group, IndexDef, IndexKind};
use arbordb_codec::{read_collating, write_collating, Value};
use std::sync::Arc;

/// Encodes the leading index columns `values` as a key prefix.
pub(crate) fn encode_prefix(index: &IndexDef, values: &[Value], out: &mut Vec<u8>) -> CoreResult<()> {
    if values.len() > index.column_types().len() {
        return Err(CoreError::illegal_argument(format!(
            "index {} has {} columns, bound has {} values",
            index.name(),
            index.column_types().len(),
            values.len()
        )));
    }
    for (ty, value) in index.column_types().iter().zip(values) {
        write_collating(*ty, value, out)?;
    }
    Ok(())
}

/// Encodes a full index entry.
pub(crate) fn encode_entry(
    index: &IndexDef,
    group: &Group,
    values: &[Value],
    hkey: &HKey,
    tables: Option<u64>,
) -> CoreResult<(Vec<u8>, Vec<u8>)> {
    if values.len() != index.column_types().len() {
        return Err(CoreError::illegal_argument(format!(
            "index {} entry needs {} values, got {}",
            index.name(),
            index.column_types().len(),
            values.len()
        )));
    }
    let mut key = Vec::with_capacity(values.len() * 9 + hkey.segment_count() * 10);
    encode_prefix(index, values, &mut key)?;
    hkey.encode_into(group, &mut key)?;

    let value = match (index.kind(), tables) {
        (IndexKind::Group { .. }, Some(bits)) => bits.to_be_bytes().to_vec(),
        (IndexKind::Group { .. }, None) => {
            return Err(CoreError::illegal_argument(format!(
                "group index {} entry needs a table bitmap",
                index.name()
            )))
        }
        (_, _) => Vec::new(),
    };
    Ok((key, value))
}

/// Decodes a stored index entry.
pub(crate) fn decode_entry(
    index: &Arc<IndexDef>,
    group: &Group,
    key: &[u8],
    value: &[u8],
) -> CoreResult<IndexRow> {
    let mut input = key;
    let values = index
        .column_types()
        .iter()
        .map(|ty| read_collating(*ty, &mut input))
        .collect::<Result<Vec<_>, _>>()?;
    let hkey = HKey::decode(input, group)?;

    let tables = match value.len() {
        0 => None,
        8 => {
            let mut bits = [0u8; 8];
            bits.copy_from_slice(value);
            Some(u64::from_be_bytes(bits))
        }
        n => {
            return Err(CoreError::corrupt(format!(
                "index {} entry value has {n} bytes",
                index.name()
            )))
        }
    };
    Ok(IndexRow::new(Arc::clone(index), values, hkey, tables))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{child_pid_index, parent_child_group};
    use crate::types::IndexId;
    use arbordb_storage::KeyspaceId;

    #[test]
    fn entry_roundtrip() {
        let (group, _, c) = parent_child_group();
        let index = child_pid_index(&group, c);
        let hkey = group.hkey_for(c, &[Value::Int(10), Value::Int(1)]).unwrap();
        let (key, value) = encode_entry(&index, &group, &[Value::Int(1)], &hkey, None).unwrap();
        assert!(value.is_empty());

        let row = decode_entry(&index, &group, &key, &value).unwrap();
        assert_eq!(row.values(), &[Value::Int(1)]);
        assert_eq!(row.hkey(), &hkey);
        assert!(row.is_key_empty());
    }

    #[test]
    fn prefix_leads_entry() {
        let (group, _, c) = parent_child_group();
        let index = child_pid_index(&group, c);
        let hkey = group.hkey_for(c, &[Value::Int(10), Value::Int(1)]).unwrap();
        let (key, _) = encode_entry(&index, &group, &[Value::Int(1)], &hkey, None).unwrap();

        let mut prefix = Vec::new();
        encode_prefix(&index, &[Value::Int(1)], &mut prefix).unwrap();
        assert!(key.starts_with(&prefix));
        assert!(encode_prefix(&index, &[Value::Int(1), Value::Int(2)], &mut prefix).is_err());
    }

    #[test]
    fn group_entries_carry_bitmap() {
        let (group, p, c) = parent_child_group();
        let tables = group.table_mask(&[p, c]).unwrap();
        let index = Arc::new(
            IndexDef::group_index(
                IndexId::new(9),
                "g",
                KeyspaceId::new(9),
                group.table(c).unwrap(),
                vec![0],
                tables,
            )
            .unwrap(),
        );
        let hkey = group.hkey_for(c, &[Value::Int(10), Value::Int(1)]).unwrap();
        assert!(encode_entry(&index, &group, &[Value::Int(10)], &hkey, None).is_err());

        let (key, value) =
            encode_entry(&index, &group, &[Value::Int(10)], &hkey, Some(tables)).unwrap();
        let row = decode_entry(&index, &group, &key, &value).unwrap();
        assert_eq!(row.tables(), Some(tables));
        assert!(!row.is_key_empty());
    }

    #[test]
    fn bad_value_length_is_rejected() {
        let (group, _, c) = parent_child_group();
        let index = child_pid_index(&group, c);
        let hkey = group.hkey_for(c, &[Value::Int(10), Value::Int(1)]).unwrap();
        let (key, _) = encode_entry(&index, &group, &[Value::Int(1)], &hkey, None).unwrap();
        assert!(decode_entry(&index, &group, &key, &[1, 2, 3]).is_err());
    }
}
