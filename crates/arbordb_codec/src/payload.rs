//! Row payloads: a row's full field list as a CBOR array.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;

/// Encodes a field list as a CBOR array.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn pack_values(values: &[Value]) -> CodecResult<Vec<u8>> {
    let mut out = Vec::with_capacity(values.len() * 9 + 1);
    ciborium::into_writer(values, &mut out)
        .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
    Ok(out)
}

/// Decodes a field list written by [`pack_values`].
///
/// # Errors
///
/// Returns an error if the bytes are not a CBOR array of values.
pub fn unpack_values(bytes: &[u8]) -> CodecResult<Vec<Value>> {
    ciborium::from_reader(bytes).map_err(|e| CodecError::decoding_failed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_mixed_row() {
        let row = vec![
            Value::Int(7),
            Value::Null,
            Value::text("seven"),
            Value::Double(7.5),
            Value::Bytes(vec![0, 7]),
            Value::Bool(false),
        ];
        let bytes = pack_values(&row).unwrap();
        assert_eq!(unpack_values(&bytes).unwrap(), row);
    }

    #[test]
    fn roundtrip_empty_row() {
        let bytes = pack_values(&[]).unwrap();
        assert!(unpack_values(&bytes).unwrap().is_empty());
    }

    #[test]
    fn garbage_fails_to_decode() {
        assert!(matches!(
            unpack_values(&[0xff, 0x00, 0x13]),
            Err(CodecError::DecodingFailed { .. })
        ));
    }
}
