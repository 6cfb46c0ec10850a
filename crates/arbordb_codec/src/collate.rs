//! Collating (order-preserving) field encoding.
//!
//! The collating bytes of a field compare, as unsigned byte strings, exactly
//! like the field values compare under [`compare`]. Every field encoding is
//! prefix-free, so encodings can be concatenated into composite keys without
//! separators.
//!
//! ## Layout
//!
//! | Value | Bytes |
//! |-------|-------|
//! | NULL | `00` |
//! | non-null | `01` + payload |
//! | Boolean | `00` / `01` |
//! | Integer | big-endian with the sign bit flipped |
//! | Double | IEEE bits, sign-flipped if positive, inverted if negative |
//! | Text, Varbinary | bytes with `00` escaped as `00 FF`, terminated by `00 00` |
//!
//! A descending field is the bitwise inverse of its ascending encoding.
//! No ascending encoding starts with `0xFF`.

use crate::error::{CodecError, CodecResult};
use crate::value::{Collation, FieldType, Value};
use std::cmp::Ordering;

/// Marker byte for NULL.
pub const NULL_MARKER: u8 = 0x00;

/// Marker byte preceding every non-null payload.
pub const VALUE_MARKER: u8 = 0x01;

const ESCAPE: u8 = 0xFF;

/// Writes the ascending collating encoding of `value` to `out`.
///
/// # Errors
///
/// Returns `TypeMismatch` if `ty` does not accept `value`, or `Unorderable`
/// for types without an order.
pub fn write_collating(ty: FieldType, value: &Value, out: &mut Vec<u8>) -> CodecResult<()> {
    check_orderable(ty)?;
    check_member(ty, value)?;

    match value {
        Value::Null => out.push(NULL_MARKER),
        Value::Bool(b) => out.extend_from_slice(&[VALUE_MARKER, u8::from(*b)]),
        Value::Int(n) => {
            out.push(VALUE_MARKER);
            out.extend_from_slice(&ordered_i64_bytes(*n));
        }
        Value::Double(d) => {
            out.push(VALUE_MARKER);
            out.extend_from_slice(&ordered_f64_bytes(*d));
        }
        Value::Text(s) => {
            out.push(VALUE_MARKER);
            if ty == FieldType::Text(Collation::CaseInsensitive) {
                push_terminated(out, s.to_lowercase().as_bytes());
            } else {
                push_terminated(out, s.as_bytes());
            }
        }
        Value::Bytes(b) => {
            out.push(VALUE_MARKER);
            push_terminated(out, b);
        }
    }
    Ok(())
}

/// Writes the collating encoding of `value` in the given direction.
///
/// # Errors
///
/// See [`write_collating`].
pub fn write_collating_directed(
    ty: FieldType,
    value: &Value,
    ascending: bool,
    out: &mut Vec<u8>,
) -> CodecResult<()> {
    let start = out.len();
    write_collating(ty, value, out)?;
    if !ascending {
        for byte in &mut out[start..] {
            *byte = !*byte;
        }
    }
    Ok(())
}

/// Reads one ascending collating field from the front of `input`, advancing it.
///
/// # Errors
///
/// Returns `UnsupportedDecode` for lossy encodings (case-insensitive text),
/// or a decoding error for malformed input.
pub fn read_collating(ty: FieldType, input: &mut &[u8]) -> CodecResult<Value> {
    read_collating_directed(ty, true, input)
}

/// Reads one collating field encoded in the given direction.
///
/// # Errors
///
/// See [`read_collating`].
pub fn read_collating_directed(
    ty: FieldType,
    ascending: bool,
    input: &mut &[u8],
) -> CodecResult<Value> {
    check_orderable(ty)?;
    if ty == FieldType::Text(Collation::CaseInsensitive) {
        return Err(CodecError::unsupported_decode(ty.name()));
    }

    let mut reader = CollatingReader {
        input,
        mask: if ascending { 0x00 } else { 0xFF },
    };

    match reader.byte()? {
        NULL_MARKER => return Ok(Value::Null),
        VALUE_MARKER => {}
        other => {
            return Err(CodecError::decoding_failed(format!(
                "invalid collating marker {other:#04x}"
            )))
        }
    }

    let value = match ty {
        FieldType::Boolean => match reader.byte()? {
            0 => Value::Bool(false),
            1 => Value::Bool(true),
            other => {
                return Err(CodecError::decoding_failed(format!(
                    "invalid boolean byte {other:#04x}"
                )))
            }
        },
        FieldType::Integer => {
            let bits = u64::from_be_bytes(reader.array()?);
            Value::Int((bits ^ (1u64 << 63)) as i64)
        }
        FieldType::Double => {
            let bits = u64::from_be_bytes(reader.array()?);
            let raw = if bits & (1u64 << 63) == 0 {
                !bits
            } else {
                bits ^ (1u64 << 63)
            };
            Value::Double(f64::from_bits(raw))
        }
        FieldType::Text(_) => {
            let bytes = reader.terminated()?;
            Value::Text(String::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)?)
        }
        FieldType::Varbinary => Value::Bytes(reader.terminated()?),
        FieldType::Blob => return Err(CodecError::unorderable(ty.name())),
    };
    Ok(value)
}

/// Compares two values of the declared type.
///
/// Agrees with the byte order of [`write_collating`]. NULL sorts below every
/// non-null value and equals NULL.
///
/// # Errors
///
/// Returns `TypeMismatch` if either value is not a member of `ty`, or
/// `Unorderable` for types without an order.
pub fn compare(ty: FieldType, a: &Value, b: &Value) -> CodecResult<Ordering> {
    check_orderable(ty)?;
    check_member(ty, a)?;
    check_member(ty, b)?;

    let ordering = match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Double(x), Value::Double(y)) => x.total_cmp(y),
        (Value::Text(x), Value::Text(y)) => match ty {
            FieldType::Text(Collation::CaseInsensitive) => x.to_lowercase().cmp(&y.to_lowercase()),
            _ => x.as_bytes().cmp(y.as_bytes()),
        },
        (Value::Bytes(x), Value::Bytes(y)) => x.cmp(y),
        _ => return Err(CodecError::type_mismatch(a.kind(), b.kind())),
    };
    Ok(ordering)
}

/// A boolean comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl Comparison {
    /// Applies the operator to a three-way ordering.
    #[must_use]
    pub const fn holds(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering.is_eq(),
            Self::Ne => ordering.is_ne(),
            Self::Lt => ordering.is_lt(),
            Self::Le => ordering.is_le(),
            Self::Gt => ordering.is_gt(),
            Self::Ge => ordering.is_ge(),
        }
    }

    /// Returns true for `=` and `<>`, the only operators defined on unordered types.
    #[must_use]
    pub const fn is_equality(self) -> bool {
        matches!(self, Self::Eq | Self::Ne)
    }
}

/// Evaluates `a op b` under SQL three-valued logic.
///
/// Returns `Ok(None)` ("unknown") when either operand is NULL. Integer and
/// double operands compare numerically with each other: exactly across the
/// two types, with `-0.0 = 0.0`, and NaN compares as unknown. Unlike
/// [`compare`], this does not follow the collating byte order.
///
/// # Errors
///
/// Returns `TypeMismatch` for incompatible operands and `Unorderable` for an
/// ordering comparison on a type without an order.
pub fn evaluate_comparison(
    ty: FieldType,
    a: &Value,
    op: Comparison,
    b: &Value,
) -> CodecResult<Option<bool>> {
    if a.is_null() || b.is_null() {
        return Ok(None);
    }

    let ordering = match (a, b) {
        (Value::Int(_) | Value::Double(_), Value::Int(_) | Value::Double(_)) if ty.is_numeric() => {
            match numeric_ordering(a, b) {
                Some(ordering) => ordering,
                None => return Ok(None),
            }
        }
        (Value::Bytes(x), Value::Bytes(y)) if ty == FieldType::Blob => {
            if !op.is_equality() {
                return Err(CodecError::unorderable(ty.name()));
            }
            x.cmp(y)
        }
        _ => compare(ty, a, b)?,
    };
    Ok(Some(op.holds(ordering)))
}

/// SQL ordering of two numeric values; `None` when a NaN is involved.
fn numeric_ordering(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Double(x), Value::Double(y)) => x.partial_cmp(y),
        (Value::Int(x), Value::Double(y)) => int_double_ordering(*x, *y),
        (Value::Double(x), Value::Int(y)) => int_double_ordering(*y, *x).map(Ordering::reverse),
        _ => None,
    }
}

/// Compares an integer with a double without rounding either.
fn int_double_ordering(int: i64, double: f64) -> Option<Ordering> {
    // 2^63; every double in [-2^63, 2^63) truncates to an exact i64.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if double.is_nan() {
        return None;
    }
    if double >= LIMIT {
        return Some(Ordering::Less);
    }
    if double < -LIMIT {
        return Some(Ordering::Greater);
    }
    let whole = double.trunc();
    #[allow(clippy::cast_possible_truncation)]
    let ordering = int.cmp(&(whole as i64)).then_with(|| {
        // Same integer part: the fraction decides.
        if double > whole {
            Ordering::Less
        } else if double < whole {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    });
    Some(ordering)
}

fn check_orderable(ty: FieldType) -> CodecResult<()> {
    if ty.is_orderable() {
        Ok(())
    } else {
        Err(CodecError::unorderable(ty.name()))
    }
}

fn check_member(ty: FieldType, value: &Value) -> CodecResult<()> {
    if ty.accepts(value) {
        Ok(())
    } else {
        Err(CodecError::type_mismatch(ty.name(), value.kind()))
    }
}

const fn ordered_i64_bytes(value: i64) -> [u8; 8] {
    ((value as u64) ^ (1u64 << 63)).to_be_bytes()
}

fn ordered_f64_bytes(value: f64) -> [u8; 8] {
    let bits = value.to_bits();
    let ordered = if bits & (1u64 << 63) == 0 {
        bits ^ (1u64 << 63)
    } else {
        !bits
    };
    ordered.to_be_bytes()
}

// Zero bytes are escaped so the terminator stays unambiguous.
fn push_terminated(out: &mut Vec<u8>, bytes: &[u8]) {
    for &byte in bytes {
        if byte == 0 {
            out.extend_from_slice(&[0, ESCAPE]);
        } else {
            out.push(byte);
        }
    }
    out.extend_from_slice(&[0, 0]);
}

struct CollatingReader<'a, 'b> {
    input: &'b mut &'a [u8],
    mask: u8,
}

impl CollatingReader<'_, '_> {
    fn byte(&mut self) -> CodecResult<u8> {
        let (&first, rest) = self.input.split_first().ok_or(CodecError::UnexpectedEof)?;
        *self.input = rest;
        Ok(first ^ self.mask)
    }

    fn array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let mut buf = [0u8; N];
        for slot in &mut buf {
            *slot = self.byte()?;
        }
        Ok(buf)
    }

    fn terminated(&mut self) -> CodecResult<Vec<u8>> {
        let mut bytes = Vec::new();
        loop {
            match self.byte()? {
                0 => match self.byte()? {
                    0 => return Ok(bytes),
                    ESCAPE => bytes.push(0),
                    other => {
                        return Err(CodecError::decoding_failed(format!(
                            "invalid escape byte {other:#04x}"
                        )))
                    }
                },
                byte => bytes.push(byte),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(ty: FieldType, value: &Value) -> Vec<u8> {
        let mut out = Vec::new();
        write_collating(ty, value, &mut out).unwrap();
        out
    }

    fn roundtrip(ty: FieldType, value: Value) {
        let bytes = encode(ty, &value);
        let mut input = bytes.as_slice();
        assert_eq!(read_collating(ty, &mut input).unwrap(), value);
        assert!(input.is_empty());
    }

    #[test]
    fn integers_order_by_bytes() {
        let values = [i64::MIN, -100, -1, 0, 1, 3, 5, i64::MAX];
        for pair in values.windows(2) {
            let a = encode(FieldType::Integer, &Value::Int(pair[0]));
            let b = encode(FieldType::Integer, &Value::Int(pair[1]));
            assert!(a < b, "{} < {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn null_sorts_first() {
        let null = encode(FieldType::Integer, &Value::Null);
        let min = encode(FieldType::Integer, &Value::Int(i64::MIN));
        assert!(null < min);
        assert_eq!(
            compare(FieldType::Integer, &Value::Null, &Value::Int(i64::MIN)).unwrap(),
            Ordering::Less
        );
    }

    #[test]
    fn doubles_order_by_bytes() {
        let values = [f64::NEG_INFINITY, -2.5, -0.0, 0.0, 1e-9, 7.0, f64::INFINITY];
        for pair in values.windows(2) {
            let a = encode(FieldType::Double, &Value::Double(pair[0]));
            let b = encode(FieldType::Double, &Value::Double(pair[1]));
            assert!(a < b, "{} < {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn text_with_embedded_zero_orders_after_prefix() {
        let ty = FieldType::Text(Collation::Binary);
        let plain = encode(ty, &Value::text("a"));
        let with_zero = encode(ty, &Value::text("a\0"));
        let longer = encode(ty, &Value::text("ab"));
        assert!(plain < with_zero);
        assert!(with_zero < longer);
    }

    #[test]
    fn roundtrips() {
        roundtrip(FieldType::Boolean, Value::Bool(true));
        roundtrip(FieldType::Integer, Value::Int(-42));
        roundtrip(FieldType::Double, Value::Double(-0.5));
        roundtrip(FieldType::Text(Collation::Binary), Value::text("x\0y"));
        roundtrip(FieldType::Varbinary, Value::Bytes(vec![0, 0xFF, 0]));
        roundtrip(FieldType::Integer, Value::Null);
    }

    #[test]
    fn descending_inverts_order_and_roundtrips() {
        let mut low = Vec::new();
        let mut high = Vec::new();
        write_collating_directed(FieldType::Integer, &Value::Int(1), false, &mut low).unwrap();
        write_collating_directed(FieldType::Integer, &Value::Int(2), false, &mut high).unwrap();
        assert!(high < low);

        let mut input = low.as_slice();
        assert_eq!(
            read_collating_directed(FieldType::Integer, false, &mut input).unwrap(),
            Value::Int(1)
        );
    }

    #[test]
    fn case_insensitive_text() {
        let ty = FieldType::Text(Collation::CaseInsensitive);
        assert_eq!(encode(ty, &Value::text("ABC")), encode(ty, &Value::text("abc")));
        assert_eq!(
            compare(ty, &Value::text("ABC"), &Value::text("abd")).unwrap(),
            Ordering::Less
        );
        let bytes = encode(ty, &Value::text("abc"));
        assert!(matches!(
            read_collating(ty, &mut bytes.as_slice()),
            Err(CodecError::UnsupportedDecode { .. })
        ));
    }

    #[test]
    fn blob_is_rejected() {
        let mut out = Vec::new();
        let err = write_collating(FieldType::Blob, &Value::Bytes(vec![1]), &mut out).unwrap_err();
        assert!(matches!(err, CodecError::Unorderable { .. }));
    }

    #[test]
    fn mismatched_value_is_rejected() {
        let err = compare(FieldType::Integer, &Value::Int(1), &Value::text("1")).unwrap_err();
        assert!(matches!(err, CodecError::TypeMismatch { .. }));
    }

    #[test]
    fn evaluate_three_valued() {
        let ty = FieldType::Integer;
        assert_eq!(
            evaluate_comparison(ty, &Value::Int(1), Comparison::Lt, &Value::Int(2)).unwrap(),
            Some(true)
        );
        assert_eq!(
            evaluate_comparison(ty, &Value::Null, Comparison::Eq, &Value::Null).unwrap(),
            None
        );
        assert_eq!(
            evaluate_comparison(ty, &Value::Int(3), Comparison::Eq, &Value::Double(3.0)).unwrap(),
            Some(true)
        );
    }

    #[test]
    fn evaluate_signed_zeros_are_equal() {
        let (zero, negative) = (Value::Double(0.0), Value::Double(-0.0));
        let ty = FieldType::Double;
        assert_eq!(
            evaluate_comparison(ty, &zero, Comparison::Eq, &negative).unwrap(),
            Some(true)
        );
        assert_eq!(
            evaluate_comparison(ty, &negative, Comparison::Lt, &zero).unwrap(),
            Some(false)
        );
        assert_eq!(
            evaluate_comparison(ty, &Value::Int(0), Comparison::Eq, &negative).unwrap(),
            Some(true)
        );
        // The collating order still separates them.
        assert_eq!(compare(ty, &negative, &zero).unwrap(), Ordering::Less);
    }

    #[test]
    fn evaluate_int_against_double_is_exact() {
        let ty = FieldType::Integer;
        let big = Value::Int(9_007_199_254_740_993);
        let rounded = Value::Double(9_007_199_254_740_992.0);
        assert_eq!(
            evaluate_comparison(ty, &big, Comparison::Eq, &rounded).unwrap(),
            Some(false)
        );
        assert_eq!(
            evaluate_comparison(ty, &big, Comparison::Gt, &rounded).unwrap(),
            Some(true)
        );
        assert_eq!(
            evaluate_comparison(ty, &rounded, Comparison::Lt, &big).unwrap(),
            Some(true)
        );
        assert_eq!(
            evaluate_comparison(ty, &Value::Int(2), Comparison::Lt, &Value::Double(2.5)).unwrap(),
            Some(true)
        );
        assert_eq!(
            evaluate_comparison(ty, &Value::Int(-2), Comparison::Gt, &Value::Double(-2.5))
                .unwrap(),
            Some(true)
        );
        let int_vs = |i: i64, op: Comparison, d: f64| {
            evaluate_comparison(ty, &Value::Int(i), op, &Value::Double(d)).unwrap()
        };
        assert_eq!(int_vs(i64::MAX, Comparison::Lt, 9.3e18), Some(true));
        assert_eq!(int_vs(i64::MIN, Comparison::Gt, f64::NEG_INFINITY), Some(true));
        assert_eq!(int_vs(1, Comparison::Eq, f64::NAN), None);
    }

    #[test]
    fn evaluate_blob_equality_only() {
        let a = Value::Bytes(vec![1]);
        assert_eq!(
            evaluate_comparison(FieldType::Blob, &a, Comparison::Eq, &a).unwrap(),
            Some(true)
        );
        assert!(evaluate_comparison(FieldType::Blob, &a, Comparison::Lt, &a).is_err());
    }

    #[test]
    fn truncated_input_is_eof() {
        let bytes = encode(FieldType::Integer, &Value::Int(9));
        let mut input = &bytes[..4];
        assert_eq!(
            read_collating(FieldType::Integer, &mut input).unwrap_err(),
            CodecError::UnexpectedEof
        );
    }
}
