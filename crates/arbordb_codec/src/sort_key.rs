//! Sort keys: concatenated collating encodings of a row's ordering columns.

use crate::collate::{read_collating_directed, write_collating_directed};
use crate::error::{CodecError, CodecResult};
use crate::value::{FieldType, Value};
use std::cmp::Ordering;

/// How one field of a [`SortKey`] was encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SortKeyField {
    /// Declared type of the field.
    pub ty: FieldType,
    /// Direction the field was encoded in.
    pub ascending: bool,
}

/// An append-only, byte-comparable key.
///
/// Two sort keys built from the same field sequence compare, byte-wise, in
/// the order their values compare field by field (respecting each field's
/// direction, NULL lowest when ascending).
///
/// # Example
///
/// ```
/// use arbordb_codec::{FieldType, SortKey, Value};
///
/// let types = [FieldType::Integer];
/// let mut a = SortKey::new();
/// a.append(&Value::Int(1), 0, &types).unwrap();
/// let mut b = SortKey::new();
/// b.append(&Value::Int(2), 0, &types).unwrap();
/// assert!(a.compare(&b).unwrap().is_lt());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortKey {
    bytes: Vec<u8>,
    fields: Vec<SortKeyField>,
}

impl SortKey {
    /// Creates an empty sort key.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty sort key with room for `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
            fields: Vec::new(),
        }
    }

    /// Appends `value`, ascending, typed by `type_table[field_index]`.
    ///
    /// # Errors
    ///
    /// Returns an error if `field_index` is outside the type table, the value
    /// does not match its type, or the type is not orderable.
    pub fn append(
        &mut self,
        value: &Value,
        field_index: usize,
        type_table: &[FieldType],
    ) -> CodecResult<()> {
        let ty = type_table.get(field_index).copied().ok_or_else(|| {
            CodecError::encoding_failed(format!(
                "field {field_index} outside type table of {} fields",
                type_table.len()
            ))
        })?;
        self.append_directed(value, ty, true)
    }

    /// Appends `value` of type `ty` in the given direction.
    ///
    /// # Errors
    ///
    /// See [`SortKey::append`].
    pub fn append_directed(&mut self, value: &Value, ty: FieldType, ascending: bool) -> CodecResult<()> {
        write_collating_directed(ty, value, ascending, &mut self.bytes)?;
        self.fields.push(SortKeyField { ty, ascending });
        Ok(())
    }

    /// The encoded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the key, returning its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// The field descriptors, in append order.
    #[must_use]
    pub fn fields(&self) -> &[SortKeyField] {
        &self.fields
    }

    /// Number of appended fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no field has been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Removes every field, keeping the allocation.
    pub fn clear(&mut self) {
        self.bytes.clear();
        self.fields.clear();
    }

    /// Three-way comparison of two keys built from the same field sequence.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if the field sequences differ.
    pub fn compare(&self, other: &Self) -> CodecResult<Ordering> {
        if self.fields != other.fields {
            return Err(CodecError::type_mismatch(
                describe(&self.fields),
                describe(&other.fields),
            ));
        }
        Ok(self.bytes.cmp(&other.bytes))
    }

    /// Decodes every field back into a value.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedDecode` if a field's encoding is lossy.
    pub fn decode_values(&self) -> CodecResult<Vec<Value>> {
        let mut input = self.bytes.as_slice();
        let values = self
            .fields
            .iter()
            .map(|field| read_collating_directed(field.ty, field.ascending, &mut input))
            .collect::<CodecResult<Vec<_>>>()?;
        if !input.is_empty() {
            return Err(CodecError::decoding_failed(format!(
                "{} trailing bytes after sort key fields",
                input.len()
            )));
        }
        Ok(values)
    }
}

impl AsRef<[u8]> for SortKey {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

fn describe(fields: &[SortKeyField]) -> String {
    let parts: Vec<String> = fields
        .iter()
        .map(|f| format!("{} {}", f.ty, if f.ascending { "ASC" } else { "DESC" }))
        .collect();
    format!("({})", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Collation;

    fn key(values: &[(Value, FieldType, bool)]) -> SortKey {
        let mut key = SortKey::new();
        for (value, ty, ascending) in values {
            key.append_directed(value, *ty, *ascending).unwrap();
        }
        key
    }

    #[test]
    fn composite_keys_order_field_by_field() {
        let text = FieldType::Text(Collation::Binary);
        let a = key(&[(Value::Int(1), FieldType::Integer, true), (Value::text("z"), text, true)]);
        let b = key(&[(Value::Int(2), FieldType::Integer, true), (Value::text("a"), text, true)]);
        assert_eq!(a.compare(&b).unwrap(), Ordering::Less);
    }

    #[test]
    fn mixed_directions() {
        let a = key(&[(Value::Int(1), FieldType::Integer, true), (Value::Int(5), FieldType::Integer, false)]);
        let b = key(&[(Value::Int(1), FieldType::Integer, true), (Value::Int(9), FieldType::Integer, false)]);
        assert_eq!(a.compare(&b).unwrap(), Ordering::Greater);
    }

    #[test]
    fn descending_puts_null_last() {
        let null = key(&[(Value::Null, FieldType::Integer, false)]);
        let one = key(&[(Value::Int(1), FieldType::Integer, false)]);
        assert_eq!(null.compare(&one).unwrap(), Ordering::Greater);
    }

    #[test]
    fn mismatched_field_sequences_fail() {
        let a = key(&[(Value::Int(1), FieldType::Integer, true)]);
        let b = key(&[(Value::Int(1), FieldType::Integer, false)]);
        assert!(matches!(a.compare(&b), Err(CodecError::TypeMismatch { .. })));
    }

    #[test]
    fn append_by_field_index() {
        let types = [FieldType::Boolean, FieldType::Integer];
        let mut key = SortKey::new();
        key.append(&Value::Int(4), 1, &types).unwrap();
        assert_eq!(key.fields()[0].ty, FieldType::Integer);
        assert!(key.append(&Value::Int(4), 2, &types).is_err());
        assert!(key.append(&Value::Int(4), 0, &types).is_err());
    }

    #[test]
    fn decode_values_roundtrip() {
        let k = key(&[
            (Value::Int(-3), FieldType::Integer, false),
            (Value::Null, FieldType::Varbinary, true),
            (Value::Bool(true), FieldType::Boolean, true),
        ]);
        assert_eq!(
            k.decode_values().unwrap(),
            vec![Value::Int(-3), Value::Null, Value::Bool(true)]
        );
    }

    #[test]
    fn clear_resets() {
        let mut k = key(&[(Value::Int(1), FieldType::Integer, true)]);
        k.clear();
        assert!(k.is_empty());
        assert!(k.as_bytes().is_empty());
    }
}
