//! Row pack/unpack.
//!
//! The group cursor turns stored value bytes into typed rows through a
//! [`RowPacker`]. Two physical formats are provided; a group picks one with
//! [`RowFormat`] when it is built.

use crate::error::{CoreError, CoreResult};
use crate::schema::RowType;
use arbordb_codec::{pack_values, read_collating, unpack_values, write_collating, Value};
use std::fmt;
use std::sync::Arc;

/// Converts between field values and stored value bytes.
pub trait RowPacker: Send + Sync + fmt::Debug {
    /// Encodes the values of one row.
    ///
    /// # Errors
    ///
    /// Returns an error if the values cannot be encoded.
    fn pack_row(&self, row_type: &RowType, values: &[Value]) -> CoreResult<Vec<u8>>;

    /// Decodes stored value bytes into field values.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes do not hold a row of `row_type`.
    fn expand_row(&self, row_type: &RowType, bytes: &[u8]) -> CoreResult<Vec<Value>>;
}

/// Physical row formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RowFormat {
    /// CBOR array of values.
    #[default]
    Cbor,
    /// Concatenated collating encodings of each field.
    Tuple,
}

impl RowFormat {
    /// Returns the packer for this format.
    #[must_use]
    pub fn packer(self) -> Arc<dyn RowPacker> {
        match self {
            Self::Cbor => Arc::new(CborRowPacker),
            Self::Tuple => Arc::new(TupleRowPacker),
        }
    }
}

/// Generic serialization of the value list.
#[derive(Debug, Clone, Copy, Default)]
pub struct CborRowPacker;

impl RowPacker for CborRowPacker {
    fn pack_row(&self, row_type: &RowType, values: &[Value]) -> CoreResult<Vec<u8>> {
        row_type.check_values(values)?;
        Ok(pack_values(values)?)
    }

    fn expand_row(&self, row_type: &RowType, bytes: &[u8]) -> CoreResult<Vec<Value>> {
        let values = unpack_values(bytes)?;
        if values.len() != row_type.field_count() {
            return Err(CoreError::corrupt(format!(
                "stored row of {} has {} fields, expected {}",
                row_type.name(),
                values.len(),
                row_type.field_count()
            )));
        }
        Ok(values)
    }
}

/// Tuple encoding: each field's storage-type collating bytes, in order.
#[derive(Debug, Clone, Copy, Default)]
pub struct TupleRowPacker;

impl RowPacker for TupleRowPacker {
    fn pack_row(&self, row_type: &RowType, values: &[Value]) -> CoreResult<Vec<u8>> {
        row_type.check_values(values)?;
        let mut out = Vec::with_capacity(values.len() * 9);
        for (ty, value) in row_type.fields().iter().zip(values) {
            write_collating(ty.storage_type(), value, &mut out)?;
        }
        Ok(out)
    }

    fn expand_row(&self, row_type: &RowType, bytes: &[u8]) -> CoreResult<Vec<Value>> {
        let mut input = bytes;
        let values = row_type
            .fields()
            .iter()
            .map(|ty| read_collating(ty.storage_type(), &mut input))
            .collect::<Result<Vec<_>, _>>()?;
        if !input.is_empty() {
            return Err(CoreError::corrupt(format!(
                "{} trailing bytes after row of {}",
                input.len(),
                row_type.name()
            )));
        }
        Ok(values)
    }
}
