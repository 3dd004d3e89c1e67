//! Serialization envelope
//!
//! Every serializable entity is written as a `u32` little-endian tag followed
//! by its fields in a fixed order. Tags are stable across releases; the
//! process-wide [`registry`] maps a tag back to the decoder of its type so
//! payloads can be decoded without knowing their type up front.
//!
//! ```
//! use numkernel_core::serialization::{decode_any, decode_as, encode};
//! use numkernel_core::table::DenseTable;
//!
//! let table = DenseTable::from_rows(&[[1.0f64, 2.0], [3.0, 4.0]]).unwrap();
//! let bytes = encode(&table);
//!
//! let back: DenseTable<f64> = decode_as(&bytes).unwrap();
//! assert_eq!(back, table);
//!
//! let any = decode_any(&bytes).unwrap();
//! assert!(any.as_any().downcast_ref::<DenseTable<f64>>().is_some());
//! ```

mod codec;
pub mod registry;

pub use codec::{Decoder, Encoder};
pub use registry::{is_registered, register, registered_tags};

use crate::bundle::{AlgorithmId, MethodId, PartialResult, ResultBundle, ResultSlot};
use crate::error::{Error, Result};
use crate::numeric::{FloatType, Numeric};
use crate::table::{CsrTable, DenseTable};
use std::any::Any;
use std::borrow::Cow;
use std::fmt::Debug;

/// Stable serialization tags
pub mod tags {
    pub const DENSE_TABLE_F32: u32 = 0x0101;
    pub const DENSE_TABLE_F64: u32 = 0x0102;
    pub const CSR_TABLE_F32: u32 = 0x0111;
    pub const CSR_TABLE_F64: u32 = 0x0112;
    pub const PARTIAL_RESULT_F32: u32 = 0x0201;
    pub const PARTIAL_RESULT_F64: u32 = 0x0202;
    pub const RESULT_BUNDLE_F32: u32 = 0x0301;
    pub const RESULT_BUNDLE_F64: u32 = 0x0302;
    pub const LINEAR_MODEL_F32: u32 = 0x0401;
    pub const LINEAR_MODEL_F64: u32 = 0x0402;
}

/// Pick the tag matching an element width
pub const fn tag_for(float_type: FloatType, f32_tag: u32, f64_tag: u32) -> u32 {
    match float_type {
        FloatType::F32 => f32_tag,
        FloatType::F64 => f64_tag,
    }
}

/// Concrete serializable type with a stable tag
pub trait Serializable: Any + Debug + Send + Sync + Sized {
    const TAG: u32;

    /// Write the fields, in the order `decode_fields` reads them
    fn encode_fields(&self, out: &mut Encoder);

    fn decode_fields(input: &mut Decoder<'_>) -> Result<Self>;
}

/// Object-safe view of a serializable value
pub trait Envelope: Any + Debug + Send + Sync {
    fn tag(&self) -> u32;

    fn write_fields(&self, out: &mut Encoder);

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync>;
}

impl<S: Serializable> Envelope for S {
    fn tag(&self) -> u32 {
        S::TAG
    }

    fn write_fields(&self, out: &mut Encoder) {
        self.encode_fields(out);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync> {
        self
    }
}

/// Tag followed by fields
pub fn encode<E: Envelope + ?Sized>(value: &E) -> Vec<u8> {
    let mut out = Encoder::new();
    out.put_u32(value.tag());
    value.write_fields(&mut out);
    out.into_bytes()
}

/// Decode a payload of any registered type
pub fn decode_any(bytes: &[u8]) -> Result<Box<dyn Envelope>> {
    let mut input = Decoder::new(bytes);
    let tag = input.get_u32()?;
    let decode = registry::decoder_for(tag)?;
    let value = decode(&mut input)?;
    input.finish()?;
    Ok(value)
}

/// Decode a payload that must hold an `S`
pub fn decode_as<S: Serializable>(bytes: &[u8]) -> Result<S> {
    let mut input = Decoder::new(bytes);
    let tag = input.get_u32()?;
    if tag != S::TAG {
        if !is_registered(tag) {
            return Err(Error::UnknownSerializationTag(tag));
        }
        return Err(Error::type_mismatch(
            format!("payload tag {:#06x}", S::TAG),
            format!("payload tag {tag:#06x}"),
        ));
    }
    let value = S::decode_fields(&mut input)?;
    input.finish()?;
    Ok(value)
}

/// Read the tag without decoding the payload
pub fn peek_tag(bytes: &[u8]) -> Result<u32> {
    Decoder::new(bytes).get_u32()
}

fn corrupt(e: Error) -> Error {
    match e {
        Error::TruncatedStream { .. } | Error::CorruptStream(_) => e,
        other => Error::CorruptStream(other.to_string()),
    }
}

fn write_dense<T: Numeric>(table: &DenseTable<T>, out: &mut Encoder) {
    out.put_usize(table.rows());
    out.put_usize(table.cols());
    out.put_values(table.as_slice());
}

fn read_dense<T: Numeric>(input: &mut Decoder<'_>) -> Result<DenseTable<T>> {
    let rows = input.get_usize()?;
    let cols = input.get_usize()?;
    let len = rows
        .checked_mul(cols)
        .ok_or_else(|| Error::CorruptStream(format!("{rows}x{cols} table overflows")))?;
    let values = input.get_values(len)?;
    DenseTable::from_vec(rows, cols, values).map_err(corrupt)
}

impl<T: Numeric> Serializable for DenseTable<T> {
    const TAG: u32 = tag_for(
        T::FLOAT_TYPE,
        tags::DENSE_TABLE_F32,
        tags::DENSE_TABLE_F64,
    );

    fn encode_fields(&self, out: &mut Encoder) {
        write_dense(self, out);
    }

    fn decode_fields(input: &mut Decoder<'_>) -> Result<Self> {
        read_dense(input)
    }
}

impl<T: Numeric> Serializable for CsrTable<T> {
    const TAG: u32 = tag_for(T::FLOAT_TYPE, tags::CSR_TABLE_F32, tags::CSR_TABLE_F64);

    fn encode_fields(&self, out: &mut Encoder) {
        out.put_usize(self.rows());
        out.put_usize(self.cols());
        out.put_usize(self.nnz());
        out.put_values(self.values());
        out.put_indices(self.column_indices());
        out.put_indices(self.row_offsets());
    }

    fn decode_fields(input: &mut Decoder<'_>) -> Result<Self> {
        let rows = input.get_usize()?;
        let cols = input.get_usize()?;
        let nnz = input.get_usize()?;
        let values = input.get_values(nnz)?;
        let column_indices = input.get_indices(nnz)?;
        let offsets = rows
            .checked_add(1)
            .ok_or_else(|| Error::CorruptStream(format!("row count {rows} overflows")))?;
        let row_offsets = input.get_indices(offsets)?;
        CsrTable::new(rows, cols, values, column_indices, row_offsets).map_err(corrupt)
    }
}

impl<T: Numeric> Serializable for PartialResult<T> {
    const TAG: u32 = tag_for(
        T::FLOAT_TYPE,
        tags::PARTIAL_RESULT_F32,
        tags::PARTIAL_RESULT_F64,
    );

    fn encode_fields(&self, out: &mut Encoder) {
        out.put_u32(self.algorithm().0);
        out.put_u32(self.method().0);
        out.put_u64(self.n_observations());
        out.put_usize(self.tables().count());
        for (code, table) in self.tables() {
            out.put_u32(code);
            write_dense(table, out);
        }
    }

    fn decode_fields(input: &mut Decoder<'_>) -> Result<Self> {
        let algorithm = AlgorithmId(input.get_u32()?);
        let method = MethodId(input.get_u32()?);
        let mut partial = PartialResult::new(algorithm, method);
        partial.set_n_observations(input.get_u64()?);
        let count = input.get_usize()?;
        for _ in 0..count {
            let code = input.get_u32()?;
            let table = read_dense(input)?;
            if partial.tables().any(|(c, _)| c == code) {
                return Err(Error::CorruptStream(format!(
                    "duplicate partial statistic {code}"
                )));
            }
            partial.insert_raw(code, table);
        }
        Ok(partial)
    }
}

impl<T: Numeric> Serializable for ResultBundle<T> {
    const TAG: u32 = tag_for(
        T::FLOAT_TYPE,
        tags::RESULT_BUNDLE_F32,
        tags::RESULT_BUNDLE_F64,
    );

    fn encode_fields(&self, out: &mut Encoder) {
        out.put_bool(self.is_allocated());
        if !self.is_allocated() {
            return;
        }
        out.put_bool(self.is_valid());
        let entries = self.raw_entries();
        out.put_usize(entries.len());
        for (slot, populated, table) in entries {
            out.put_u32(slot.code);
            out.put_str(&slot.name);
            out.put_bool(populated);
            write_dense(table, out);
        }
    }

    fn decode_fields(input: &mut Decoder<'_>) -> Result<Self> {
        if !input.get_bool()? {
            return Ok(ResultBundle::new());
        }
        let valid = input.get_bool()?;
        let count = input.get_usize()?;
        let mut parts = Vec::new();
        for _ in 0..count {
            let code = input.get_u32()?;
            let name = input.get_str()?;
            let populated = input.get_bool()?;
            let table = read_dense::<T>(input)?;
            let slot = ResultSlot {
                code,
                name: Cow::Owned(name),
                rows: table.rows(),
                cols: table.cols(),
            };
            parts.push((slot, populated, table));
        }
        ResultBundle::from_raw(valid, parts)
    }
}
