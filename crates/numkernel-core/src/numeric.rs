//! Element types for numeric containers
//!
//! A container stores exactly one floating-point width, chosen once through
//! its type parameter. Aggregates (sums, dot products) are always carried in
//! `f64` so that `f32` tables do not lose precision while accumulating.

use bytemuck::Pod;
use num_traits::Float;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

/// Runtime tag for the element width of a container or kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FloatType {
    F32,
    F64,
}

impl FloatType {
    /// Size of one element in bytes
    pub fn size(self) -> usize {
        match self {
            Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }
}

impl fmt::Display for FloatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Floating-point element stored in numeric containers
pub trait Numeric: Pod + Float + Default + Debug + Send + Sync + 'static {
    /// Width tag of this element type
    const FLOAT_TYPE: FloatType;

    /// Convert from an f64 aggregate
    fn from_f64(val: f64) -> Self;

    /// Widen to f64 for aggregation
    fn as_f64(self) -> f64;

    /// Append the little-endian encoding of this value
    fn write_le(self, out: &mut Vec<u8>);

    /// Read a value from exactly `FLOAT_TYPE.size()` little-endian bytes
    fn read_le(bytes: &[u8]) -> Self;
}

impl Numeric for f64 {
    const FLOAT_TYPE: FloatType = FloatType::F64;

    fn from_f64(val: f64) -> Self {
        val
    }

    fn as_f64(self) -> f64 {
        self
    }

    fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn read_le(bytes: &[u8]) -> Self {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes[..8]);
        f64::from_le_bytes(raw)
    }
}

impl Numeric for f32 {
    const FLOAT_TYPE: FloatType = FloatType::F32;

    fn from_f64(val: f64) -> Self {
        val as f32
    }

    fn as_f64(self) -> f64 {
        self as f64
    }

    fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn read_le(bytes: &[u8]) -> Self {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&bytes[..4]);
        f32::from_le_bytes(raw)
    }
}
