//! Error types for numkernel
//!
//! Provides a unified error type for all numkernel crates. Every variant maps
//! onto one [`ErrorKind`] so callers at an interop boundary can translate
//! errors by category without matching on individual variants.

use thiserror::Error;

/// Category of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad parameter shape or an unsupported method/type/CPU combination. Not retryable.
    Configuration,
    /// Missing input, wrong layout or mismatched dimensions. Fix the input and retry.
    Input,
    /// Container allocation failed
    Allocation,
    /// Singular system, zero divisor and similar numerical failures
    Numerical,
    /// Encoding or decoding of a serialized payload failed
    Serialization,
    /// An operation was called in a state that does not allow it
    State,
}

/// Core error type for numkernel operations
#[derive(Error, Debug)]
pub enum Error {
    /// No kernel variant is compiled for the requested combination
    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    /// Invalid parameter provided to an algorithm
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A required input, parameter or result was never set
    #[error("Missing argument: {0}")]
    MissingArgument(String),

    /// A container has the wrong layout or element type
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Container dimensions do not agree
    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// Requested row range lies outside the container
    #[error("Row range {start}..{end} out of bounds for {rows} rows")]
    RowRange { start: usize, end: usize, rows: usize },

    /// Insufficient data for the requested operation
    #[error("Insufficient data: expected at least {expected} observations, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    /// Container allocation failed
    #[error("Allocation of {rows}x{cols} table failed: {reason}")]
    Allocation {
        rows: usize,
        cols: usize,
        reason: String,
    },

    /// Singular or ill-conditioned data
    #[error("Numerical degeneracy: {0}")]
    NumericalDegeneracy(String),

    /// No registered factory for a serialization tag
    #[error("Unknown serialization tag {0:#06x}")]
    UnknownSerializationTag(u32),

    /// The tag is already taken by a different type
    #[error("Serialization tag {0:#06x} is already registered to another type")]
    DuplicateSerializationTag(u32),

    /// Stream ended before all fields were read
    #[error("Truncated stream: needed {needed} bytes, {available} available")]
    TruncatedStream { needed: usize, available: usize },

    /// Stream content is inconsistent
    #[error("Corrupt stream: {0}")]
    CorruptStream(String),

    /// Finalize was requested before any increment was folded in
    #[error("Empty computation: {0}")]
    EmptyComputation(String),

    /// Operation not allowed in the current state
    #[error("Invalid state: cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Taxonomy category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedConfiguration(_) | Self::InvalidParameter(_) => {
                ErrorKind::Configuration
            }
            Self::MissingArgument(_)
            | Self::TypeMismatch { .. }
            | Self::DimensionMismatch { .. }
            | Self::RowRange { .. }
            | Self::InsufficientData { .. } => ErrorKind::Input,
            Self::Allocation { .. } => ErrorKind::Allocation,
            Self::NumericalDegeneracy(_) => ErrorKind::Numerical,
            Self::UnknownSerializationTag(_)
            | Self::DuplicateSerializationTag(_)
            | Self::TruncatedStream { .. }
            | Self::CorruptStream(_) => ErrorKind::Serialization,
            Self::EmptyComputation(_) | Self::InvalidState { .. } => ErrorKind::State,
        }
    }

    /// Stable numeric identifier, for hosts that signal errors by code
    pub fn code(&self) -> u32 {
        match self {
            Self::UnsupportedConfiguration(_) => 100,
            Self::InvalidParameter(_) => 101,
            Self::MissingArgument(_) => 200,
            Self::TypeMismatch { .. } => 201,
            Self::DimensionMismatch { .. } => 202,
            Self::RowRange { .. } => 203,
            Self::InsufficientData { .. } => 204,
            Self::Allocation { .. } => 300,
            Self::NumericalDegeneracy(_) => 400,
            Self::UnknownSerializationTag(_) => 500,
            Self::DuplicateSerializationTag(_) => 501,
            Self::TruncatedStream { .. } => 502,
            Self::CorruptStream(_) => 503,
            Self::EmptyComputation(_) => 600,
            Self::InvalidState { .. } => 601,
        }
    }

    /// Create an error for a missing bundle entry
    pub fn missing(name: &str) -> Self {
        Self::MissingArgument(name.to_string())
    }

    /// Create an error for size mismatch
    pub fn size_mismatch(expected: usize, actual: usize, context: &str) -> Self {
        Self::DimensionMismatch {
            context: context.to_string(),
            expected,
            actual,
        }
    }

    /// Create an error for a container of the wrong layout or type
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an error for an operation the kernel does not implement
    pub fn unsupported(kernel: &str, operation: &str) -> Self {
        Self::UnsupportedConfiguration(format!("{kernel} does not support {operation}"))
    }

    /// Create an error for NaN/Inf values
    pub fn non_finite(context: &str) -> Self {
        Self::NumericalDegeneracy(format!("{context} contains NaN or infinite values"))
    }
}
