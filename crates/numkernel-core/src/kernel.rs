//! Kernel strategy trait
//!
//! A kernel is one implementation of one algorithm method for one element
//! type and one CPU level. Execution modes own a shared handle to a kernel and
//! drive it through the calls below; kernels hold no per-computation state.

use crate::bundle::{
    AlgorithmId, InputBundle, MethodId, ParameterBundle, PartialResult, ResultBundle,
    ResultLayout,
};
use crate::cpu::CpuType;
use crate::error::{Error, Result};
use crate::numeric::Numeric;
use std::fmt;

/// How a kernel is being driven
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComputeMode {
    Batch,
    Online,
    Distributed,
}

impl fmt::Display for ComputeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Batch => f.write_str("batch"),
            Self::Online => f.write_str("online"),
            Self::Distributed => f.write_str("distributed"),
        }
    }
}

/// What finalization does to the accumulated partial result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FinalizePolicy {
    /// Finalize consumes the partial; the next increment starts fresh
    #[default]
    Consume,
    /// Finalize leaves the partial in place so accumulation can continue
    Peek,
}

/// Pluggable compute unit of an algorithm
///
/// Only `check_input`, `result_layout` and `compute` are required. Kernels
/// that support online or distributed processing also implement the partial
/// result operations; the provided versions fail with
/// [`Error::UnsupportedConfiguration`].
pub trait KernelStrategy<T: Numeric>: Send + Sync {
    /// Human-readable kernel name, e.g. `"covariance/dense"`
    fn name(&self) -> &'static str;

    fn algorithm(&self) -> AlgorithmId;

    fn method(&self) -> MethodId;

    /// Lowest CPU level this kernel requires
    fn cpu(&self) -> CpuType;

    /// Whether the kernel can be driven in `mode`
    fn supports(&self, mode: ComputeMode) -> bool {
        mode == ComputeMode::Batch
    }

    fn finalize_policy(&self) -> FinalizePolicy {
        FinalizePolicy::Consume
    }

    /// Validate inputs and parameters before anything is allocated
    fn check_input(&self, input: &InputBundle<T>, params: &ParameterBundle) -> Result<()>;

    /// Shapes of the batch outputs for these inputs
    fn result_layout(&self, input: &InputBundle<T>, params: &ParameterBundle)
        -> Result<ResultLayout>;

    /// Single-pass computation into an allocated result bundle
    fn compute(
        &self,
        input: &InputBundle<T>,
        params: &ParameterBundle,
        result: &mut ResultBundle<T>,
    ) -> Result<()>;

    /// Empty accumulator sized for these inputs
    fn init_partial(
        &self,
        _input: &InputBundle<T>,
        _params: &ParameterBundle,
    ) -> Result<PartialResult<T>> {
        Err(Error::unsupported(self.name(), "partial results"))
    }

    /// Fold the current input block into `partial`
    fn compute_partial(
        &self,
        _input: &InputBundle<T>,
        _params: &ParameterBundle,
        _partial: &mut PartialResult<T>,
    ) -> Result<()> {
        Err(Error::unsupported(self.name(), "online accumulation"))
    }

    /// Shapes of the outputs produced from `partial`
    fn finalize_layout(
        &self,
        _partial: &PartialResult<T>,
        _params: &ParameterBundle,
    ) -> Result<ResultLayout> {
        Err(Error::unsupported(self.name(), "finalization"))
    }

    /// Turn sufficient statistics into outputs
    fn finalize(
        &self,
        _partial: &PartialResult<T>,
        _params: &ParameterBundle,
        _result: &mut ResultBundle<T>,
    ) -> Result<()> {
        Err(Error::unsupported(self.name(), "finalization"))
    }

    /// Merge `other` into `into`
    ///
    /// Must be associative; callers have already checked compatibility.
    fn merge(
        &self,
        _into: &mut PartialResult<T>,
        _other: &PartialResult<T>,
        _params: &ParameterBundle,
    ) -> Result<()> {
        Err(Error::unsupported(self.name(), "merge"))
    }
}

impl<T: Numeric> fmt::Debug for dyn KernelStrategy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelStrategy")
            .field("name", &self.name())
            .field("algorithm", &self.algorithm())
            .field("method", &self.method())
            .field("cpu", &self.cpu())
            .finish()
    }
}

/// Fail with [`Error::InsufficientData`] when `table_rows` is below `min_rows`
pub fn require_rows(table_rows: usize, min_rows: usize) -> Result<()> {
    if table_rows < min_rows {
        return Err(Error::InsufficientData {
            expected: min_rows,
            actual: table_rows,
        });
    }
    Ok(())
}
