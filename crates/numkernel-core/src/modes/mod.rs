//! Algorithm execution modes
//!
//! Every mode owns one kernel handle and one result bundle and drives the
//! kernel through a small state machine:
//!
//! - [`Batch`]: all data at once, one `compute` call
//! - [`Online`]: increments folded into a partial result, then finalized
//! - [`DistributedLocal`] / [`DistributedMaster`]: partials computed on
//!   separate nodes, merged by the master and finalized there

mod batch;
mod distributed;
mod online;

pub use batch::{Batch, BatchState};
pub use distributed::{DistributedLocal, DistributedMaster, MasterState};
pub use online::{Online, OnlineState};

use crate::bundle::{BundleId, InputBundle, ParameterBundle, PartialResult, ResultBundle};
use crate::error::{Error, Result};
use crate::kernel::{ComputeMode, KernelStrategy};
use crate::numeric::Numeric;
use crate::table::IntoSharedTable;
use std::sync::Arc;

pub(crate) fn require_mode<T: Numeric>(
    kernel: &Arc<dyn KernelStrategy<T>>,
    mode: ComputeMode,
) -> Result<()> {
    if !kernel.supports(mode) {
        return Err(Error::unsupported(kernel.name(), &format!("{mode} mode")));
    }
    Ok(())
}

/// Fail with [`Error::TypeMismatch`] if `partial` was produced by another kernel family
pub(crate) fn check_partial_origin<T: Numeric>(
    kernel: &Arc<dyn KernelStrategy<T>>,
    partial: &PartialResult<T>,
) -> Result<()> {
    if partial.algorithm() != kernel.algorithm() || partial.method() != kernel.method() {
        return Err(Error::type_mismatch(
            format!("partial of {}/{}", kernel.algorithm(), kernel.method()),
            format!("partial of {}/{}", partial.algorithm(), partial.method()),
        ));
    }
    Ok(())
}

/// Finalize `partial` into `result`, leaving it invalid on failure
pub(crate) fn finalize_into<T: Numeric>(
    kernel: &Arc<dyn KernelStrategy<T>>,
    partial: &PartialResult<T>,
    params: &ParameterBundle,
    result: &mut ResultBundle<T>,
) -> Result<()> {
    let layout = kernel.finalize_layout(partial, params)?;
    if result.layout() != Some(&layout) {
        result.reset();
    }
    result.allocate(&layout)?;
    match kernel.finalize(partial, params, result) {
        Ok(()) => result.seal(),
        Err(e) => {
            result.invalidate();
            Err(e)
        }
    }
}

/// Partial-result accumulation shared by online and distributed-local modes
pub(crate) struct Accumulator<T: Numeric> {
    kernel: Arc<dyn KernelStrategy<T>>,
    parameters: ParameterBundle,
    input: InputBundle<T>,
    partial: Option<PartialResult<T>>,
}

impl<T: Numeric> Accumulator<T> {
    pub(crate) fn new(kernel: Arc<dyn KernelStrategy<T>>) -> Self {
        Self {
            kernel,
            parameters: ParameterBundle::default(),
            input: InputBundle::new(),
            partial: None,
        }
    }

    pub(crate) fn kernel(&self) -> &Arc<dyn KernelStrategy<T>> {
        &self.kernel
    }

    pub(crate) fn parameters(&self) -> &ParameterBundle {
        &self.parameters
    }

    /// New parameters invalidate whatever was accumulated under the old ones
    pub(crate) fn configure(&mut self, parameters: ParameterBundle) {
        self.parameters = parameters;
        self.partial = None;
    }

    pub(crate) fn set_input<K: BundleId>(
        &mut self,
        id: K,
        table: impl IntoSharedTable<T>,
    ) {
        self.input.set(id, table);
    }

    /// Fold the current input into a staged copy, committing only on success
    pub(crate) fn compute(&mut self) -> Result<()> {
        self.kernel.check_input(&self.input, &self.parameters)?;
        let mut staged = match &self.partial {
            Some(partial) => partial.clone(),
            None => self.kernel.init_partial(&self.input, &self.parameters)?,
        };
        self.kernel
            .compute_partial(&self.input, &self.parameters, &mut staged)?;
        log::trace!(
            "{}: folded increment, {} observations",
            self.kernel.name(),
            staged.n_observations()
        );
        self.partial = Some(staged);
        Ok(())
    }

    /// Partial result holding at least one observation
    pub(crate) fn filled(&self) -> Option<&PartialResult<T>> {
        self.partial.as_ref().filter(|p| !p.is_empty())
    }

    pub(crate) fn partial(&self) -> Option<&PartialResult<T>> {
        self.partial.as_ref()
    }

    pub(crate) fn take(&mut self) -> Option<PartialResult<T>> {
        self.partial.take()
    }

    pub(crate) fn set_partial(&mut self, partial: PartialResult<T>) -> Result<()> {
        check_partial_origin(&self.kernel, &partial)?;
        self.partial = Some(partial);
        Ok(())
    }

    pub(crate) fn reset(&mut self) {
        self.partial = None;
    }
}
