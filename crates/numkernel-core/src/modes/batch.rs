//! Single-pass batch mode

use super::require_mode;
use crate::bundle::{BundleId, InputBundle, ParameterBundle, ResultBundle};
use crate::error::Result;
use crate::kernel::{ComputeMode, KernelStrategy};
use crate::numeric::Numeric;
use crate::table::{DenseTable, IntoSharedTable};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Configured,
    Computed,
}

/// Batch execution of one kernel
///
/// Changing parameters or inputs releases the previous results. Computing
/// twice over the same inputs reproduces the same bundle bit for bit.
pub struct Batch<T: Numeric> {
    kernel: Arc<dyn KernelStrategy<T>>,
    parameters: ParameterBundle,
    input: InputBundle<T>,
    result: ResultBundle<T>,
    state: BatchState,
}

impl<T: Numeric> Batch<T> {
    pub fn new(kernel: Arc<dyn KernelStrategy<T>>) -> Result<Self> {
        require_mode(&kernel, ComputeMode::Batch)?;
        Ok(Self {
            kernel,
            parameters: ParameterBundle::default(),
            input: InputBundle::new(),
            result: ResultBundle::new(),
            state: BatchState::Configured,
        })
    }

    pub fn kernel(&self) -> &Arc<dyn KernelStrategy<T>> {
        &self.kernel
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn parameters(&self) -> &ParameterBundle {
        &self.parameters
    }

    pub fn configure(&mut self, parameters: ParameterBundle) {
        self.parameters = parameters;
        self.invalidate_results();
    }

    pub fn set_input<K: BundleId>(&mut self, id: K, table: impl IntoSharedTable<T>) {
        self.input.set(id, table);
        self.invalidate_results();
    }

    fn invalidate_results(&mut self) {
        self.result.reset();
        if self.state != BatchState::Configured {
            log::trace!("{}: batch back to configured", self.kernel.name());
        }
        self.state = BatchState::Configured;
    }

    /// Run the kernel over the current inputs
    ///
    /// On failure the result bundle stays invalid and every id reports
    /// `MissingArgument`.
    pub fn compute(&mut self) -> Result<()> {
        self.result.invalidate();
        self.state = BatchState::Configured;

        self.kernel.check_input(&self.input, &self.parameters)?;
        let layout = self.kernel.result_layout(&self.input, &self.parameters)?;
        if self.result.layout() != Some(&layout) {
            self.result.reset();
        }
        self.result.allocate(&layout)?;

        if let Err(e) = self
            .kernel
            .compute(&self.input, &self.parameters, &mut self.result)
        {
            self.result.invalidate();
            return Err(e);
        }
        self.result.seal()?;
        self.state = BatchState::Computed;
        log::trace!("{}: batch computed", self.kernel.name());
        Ok(())
    }

    pub fn get_result<K: BundleId>(&self, id: K) -> Result<&DenseTable<T>> {
        self.result.get(id)
    }

    pub fn result(&self) -> &ResultBundle<T> {
        &self.result
    }

    pub fn into_result(self) -> ResultBundle<T> {
        self.result
    }
}
