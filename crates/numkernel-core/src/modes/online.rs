//! Incremental online mode

use super::{finalize_into, require_mode, Accumulator};
use crate::bundle::{BundleId, ParameterBundle, PartialResult, ResultBundle};
use crate::error::{Error, Result};
use crate::kernel::{ComputeMode, FinalizePolicy, KernelStrategy};
use crate::numeric::Numeric;
use crate::table::{DenseTable, IntoSharedTable};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnlineState {
    Configured,
    Accumulating,
    Finalized,
}

/// Online execution of one kernel
///
/// Each `compute` folds the current input into the partial result. A failed
/// increment leaves the partial at its last good state.
pub struct Online<T: Numeric> {
    accumulator: Accumulator<T>,
    result: ResultBundle<T>,
    state: OnlineState,
}

impl<T: Numeric> Online<T> {
    pub fn new(kernel: Arc<dyn KernelStrategy<T>>) -> Result<Self> {
        require_mode(&kernel, ComputeMode::Online)?;
        Ok(Self {
            accumulator: Accumulator::new(kernel),
            result: ResultBundle::new(),
            state: OnlineState::Configured,
        })
    }

    pub fn kernel(&self) -> &Arc<dyn KernelStrategy<T>> {
        self.accumulator.kernel()
    }

    pub fn state(&self) -> OnlineState {
        self.state
    }

    pub fn parameters(&self) -> &ParameterBundle {
        self.accumulator.parameters()
    }

    /// Set parameters, discarding any accumulated state
    pub fn configure(&mut self, parameters: ParameterBundle) {
        self.accumulator.configure(parameters);
        self.result.reset();
        self.transition(OnlineState::Configured);
    }

    /// Input block for the next increment
    pub fn set_input<K: BundleId>(&mut self, id: K, table: impl IntoSharedTable<T>) {
        self.accumulator.set_input(id, table);
    }

    /// Fold the current input block into the partial result
    pub fn compute(&mut self) -> Result<()> {
        self.accumulator.compute()?;
        self.transition(OnlineState::Accumulating);
        Ok(())
    }

    /// Produce results from everything folded in so far
    ///
    /// Fails with [`Error::EmptyComputation`] before the first increment and
    /// with [`Error::InvalidState`] when called again without a new increment.
    pub fn finalize_compute(&mut self) -> Result<()> {
        if self.state == OnlineState::Finalized {
            return Err(Error::InvalidState {
                operation: "finalize",
                state: "finalized",
            });
        }
        let partial = self.accumulator.filled().ok_or_else(|| {
            Error::EmptyComputation(format!(
                "{}: no increments were folded in",
                self.accumulator.kernel().name()
            ))
        })?;
        finalize_into(
            self.accumulator.kernel(),
            partial,
            self.accumulator.parameters(),
            &mut self.result,
        )?;
        if self.accumulator.kernel().finalize_policy() == FinalizePolicy::Consume {
            self.accumulator.reset();
        }
        self.transition(OnlineState::Finalized);
        Ok(())
    }

    /// Accumulated sufficient statistics, if any
    pub fn partial_result(&self) -> Option<&PartialResult<T>> {
        self.accumulator.partial()
    }

    /// Resume from a previously saved partial result
    pub fn set_partial_result(&mut self, partial: PartialResult<T>) -> Result<()> {
        self.accumulator.set_partial(partial)?;
        self.transition(OnlineState::Accumulating);
        Ok(())
    }

    /// Drop accumulated state and results, keeping parameters
    pub fn reset(&mut self) {
        self.accumulator.reset();
        self.result.reset();
        self.transition(OnlineState::Configured);
    }

    pub fn get_result<K: BundleId>(&self, id: K) -> Result<&DenseTable<T>> {
        self.result.get(id)
    }

    pub fn result(&self) -> &ResultBundle<T> {
        &self.result
    }

    fn transition(&mut self, next: OnlineState) {
        if self.state != next {
            log::trace!(
                "{}: online {:?} -> {:?}",
                self.accumulator.kernel().name(),
                self.state,
                next
            );
        }
        self.state = next;
    }
}
