//! Distributed local and master steps
//!
//! Local nodes run the online accumulation and ship their partial results as
//! opaque byte payloads. The master collects partials from any number of
//! producers, merges them with the kernel's merge arithmetic and finalizes the
//! merged statistics.

use super::{check_partial_origin, finalize_into, require_mode, Accumulator};
use crate::bundle::{BundleId, ParameterBundle, PartialResult, ResultBundle};
use crate::error::{Error, Result};
use crate::kernel::{ComputeMode, FinalizePolicy, KernelStrategy};
use crate::numeric::Numeric;
use crate::serialization;
use crate::table::{DenseTable, IntoSharedTable};
use std::sync::{Arc, Mutex, MutexGuard};

/// Local step: accumulate a partial result over this node's data
pub struct DistributedLocal<T: Numeric> {
    accumulator: Accumulator<T>,
}

impl<T: Numeric> DistributedLocal<T> {
    pub fn new(kernel: Arc<dyn KernelStrategy<T>>) -> Result<Self> {
        require_mode(&kernel, ComputeMode::Distributed)?;
        Ok(Self {
            accumulator: Accumulator::new(kernel),
        })
    }

    pub fn kernel(&self) -> &Arc<dyn KernelStrategy<T>> {
        self.accumulator.kernel()
    }

    pub fn configure(&mut self, parameters: ParameterBundle) {
        self.accumulator.configure(parameters);
    }

    pub fn set_input<K: BundleId>(&mut self, id: K, table: impl IntoSharedTable<T>) {
        self.accumulator.set_input(id, table);
    }

    /// Fold the current input block into the local partial result
    pub fn compute(&mut self) -> Result<()> {
        self.accumulator.compute()
    }

    fn empty(&self) -> Error {
        Error::EmptyComputation(format!(
            "{}: local step has no observations",
            self.accumulator.kernel().name()
        ))
    }

    /// Local partial result, once at least one block was folded in
    pub fn partial_result(&self) -> Result<&PartialResult<T>> {
        self.accumulator.filled().ok_or_else(|| self.empty())
    }

    /// Hand over the partial result and start over
    pub fn take_partial_result(&mut self) -> Result<PartialResult<T>> {
        if self.accumulator.filled().is_none() {
            return Err(self.empty());
        }
        self.accumulator.take().ok_or_else(|| self.empty())
    }

    /// Serialized partial result for transport to the master
    pub fn encode_partial(&self) -> Result<Vec<u8>> {
        Ok(serialization::encode(self.partial_result()?))
    }

    pub fn set_partial_result(&mut self, partial: PartialResult<T>) -> Result<()> {
        self.accumulator.set_partial(partial)
    }

    pub fn reset(&mut self) {
        self.accumulator.reset();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterState {
    Collecting,
    Merged,
    Finalized,
}

struct Inbox<T: Numeric> {
    partials: Vec<PartialResult<T>>,
    received: usize,
    closed: bool,
}

/// Master step: merge partial results from local nodes and finalize
///
/// [`add_input`](Self::add_input) and [`add_serialized`](Self::add_serialized)
/// take `&self` and may be called from several producer threads at once.
pub struct DistributedMaster<T: Numeric> {
    kernel: Arc<dyn KernelStrategy<T>>,
    parameters: ParameterBundle,
    inbox: Mutex<Inbox<T>>,
    expected_inputs: Option<usize>,
    merged: Option<PartialResult<T>>,
    result: ResultBundle<T>,
    state: MasterState,
}

impl<T: Numeric> DistributedMaster<T> {
    pub fn new(kernel: Arc<dyn KernelStrategy<T>>) -> Result<Self> {
        require_mode(&kernel, ComputeMode::Distributed)?;
        Ok(Self {
            kernel,
            parameters: ParameterBundle::default(),
            inbox: Mutex::new(Inbox {
                partials: Vec::new(),
                received: 0,
                closed: false,
            }),
            expected_inputs: None,
            merged: None,
            result: ResultBundle::new(),
            state: MasterState::Collecting,
        })
    }

    /// Refuse to merge until `n` partial results have arrived
    pub fn with_expected_inputs(mut self, n: usize) -> Self {
        self.expected_inputs = Some(n);
        self
    }

    pub fn kernel(&self) -> &Arc<dyn KernelStrategy<T>> {
        &self.kernel
    }

    pub fn state(&self) -> MasterState {
        self.state
    }

    pub fn configure(&mut self, parameters: ParameterBundle) {
        self.parameters = parameters;
        self.result.reset();
    }

    fn lock(&self) -> MutexGuard<'_, Inbox<T>> {
        self.inbox.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue a partial result from a local node
    pub fn add_input(&self, partial: PartialResult<T>) -> Result<()> {
        check_partial_origin(&self.kernel, &partial)?;
        let mut inbox = self.lock();
        if inbox.closed {
            return Err(Error::InvalidState {
                operation: "add input",
                state: "finalized",
            });
        }
        if let Some(reference) = inbox.partials.first().or(self.merged.as_ref()) {
            reference.check_compatible(&partial)?;
        }
        inbox.partials.push(partial);
        inbox.received += 1;
        Ok(())
    }

    /// Decode and queue a serialized partial result
    pub fn add_serialized(&self, bytes: &[u8]) -> Result<()> {
        let partial = serialization::decode_as::<PartialResult<T>>(bytes)?;
        self.add_input(partial)
    }

    /// Partial results queued and not yet merged
    pub fn pending_inputs(&self) -> usize {
        self.lock().partials.len()
    }

    /// Partial results received since the last reset
    pub fn received_inputs(&self) -> usize {
        self.lock().received
    }

    /// Merge every queued partial result
    ///
    /// On failure the queued inputs are kept and the merged state is
    /// unchanged.
    pub fn compute(&mut self) -> Result<()> {
        let inbox = self
            .inbox
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if inbox.closed {
            return Err(Error::InvalidState {
                operation: "merge partial results",
                state: "finalized",
            });
        }
        if let Some(expected) = self.expected_inputs {
            if inbox.received < expected {
                return Err(Error::InvalidState {
                    operation: "merge partial results",
                    state: "waiting for inputs",
                });
            }
        }

        let mut queued = inbox.partials.iter();
        let mut staged = match (&self.merged, queued.next()) {
            (Some(merged), first) => {
                let mut staged = merged.clone();
                if let Some(first) = first {
                    self.kernel.merge(&mut staged, first, &self.parameters)?;
                }
                staged
            }
            (None, Some(first)) => first.clone(),
            (None, None) => {
                return Err(Error::EmptyComputation(format!(
                    "{}: master received no partial results",
                    self.kernel.name()
                )))
            }
        };
        for partial in queued {
            self.kernel.merge(&mut staged, partial, &self.parameters)?;
        }

        log::trace!(
            "{}: merged {} partial results, {} observations",
            self.kernel.name(),
            inbox.partials.len(),
            staged.n_observations()
        );
        inbox.partials.clear();
        self.merged = Some(staged);
        self.state = MasterState::Merged;
        Ok(())
    }

    /// Produce results from the merged partial result
    ///
    /// Queued inputs are merged first. After a successful call the master
    /// accepts no more inputs until [`reset`](Self::reset).
    pub fn finalize_compute(&mut self) -> Result<()> {
        if self.state == MasterState::Finalized {
            return Err(Error::InvalidState {
                operation: "finalize",
                state: "finalized",
            });
        }
        if self.pending_inputs() > 0 || self.merged.is_none() {
            self.compute()?;
        }
        let merged = self
            .merged
            .as_ref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                Error::EmptyComputation(format!(
                    "{}: merged partial result has no observations",
                    self.kernel.name()
                ))
            })?;
        finalize_into(&self.kernel, merged, &self.parameters, &mut self.result)?;

        if self.kernel.finalize_policy() == FinalizePolicy::Consume {
            self.merged = None;
        }
        self.lock().closed = true;
        self.state = MasterState::Finalized;
        log::trace!("{}: master finalized", self.kernel.name());
        Ok(())
    }

    /// Merged statistics so far
    pub fn merged_result(&self) -> Option<&PartialResult<T>> {
        self.merged.as_ref()
    }

    /// Reopen the master for a new round
    pub fn reset(&mut self) {
        let inbox = self
            .inbox
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        inbox.partials.clear();
        inbox.received = 0;
        inbox.closed = false;
        self.merged = None;
        self.result.reset();
        self.state = MasterState::Collecting;
    }

    pub fn get_result<K: BundleId>(&self, id: K) -> Result<&DenseTable<T>> {
        self.result.get(id)
    }

    pub fn result(&self) -> &ResultBundle<T> {
        &self.result
    }
}
