//! Dense low-order moments kernel

use crate::stats::{self, MomentStats};
use crate::{method, MomentsInput, ALGORITHM};
use numkernel_core::execution::{chunk_rows, fold_row_chunks, ExecutionStrategy};
use numkernel_core::kernel::require_rows;
use numkernel_core::prelude::*;
use std::marker::PhantomData;
use tracing::{debug, instrument};

/// Minimum, maximum, sums and the derived moments of every feature
///
/// CSR inputs are read through the table's cached dense view.
#[derive(Debug, Clone)]
pub struct DenseMoments<T: Numeric, P: ComputePrimitives<T>> {
    primitives: P,
    cpu: CpuType,
    strategy: ExecutionStrategy,
    _phantom: PhantomData<T>,
}

impl<T: Numeric, P: ComputePrimitives<T>> DenseMoments<T, P> {
    pub fn new(primitives: P, cpu: CpuType) -> Self {
        Self {
            primitives,
            cpu,
            strategy: ExecutionStrategy::default(),
            _phantom: PhantomData,
        }
    }

    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    fn table_stats(&self, data: &NumericTable<T>) -> Result<MomentStats> {
        let rows = data.rows();
        let folded = fold_row_chunks(
            self.strategy,
            rows,
            chunk_rows(rows),
            |range| Ok(MomentStats::of_block(&self.primitives, data.block(range)?)),
            |a, b| Ok(a.merged(b)),
        )?;
        Ok(folded.unwrap_or_else(|| MomentStats::empty(data.cols())))
    }
}

impl<T: Numeric, P: ComputePrimitives<T>> KernelStrategy<T> for DenseMoments<T, P> {
    fn name(&self) -> &'static str {
        "moments/dense"
    }

    fn algorithm(&self) -> AlgorithmId {
        ALGORITHM
    }

    fn method(&self) -> MethodId {
        method::DENSE
    }

    fn cpu(&self) -> CpuType {
        self.cpu
    }

    fn supports(&self, _mode: ComputeMode) -> bool {
        true
    }

    fn check_input(&self, input: &InputBundle<T>, _params: &ParameterBundle) -> Result<()> {
        require_rows(input.get(MomentsInput::Data)?.rows(), 1)
    }

    fn result_layout(&self, input: &InputBundle<T>, _params: &ParameterBundle) -> Result<ResultLayout> {
        Ok(stats::layout(input.get(MomentsInput::Data)?.cols()))
    }

    #[instrument(skip_all, fields(backend = self.primitives.backend_name()))]
    fn compute(
        &self,
        input: &InputBundle<T>,
        _params: &ParameterBundle,
        result: &mut ResultBundle<T>,
    ) -> Result<()> {
        let data = input.get(MomentsInput::Data)?;
        debug!("moments over {}x{} {} table", data.rows(), data.cols(), data.layout());
        self.table_stats(data)?.finalize(result)
    }

    fn init_partial(&self, input: &InputBundle<T>, _params: &ParameterBundle) -> Result<PartialResult<T>> {
        stats::init_partial(method::DENSE, input.get(MomentsInput::Data)?.cols())
    }

    fn compute_partial(
        &self,
        input: &InputBundle<T>,
        _params: &ParameterBundle,
        partial: &mut PartialResult<T>,
    ) -> Result<()> {
        let block = self.table_stats(input.get(MomentsInput::Data)?)?;
        let mut acc = MomentStats::load(partial)?;
        acc.check_features(&block)?;
        acc.merge(&block);
        acc.store(partial)
    }

    fn finalize_layout(&self, partial: &PartialResult<T>, _params: &ParameterBundle) -> Result<ResultLayout> {
        Ok(stats::layout(stats::partial_features(partial)?))
    }

    fn finalize(
        &self,
        partial: &PartialResult<T>,
        _params: &ParameterBundle,
        result: &mut ResultBundle<T>,
    ) -> Result<()> {
        MomentStats::load(partial)?.finalize(result)
    }

    fn merge(
        &self,
        into: &mut PartialResult<T>,
        other: &PartialResult<T>,
        _params: &ParameterBundle,
    ) -> Result<()> {
        let mut acc = MomentStats::load(into)?;
        let other = MomentStats::load(other)?;
        acc.check_features(&other)?;
        acc.merge(&other);
        acc.store(into)
    }
}
