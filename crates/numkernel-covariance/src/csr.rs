//! Sparse covariance kernel
//!
//! Accumulates raw column sums and the raw cross product over the stored
//! non-zeros only, then centers once per block:
//! `C[a][b] = S[a][b] - sum[a] * sum[b] / n`.

use crate::stats::{self, CrossStats};
use crate::{method, params::CovarianceParams, CovarianceInput};
use numkernel_core::execution::{chunk_rows, fold_row_chunks, ExecutionStrategy};
use numkernel_core::kernel::require_rows;
use numkernel_core::prelude::*;
use std::marker::PhantomData;
use std::ops::Range;
use tracing::{debug, instrument};

fn csr_block_stats<T: Numeric>(table: &CsrTable<T>, rows: Range<usize>) -> CrossStats {
    let p = table.cols();
    let mut stats = CrossStats::empty(p);
    stats.n = rows.len() as u64;
    if rows.is_empty() {
        return stats;
    }

    for i in rows {
        let (cols, values) = table.row(i);
        for (ka, (&a, &xa)) in cols.iter().zip(values).enumerate() {
            let xa = xa.as_f64();
            stats.sum[a] += xa;
            for (&b, &xb) in cols[ka..].iter().zip(&values[ka..]) {
                stats.cross[a * p + b] += xa * xb.as_f64();
            }
        }
    }

    let n = stats.n as f64;
    for a in 0..p {
        for b in a..p {
            let centered = stats.cross[a * p + b] - stats.sum[a] * stats.sum[b] / n;
            stats.cross[a * p + b] = centered;
            stats.cross[b * p + a] = centered;
        }
    }
    stats
}

/// Covariance over compressed sparse rows
///
/// Baseline only; the sparse loop does not vectorize.
#[derive(Debug, Clone)]
pub struct CsrCovariance<T: Numeric> {
    strategy: ExecutionStrategy,
    _phantom: PhantomData<T>,
}

impl<T: Numeric> Default for CsrCovariance<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Numeric> CsrCovariance<T> {
    pub fn new() -> Self {
        Self {
            strategy: ExecutionStrategy::default(),
            _phantom: PhantomData,
        }
    }

    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    fn table_stats(&self, data: &NumericTable<T>) -> Result<CrossStats> {
        let csr = data.csr()?;
        let rows = csr.rows();
        let folded = fold_row_chunks(
            self.strategy,
            rows,
            chunk_rows(rows),
            |range| Ok(csr_block_stats(csr, range)),
            |a, b| Ok(a.merged(b)),
        )?;
        Ok(folded.unwrap_or_else(|| CrossStats::empty(csr.cols())))
    }
}

impl<T: Numeric> KernelStrategy<T> for CsrCovariance<T> {
    fn name(&self) -> &'static str {
        "covariance/csr"
    }

    fn algorithm(&self) -> AlgorithmId {
        crate::ALGORITHM
    }

    fn method(&self) -> MethodId {
        method::CSR
    }

    fn cpu(&self) -> CpuType {
        CpuType::Baseline
    }

    fn supports(&self, _mode: ComputeMode) -> bool {
        true
    }

    fn check_input(&self, input: &InputBundle<T>, params: &ParameterBundle) -> Result<()> {
        let data = input.get(CovarianceInput::Data)?;
        data.csr()?;
        require_rows(data.rows(), 1)?;
        CovarianceParams::from_bundle(params)?;
        Ok(())
    }

    fn result_layout(&self, input: &InputBundle<T>, _params: &ParameterBundle) -> Result<ResultLayout> {
        Ok(stats::layout(input.get(CovarianceInput::Data)?.cols()))
    }

    #[instrument(skip_all)]
    fn compute(
        &self,
        input: &InputBundle<T>,
        params: &ParameterBundle,
        result: &mut ResultBundle<T>,
    ) -> Result<()> {
        let params = CovarianceParams::from_bundle(params)?;
        let data = input.get(CovarianceInput::Data)?;
        debug!(
            "sparse covariance over {}x{}, {} non-zeros",
            data.rows(),
            data.cols(),
            data.csr()?.nnz()
        );
        self.table_stats(data)?.finalize(&params, result)
    }

    fn init_partial(&self, input: &InputBundle<T>, _params: &ParameterBundle) -> Result<PartialResult<T>> {
        stats::init_partial(method::CSR, input.get(CovarianceInput::Data)?.cols())
    }

    fn compute_partial(
        &self,
        input: &InputBundle<T>,
        _params: &ParameterBundle,
        partial: &mut PartialResult<T>,
    ) -> Result<()> {
        let block = self.table_stats(input.get(CovarianceInput::Data)?)?;
        stats::accumulate(partial, &block)
    }

    fn finalize_layout(&self, partial: &PartialResult<T>, _params: &ParameterBundle) -> Result<ResultLayout> {
        Ok(stats::layout(stats::partial_features(partial)?))
    }

    fn finalize(
        &self,
        partial: &PartialResult<T>,
        params: &ParameterBundle,
        result: &mut ResultBundle<T>,
    ) -> Result<()> {
        stats::finalize_partial(partial, params, result)
    }

    fn merge(
        &self,
        into: &mut PartialResult<T>,
        other: &PartialResult<T>,
        _params: &ParameterBundle,
    ) -> Result<()> {
        stats::merge_partials(into, other)
    }
}
