//! Dense covariance kernel
//!
//! Row blocks are transposed into a column-major scratch buffer and centered
//! about the block mean; the cross product is then a set of column dot
//! products on the backend's primitives. CSR inputs are accepted through the
//! table's cached dense view.

use crate::stats::{self, CrossStats};
use crate::{method, params::CovarianceParams, CovarianceInput};
use numkernel_core::execution::{chunk_rows, fold_row_chunks, ExecutionStrategy};
use numkernel_core::kernel::require_rows;
use numkernel_core::prelude::*;
use numkernel_core::table::RowBlock;
use std::marker::PhantomData;
use tracing::{debug, instrument};

/// Centered statistics of one row block
pub(crate) fn block_stats<T: Numeric, P: ComputePrimitives<T>>(
    primitives: &P,
    block: RowBlock<'_, T>,
) -> CrossStats {
    let n = block.rows();
    let p = block.cols();
    let mut stats = CrossStats::empty(p);
    if n == 0 {
        return stats;
    }
    stats.n = n as u64;

    let mut columns = vec![T::zero(); n * p];
    for (i, row) in block.iter_rows().enumerate() {
        for (j, &x) in row.iter().enumerate() {
            columns[j * n + i] = x;
        }
    }

    for (j, column) in columns.chunks_exact_mut(n).enumerate() {
        let sum = primitives.sum(column);
        stats.sum[j] = sum;
        let mean = sum / n as f64;
        for x in column.iter_mut() {
            *x = T::from_f64(x.as_f64() - mean);
        }
    }

    for i in 0..p {
        let ci = &columns[i * n..(i + 1) * n];
        for j in i..p {
            let cj = &columns[j * n..(j + 1) * n];
            let c = primitives.dot_product(ci, cj);
            stats.cross[i * p + j] = c;
            stats.cross[j * p + i] = c;
        }
    }
    stats
}

/// Covariance over dense row-major data
#[derive(Debug, Clone)]
pub struct DenseCovariance<T: Numeric, P: ComputePrimitives<T>> {
    primitives: P,
    cpu: CpuType,
    strategy: ExecutionStrategy,
    _phantom: PhantomData<T>,
}

impl<T: Numeric, P: ComputePrimitives<T>> DenseCovariance<T, P> {
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

    fn table_stats(&self, data: &NumericTable<T>) -> Result<CrossStats> {
        let rows = data.rows();
        let folded = fold_row_chunks(
            self.strategy,
            rows,
            chunk_rows(rows),
            |range| Ok(block_stats(&self.primitives, data.block(range)?)),
            |a, b| Ok(a.merged(b)),
        )?;
        Ok(folded.unwrap_or_else(|| CrossStats::empty(data.cols())))
    }
}

impl<T: Numeric, P: ComputePrimitives<T>> KernelStrategy<T> for DenseCovariance<T, P> {
    fn name(&self) -> &'static str {
        "covariance/dense"
    }

    fn algorithm(&self) -> AlgorithmId {
        crate::ALGORITHM
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

    fn check_input(&self, input: &InputBundle<T>, params: &ParameterBundle) -> Result<()> {
        let data = input.get(CovarianceInput::Data)?;
        require_rows(data.rows(), 1)?;
        CovarianceParams::from_bundle(params)?;
        Ok(())
    }

    fn result_layout(&self, input: &InputBundle<T>, _params: &ParameterBundle) -> Result<ResultLayout> {
        Ok(stats::layout(input.get(CovarianceInput::Data)?.cols()))
    }

    #[instrument(skip_all, fields(backend = self.primitives.backend_name()))]
    fn compute(
        &self,
        input: &InputBundle<T>,
        params: &ParameterBundle,
        result: &mut ResultBundle<T>,
    ) -> Result<()> {
        let params = CovarianceParams::from_bundle(params)?;
        let data = input.get(CovarianceInput::Data)?;
        debug!("covariance over {}x{} {} table", data.rows(), data.cols(), data.layout());
        self.table_stats(data)?.finalize(&params, result)
    }

    fn init_partial(&self, input: &InputBundle<T>, _params: &ParameterBundle) -> Result<PartialResult<T>> {
        stats::init_partial(method::DENSE, input.get(CovarianceInput::Data)?.cols())
    }

    fn compute_partial(
        &self,
        input: &InputBundle<T>,
        _params: &ParameterBundle,
        partial: &mut PartialResult<T>,
    ) -> Result<()> {
        let data = input.get(CovarianceInput::Data)?;
        let block = self.table_stats(data)?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use numkernel_core::ScalarBackend;

    #[test]
    fn test_block_stats_centered() {
        let table: NumericTable<f64> =
            DenseTable::from_rows(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0], [7.0, 8.0]])
                .unwrap()
                .into();
        let stats = block_stats(&ScalarBackend::new(), table.block(0..4).unwrap());
        assert_eq!(stats.n, 4);
        assert_eq!(stats.sum, vec![16.0, 20.0]);
        for c in &stats.cross {
            assert_relative_eq!(*c, 20.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_chunked_fold_matches_single_block() {
        let rows: Vec<[f64; 3]> = (0..50)
            .map(|i| {
                let x = i as f64;
                [x, (x * 0.7).sin(), x * x * 0.01]
            })
            .collect();
        let table: NumericTable<f64> = DenseTable::from_rows(&rows).unwrap().into();
        let kernel = DenseCovariance::<f64, _>::new(ScalarBackend::new(), CpuType::Baseline)
            .with_strategy(ExecutionStrategy::Sequential);
        let whole = kernel.table_stats(&table).unwrap();

        let mut chunked = CrossStats::empty(3);
        for range in [0..7, 7..30, 30..50] {
            chunked.merge(&block_stats(&ScalarBackend::new(), table.block(range).unwrap()));
        }
        assert_eq!(whole.n, chunked.n);
        for (a, b) in whole.cross.iter().zip(&chunked.cross) {
            assert_relative_eq!(*a, *b, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_f32_accumulates_in_f64() {
        let table: NumericTable<f32> =
            DenseTable::from_rows(&[[1.0f32, 2.0], [3.0, 4.0]]).unwrap().into();
        let stats = block_stats(&ScalarBackend::new(), table.block(0..2).unwrap());
        assert_eq!(stats.sum, vec![4.0, 6.0]);
        assert_relative_eq!(stats.cross[1], 2.0);
    }
}
