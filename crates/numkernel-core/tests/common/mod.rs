//! Shared utilities for integration tests

#![allow(dead_code)]

use numkernel_core::prelude::*;
use std::sync::Arc;

pub use approx::assert_relative_eq;

pub const ALGORITHM: AlgorithmId = AlgorithmId(900);
pub const METHOD: MethodId = MethodId(0);

numkernel_core::bundle_ids! {
    pub enum TotalsInput {
        Data = 0 => "data",
    }
}

numkernel_core::bundle_ids! {
    pub enum TotalsResult {
        Total = 0 => "total",
        Count = 1 => "count",
    }
}

numkernel_core::bundle_ids! {
    pub enum TotalsPartial {
        Sum = 0 => "sum",
    }
}

/// Column totals over every folded row
///
/// Rows holding NaN are rejected so tests can drive the failure paths.
pub struct Totals {
    pub policy: FinalizePolicy,
}

impl Totals {
    pub fn shared(policy: FinalizePolicy) -> Arc<dyn KernelStrategy<f64>> {
        Arc::new(Self { policy })
    }

    fn fold(data: &NumericTable<f64>, sums: &mut [f64]) -> Result<()> {
        let block = data.block(0..data.rows())?;
        for row in block.iter_rows() {
            if row.iter().any(|x| x.is_nan()) {
                return Err(Error::non_finite("totals input"));
            }
            for (s, x) in sums.iter_mut().zip(row) {
                *s += x;
            }
        }
        Ok(())
    }
}

impl KernelStrategy<f64> for Totals {
    fn name(&self) -> &'static str {
        "totals"
    }

    fn algorithm(&self) -> AlgorithmId {
        ALGORITHM
    }

    fn method(&self) -> MethodId {
        METHOD
    }

    fn cpu(&self) -> CpuType {
        CpuType::Baseline
    }

    fn supports(&self, _mode: ComputeMode) -> bool {
        true
    }

    fn finalize_policy(&self) -> FinalizePolicy {
        self.policy
    }

    fn check_input(&self, input: &InputBundle<f64>, _: &ParameterBundle) -> Result<()> {
        let data = input.get(TotalsInput::Data)?;
        numkernel_core::kernel::require_rows(data.rows(), 1)
    }

    fn result_layout(&self, input: &InputBundle<f64>, _: &ParameterBundle) -> Result<ResultLayout> {
        let cols = input.get(TotalsInput::Data)?.cols();
        Ok(ResultLayout::new()
            .with(TotalsResult::Total, 1, cols)
            .with(TotalsResult::Count, 1, 1))
    }

    fn compute(
        &self,
        input: &InputBundle<f64>,
        _: &ParameterBundle,
        result: &mut ResultBundle<f64>,
    ) -> Result<()> {
        let data = input.get(TotalsInput::Data)?;
        let mut sums = vec![0.0; data.cols()];
        Self::fold(data, &mut sums)?;
        result.table_mut(TotalsResult::Total)?.assign_f64(&sums)?;
        result
            .table_mut(TotalsResult::Count)?
            .set(0, 0, data.rows() as f64);
        Ok(())
    }

    fn init_partial(
        &self,
        input: &InputBundle<f64>,
        _: &ParameterBundle,
    ) -> Result<PartialResult<f64>> {
        let cols = input.get(TotalsInput::Data)?.cols();
        PartialResult::new(ALGORITHM, METHOD).with_table(TotalsPartial::Sum, 1, cols)
    }

    fn compute_partial(
        &self,
        input: &InputBundle<f64>,
        _: &ParameterBundle,
        partial: &mut PartialResult<f64>,
    ) -> Result<()> {
        let data = input.get(TotalsInput::Data)?;
        let sums = partial.table_mut(TotalsPartial::Sum)?;
        if sums.cols() != data.cols() {
            return Err(Error::size_mismatch(sums.cols(), data.cols(), "feature count"));
        }
        Self::fold(data, sums.as_mut_slice())?;
        partial.add_observations(data.rows() as u64);
        Ok(())
    }

    fn finalize_layout(
        &self,
        partial: &PartialResult<f64>,
        _: &ParameterBundle,
    ) -> Result<ResultLayout> {
        let cols = partial.table(TotalsPartial::Sum)?.cols();
        Ok(ResultLayout::new()
            .with(TotalsResult::Total, 1, cols)
            .with(TotalsResult::Count, 1, 1))
    }

    fn finalize(
        &self,
        partial: &PartialResult<f64>,
        _: &ParameterBundle,
        result: &mut ResultBundle<f64>,
    ) -> Result<()> {
        let sums = partial.table(TotalsPartial::Sum)?.as_slice().to_vec();
        result.table_mut(TotalsResult::Total)?.assign_f64(&sums)?;
        result
            .table_mut(TotalsResult::Count)?
            .set(0, 0, partial.n_observations() as f64);
        Ok(())
    }

    fn merge(
        &self,
        into: &mut PartialResult<f64>,
        other: &PartialResult<f64>,
        _: &ParameterBundle,
    ) -> Result<()> {
        let src = other.table(TotalsPartial::Sum)?.as_slice();
        for (a, b) in into
            .table_mut(TotalsPartial::Sum)?
            .as_mut_slice()
            .iter_mut()
            .zip(src)
        {
            *a += b;
        }
        into.add_observations(other.n_observations());
        Ok(())
    }
}

pub fn table(rows: &[[f64; 2]]) -> DenseTable<f64> {
    DenseTable::from_rows(rows).unwrap()
}
