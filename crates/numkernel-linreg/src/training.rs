//! Normal-equations training
//!
//! Each block contributes `X'X` and `X'Y` for the design matrix `X = [1 | data]`.
//! Both are plain sums, so increments and distributed partials merge by
//! addition. Finalization solves `X'X B = X'Y` with a Cholesky factorization;
//! without an intercept the leading row and column are dropped first.

use crate::params::LinearRegressionParams;
use crate::{method, TrainingInput, TrainingPartial, TrainingResult, TRAINING};
use nalgebra::DMatrix;
use numkernel_core::execution::{chunk_rows, fold_row_chunks, ExecutionStrategy};
use numkernel_core::kernel::require_rows;
use numkernel_core::prelude::*;
use numkernel_core::table::RowBlock;
use std::marker::PhantomData;
use tracing::{debug, instrument};

/// Cross products of the augmented design matrix with itself and the responses
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NormalStats {
    pub(crate) n: u64,
    /// `q x q`, `q = features + 1`
    pub(crate) xtx: Vec<f64>,
    /// `q x k`
    pub(crate) xty: Vec<f64>,
    pub(crate) q: usize,
    pub(crate) k: usize,
}

impl NormalStats {
    pub(crate) fn empty(q: usize, k: usize) -> Self {
        Self {
            n: 0,
            xtx: vec![0.0; q * q],
            xty: vec![0.0; q * k],
            q,
            k,
        }
    }

    pub(crate) fn of_block<T: Numeric, P: ComputePrimitives<T>>(
        primitives: &P,
        x: RowBlock<'_, T>,
        y: RowBlock<'_, T>,
    ) -> Self {
        let n = x.rows();
        let q = x.cols() + 1;
        let k = y.cols();
        let mut stats = Self::empty(q, k);
        if n == 0 {
            return stats;
        }
        stats.n = n as u64;

        let mut design = vec![T::one(); q * n];
        for (i, row) in x.iter_rows().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                design[(j + 1) * n + i] = v;
            }
        }
        let mut responses = vec![T::zero(); k * n];
        for (i, row) in y.iter_rows().enumerate() {
            for (c, &v) in row.iter().enumerate() {
                responses[c * n + i] = v;
            }
        }

        for a in 0..q {
            let ca = &design[a * n..(a + 1) * n];
            for b in a..q {
                let v = primitives.dot_product(ca, &design[b * n..(b + 1) * n]);
                stats.xtx[a * q + b] = v;
                stats.xtx[b * q + a] = v;
            }
            for c in 0..k {
                stats.xty[a * k + c] = primitives.dot_product(ca, &responses[c * n..(c + 1) * n]);
            }
        }
        stats
    }

    /// Fail unless `other` has the same design width and response count
    pub(crate) fn check_shape(&self, other: &Self) -> Result<()> {
        if self.q != other.q {
            return Err(Error::size_mismatch(self.q, other.q, "normal equations design columns"));
        }
        if self.k != other.k {
            return Err(Error::size_mismatch(self.k, other.k, "normal equations responses"));
        }
        Ok(())
    }

    /// Add `other`'s cross products; shapes must agree (see [`check_shape`](Self::check_shape))
    pub(crate) fn merge(&mut self, other: &Self) {
        for (a, b) in self.xtx.iter_mut().zip(&other.xtx) {
            *a += b;
        }
        for (a, b) in self.xty.iter_mut().zip(&other.xty) {
            *a += b;
        }
        self.n += other.n;
    }

    fn merged(mut self, other: Self) -> Self {
        self.merge(&other);
        self
    }

    fn load<T: Numeric>(partial: &PartialResult<T>) -> Result<Self> {
        let xtx = partial.table(TrainingPartial::XtX)?;
        let xty = partial.table(TrainingPartial::XtY)?;
        if xtx.rows() != xtx.cols() || xty.rows() != xtx.rows() {
            return Err(Error::size_mismatch(xtx.rows(), xty.rows(), "normal equations"));
        }
        Ok(Self {
            n: partial.n_observations(),
            xtx: xtx.to_f64_vec(),
            xty: xty.to_f64_vec(),
            q: xtx.rows(),
            k: xty.cols(),
        })
    }

    fn store<T: Numeric>(&self, partial: &mut PartialResult<T>) -> Result<()> {
        partial.table_mut(TrainingPartial::XtX)?.assign_f64(&self.xtx)?;
        partial.table_mut(TrainingPartial::XtY)?.assign_f64(&self.xty)?;
        partial.set_n_observations(self.n);
        Ok(())
    }

    /// Solve for `Beta`, row-major `k x q` with the intercept in column 0
    pub(crate) fn solve(&self, intercept: bool) -> Result<Vec<f64>> {
        let (q, k) = (self.q, self.k);
        let skip = usize::from(!intercept);
        let m = q - skip;

        let a = DMatrix::from_fn(m, m, |i, j| self.xtx[(i + skip) * q + j + skip]);
        let b = DMatrix::from_fn(m, k, |i, c| self.xty[(i + skip) * k + c]);
        let cholesky = a.cholesky().ok_or_else(|| {
            Error::NumericalDegeneracy(format!(
                "X'X ({m}x{m}) is not positive definite after {} observations",
                self.n
            ))
        })?;
        let solution = cholesky.solve(&b);
        if solution.iter().any(|v| !v.is_finite()) {
            return Err(Error::non_finite("regression coefficients"));
        }

        let mut beta = vec![0.0; k * q];
        for c in 0..k {
            for i in 0..m {
                beta[c * q + i + skip] = solution[(i, c)];
            }
        }
        Ok(beta)
    }

    fn finalize<T: Numeric>(&self, params: &ParameterBundle, result: &mut ResultBundle<T>) -> Result<()> {
        let params = LinearRegressionParams::from_bundle(params)?;
        debug!(
            "solving {}x{} normal equations for {} responses, intercept {}",
            self.q, self.q, self.k, params.intercept
        );
        let beta = self.solve(params.intercept)?;
        result.table_mut(TrainingResult::Beta)?.assign_f64(&beta)
    }
}

fn beta_layout(q: usize, k: usize) -> ResultLayout {
    ResultLayout::new().with(TrainingResult::Beta, k, q)
}

/// Linear regression training through the normal equations
#[derive(Debug, Clone)]
pub struct NormEqTraining<T: Numeric, P: ComputePrimitives<T>> {
    primitives: P,
    cpu: CpuType,
    strategy: ExecutionStrategy,
    _phantom: PhantomData<T>,
}

impl<T: Numeric, P: ComputePrimitives<T>> NormEqTraining<T, P> {
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

    fn input_stats(&self, input: &InputBundle<T>) -> Result<NormalStats> {
        let x = input.get(TrainingInput::Data)?;
        let y = input.get(TrainingInput::Dependent)?;
        let rows = x.rows();
        let folded = fold_row_chunks(
            self.strategy,
            rows,
            chunk_rows(rows),
            |range| {
                Ok(NormalStats::of_block(
                    &self.primitives,
                    x.block(range.clone())?,
                    y.block(range)?,
                ))
            },
            |a, b| Ok(a.merged(b)),
        )?;
        Ok(folded.unwrap_or_else(|| NormalStats::empty(x.cols() + 1, y.cols())))
    }
}

impl<T: Numeric, P: ComputePrimitives<T>> KernelStrategy<T> for NormEqTraining<T, P> {
    fn name(&self) -> &'static str {
        "linear-regression/train/normeq"
    }

    fn algorithm(&self) -> AlgorithmId {
        TRAINING
    }

    fn method(&self) -> MethodId {
        method::NORM_EQ
    }

    fn cpu(&self) -> CpuType {
        self.cpu
    }

    fn supports(&self, _mode: ComputeMode) -> bool {
        true
    }

    fn check_input(&self, input: &InputBundle<T>, params: &ParameterBundle) -> Result<()> {
        let x = input.get(TrainingInput::Data)?;
        let y = input.get(TrainingInput::Dependent)?;
        require_rows(x.rows(), 1)?;
        if y.rows() != x.rows() {
            return Err(Error::size_mismatch(x.rows(), y.rows(), "dependent rows"));
        }
        LinearRegressionParams::from_bundle(params)?;
        Ok(())
    }

    fn result_layout(&self, input: &InputBundle<T>, _params: &ParameterBundle) -> Result<ResultLayout> {
        Ok(beta_layout(
            input.get(TrainingInput::Data)?.cols() + 1,
            input.get(TrainingInput::Dependent)?.cols(),
        ))
    }

    #[instrument(skip_all, fields(backend = self.primitives.backend_name()))]
    fn compute(
        &self,
        input: &InputBundle<T>,
        params: &ParameterBundle,
        result: &mut ResultBundle<T>,
    ) -> Result<()> {
        self.input_stats(input)?.finalize(params, result)
    }

    fn init_partial(&self, input: &InputBundle<T>, _params: &ParameterBundle) -> Result<PartialResult<T>> {
        let q = input.get(TrainingInput::Data)?.cols() + 1;
        let k = input.get(TrainingInput::Dependent)?.cols();
        PartialResult::new(TRAINING, method::NORM_EQ)
            .with_table(TrainingPartial::XtX, q, q)?
            .with_table(TrainingPartial::XtY, q, k)
    }

    fn compute_partial(
        &self,
        input: &InputBundle<T>,
        _params: &ParameterBundle,
        partial: &mut PartialResult<T>,
    ) -> Result<()> {
        let block = self.input_stats(input)?;
        let mut acc = NormalStats::load(partial)?;
        acc.check_shape(&block)?;
        acc.merge(&block);
        acc.store(partial)
    }

    fn finalize_layout(&self, partial: &PartialResult<T>, _params: &ParameterBundle) -> Result<ResultLayout> {
        let xty = partial.table(TrainingPartial::XtY)?;
        Ok(beta_layout(xty.rows(), xty.cols()))
    }

    #[instrument(skip_all)]
    fn finalize(
        &self,
        partial: &PartialResult<T>,
        params: &ParameterBundle,
        result: &mut ResultBundle<T>,
    ) -> Result<()> {
        NormalStats::load(partial)?.finalize(params, result)
    }

    fn merge(
        &self,
        into: &mut PartialResult<T>,
        other: &PartialResult<T>,
        _params: &ParameterBundle,
    ) -> Result<()> {
        let mut acc = NormalStats::load(into)?;
        let other = NormalStats::load(other)?;
        acc.check_shape(&other)?;
        acc.merge(&other);
        acc.store(into)
    }
}
