//! Sufficient statistics shared by the dense and CSR kernels
//!
//! Both kernels reduce a row block to a count, column sums and the cross
//! product centered about the block mean. Blocks and partial results combine
//! through the pairwise update
//!
//! ```text
//! C = Ca + Cb + (na * nb / n) (ma - mb)(ma - mb)^T
//! ```
//!
//! which is associative, so the final matrix does not depend on how the rows
//! were split into increments or nodes.

use crate::params::{CovarianceParams, Estimator, OutputMatrix};
use crate::{CovariancePartial, CovarianceResult, ALGORITHM};
use numkernel_core::{
    Error, MethodId, Numeric, ParameterBundle, PartialResult, ResultBundle,
    ResultLayout, Result,
};

/// Count, column sums and centered cross product of a set of rows
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CrossStats {
    pub(crate) n: u64,
    pub(crate) sum: Vec<f64>,
    /// Row-major `p x p`
    pub(crate) cross: Vec<f64>,
}

impl CrossStats {
    pub(crate) fn empty(p: usize) -> Self {
        Self {
            n: 0,
            sum: vec![0.0; p],
            cross: vec![0.0; p * p],
        }
    }

    pub(crate) fn features(&self) -> usize {
        self.sum.len()
    }

    /// Fold `other` into `self`
    pub(crate) fn merge(&mut self, other: &Self) {
        if other.n == 0 {
            return;
        }
        if self.n == 0 {
            self.clone_from(other);
            return;
        }
        let na = self.n as f64;
        let nb = other.n as f64;
        let n = na + nb;
        let p = self.features();
        let delta: Vec<f64> = self
            .sum
            .iter()
            .zip(&other.sum)
            .map(|(sa, sb)| sb / nb - sa / na)
            .collect();
        let weight = na * nb / n;
        for i in 0..p {
            for j in 0..p {
                let k = i * p + j;
                self.cross[k] += other.cross[k] + weight * delta[i] * delta[j];
            }
        }
        for (a, b) in self.sum.iter_mut().zip(&other.sum) {
            *a += b;
        }
        self.n += other.n;
    }

    pub(crate) fn merged(mut self, other: Self) -> Self {
        self.merge(&other);
        self
    }

    pub(crate) fn load<T: Numeric>(partial: &PartialResult<T>) -> Result<Self> {
        let sum = partial.table(CovariancePartial::Sum)?.to_f64_vec();
        let cross = partial.table(CovariancePartial::CrossProduct)?.to_f64_vec();
        let p = sum.len();
        if cross.len() != p * p {
            return Err(Error::size_mismatch(p * p, cross.len(), "cross product"));
        }
        Ok(Self {
            n: partial.n_observations(),
            sum,
            cross,
        })
    }

    pub(crate) fn store<T: Numeric>(&self, partial: &mut PartialResult<T>) -> Result<()> {
        partial
            .table_mut(CovariancePartial::Sum)?
            .assign_f64(&self.sum)?;
        partial
            .table_mut(CovariancePartial::CrossProduct)?
            .assign_f64(&self.cross)?;
        partial.set_n_observations(self.n);
        Ok(())
    }

    /// Write the covariance (or correlation) matrix and the mean
    pub(crate) fn finalize<T: Numeric>(
        &self,
        params: &CovarianceParams,
        result: &mut ResultBundle<T>,
    ) -> Result<()> {
        if self.n == 0 {
            return Err(Error::InsufficientData {
                expected: 1,
                actual: 0,
            });
        }
        let n = self.n as f64;

        let matrix = match params.output_matrix {
            OutputMatrix::Covariance => {
                let divisor = match params.estimator {
                    Estimator::Unbiased if self.n < 2 => {
                        return Err(Error::NumericalDegeneracy(
                            "unbiased covariance needs at least 2 observations".to_string(),
                        ))
                    }
                    Estimator::Unbiased => n - 1.0,
                    Estimator::Biased => n,
                };
                self.cross.iter().map(|c| c / divisor).collect::<Vec<_>>()
            }
            OutputMatrix::Correlation => self.correlation()?,
        };
        let mean: Vec<f64> = self.sum.iter().map(|s| s / n).collect();

        result
            .table_mut(CovarianceResult::Covariance)?
            .assign_f64(&matrix)?;
        result.table_mut(CovarianceResult::Mean)?.assign_f64(&mean)?;
        Ok(())
    }

    fn correlation(&self) -> Result<Vec<f64>> {
        let p = self.features();
        let std: Vec<f64> = (0..p)
            .map(|i| {
                let var = self.cross[i * p + i];
                if var > 0.0 && var.is_finite() {
                    Ok(var.sqrt())
                } else {
                    Err(Error::NumericalDegeneracy(format!(
                        "feature {i} has zero variance, correlation is undefined"
                    )))
                }
            })
            .collect::<Result<_>>()?;

        let mut corr = vec![0.0; p * p];
        for i in 0..p {
            for j in 0..p {
                corr[i * p + j] = if i == j {
                    1.0
                } else {
                    self.cross[i * p + j] / (std[i] * std[j])
                };
            }
        }
        Ok(corr)
    }
}

pub(crate) fn layout(p: usize) -> ResultLayout {
    ResultLayout::new()
        .with(CovarianceResult::Covariance, p, p)
        .with(CovarianceResult::Mean, 1, p)
}

pub(crate) fn init_partial<T: Numeric>(method: MethodId, p: usize) -> Result<PartialResult<T>> {
    PartialResult::new(ALGORITHM, method)
        .with_table(CovariancePartial::Sum, 1, p)?
        .with_table(CovariancePartial::CrossProduct, p, p)
}

/// Feature count recorded in a covariance partial result
pub(crate) fn partial_features<T: Numeric>(partial: &PartialResult<T>) -> Result<usize> {
    Ok(partial.table(CovariancePartial::Sum)?.cols())
}

/// Fold block statistics into a partial result
pub(crate) fn accumulate<T: Numeric>(partial: &mut PartialResult<T>, block: &CrossStats) -> Result<()> {
    let p = partial_features(partial)?;
    if p != block.features() {
        return Err(Error::size_mismatch(p, block.features(), "covariance features"));
    }
    let mut acc = CrossStats::load(partial)?;
    acc.merge(block);
    acc.store(partial)
}

pub(crate) fn merge_partials<T: Numeric>(
    into: &mut PartialResult<T>,
    other: &PartialResult<T>,
) -> Result<()> {
    let other = CrossStats::load(other)?;
    accumulate(into, &other)
}

pub(crate) fn finalize_partial<T: Numeric>(
    partial: &PartialResult<T>,
    params: &ParameterBundle,
    result: &mut ResultBundle<T>,
) -> Result<()> {
    let params = CovarianceParams::from_bundle(params)?;
    CrossStats::load(partial)?.finalize(&params, result)
}
