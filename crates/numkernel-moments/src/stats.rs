//! Per-feature moment accumulators

use crate::{MomentsPartial, MomentsResult, ALGORITHM};
use numkernel_core::{
    ComputePrimitives, Error, MethodId, Numeric, PartialResult, ResultBundle, ResultLayout,
    Result,
};
use numkernel_core::table::RowBlock;

/// Running minimum, NaN-skipping
///
/// Only a strictly smaller value replaces the current one, so on ties
/// (including `-0.0` against `0.0`) the value already held wins.
#[inline]
pub(crate) fn keep_min(current: f64, candidate: f64) -> f64 {
    if candidate < current {
        candidate
    } else {
        current
    }
}

/// Running maximum, same tie rule as [`keep_min`]
#[inline]
pub(crate) fn keep_max(current: f64, candidate: f64) -> f64 {
    if candidate > current {
        candidate
    } else {
        current
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MomentStats {
    pub(crate) n: u64,
    pub(crate) min: Vec<f64>,
    pub(crate) max: Vec<f64>,
    pub(crate) sum: Vec<f64>,
    pub(crate) sum_sq: Vec<f64>,
    /// Sum of squared deviations from the mean
    pub(crate) m2: Vec<f64>,
}

impl MomentStats {
    pub(crate) fn empty(p: usize) -> Self {
        Self {
            n: 0,
            min: vec![f64::INFINITY; p],
            max: vec![f64::NEG_INFINITY; p],
            sum: vec![0.0; p],
            sum_sq: vec![0.0; p],
            m2: vec![0.0; p],
        }
    }

    pub(crate) fn features(&self) -> usize {
        self.sum.len()
    }

    /// Statistics of one row block, column by column on the backend primitives
    pub(crate) fn of_block<T: Numeric, P: ComputePrimitives<T>>(
        primitives: &P,
        block: RowBlock<'_, T>,
    ) -> Self {
        let n = block.rows();
        let mut stats = Self::empty(block.cols());
        if n == 0 {
            return stats;
        }
        stats.n = n as u64;

        let mut column = Vec::with_capacity(n);
        for j in 0..block.cols() {
            column.clear();
            column.extend(block.iter_rows().map(|row| row[j]));

            let sum = primitives.sum(&column);
            let mean = sum / n as f64;
            stats.sum[j] = sum;
            stats.sum_sq[j] = primitives.sum_of_squares(&column);

            let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
            for x in column.iter_mut() {
                let v = x.as_f64();
                lo = keep_min(lo, v);
                hi = keep_max(hi, v);
                *x = T::from_f64(v - mean);
            }
            stats.min[j] = lo;
            stats.max[j] = hi;
            stats.m2[j] = primitives.sum_of_squares(&column);
        }
        stats
    }

    /// Fail unless `other` describes the same features
    pub(crate) fn check_features(&self, other: &Self) -> Result<()> {
        if self.features() != other.features() {
            return Err(Error::size_mismatch(
                self.features(),
                other.features(),
                "moment features",
            ));
        }
        Ok(())
    }

    /// Fold `other` into `self`; `self` wins min/max ties
    ///
    /// Both sides must have the same features; see [`check_features`](Self::check_features).
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
        let weight = na * nb / (na + nb);
        for j in 0..self.features() {
            let delta = other.sum[j] / nb - self.sum[j] / na;
            self.m2[j] += other.m2[j] + weight * delta * delta;
            self.min[j] = keep_min(self.min[j], other.min[j]);
            self.max[j] = keep_max(self.max[j], other.max[j]);
            self.sum[j] += other.sum[j];
            self.sum_sq[j] += other.sum_sq[j];
        }
        self.n += other.n;
    }

    pub(crate) fn merged(mut self, other: Self) -> Self {
        self.merge(&other);
        self
    }

    pub(crate) fn load<T: Numeric>(partial: &PartialResult<T>) -> Result<Self> {
        let stats = Self {
            n: partial.n_observations(),
            min: partial.table(MomentsPartial::Minimum)?.to_f64_vec(),
            max: partial.table(MomentsPartial::Maximum)?.to_f64_vec(),
            sum: partial.table(MomentsPartial::Sum)?.to_f64_vec(),
            sum_sq: partial.table(MomentsPartial::SumSquares)?.to_f64_vec(),
            m2: partial.table(MomentsPartial::SumSquaresCentered)?.to_f64_vec(),
        };
        let p = stats.features();
        for len in [stats.min.len(), stats.max.len(), stats.sum_sq.len(), stats.m2.len()] {
            if len != p {
                return Err(Error::size_mismatch(p, len, "moment statistics"));
            }
        }
        Ok(stats)
    }

    pub(crate) fn store<T: Numeric>(&self, partial: &mut PartialResult<T>) -> Result<()> {
        partial.table_mut(MomentsPartial::Minimum)?.assign_f64(&self.min)?;
        partial.table_mut(MomentsPartial::Maximum)?.assign_f64(&self.max)?;
        partial.table_mut(MomentsPartial::Sum)?.assign_f64(&self.sum)?;
        partial
            .table_mut(MomentsPartial::SumSquares)?
            .assign_f64(&self.sum_sq)?;
        partial
            .table_mut(MomentsPartial::SumSquaresCentered)?
            .assign_f64(&self.m2)?;
        partial.set_n_observations(self.n);
        Ok(())
    }

    /// Derive all ten outputs
    ///
    /// Fails with [`Error::NumericalDegeneracy`] below two observations
    /// (variance) or on a zero mean (variation).
    pub(crate) fn finalize<T: Numeric>(&self, result: &mut ResultBundle<T>) -> Result<()> {
        if self.n == 0 {
            return Err(Error::InsufficientData {
                expected: 1,
                actual: 0,
            });
        }
        if self.n < 2 {
            return Err(Error::NumericalDegeneracy(
                "variance needs at least 2 observations".to_string(),
            ));
        }
        let n = self.n as f64;
        let mean: Vec<f64> = self.sum.iter().map(|s| s / n).collect();
        let raw2: Vec<f64> = self.sum_sq.iter().map(|s| s / n).collect();
        let variance: Vec<f64> = self.m2.iter().map(|m| m / (n - 1.0)).collect();
        let std: Vec<f64> = variance.iter().map(|v| v.sqrt()).collect();
        let variation = mean
            .iter()
            .zip(&std)
            .enumerate()
            .map(|(j, (&m, &s))| {
                if m == 0.0 {
                    Err(Error::NumericalDegeneracy(format!(
                        "feature {j} has zero mean, variation is undefined"
                    )))
                } else {
                    Ok(s / m)
                }
            })
            .collect::<Result<Vec<f64>>>()?;

        let outputs: [(MomentsResult, &[f64]); 10] = [
            (MomentsResult::Minimum, &self.min[..]),
            (MomentsResult::Maximum, &self.max[..]),
            (MomentsResult::Sum, &self.sum[..]),
            (MomentsResult::SumSquares, &self.sum_sq[..]),
            (MomentsResult::SumSquaresCentered, &self.m2[..]),
            (MomentsResult::Mean, &mean[..]),
            (MomentsResult::SecondOrderRawMoment, &raw2[..]),
            (MomentsResult::Variance, &variance[..]),
            (MomentsResult::StandardDeviation, &std[..]),
            (MomentsResult::Variation, &variation[..]),
        ];
        for (id, values) in outputs {
            result.table_mut(id)?.assign_f64(values)?;
        }
        Ok(())
    }
}

pub(crate) fn layout(p: usize) -> ResultLayout {
    MomentsResult::ALL
        .iter()
        .fold(ResultLayout::new(), |layout, &id| layout.with(id, 1, p))
}

pub(crate) fn init_partial<T: Numeric>(method: MethodId, p: usize) -> Result<PartialResult<T>> {
    PartialResult::new(ALGORITHM, method)
        .with_filled(MomentsPartial::Minimum, 1, p, T::infinity())?
        .with_filled(MomentsPartial::Maximum, 1, p, T::neg_infinity())?
        .with_table(MomentsPartial::Sum, 1, p)?
        .with_table(MomentsPartial::SumSquares, 1, p)?
        .with_table(MomentsPartial::SumSquaresCentered, 1, p)
}

pub(crate) fn partial_features<T: Numeric>(partial: &PartialResult<T>) -> Result<usize> {
    Ok(partial.table(MomentsPartial::Sum)?.cols())
}
