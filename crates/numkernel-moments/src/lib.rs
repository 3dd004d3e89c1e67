//! Low-order moments
//!
//! Per-feature minimum, maximum, sum, sum of squares, centered sum of
//! squares, mean, second raw moment, variance, standard deviation and
//! variation, in every execution mode.
//!
//! Minimum and maximum skip NaN. When two candidates compare equal (this
//! includes `-0.0` and `0.0`) the accumulator keeps the value it already
//! holds, so the earliest folded block wins.

mod kernel;
mod stats;

pub use kernel::DenseMoments;

use numkernel_core::{
    AlgorithmId, CpuType, Dispatchable, KernelStrategy, RegistryBuilder, ScalarBackend,
};
use std::sync::Arc;

pub const ALGORITHM: AlgorithmId = AlgorithmId(2);

/// Moments method ids
pub mod method {
    use numkernel_core::MethodId;

    pub const DENSE: MethodId = MethodId(0);
}

numkernel_core::bundle_ids! {
    pub enum MomentsInput {
        Data = 0 => "data",
    }
}

numkernel_core::bundle_ids! {
    /// Every output is a `1 x p` table
    pub enum MomentsResult {
        Minimum = 0 => "minimum",
        Maximum = 1 => "maximum",
        Sum = 2 => "sum",
        SumSquares = 3 => "sumSquares",
        SumSquaresCentered = 4 => "sumSquaresCentered",
        Mean = 5 => "mean",
        SecondOrderRawMoment = 6 => "secondOrderRawMoment",
        /// Divisor `n - 1`
        Variance = 7 => "variance",
        StandardDeviation = 8 => "standardDeviation",
        /// Standard deviation over mean
        Variation = 9 => "variation",
    }
}

numkernel_core::bundle_ids! {
    pub enum MomentsPartial {
        Minimum = 0 => "partialMinimum",
        Maximum = 1 => "partialMaximum",
        Sum = 2 => "partialSum",
        SumSquares = 3 => "partialSumSquares",
        SumSquaresCentered = 4 => "partialSumSquaresCentered",
    }
}

fn dense_scalar<T: Dispatchable>() -> Arc<dyn KernelStrategy<T>> {
    Arc::new(DenseMoments::<T, _>::new(ScalarBackend::new(), CpuType::Baseline))
}

#[cfg(all(target_arch = "x86_64", feature = "avx2"))]
fn dense_avx2<T: Dispatchable + numkernel_core::primitives::Avx2Element>(
) -> Arc<dyn KernelStrategy<T>> {
    Arc::new(DenseMoments::<T, _>::new(
        numkernel_core::Avx2Backend::new(),
        CpuType::Avx2,
    ))
}

/// Register every moments kernel variant
pub fn register(builder: &mut RegistryBuilder) {
    builder
        .register::<f32>(ALGORITHM, method::DENSE, CpuType::Baseline, dense_scalar::<f32>)
        .register::<f64>(ALGORITHM, method::DENSE, CpuType::Baseline, dense_scalar::<f64>);

    #[cfg(all(target_arch = "x86_64", feature = "avx2"))]
    {
        builder
            .register::<f32>(ALGORITHM, method::DENSE, CpuType::Avx2, dense_avx2::<f32>)
            .register::<f64>(ALGORITHM, method::DENSE, CpuType::Avx2, dense_avx2::<f64>);
    }
}
