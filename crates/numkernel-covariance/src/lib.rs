//! Covariance and correlation kernels
//!
//! Computes the `p x p` covariance (or correlation) matrix and the mean of a
//! table of observations, in every execution mode. Online increments and
//! distributed partials combine through a pairwise update, so the result is
//! the same however the rows were split.
//!
//! | Method | Layout | Variants |
//! |--------|--------|----------|
//! | [`method::DENSE`] | dense, CSR via dense view | baseline, AVX2 |
//! | [`method::CSR`] | CSR only | baseline |
//!
//! # Example
//!
//! ```rust
//! use numkernel_core::prelude::*;
//! use numkernel_covariance::{CovarianceInput, CovarianceResult, DenseCovariance};
//! use numkernel_core::ScalarBackend;
//! use std::sync::Arc;
//!
//! let kernel: Arc<dyn KernelStrategy<f64>> =
//!     Arc::new(DenseCovariance::<f64, _>::new(ScalarBackend::new(), CpuType::Baseline));
//! let mut batch = Batch::new(kernel).unwrap();
//! batch.set_input(
//!     CovarianceInput::Data,
//!     DenseTable::from_rows(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0], [7.0, 8.0]]).unwrap(),
//! );
//! batch.compute().unwrap();
//! let mean = batch.get_result(CovarianceResult::Mean).unwrap();
//! assert_eq!(mean.as_slice(), &[4.0, 5.0]);
//! ```

mod csr;
mod dense;
mod params;
mod stats;

pub use csr::CsrCovariance;
pub use dense::DenseCovariance;
pub use params::{CovarianceParams, Estimator, OutputMatrix};

use numkernel_core::{
    AlgorithmId, CpuType, Dispatchable, KernelStrategy, RegistryBuilder, ScalarBackend,
};
use std::sync::Arc;

pub const ALGORITHM: AlgorithmId = AlgorithmId(1);

/// Covariance method ids
pub mod method {
    use numkernel_core::MethodId;

    /// Dense data; CSR tables are read through their dense view
    pub const DENSE: MethodId = MethodId(0);
    /// Sparse accumulation over CSR tables
    pub const CSR: MethodId = MethodId(1);
}

numkernel_core::bundle_ids! {
    pub enum CovarianceInput {
        Data = 0 => "data",
    }
}

numkernel_core::bundle_ids! {
    pub enum CovarianceParameter {
        OutputMatrix = 0 => "outputMatrix",
        Estimator = 1 => "estimator",
    }
}

numkernel_core::bundle_ids! {
    pub enum CovarianceResult {
        /// Covariance or correlation matrix, `p x p`
        Covariance = 0 => "covariance",
        Mean = 1 => "mean",
    }
}

numkernel_core::bundle_ids! {
    pub enum CovariancePartial {
        Sum = 0 => "sum",
        /// Cross product centered about the running mean
        CrossProduct = 1 => "crossProduct",
    }
}

fn dense_scalar<T: Dispatchable>() -> Arc<dyn KernelStrategy<T>> {
    Arc::new(DenseCovariance::<T, _>::new(ScalarBackend::new(), CpuType::Baseline))
}

#[cfg(all(target_arch = "x86_64", feature = "avx2"))]
fn dense_avx2<T: Dispatchable + numkernel_core::primitives::Avx2Element>(
) -> Arc<dyn KernelStrategy<T>> {
    Arc::new(DenseCovariance::<T, _>::new(
        numkernel_core::Avx2Backend::new(),
        CpuType::Avx2,
    ))
}

fn csr_baseline<T: Dispatchable>() -> Arc<dyn KernelStrategy<T>> {
    Arc::new(CsrCovariance::<T>::new())
}

/// Register every covariance kernel variant
pub fn register(builder: &mut RegistryBuilder) {
    builder
        .register::<f32>(ALGORITHM, method::DENSE, CpuType::Baseline, dense_scalar::<f32>)
        .register::<f64>(ALGORITHM, method::DENSE, CpuType::Baseline, dense_scalar::<f64>)
        .register::<f32>(ALGORITHM, method::CSR, CpuType::Baseline, csr_baseline::<f32>)
        .register::<f64>(ALGORITHM, method::CSR, CpuType::Baseline, csr_baseline::<f64>);

    #[cfg(all(target_arch = "x86_64", feature = "avx2"))]
    {
        builder
            .register::<f32>(ALGORITHM, method::DENSE, CpuType::Avx2, dense_avx2::<f32>)
            .register::<f64>(ALGORITHM, method::DENSE, CpuType::Avx2, dense_avx2::<f64>);
    }
}
