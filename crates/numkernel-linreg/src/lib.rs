//! Linear regression
//!
//! Training accumulates the normal equations `X'X` and `X'Y` over any number
//! of increments or nodes and solves them by Cholesky factorization.
//! Prediction applies the coefficients to new rows and runs in batch mode
//! only.
//!
//! ```rust
//! use numkernel_core::prelude::*;
//! use numkernel_core::ScalarBackend;
//! use numkernel_linreg::{NormEqTraining, TrainingInput, TrainingResult};
//! use std::sync::Arc;
//!
//! let kernel: Arc<dyn KernelStrategy<f64>> =
//!     Arc::new(NormEqTraining::<f64, _>::new(ScalarBackend::new(), CpuType::Baseline));
//! let mut batch = Batch::new(kernel).unwrap();
//! batch.set_input(TrainingInput::Data, DenseTable::from_rows(&[[0.0], [1.0], [2.0]]).unwrap());
//! batch.set_input(TrainingInput::Dependent, DenseTable::from_rows(&[[1.0], [3.0], [5.0]]).unwrap());
//! batch.compute().unwrap();
//!
//! let beta = batch.get_result(TrainingResult::Beta).unwrap();
//! assert!((beta.get(0, 0) - 1.0).abs() < 1e-10);
//! assert!((beta.get(0, 1) - 2.0).abs() < 1e-10);
//! ```

mod model;
mod params;
mod prediction;
mod training;

pub use model::LinearModel;
pub use params::LinearRegressionParams;
pub use prediction::LinearPrediction;
pub use training::NormEqTraining;

use numkernel_core::{
    AlgorithmId, CpuType, Dispatchable, KernelStrategy, RegistryBuilder, Result, ScalarBackend,
};
use std::sync::Arc;

pub const TRAINING: AlgorithmId = AlgorithmId(3);
pub const PREDICTION: AlgorithmId = AlgorithmId(4);

/// Linear regression method ids
pub mod method {
    use numkernel_core::MethodId;

    /// Training through the normal equations
    pub const NORM_EQ: MethodId = MethodId(0);
    /// Prediction has a single method
    pub const DEFAULT: MethodId = MethodId(0);
}

numkernel_core::bundle_ids! {
    pub enum TrainingInput {
        /// `n x p` observations
        Data = 0 => "data",
        /// `n x k` responses
        Dependent = 1 => "dependentVariables",
    }
}

numkernel_core::bundle_ids! {
    pub enum TrainingParameter {
        Intercept = 0 => "interceptFlag",
    }
}

numkernel_core::bundle_ids! {
    pub enum TrainingResult {
        /// `k x (p + 1)`, intercept in column 0
        Beta = 0 => "beta",
    }
}

numkernel_core::bundle_ids! {
    pub enum TrainingPartial {
        XtX = 0 => "partialXTX",
        XtY = 1 => "partialXTY",
    }
}

numkernel_core::bundle_ids! {
    pub enum PredictionInput {
        Data = 0 => "data",
        Beta = 1 => "beta",
    }
}

numkernel_core::bundle_ids! {
    pub enum PredictionResult {
        Prediction = 0 => "prediction",
    }
}

fn training_scalar<T: Dispatchable>() -> Arc<dyn KernelStrategy<T>> {
    Arc::new(NormEqTraining::<T, _>::new(ScalarBackend::new(), CpuType::Baseline))
}

fn prediction_scalar<T: Dispatchable>() -> Arc<dyn KernelStrategy<T>> {
    Arc::new(LinearPrediction::<T, _>::new(ScalarBackend::new(), CpuType::Baseline))
}

#[cfg(all(target_arch = "x86_64", feature = "avx2"))]
fn training_avx2<T: Dispatchable + numkernel_core::primitives::Avx2Element>(
) -> Arc<dyn KernelStrategy<T>> {
    Arc::new(NormEqTraining::<T, _>::new(
        numkernel_core::Avx2Backend::new(),
        CpuType::Avx2,
    ))
}

#[cfg(all(target_arch = "x86_64", feature = "avx2"))]
fn prediction_avx2<T: Dispatchable + numkernel_core::primitives::Avx2Element>(
) -> Arc<dyn KernelStrategy<T>> {
    Arc::new(LinearPrediction::<T, _>::new(
        numkernel_core::Avx2Backend::new(),
        CpuType::Avx2,
    ))
}

/// Register training and prediction kernels
pub fn register(builder: &mut RegistryBuilder) {
    builder
        .register::<f32>(TRAINING, method::NORM_EQ, CpuType::Baseline, training_scalar::<f32>)
        .register::<f64>(TRAINING, method::NORM_EQ, CpuType::Baseline, training_scalar::<f64>)
        .register::<f32>(PREDICTION, method::DEFAULT, CpuType::Baseline, prediction_scalar::<f32>)
        .register::<f64>(PREDICTION, method::DEFAULT, CpuType::Baseline, prediction_scalar::<f64>);

    #[cfg(all(target_arch = "x86_64", feature = "avx2"))]
    {
        builder
            .register::<f32>(TRAINING, method::NORM_EQ, CpuType::Avx2, training_avx2::<f32>)
            .register::<f64>(TRAINING, method::NORM_EQ, CpuType::Avx2, training_avx2::<f64>)
            .register::<f32>(PREDICTION, method::DEFAULT, CpuType::Avx2, prediction_avx2::<f32>)
            .register::<f64>(PREDICTION, method::DEFAULT, CpuType::Avx2, prediction_avx2::<f64>);
    }
}

/// Add [`LinearModel`] to the process-wide serialization registry
pub fn register_serialization() -> Result<()> {
    numkernel_core::serialization::register::<LinearModel<f32>>()?;
    numkernel_core::serialization::register::<LinearModel<f64>>()
}
