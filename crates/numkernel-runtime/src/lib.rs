//! Process-wide kernel dispatcher
//!
//! Every algorithm crate contributes its kernel variants through its
//! `register` function; the dispatcher resolves them once, at first use,
//! against the CPU level detected at startup. The first use also adds the
//! algorithm crates' serializable types to the serialization registry.
//!
//! # Example
//!
//! ```rust
//! use numkernel_core::prelude::*;
//! use numkernel_covariance::{self as covariance, CovarianceInput, CovarianceResult};
//!
//! let mut online = numkernel_runtime::dispatcher()
//!     .online::<f64>(covariance::ALGORITHM, covariance::method::DENSE)
//!     .unwrap();
//! for rows in [[[1.0, 2.0], [3.0, 4.0]], [[5.0, 6.0], [7.0, 8.0]]] {
//!     online.set_input(CovarianceInput::Data, DenseTable::from_rows(&rows).unwrap());
//!     online.compute().unwrap();
//! }
//! online.finalize_compute().unwrap();
//! assert_eq!(
//!     online.get_result(CovarianceResult::Mean).unwrap().as_slice(),
//!     &[4.0, 5.0]
//! );
//! ```

use lazy_static::lazy_static;
use numkernel_core::{CpuType, KernelRegistry, RegistryBuilder};

/// Registry builder holding every kernel variant of the workspace
pub fn registry_builder() -> RegistryBuilder {
    let mut builder = RegistryBuilder::new();
    numkernel_covariance::register(&mut builder);
    numkernel_moments::register(&mut builder);
    numkernel_linreg::register(&mut builder);
    builder
}

lazy_static! {
    static ref DISPATCHER: KernelRegistry = {
        let registry = registry_builder().build(CpuType::detected());
        log::debug!(
            "numkernel dispatcher ready: {} kernels at {}, best backend {}",
            registry.len(),
            registry.cpu(),
            numkernel_core::primitives::best_backend_name()
        );
        registry
    };
}

/// Process-wide kernel registry, built on first use
pub fn dispatcher() -> &'static KernelRegistry {
    init_serialization();
    &DISPATCHER
}

/// Register every serializable type of the workspace
///
/// Idempotent; called by [`dispatcher`]. Call it directly before decoding
/// payloads with [`decode_any`](numkernel_core::decode_any) in a process
/// that never dispatches a kernel.
pub fn init_serialization() {
    lazy_static! {
        static ref REGISTERED: () = {
            if let Err(e) = numkernel_linreg::register_serialization() {
                log::warn!("linear model serialization unavailable: {e}");
            }
        };
    }
    lazy_static::initialize(&REGISTERED);
}

/// Common imports
pub mod prelude {
    pub use numkernel_core::prelude::*;
    pub use numkernel_core::{CpuType, ErrorKind};
}

#[cfg(test)]
mod tests {
    use super::*;
    use numkernel_core::serialization::{is_registered, tags};
    use numkernel_core::{AlgorithmId, ErrorKind, MethodId};
    use numkernel_covariance as covariance;
    use numkernel_linreg as linreg;
    use numkernel_moments as moments;

    #[test]
    fn test_dispatcher_serves_every_algorithm() {
        let registry = dispatcher();
        assert!(registry.cpu() <= CpuType::detected());
        assert!(registry
            .select::<f64>(covariance::ALGORITHM, covariance::method::DENSE)
            .is_ok());
        assert!(registry
            .select::<f32>(covariance::ALGORITHM, covariance::method::CSR)
            .is_ok());
        assert!(registry
            .select::<f64>(moments::ALGORITHM, moments::method::DENSE)
            .is_ok());
        assert!(registry
            .select::<f32>(linreg::TRAINING, linreg::method::NORM_EQ)
            .is_ok());
        assert!(registry
            .select::<f64>(linreg::PREDICTION, linreg::method::DEFAULT)
            .is_ok());
        assert_eq!(registry.len(), 2 * 5);
    }

    #[test]
    fn test_dispatcher_is_shared() {
        assert!(std::ptr::eq(dispatcher(), dispatcher()));
        assert!(is_registered(tags::LINEAR_MODEL_F64));
    }

    #[test]
    fn test_unknown_algorithm_is_unsupported() {
        let err = dispatcher()
            .batch::<f64>(AlgorithmId(77), MethodId(0))
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
