//! numkernel: numerical analytics kernels
//!
//! This crate re-exports the workspace. The process-wide kernel dispatcher
//! lives in [`runtime`] and is re-exported here.
//!
//! # Crates
//!
//! - [`core`]: containers, bundles, dispatch, execution modes, serialization
//! - [`covariance`]: covariance and correlation matrices
//! - [`moments`]: low-order moments
//! - [`linreg`]: linear regression training and prediction
//! - [`runtime`]: the shared dispatcher and serialization setup
//!
//! # Example
//!
//! ```rust
//! use numkernel::prelude::*;
//! use numkernel::covariance::{self, CovarianceInput, CovarianceResult};
//!
//! let mut online = numkernel::dispatcher()
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

pub use numkernel_core as core;
pub use numkernel_covariance as covariance;
pub use numkernel_linreg as linreg;
pub use numkernel_moments as moments;
pub use numkernel_runtime as runtime;

pub use numkernel_core::{
    decode_any, decode_as, encode, AlgorithmId, Batch, CpuType, CsrTable, DenseTable,
    DistributedLocal, DistributedMaster, Error, ErrorKind, KernelRegistry, MethodId,
    NumericTable, Online, ParameterBundle, RegistryBuilder, Result,
};
pub use numkernel_runtime::{dispatcher, init_serialization, registry_builder};

/// Common imports
pub mod prelude {
    pub use numkernel_runtime::prelude::*;
}
