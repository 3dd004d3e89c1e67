//! Core framework for numkernel
//!
//! Every numeric algorithm is written once as a [`KernelStrategy`] and run
//! through one of the execution modes: single-shot [`Batch`], incremental
//! [`Online`], or [`DistributedLocal`] steps merged by a
//! [`DistributedMaster`]. The kernel variant that runs is chosen from the
//! detected CPU level by a [`KernelRegistry`].
//!
//! # Architecture Overview
//!
//! 1. **Containers** ([`table`]): dense and CSR tables of one float width
//! 2. **Bundles** ([`bundle`]): parameters, inputs, results, partial results
//! 3. **Dispatch** ([`cpu`], [`dispatch`], [`primitives`]): per-CPU kernel variants
//! 4. **Modes** ([`modes`]): state machines driving a kernel
//! 5. **Serialization** ([`serialization`]): tagged byte envelopes
//!
//! # Example
//!
//! ```rust
//! use numkernel_core::prelude::*;
//! use std::sync::Arc;
//!
//! numkernel_core::bundle_ids! {
//!     pub enum SumInput { Data = 0 => "data" }
//! }
//! numkernel_core::bundle_ids! {
//!     pub enum SumResult { Total = 0 => "total" }
//! }
//!
//! struct ColumnSum;
//!
//! impl KernelStrategy<f64> for ColumnSum {
//!     fn name(&self) -> &'static str { "column-sum" }
//!     fn algorithm(&self) -> AlgorithmId { AlgorithmId(1000) }
//!     fn method(&self) -> MethodId { MethodId(0) }
//!     fn cpu(&self) -> CpuType { CpuType::Baseline }
//!
//!     fn check_input(&self, input: &InputBundle<f64>, _: &ParameterBundle) -> Result<()> {
//!         input.get(SumInput::Data).map(|_| ())
//!     }
//!
//!     fn result_layout(&self, input: &InputBundle<f64>, _: &ParameterBundle) -> Result<ResultLayout> {
//!         let cols = input.get(SumInput::Data)?.cols();
//!         Ok(ResultLayout::new().with(SumResult::Total, 1, cols))
//!     }
//!
//!     fn compute(
//!         &self,
//!         input: &InputBundle<f64>,
//!         _: &ParameterBundle,
//!         result: &mut ResultBundle<f64>,
//!     ) -> Result<()> {
//!         let data = input.get(SumInput::Data)?;
//!         let block = data.block(0..data.rows())?;
//!         let out = result.table_mut(SumResult::Total)?;
//!         for row in block.iter_rows() {
//!             for (j, x) in row.iter().enumerate() {
//!                 out.set(0, j, out.get(0, j) + x);
//!             }
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let kernel: Arc<dyn KernelStrategy<f64>> = Arc::new(ColumnSum);
//! let mut batch = Batch::new(kernel).unwrap();
//! batch.set_input(SumInput::Data, DenseTable::from_rows(&[[1.0, 2.0], [3.0, 4.0]]).unwrap());
//! batch.compute().unwrap();
//! assert_eq!(batch.get_result(SumResult::Total).unwrap().as_slice(), &[4.0, 6.0]);
//! ```

pub mod bundle;
pub mod cpu;
pub mod dispatch;
pub mod error;
pub mod execution;
pub mod kernel;
pub mod modes;
pub mod numeric;
pub mod primitives;
pub mod serialization;
pub mod table;

// Re-export core types
pub use bundle::{
    AlgorithmId, BundleId, InputBundle, MethodId, ParameterBundle, ParameterValue,
    PartialResult, ResultBundle, ResultLayout,
};
pub use cpu::{CpuFeatures, CpuType};
pub use dispatch::{Dispatchable, KernelFactory, KernelKey, KernelRegistry, RegistryBuilder};
pub use error::{Error, ErrorKind, Result};
pub use execution::{fold_row_chunks, ExecutionStrategy};
pub use kernel::{ComputeMode, FinalizePolicy, KernelStrategy};
pub use modes::{Batch, DistributedLocal, DistributedMaster, Online};
pub use numeric::{FloatType, Numeric};
pub use primitives::{ComputePrimitives, ScalarBackend};
#[cfg(all(target_arch = "x86_64", feature = "avx2"))]
pub use primitives::Avx2Backend;
pub use serialization::{decode_any, decode_as, encode, Envelope, Serializable};
pub use table::{CsrTable, DenseTable, IntoSharedTable, Layout, NumericTable, RowBlock};

/// Common imports for kernel and mode code
pub mod prelude {
    pub use crate::bundle::{
        AlgorithmId, BundleId, InputBundle, MethodId, ParameterBundle, PartialResult,
        ResultBundle, ResultLayout,
    };
    pub use crate::cpu::CpuType;
    pub use crate::error::{Error, Result};
    pub use crate::kernel::{ComputeMode, FinalizePolicy, KernelStrategy};
    pub use crate::modes::{Batch, DistributedLocal, DistributedMaster, Online};
    pub use crate::numeric::Numeric;
    pub use crate::primitives::ComputePrimitives;
    pub use crate::table::{CsrTable, DenseTable, IntoSharedTable, NumericTable};
}
