//! Computational primitives with per-CPU backends
//!
//! Kernels are generic over a [`ComputePrimitives`] backend. Each backend is a
//! zero-sized type; the dispatcher instantiates one kernel per backend and
//! registers it under the matching [`CpuType`](crate::cpu::CpuType).
//!
//! - [`ScalarBackend`]: portable, registered at `CpuType::Baseline`
//! - `Avx2Backend`: AVX2 + FMA, registered at `CpuType::Avx2`; compiled on
//!   x86_64 with the `avx2` feature

#[cfg(all(target_arch = "x86_64", feature = "avx2"))]
mod avx2;
mod scalar;
mod traits;

#[cfg(all(target_arch = "x86_64", feature = "avx2"))]
pub use avx2::{Avx2Backend, Avx2Element};
pub use scalar::ScalarBackend;
pub use traits::ComputePrimitives;

/// Name of the fastest backend usable on this CPU
pub fn best_backend_name() -> &'static str {
    #[cfg(all(target_arch = "x86_64", feature = "avx2"))]
    {
        if Avx2Backend::is_available() {
            return "avx2";
        }
    }
    "scalar"
}
