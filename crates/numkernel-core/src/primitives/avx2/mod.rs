//! AVX2 + FMA backend
//!
//! Element loops run 256-bit wide and accumulate in f64 lanes; `f32` input is
//! widened four lanes at a time before accumulation. Remainders fall back to
//! scalar code.

mod f32;
mod f64;

use super::ComputePrimitives;
use crate::cpu::CpuType;
use crate::numeric::Numeric;
use std::arch::x86_64::*;

/// AVX2 backend for x86_64 processors with FMA
#[derive(Clone, Copy, Debug)]
pub struct Avx2Backend {
    _private: (),
}

impl Avx2Backend {
    /// Create a new AVX2 backend
    ///
    /// # Panics
    /// Panics if the CPU doesn't support AVX2 and FMA
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        match Self::try_new() {
            Some(backend) => backend,
            None => panic!("AVX2 backend requested but CPU doesn't support AVX2+FMA"),
        }
    }

    /// Create the backend if the running CPU supports it
    pub fn try_new() -> Option<Self> {
        Self::is_available().then_some(Self { _private: () })
    }

    pub fn is_available() -> bool {
        CpuType::Avx2.is_supported()
    }
}

/// Element types with AVX2 loops
pub trait Avx2Element: Numeric {
    /// Elements per 256-bit register
    const LANES: usize;

    /// # Safety
    /// The CPU must support AVX2 and FMA.
    unsafe fn sum_avx2(data: &[Self]) -> f64;

    /// # Safety
    /// The CPU must support AVX2 and FMA.
    unsafe fn dot_product_avx2(a: &[Self], b: &[Self]) -> f64;
}

impl Avx2Element for f64 {
    const LANES: usize = 4;

    unsafe fn sum_avx2(data: &[f64]) -> f64 {
        self::f64::sum(data)
    }

    unsafe fn dot_product_avx2(a: &[f64], b: &[f64]) -> f64 {
        self::f64::dot_product(a, b)
    }
}

impl Avx2Element for f32 {
    const LANES: usize = 8;

    unsafe fn sum_avx2(data: &[f32]) -> f64 {
        self::f32::sum(data)
    }

    unsafe fn dot_product_avx2(a: &[f32], b: &[f32]) -> f64 {
        self::f32::dot_product(a, b)
    }
}

impl<T: Avx2Element> ComputePrimitives<T> for Avx2Backend {
    fn backend_name(&self) -> &'static str {
        "avx2"
    }

    fn simd_width(&self) -> usize {
        T::LANES
    }

    fn sum(&self, data: &[T]) -> f64 {
        // Safety: construction checked AVX2+FMA support
        unsafe { T::sum_avx2(data) }
    }

    fn dot_product(&self, a: &[T], b: &[T]) -> f64 {
        // Safety: construction checked AVX2+FMA support
        unsafe { T::dot_product_avx2(a, b) }
    }
}

#[inline]
#[target_feature(enable = "avx")]
unsafe fn horizontal_sum(v: __m256d) -> f64 {
    let mut lanes = [0.0f64; 4];
    _mm256_storeu_pd(lanes.as_mut_ptr(), v);
    (lanes[0] + lanes[1]) + (lanes[2] + lanes[3])
}
