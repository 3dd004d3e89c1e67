//! AVX2 loops for f32, widened to f64 lanes

use super::horizontal_sum;
use std::arch::x86_64::*;

#[target_feature(enable = "avx2", enable = "fma")]
pub(super) unsafe fn sum(data: &[f32]) -> f64 {
    let chunks = data.len() / 8;
    let ptr = data.as_ptr();

    let mut lo = _mm256_setzero_pd();
    let mut hi = _mm256_setzero_pd();
    for i in 0..chunks {
        let offset = i * 8;
        lo = _mm256_add_pd(lo, _mm256_cvtps_pd(_mm_loadu_ps(ptr.add(offset))));
        hi = _mm256_add_pd(hi, _mm256_cvtps_pd(_mm_loadu_ps(ptr.add(offset + 4))));
    }

    let mut total = horizontal_sum(_mm256_add_pd(lo, hi));
    for &x in &data[chunks * 8..] {
        total += x as f64;
    }
    total
}

#[target_feature(enable = "avx2", enable = "fma")]
pub(super) unsafe fn dot_product(a: &[f32], b: &[f32]) -> f64 {
    let n = a.len().min(b.len());
    let chunks = n / 8;
    let (pa, pb) = (a.as_ptr(), b.as_ptr());

    let mut lo = _mm256_setzero_pd();
    let mut hi = _mm256_setzero_pd();
    for i in 0..chunks {
        let offset = i * 8;
        let a_lo = _mm256_cvtps_pd(_mm_loadu_ps(pa.add(offset)));
        let b_lo = _mm256_cvtps_pd(_mm_loadu_ps(pb.add(offset)));
        let a_hi = _mm256_cvtps_pd(_mm_loadu_ps(pa.add(offset + 4)));
        let b_hi = _mm256_cvtps_pd(_mm_loadu_ps(pb.add(offset + 4)));
        lo = _mm256_fmadd_pd(a_lo, b_lo, lo);
        hi = _mm256_fmadd_pd(a_hi, b_hi, hi);
    }

    let mut total = horizontal_sum(_mm256_add_pd(lo, hi));
    for i in chunks * 8..n {
        total += a[i] as f64 * b[i] as f64;
    }
    total
}
