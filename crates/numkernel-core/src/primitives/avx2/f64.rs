//! AVX2 loops for f64

use super::horizontal_sum;
use std::arch::x86_64::*;

#[target_feature(enable = "avx2", enable = "fma")]
pub(super) unsafe fn sum(data: &[f64]) -> f64 {
    let chunks = data.len() / 4;
    let ptr = data.as_ptr();

    let mut acc = _mm256_setzero_pd();
    for i in 0..chunks {
        acc = _mm256_add_pd(acc, _mm256_loadu_pd(ptr.add(i * 4)));
    }

    let mut total = horizontal_sum(acc);
    for &x in &data[chunks * 4..] {
        total += x;
    }
    total
}

#[target_feature(enable = "avx2", enable = "fma")]
pub(super) unsafe fn dot_product(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    let chunks = n / 4;
    let (pa, pb) = (a.as_ptr(), b.as_ptr());

    let mut acc = _mm256_setzero_pd();
    for i in 0..chunks {
        let offset = i * 4;
        let va = _mm256_loadu_pd(pa.add(offset));
        let vb = _mm256_loadu_pd(pb.add(offset));
        acc = _mm256_fmadd_pd(va, vb, acc);
    }

    let mut total = horizontal_sum(acc);
    for i in chunks * 4..n {
        total += a[i] * b[i];
    }
    total
}
