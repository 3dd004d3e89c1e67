//! Compute primitives shared by the kernel backends

use crate::numeric::Numeric;

/// Low-level reductions a kernel builds on
///
/// Every method returns an f64 aggregate regardless of the element width.
/// Backends only override what they accelerate; the provided methods are the
/// portable scalar versions.
pub trait ComputePrimitives<T: Numeric>: Clone + Send + Sync + 'static {
    /// Name of this backend
    fn backend_name(&self) -> &'static str;

    /// Number of elements processed per vector instruction
    fn simd_width(&self) -> usize {
        1
    }

    /// Sum of all elements
    fn sum(&self, data: &[T]) -> f64 {
        data.iter().fold(0.0, |acc, &x| acc + x.as_f64())
    }

    /// Sum of `a[i] * b[i]` over the common length
    fn dot_product(&self, a: &[T], b: &[T]) -> f64 {
        a.iter()
            .zip(b)
            .fold(0.0, |acc, (&x, &y)| acc + x.as_f64() * y.as_f64())
    }

    fn sum_of_squares(&self, data: &[T]) -> f64 {
        self.dot_product(data, data)
    }
}
