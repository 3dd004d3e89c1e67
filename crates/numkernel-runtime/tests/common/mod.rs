//! Shared utilities for integration tests

#![allow(dead_code)]

use numkernel_runtime::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::sync::Once;

pub use approx::assert_relative_eq;

pub const RELATIVE: f64 = 1e-9;

static TRACING: Once = Once::new();

/// Route kernel tracing to the test output, filtered by `RUST_LOG`
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Normally distributed `rows x cols` table
pub fn normal_table(rng: &mut ChaCha8Rng, rows: usize, cols: usize) -> DenseTable<f64> {
    let normal = Normal::new(2.0, 3.0).unwrap();
    let data = (0..rows * cols).map(|_| normal.sample(rng)).collect();
    DenseTable::from_vec(rows, cols, data).unwrap()
}

/// Rows `range` of `table` as a new table
pub fn rows_of(table: &DenseTable<f64>, range: std::ops::Range<usize>) -> DenseTable<f64> {
    let cols = table.cols();
    let data = table.as_slice()[range.start * cols..range.end * cols].to_vec();
    DenseTable::from_vec(range.len(), cols, data).unwrap()
}

pub fn assert_tables_close(actual: &DenseTable<f64>, expected: &DenseTable<f64>, tolerance: f64) {
    assert_eq!(actual.shape(), expected.shape());
    for (a, e) in actual.as_slice().iter().zip(expected.as_slice()) {
        assert_relative_eq!(*a, *e, max_relative = tolerance, epsilon = 1e-10);
    }
}
