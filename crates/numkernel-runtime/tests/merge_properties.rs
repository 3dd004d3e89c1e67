//! Merging partial results in any grouping agrees with one batch pass

mod common;

use common::*;
use numkernel_covariance::{self as covariance, CovarianceInput, CovarianceResult};
use numkernel_linreg::{self as linreg, TrainingInput, TrainingResult};
use numkernel_moments::{self as moments, MomentsInput, MomentsResult};
use numkernel_runtime::prelude::*;
use proptest::prelude::*;

/// Partial result of one local step over `rows` of `table`
fn local_partial(
    algorithm: AlgorithmId,
    method: MethodId,
    inputs: &[(u32, &DenseTable<f64>)],
    range: std::ops::Range<usize>,
) -> PartialResult<f64> {
    let mut local = numkernel_runtime::dispatcher()
        .distributed_local::<f64>(algorithm, method)
        .unwrap();
    for &(code, table) in inputs {
        local.set_input(RawId(code), rows_of(table, range.clone()));
    }
    local.compute().unwrap();
    local.take_partial_result().unwrap()
}

#[derive(Debug, Clone, Copy)]
struct RawId(u32);

impl BundleId for RawId {
    fn code(self) -> u32 {
        self.0
    }

    fn name(self) -> &'static str {
        "raw"
    }
}

/// Finalize `(p1 + p2) + p3` on one master
fn finalize_grouped(
    algorithm: AlgorithmId,
    method: MethodId,
    parts: [PartialResult<f64>; 3],
) -> ResultBundle<f64> {
    let [p1, p2, p3] = parts;
    let mut first = numkernel_runtime::dispatcher()
        .distributed_master::<f64>(algorithm, method)
        .unwrap();
    first.add_input(p1).unwrap();
    first.add_input(p2).unwrap();
    first.compute().unwrap();
    let merged = first.merged_result().unwrap().clone();

    let mut second = numkernel_runtime::dispatcher()
        .distributed_master::<f64>(algorithm, method)
        .unwrap();
    let bytes = numkernel_core::encode(&merged);
    second.add_serialized(&bytes).unwrap();
    second.add_serialized(&numkernel_core::encode(&p3)).unwrap();
    second.finalize_compute().unwrap();
    second.result().clone()
}

fn batch_result(
    algorithm: AlgorithmId,
    method: MethodId,
    inputs: &[(u32, &DenseTable<f64>)],
) -> ResultBundle<f64> {
    let mut batch = numkernel_runtime::dispatcher().batch::<f64>(algorithm, method).unwrap();
    for &(code, table) in inputs {
        batch.set_input(RawId(code), table.clone());
    }
    batch.compute().unwrap();
    batch.into_result()
}

fn split_points(rows: usize, a: usize, b: usize) -> [std::ops::Range<usize>; 3] {
    // Every part keeps at least two rows
    let first = 2 + a % (rows - 5);
    let second = first + 2 + b % (rows - first - 3);
    [0..first, first..second, second..rows]
}

fn assert_results_close(actual: &ResultBundle<f64>, expected: &ResultBundle<f64>) {
    for (code, name, table) in expected.iter() {
        let got = actual
            .get_code(code)
            .unwrap_or_else(|| panic!("missing result {name}"));
        assert_tables_close(got, table, RELATIVE);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn covariance_merge_matches_batch(seed in any::<u64>(), rows in 8usize..64, a in any::<usize>(), b in any::<usize>()) {
        let table = normal_table(&mut rng(seed), rows, 4);
        let inputs = [(CovarianceInput::Data.code(), &table)];
        let parts = split_points(rows, a, b)
            .map(|range| local_partial(covariance::ALGORITHM, covariance::method::DENSE, &inputs, range));

        let merged = finalize_grouped(covariance::ALGORITHM, covariance::method::DENSE, parts);
        let batch = batch_result(covariance::ALGORITHM, covariance::method::DENSE, &inputs);
        assert_results_close(&merged, &batch);
        prop_assert!(merged.get(CovarianceResult::Covariance).is_ok());
    }

    #[test]
    fn moments_merge_matches_batch(seed in any::<u64>(), rows in 8usize..64, a in any::<usize>(), b in any::<usize>()) {
        let table = normal_table(&mut rng(seed), rows, 3);
        let inputs = [(MomentsInput::Data.code(), &table)];
        let parts = split_points(rows, a, b)
            .map(|range| local_partial(moments::ALGORITHM, moments::method::DENSE, &inputs, range));

        let merged = finalize_grouped(moments::ALGORITHM, moments::method::DENSE, parts);
        let batch = batch_result(moments::ALGORITHM, moments::method::DENSE, &inputs);
        assert_results_close(&merged, &batch);
        prop_assert_eq!(
            merged.get(MomentsResult::Minimum).unwrap().as_slice(),
            batch.get(MomentsResult::Minimum).unwrap().as_slice()
        );
    }

    #[test]
    fn linreg_merge_matches_batch(seed in any::<u64>(), rows in 16usize..64, a in any::<usize>(), b in any::<usize>()) {
        let mut rng = rng(seed);
        let data = normal_table(&mut rng, rows, 2);
        let noise = normal_table(&mut rng, rows, 1);
        let response: Vec<f64> = (0..rows)
            .map(|i| 1.5 + 2.0 * data.get(i, 0) - 0.5 * data.get(i, 1) + 0.01 * noise.get(i, 0))
            .collect();
        let dependent = DenseTable::from_vec(rows, 1, response).unwrap();
        let inputs = [
            (TrainingInput::Data.code(), &data),
            (TrainingInput::Dependent.code(), &dependent),
        ];
        let parts = split_points(rows, a, b)
            .map(|range| local_partial(linreg::TRAINING, linreg::method::NORM_EQ, &inputs, range));

        let merged = finalize_grouped(linreg::TRAINING, linreg::method::NORM_EQ, parts);
        let batch = batch_result(linreg::TRAINING, linreg::method::NORM_EQ, &inputs);
        let beta = merged.get(TrainingResult::Beta).unwrap();
        for (m, e) in beta.as_slice().iter().zip(batch.get(TrainingResult::Beta).unwrap().as_slice()) {
            prop_assert!((m - e).abs() <= 1e-8 * e.abs().max(1.0));
        }
    }
}
