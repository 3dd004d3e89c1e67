//! Every CPU variant of a kernel agrees with the portable one

mod common;

use common::*;
use numkernel_covariance::{self as covariance, CovarianceInput};
use numkernel_linreg::{self as linreg, PredictionInput, TrainingInput};
use numkernel_moments::{self as moments, MomentsInput};
use numkernel_runtime::prelude::*;

fn run<K: BundleId>(
    registry: &numkernel_core::KernelRegistry,
    algorithm: AlgorithmId,
    method: MethodId,
    inputs: &[(K, DenseTable<f64>)],
) -> ResultBundle<f64> {
    let mut batch = registry.batch::<f64>(algorithm, method).unwrap();
    for (id, table) in inputs {
        batch.set_input(*id, table.clone());
    }
    batch.compute().unwrap();
    batch.into_result()
}

fn assert_bundles_close(actual: &ResultBundle<f64>, expected: &ResultBundle<f64>) {
    assert!(actual.is_valid());
    for (code, _, table) in expected.iter() {
        assert_tables_close(actual.get_code(code).unwrap(), table, RELATIVE);
    }
}

#[test]
fn test_every_level_matches_baseline() {
    init_tracing();
    let builder = numkernel_runtime::registry_builder();
    let baseline = builder.build(CpuType::Baseline);
    let best = numkernel_runtime::dispatcher();
    assert_eq!(best.cpu(), builder.build(CpuType::Avx512).cpu());

    let mut rng = rng(5);
    // Odd widths exercise the vector remainder lanes
    let data = normal_table(&mut rng, 203, 7);
    let dependent = normal_table(&mut rng, 203, 2);

    for registry in [&baseline, best] {
        assert!(registry.keys().len() == registry.len());
    }

    let cov_inputs = [(CovarianceInput::Data, data.clone())];
    assert_bundles_close(
        &run(best, covariance::ALGORITHM, covariance::method::DENSE, &cov_inputs),
        &run(&baseline, covariance::ALGORITHM, covariance::method::DENSE, &cov_inputs),
    );

    let moment_inputs = [(MomentsInput::Data, data.clone())];
    assert_bundles_close(
        &run(best, moments::ALGORITHM, moments::method::DENSE, &moment_inputs),
        &run(&baseline, moments::ALGORITHM, moments::method::DENSE, &moment_inputs),
    );

    let train_inputs = [
        (TrainingInput::Data, data.clone()),
        (TrainingInput::Dependent, dependent),
    ];
    let trained = run(&baseline, linreg::TRAINING, linreg::method::NORM_EQ, &train_inputs);
    assert_bundles_close(
        &run(best, linreg::TRAINING, linreg::method::NORM_EQ, &train_inputs),
        &trained,
    );

    let beta = trained.get(linreg::TrainingResult::Beta).unwrap().clone();
    let predict_inputs = [(PredictionInput::Data, data), (PredictionInput::Beta, beta)];
    assert_bundles_close(
        &run(best, linreg::PREDICTION, linreg::method::DEFAULT, &predict_inputs),
        &run(&baseline, linreg::PREDICTION, linreg::method::DEFAULT, &predict_inputs),
    );
}

#[test]
fn test_f32_kernels_track_f64() {
    let rows: Vec<[f64; 3]> = (0..50)
        .map(|i| {
            let x = i as f64;
            [x * 0.5, (x * 0.3).sin(), 10.0 - x * 0.1]
        })
        .collect();
    let rows32: Vec<[f32; 3]> = rows
        .iter()
        .map(|r| [r[0] as f32, r[1] as f32, r[2] as f32])
        .collect();

    let mut wide = numkernel_runtime::dispatcher()
        .batch::<f64>(covariance::ALGORITHM, covariance::method::DENSE)
        .unwrap();
    wide.set_input(CovarianceInput::Data, DenseTable::from_rows(&rows).unwrap());
    wide.compute().unwrap();

    let mut narrow = numkernel_runtime::dispatcher()
        .batch::<f32>(covariance::ALGORITHM, covariance::method::DENSE)
        .unwrap();
    narrow.set_input(CovarianceInput::Data, DenseTable::from_rows(&rows32).unwrap());
    narrow.compute().unwrap();

    let expected = wide.get_result(covariance::CovarianceResult::Covariance).unwrap();
    let actual = narrow.get_result(covariance::CovarianceResult::Covariance).unwrap();
    for (a, e) in actual.as_slice().iter().zip(expected.as_slice()) {
        assert_relative_eq!(*a as f64, *e, max_relative = 1e-4, epsilon = 1e-5);
    }
}
