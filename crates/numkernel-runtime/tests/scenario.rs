//! End-to-end behaviour through the process-wide dispatcher

mod common;

use common::*;
use numkernel_covariance::{self as covariance, CovarianceInput, CovarianceResult};
use numkernel_moments::{self as moments, MomentsInput, MomentsResult};
use numkernel_runtime::prelude::*;

#[test]
fn test_covariance_scenario_batch_and_online() {
    init_tracing();
    let rows = [[1.0, 2.0], [3.0, 4.0], [5.0, 6.0], [7.0, 8.0]];

    let mut batch = numkernel_runtime::dispatcher()
        .batch::<f64>(covariance::ALGORITHM, covariance::method::DENSE)
        .unwrap();
    batch.set_input(CovarianceInput::Data, DenseTable::from_rows(&rows).unwrap());
    batch.compute().unwrap();

    let cov = batch.get_result(CovarianceResult::Covariance).unwrap();
    for &c in cov.as_slice() {
        assert_relative_eq!(c, 6.667, epsilon = 1e-3);
        assert_relative_eq!(c, 20.0 / 3.0, epsilon = 1e-12);
    }
    assert_eq!(
        batch.get_result(CovarianceResult::Mean).unwrap().as_slice(),
        &[4.0, 5.0]
    );

    let mut online = numkernel_runtime::dispatcher()
        .online::<f64>(covariance::ALGORITHM, covariance::method::DENSE)
        .unwrap();
    for half in rows.chunks(2) {
        online.set_input(CovarianceInput::Data, DenseTable::from_rows(half).unwrap());
        online.compute().unwrap();
    }
    online.finalize_compute().unwrap();
    assert_tables_close(
        online.get_result(CovarianceResult::Covariance).unwrap(),
        cov,
        1e-12,
    );
    assert_eq!(
        online.get_result(CovarianceResult::Mean).unwrap().as_slice(),
        &[4.0, 5.0]
    );
}

#[test]
fn test_batch_recompute_is_bit_identical() {
    init_tracing();
    let mut rng = rng(21);
    let table = normal_table(&mut rng, 300, 6);

    let mut batch = numkernel_runtime::dispatcher()
        .batch::<f64>(moments::ALGORITHM, moments::method::DENSE)
        .unwrap();
    batch.set_input(MomentsInput::Data, table);
    batch.compute().unwrap();
    let first = numkernel_core::encode(batch.result());
    batch.compute().unwrap();
    assert_eq!(numkernel_core::encode(batch.result()), first);
}

#[test]
fn test_zero_row_input_leaves_every_result_missing() {
    init_tracing();
    let mut batch = numkernel_runtime::dispatcher()
        .batch::<f64>(moments::ALGORITHM, moments::method::DENSE)
        .unwrap();
    batch.set_input(MomentsInput::Data, DenseTable::from_rows(&[[1.0, 2.0], [2.0, 5.0]]).unwrap());
    batch.compute().unwrap();

    batch.set_input(MomentsInput::Data, DenseTable::<f64>::empty(2));
    let err = batch.compute().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Input);
    assert!(!batch.result().is_valid());
    for id in MomentsResult::ALL {
        assert!(matches!(batch.get_result(*id), Err(Error::MissingArgument(_))));
    }
}

#[test]
fn test_failed_kernel_call_invalidates_previous_results() {
    init_tracing();
    let mut batch = numkernel_runtime::dispatcher()
        .batch::<f64>(covariance::ALGORITHM, covariance::method::DENSE)
        .unwrap();
    batch.set_input(CovarianceInput::Data, DenseTable::from_rows(&[[1.0, 2.0], [3.0, 5.0]]).unwrap());
    batch.compute().unwrap();
    assert!(batch.result().is_valid());

    batch.configure(covariance::CovarianceParams::correlation().into());
    batch.set_input(CovarianceInput::Data, DenseTable::from_rows(&[[1.0, 2.0], [1.0, 5.0]]).unwrap());
    assert!(matches!(batch.compute(), Err(Error::NumericalDegeneracy(_))));
    assert!(matches!(
        batch.get_result(CovarianceResult::Covariance),
        Err(Error::MissingArgument(_))
    ));
}

#[test]
fn test_csr_method_rejects_dense_input() {
    let mut batch = numkernel_runtime::dispatcher()
        .batch::<f32>(covariance::ALGORITHM, covariance::method::CSR)
        .unwrap();
    batch.set_input(
        CovarianceInput::Data,
        DenseTable::from_rows(&[[1.0f32, 2.0], [3.0, 4.0]]).unwrap(),
    );
    let err = batch.compute().unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { .. }));
    assert_eq!(err.code(), 201);
}
