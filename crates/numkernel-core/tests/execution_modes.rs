//! State machine behaviour of the execution modes

mod common;

use common::*;
use numkernel_core::modes::{BatchState, MasterState, OnlineState};
use numkernel_core::prelude::*;
use numkernel_core::ErrorKind;
use std::sync::Arc;
use std::thread;

#[test]
fn test_batch_compute_and_recompute() {
    let mut batch = Batch::new(Totals::shared(FinalizePolicy::Consume)).unwrap();
    batch.set_input(TotalsInput::Data, table(&[[1.0, 2.0], [3.0, 4.0]]));
    assert_eq!(batch.state(), BatchState::Configured);

    batch.compute().unwrap();
    assert_eq!(batch.state(), BatchState::Computed);
    let first = batch.result().clone();
    assert_eq!(batch.get_result(TotalsResult::Total).unwrap().as_slice(), &[4.0, 6.0]);
    assert_eq!(batch.result().get_scalar(TotalsResult::Count).unwrap(), 2.0);

    batch.compute().unwrap();
    assert_eq!(batch.result(), &first);
}

#[test]
fn test_batch_new_input_releases_results() {
    let mut batch = Batch::new(Totals::shared(FinalizePolicy::Consume)).unwrap();
    batch.set_input(TotalsInput::Data, table(&[[1.0, 2.0]]));
    batch.compute().unwrap();

    batch.set_input(TotalsInput::Data, table(&[[5.0, 5.0]]));
    assert_eq!(batch.state(), BatchState::Configured);
    assert!(matches!(
        batch.get_result(TotalsResult::Total),
        Err(Error::MissingArgument(_))
    ));
}

#[test]
fn test_batch_failure_leaves_results_invalid() {
    let mut batch = Batch::new(Totals::shared(FinalizePolicy::Consume)).unwrap();
    batch.set_input(TotalsInput::Data, table(&[[1.0, f64::NAN]]));
    let err = batch.compute().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Numerical);
    assert!(!batch.result().is_valid());
    assert!(matches!(
        batch.get_result(TotalsResult::Total),
        Err(Error::MissingArgument(_))
    ));
    assert!(matches!(
        batch.get_result(TotalsResult::Count),
        Err(Error::MissingArgument(_))
    ));
}

#[test]
fn test_batch_without_input_is_missing_argument() {
    let mut batch = Batch::new(Totals::shared(FinalizePolicy::Consume)).unwrap();
    assert!(matches!(batch.compute(), Err(Error::MissingArgument(_))));
}

#[test]
fn test_online_matches_batch() {
    let mut online = Online::new(Totals::shared(FinalizePolicy::Consume)).unwrap();
    online.set_input(TotalsInput::Data, table(&[[1.0, 2.0], [3.0, 4.0]]));
    online.compute().unwrap();
    online.set_input(TotalsInput::Data, table(&[[5.0, 6.0]]));
    online.compute().unwrap();
    assert_eq!(online.state(), OnlineState::Accumulating);

    online.finalize_compute().unwrap();
    assert_eq!(online.state(), OnlineState::Finalized);
    assert_eq!(online.get_result(TotalsResult::Total).unwrap().as_slice(), &[9.0, 12.0]);
    assert_eq!(online.result().get_scalar(TotalsResult::Count).unwrap(), 3.0);
}

#[test]
fn test_online_finalize_without_increment_is_empty() {
    let mut online = Online::new(Totals::shared(FinalizePolicy::Consume)).unwrap();
    let err = online.finalize_compute().unwrap_err();
    assert!(matches!(err, Error::EmptyComputation(_)));
    assert_eq!(err.kind(), ErrorKind::State);
}

#[test]
fn test_online_double_finalize_is_invalid_state() {
    let mut online = Online::new(Totals::shared(FinalizePolicy::Peek)).unwrap();
    online.set_input(TotalsInput::Data, table(&[[1.0, 1.0]]));
    online.compute().unwrap();
    online.finalize_compute().unwrap();
    assert!(matches!(
        online.finalize_compute(),
        Err(Error::InvalidState { .. })
    ));

    online.reset();
    assert_eq!(online.state(), OnlineState::Configured);
    assert!(matches!(
        online.finalize_compute(),
        Err(Error::EmptyComputation(_))
    ));
}

#[test]
fn test_online_failed_increment_keeps_last_good_partial() {
    let mut online = Online::new(Totals::shared(FinalizePolicy::Consume)).unwrap();
    online.set_input(TotalsInput::Data, table(&[[1.0, 2.0]]));
    online.compute().unwrap();
    let before = online.partial_result().cloned().unwrap();

    online.set_input(TotalsInput::Data, table(&[[10.0, 10.0], [f64::NAN, 0.0]]));
    assert!(online.compute().is_err());
    assert_eq!(online.partial_result(), Some(&before));

    online.finalize_compute().unwrap();
    assert_eq!(online.get_result(TotalsResult::Total).unwrap().as_slice(), &[1.0, 2.0]);
}

#[test]
fn test_consume_policy_starts_fresh_after_finalize() {
    let mut online = Online::new(Totals::shared(FinalizePolicy::Consume)).unwrap();
    online.set_input(TotalsInput::Data, table(&[[1.0, 2.0]]));
    online.compute().unwrap();
    online.finalize_compute().unwrap();
    assert!(online.partial_result().is_none());

    online.set_input(TotalsInput::Data, table(&[[3.0, 3.0]]));
    online.compute().unwrap();
    online.finalize_compute().unwrap();
    assert_eq!(online.get_result(TotalsResult::Total).unwrap().as_slice(), &[3.0, 3.0]);
}

#[test]
fn test_peek_policy_keeps_accumulating() {
    let mut online = Online::new(Totals::shared(FinalizePolicy::Peek)).unwrap();
    online.set_input(TotalsInput::Data, table(&[[1.0, 2.0]]));
    online.compute().unwrap();
    online.finalize_compute().unwrap();
    assert_eq!(online.partial_result().unwrap().n_observations(), 1);

    online.set_input(TotalsInput::Data, table(&[[3.0, 3.0]]));
    online.compute().unwrap();
    online.finalize_compute().unwrap();
    assert_eq!(online.get_result(TotalsResult::Total).unwrap().as_slice(), &[4.0, 5.0]);
    assert_eq!(online.result().get_scalar(TotalsResult::Count).unwrap(), 2.0);
}

#[test]
fn test_online_resumes_from_saved_partial() {
    let mut first = Online::new(Totals::shared(FinalizePolicy::Consume)).unwrap();
    first.set_input(TotalsInput::Data, table(&[[1.0, 2.0]]));
    first.compute().unwrap();
    let bytes = numkernel_core::encode(first.partial_result().unwrap());

    let partial = numkernel_core::decode_as::<PartialResult<f64>>(&bytes).unwrap();
    let mut second = Online::new(Totals::shared(FinalizePolicy::Consume)).unwrap();
    second.set_partial_result(partial).unwrap();
    second.set_input(TotalsInput::Data, table(&[[2.0, 2.0]]));
    second.compute().unwrap();
    second.finalize_compute().unwrap();
    assert_eq!(second.get_result(TotalsResult::Total).unwrap().as_slice(), &[3.0, 4.0]);
}

#[test]
fn test_foreign_partial_is_type_mismatch() {
    let mut online = Online::new(Totals::shared(FinalizePolicy::Consume)).unwrap();
    let foreign = PartialResult::<f64>::new(AlgorithmId(1), MethodId(0));
    assert!(matches!(
        online.set_partial_result(foreign),
        Err(Error::TypeMismatch { .. })
    ));
}

fn local_partial(rows: &[[f64; 2]]) -> PartialResult<f64> {
    let mut local = DistributedLocal::new(Totals::shared(FinalizePolicy::Consume)).unwrap();
    local.set_input(TotalsInput::Data, table(rows));
    local.compute().unwrap();
    local.take_partial_result().unwrap()
}

#[test]
fn test_local_without_compute_is_empty() {
    let mut local = DistributedLocal::new(Totals::shared(FinalizePolicy::Consume)).unwrap();
    assert!(matches!(local.partial_result(), Err(Error::EmptyComputation(_))));
    assert!(matches!(local.encode_partial(), Err(Error::EmptyComputation(_))));
    assert!(matches!(
        local.take_partial_result(),
        Err(Error::EmptyComputation(_))
    ));
}

#[test]
fn test_master_merges_and_finalizes() {
    let mut master = DistributedMaster::new(Totals::shared(FinalizePolicy::Consume)).unwrap();
    master.add_input(local_partial(&[[1.0, 2.0]])).unwrap();
    master.add_input(local_partial(&[[3.0, 4.0], [5.0, 6.0]])).unwrap();
    assert_eq!(master.pending_inputs(), 2);

    master.compute().unwrap();
    assert_eq!(master.state(), MasterState::Merged);
    assert_eq!(master.pending_inputs(), 0);
    assert_eq!(master.merged_result().unwrap().n_observations(), 3);

    master.finalize_compute().unwrap();
    assert_eq!(master.state(), MasterState::Finalized);
    assert_eq!(master.get_result(TotalsResult::Total).unwrap().as_slice(), &[9.0, 12.0]);
}

#[test]
fn test_master_finalize_merges_pending_inputs() {
    let mut master = DistributedMaster::new(Totals::shared(FinalizePolicy::Consume)).unwrap();
    master.add_input(local_partial(&[[1.0, 1.0]])).unwrap();
    master.compute().unwrap();
    master.add_input(local_partial(&[[2.0, 2.0]])).unwrap();
    master.finalize_compute().unwrap();
    assert_eq!(master.get_result(TotalsResult::Total).unwrap().as_slice(), &[3.0, 3.0]);
}

#[test]
fn test_master_without_inputs_is_empty() {
    let mut master = DistributedMaster::new(Totals::shared(FinalizePolicy::Consume)).unwrap();
    assert!(matches!(master.compute(), Err(Error::EmptyComputation(_))));
    assert!(matches!(
        master.finalize_compute(),
        Err(Error::EmptyComputation(_))
    ));
}

#[test]
fn test_master_rejects_inputs_after_finalize() {
    let mut master = DistributedMaster::new(Totals::shared(FinalizePolicy::Consume)).unwrap();
    master.add_input(local_partial(&[[1.0, 1.0]])).unwrap();
    master.finalize_compute().unwrap();

    let late = local_partial(&[[2.0, 2.0]]);
    assert!(matches!(
        master.add_input(late.clone()),
        Err(Error::InvalidState { .. })
    ));
    assert!(matches!(
        master.finalize_compute(),
        Err(Error::InvalidState { .. })
    ));

    master.reset();
    assert_eq!(master.state(), MasterState::Collecting);
    master.add_input(late).unwrap();
    master.finalize_compute().unwrap();
    assert_eq!(master.get_result(TotalsResult::Total).unwrap().as_slice(), &[2.0, 2.0]);
}

#[test]
fn test_master_rejects_incompatible_partials() {
    let master = DistributedMaster::new(Totals::shared(FinalizePolicy::Consume)).unwrap();
    master.add_input(local_partial(&[[1.0, 1.0]])).unwrap();

    let foreign = PartialResult::<f64>::new(AlgorithmId(7), METHOD);
    assert!(matches!(
        master.add_input(foreign),
        Err(Error::TypeMismatch { .. })
    ));

    let wider = PartialResult::<f64>::new(ALGORITHM, METHOD)
        .with_table(TotalsPartial::Sum, 1, 3)
        .unwrap();
    assert!(matches!(
        master.add_input(wider),
        Err(Error::DimensionMismatch { .. })
    ));
    assert_eq!(master.pending_inputs(), 1);
}

#[test]
fn test_master_waits_for_expected_inputs() {
    let mut master = DistributedMaster::new(Totals::shared(FinalizePolicy::Consume))
        .unwrap()
        .with_expected_inputs(2);
    master.add_input(local_partial(&[[1.0, 1.0]])).unwrap();
    assert!(matches!(master.compute(), Err(Error::InvalidState { .. })));
    assert_eq!(master.pending_inputs(), 1);

    master.add_input(local_partial(&[[1.0, 1.0]])).unwrap();
    master.compute().unwrap();
    assert_eq!(master.received_inputs(), 2);
}

#[test]
fn test_master_accepts_concurrent_producers() {
    let mut master = DistributedMaster::new(Totals::shared(FinalizePolicy::Consume))
        .unwrap()
        .with_expected_inputs(8);

    let payloads: Vec<Vec<u8>> = (0..8)
        .map(|i| {
            let mut local =
                DistributedLocal::new(Totals::shared(FinalizePolicy::Consume)).unwrap();
            local.set_input(TotalsInput::Data, table(&[[i as f64, 1.0]]));
            local.compute().unwrap();
            local.encode_partial().unwrap()
        })
        .collect();

    thread::scope(|scope| {
        for bytes in &payloads {
            let master = &master;
            scope.spawn(move || master.add_serialized(bytes).unwrap());
        }
    });

    assert_eq!(master.received_inputs(), 8);
    master.finalize_compute().unwrap();
    let total = master.get_result(TotalsResult::Total).unwrap();
    assert_relative_eq!(total.get(0, 0), 28.0);
    assert_relative_eq!(total.get(0, 1), 8.0);
}

#[test]
fn test_batch_only_kernel_rejects_other_modes() {
    struct BatchOnly;
    impl KernelStrategy<f64> for BatchOnly {
        fn name(&self) -> &'static str {
            "batch-only"
        }
        fn algorithm(&self) -> AlgorithmId {
            ALGORITHM
        }
        fn method(&self) -> MethodId {
            MethodId(1)
        }
        fn cpu(&self) -> CpuType {
            CpuType::Baseline
        }
        fn check_input(&self, _: &InputBundle<f64>, _: &ParameterBundle) -> Result<()> {
            Ok(())
        }
        fn result_layout(&self, _: &InputBundle<f64>, _: &ParameterBundle) -> Result<ResultLayout> {
            Ok(ResultLayout::new())
        }
        fn compute(&self, _: &InputBundle<f64>, _: &ParameterBundle, _: &mut ResultBundle<f64>) -> Result<()> {
            Ok(())
        }
    }

    let kernel: Arc<dyn KernelStrategy<f64>> = Arc::new(BatchOnly);
    assert!(Batch::new(Arc::clone(&kernel)).is_ok());
    assert!(matches!(
        Online::new(Arc::clone(&kernel)),
        Err(Error::UnsupportedConfiguration(_))
    ));
    assert!(matches!(
        DistributedMaster::new(kernel),
        Err(Error::UnsupportedConfiguration(_))
    ));
}
