//! Prediction from trained coefficients

use crate::{method, PredictionInput, PredictionResult, PREDICTION};
use numkernel_core::kernel::require_rows;
use numkernel_core::prelude::*;
use std::marker::PhantomData;
use tracing::instrument;

/// Write `data * beta'` plus intercepts into `out` (`n x k`)
pub(crate) fn predict_into<T: Numeric, P: ComputePrimitives<T>>(
    primitives: &P,
    data: &NumericTable<T>,
    beta: &DenseTable<T>,
    out: &mut DenseTable<T>,
) -> Result<()> {
    if beta.cols() != data.cols() + 1 {
        return Err(Error::size_mismatch(data.cols() + 1, beta.cols(), "beta columns"));
    }
    if out.shape() != (data.rows(), beta.rows()) {
        return Err(Error::size_mismatch(
            data.rows() * beta.rows(),
            out.rows() * out.cols(),
            "prediction table",
        ));
    }
    let block = data.block(0..data.rows())?;
    for (i, x) in block.iter_rows().enumerate() {
        let y = out.row_mut(i);
        for (c, target) in y.iter_mut().enumerate() {
            let coefficients = beta.row(c);
            let value = coefficients[0].as_f64() + primitives.dot_product(x, &coefficients[1..]);
            *target = T::from_f64(value);
        }
    }
    Ok(())
}

/// Batch-only prediction kernel
#[derive(Debug, Clone)]
pub struct LinearPrediction<T: Numeric, P: ComputePrimitives<T>> {
    primitives: P,
    cpu: CpuType,
    _phantom: PhantomData<T>,
}

impl<T: Numeric, P: ComputePrimitives<T>> LinearPrediction<T, P> {
    pub fn new(primitives: P, cpu: CpuType) -> Self {
        Self {
            primitives,
            cpu,
            _phantom: PhantomData,
        }
    }
}

impl<T: Numeric, P: ComputePrimitives<T>> KernelStrategy<T> for LinearPrediction<T, P> {
    fn name(&self) -> &'static str {
        "linear-regression/predict"
    }

    fn algorithm(&self) -> AlgorithmId {
        PREDICTION
    }

    fn method(&self) -> MethodId {
        method::DEFAULT
    }

    fn cpu(&self) -> CpuType {
        self.cpu
    }

    fn check_input(&self, input: &InputBundle<T>, _params: &ParameterBundle) -> Result<()> {
        let data = input.get(PredictionInput::Data)?;
        let beta = input.get(PredictionInput::Beta)?;
        require_rows(data.rows(), 1)?;
        beta.dense()?;
        if beta.cols() != data.cols() + 1 {
            return Err(Error::size_mismatch(data.cols() + 1, beta.cols(), "beta columns"));
        }
        Ok(())
    }

    fn result_layout(&self, input: &InputBundle<T>, _params: &ParameterBundle) -> Result<ResultLayout> {
        let rows = input.get(PredictionInput::Data)?.rows();
        let responses = input.get(PredictionInput::Beta)?.rows();
        Ok(ResultLayout::new().with(PredictionResult::Prediction, rows, responses))
    }

    #[instrument(skip_all, fields(backend = self.primitives.backend_name()))]
    fn compute(
        &self,
        input: &InputBundle<T>,
        _params: &ParameterBundle,
        result: &mut ResultBundle<T>,
    ) -> Result<()> {
        let data = input.get(PredictionInput::Data)?;
        let beta = input.get(PredictionInput::Beta)?.dense()?;
        predict_into(
            &self.primitives,
            data,
            beta,
            result.table_mut(PredictionResult::Prediction)?,
        )
    }
}
