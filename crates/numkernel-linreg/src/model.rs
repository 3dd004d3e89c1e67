//! Trained linear model

use crate::prediction::predict_into;
use crate::params::LinearRegressionParams;
use crate::TrainingResult;
use numkernel_core::serialization::{tag_for, tags, Decoder, Encoder, Serializable};
use numkernel_core::{DenseTable, Error, NumericTable, Numeric, ResultBundle, Result, ScalarBackend};

/// Coefficients produced by training, ready for prediction or transport
///
/// `beta` is `k x (p + 1)`: one row per response, intercept in column 0.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel<T: Numeric> {
    beta: DenseTable<T>,
    intercept: bool,
}

impl<T: Numeric> LinearModel<T> {
    pub fn new(beta: DenseTable<T>, intercept: bool) -> Result<Self> {
        if beta.cols() < 2 {
            return Err(Error::size_mismatch(2, beta.cols(), "beta columns"));
        }
        Ok(Self { beta, intercept })
    }

    /// Take the coefficients out of a training result bundle
    pub fn from_result(result: &ResultBundle<T>, params: &LinearRegressionParams) -> Result<Self> {
        Self::new(result.get(TrainingResult::Beta)?.clone(), params.intercept)
    }

    pub fn beta(&self) -> &DenseTable<T> {
        &self.beta
    }

    pub fn has_intercept(&self) -> bool {
        self.intercept
    }

    pub fn n_features(&self) -> usize {
        self.beta.cols() - 1
    }

    pub fn n_responses(&self) -> usize {
        self.beta.rows()
    }

    /// Predict on the portable backend
    pub fn predict(&self, data: &NumericTable<T>) -> Result<DenseTable<T>> {
        let mut out = DenseTable::new(data.rows(), self.n_responses())?;
        predict_into(&ScalarBackend::new(), data, &self.beta, &mut out)?;
        Ok(out)
    }
}

impl<T: Numeric> Serializable for LinearModel<T> {
    const TAG: u32 = tag_for(T::FLOAT_TYPE, tags::LINEAR_MODEL_F32, tags::LINEAR_MODEL_F64);

    fn encode_fields(&self, out: &mut Encoder) {
        out.put_bool(self.intercept);
        self.beta.encode_fields(out);
    }

    fn decode_fields(input: &mut Decoder<'_>) -> Result<Self> {
        let intercept = input.get_bool()?;
        let beta = DenseTable::decode_fields(input)?;
        Self::new(beta, intercept)
            .map_err(|e| Error::CorruptStream(format!("linear model: {e}")))
    }
}
