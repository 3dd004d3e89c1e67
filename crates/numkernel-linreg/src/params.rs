use crate::TrainingParameter;
use numkernel_core::{ParameterBundle, Result};
use serde::{Deserialize, Serialize};

/// Linear regression training parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearRegressionParams {
    /// Fit an intercept term; when off, column 0 of `Beta` is zero
    pub intercept: bool,
}

impl Default for LinearRegressionParams {
    fn default() -> Self {
        Self { intercept: true }
    }
}

impl LinearRegressionParams {
    pub fn without_intercept() -> Self {
        Self { intercept: false }
    }

    pub fn to_bundle(&self) -> ParameterBundle {
        ParameterBundle::builder()
            .set(TrainingParameter::Intercept, self.intercept)
            .build()
    }

    pub fn from_bundle(params: &ParameterBundle) -> Result<Self> {
        Ok(Self {
            intercept: params.flag_or(TrainingParameter::Intercept, true)?,
        })
    }
}

impl From<LinearRegressionParams> for ParameterBundle {
    fn from(params: LinearRegressionParams) -> Self {
        params.to_bundle()
    }
}
