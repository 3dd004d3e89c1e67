//! Covariance configuration

use crate::CovarianceParameter;
use numkernel_core::{Error, ParameterBundle, Result};
use serde::{Deserialize, Serialize};

/// Matrix produced in the `Covariance` result slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMatrix {
    #[default]
    Covariance,
    Correlation,
}

impl OutputMatrix {
    pub fn code(self) -> u32 {
        match self {
            Self::Covariance => 0,
            Self::Correlation => 1,
        }
    }

    pub fn from_code(code: u32) -> Result<Self> {
        match code {
            0 => Ok(Self::Covariance),
            1 => Ok(Self::Correlation),
            other => Err(Error::InvalidParameter(format!(
                "outputMatrix must be 0 (covariance) or 1 (correlation), got {other}"
            ))),
        }
    }
}

/// Divisor applied to the centered cross product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Estimator {
    /// Divide by `n - 1`
    #[default]
    Unbiased,
    /// Divide by `n`
    Biased,
}

impl Estimator {
    pub fn code(self) -> u32 {
        match self {
            Self::Unbiased => 0,
            Self::Biased => 1,
        }
    }

    pub fn from_code(code: u32) -> Result<Self> {
        match code {
            0 => Ok(Self::Unbiased),
            1 => Ok(Self::Biased),
            other => Err(Error::InvalidParameter(format!(
                "estimator must be 0 (unbiased) or 1 (biased), got {other}"
            ))),
        }
    }
}

/// Typed covariance parameters
///
/// Unset bundle entries fall back to the defaults: covariance matrix,
/// unbiased estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CovarianceParams {
    pub output_matrix: OutputMatrix,
    pub estimator: Estimator,
}

impl CovarianceParams {
    pub fn correlation() -> Self {
        Self {
            output_matrix: OutputMatrix::Correlation,
            ..Self::default()
        }
    }

    pub fn with_estimator(mut self, estimator: Estimator) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn to_bundle(&self) -> ParameterBundle {
        ParameterBundle::builder()
            .choice(CovarianceParameter::OutputMatrix, self.output_matrix.code())
            .choice(CovarianceParameter::Estimator, self.estimator.code())
            .build()
    }

    pub fn from_bundle(params: &ParameterBundle) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            output_matrix: OutputMatrix::from_code(
                params.choice_or(CovarianceParameter::OutputMatrix, defaults.output_matrix.code())?,
            )?,
            estimator: Estimator::from_code(
                params.choice_or(CovarianceParameter::Estimator, defaults.estimator.code())?,
            )?,
        })
    }
}

impl From<CovarianceParams> for ParameterBundle {
    fn from(params: CovarianceParams) -> Self {
        params.to_bundle()
    }
}
