//! Parameter bundles

use super::BundleId;
use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// One configuration value
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Scalar(f64),
    Integer(u64),
    Flag(bool),
    /// Index into an algorithm-defined enumeration
    Choice(u32),
    Vector(Vec<f64>),
}

impl ParameterValue {
    fn kind(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::Integer(_) => "integer",
            Self::Flag(_) => "flag",
            Self::Choice(_) => "choice",
            Self::Vector(_) => "vector",
        }
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        Self::Scalar(v)
    }
}

impl From<u64> for ParameterValue {
    fn from(v: u64) -> Self {
        Self::Integer(v)
    }
}

impl From<usize> for ParameterValue {
    fn from(v: usize) -> Self {
        Self::Integer(v as u64)
    }
}

impl From<bool> for ParameterValue {
    fn from(v: bool) -> Self {
        Self::Flag(v)
    }
}

impl From<Vec<f64>> for ParameterValue {
    fn from(v: Vec<f64>) -> Self {
        Self::Vector(v)
    }
}

/// Immutable set of algorithm parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterBundle {
    entries: BTreeMap<u32, (&'static str, ParameterValue)>,
}

/// Builder for [`ParameterBundle`]
#[derive(Debug, Default)]
pub struct ParameterBundleBuilder {
    entries: BTreeMap<u32, (&'static str, ParameterValue)>,
}

impl ParameterBundleBuilder {
    /// Set a parameter, replacing any earlier value
    pub fn set<K: BundleId>(mut self, id: K, value: impl Into<ParameterValue>) -> Self {
        self.entries.insert(id.code(), (id.name(), value.into()));
        self
    }

    /// Set an enumerated choice
    pub fn choice<K: BundleId>(self, id: K, choice: u32) -> Self {
        self.set(id, ParameterValue::Choice(choice))
    }

    pub fn build(self) -> ParameterBundle {
        ParameterBundle {
            entries: self.entries,
        }
    }
}

impl ParameterBundle {
    pub fn builder() -> ParameterBundleBuilder {
        ParameterBundleBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains<K: BundleId>(&self, id: K) -> bool {
        self.entries.contains_key(&id.code())
    }

    /// Raw value of `id`, or [`Error::MissingArgument`]
    pub fn get<K: BundleId>(&self, id: K) -> Result<&ParameterValue> {
        self.entries
            .get(&id.code())
            .map(|(_, v)| v)
            .ok_or_else(|| Error::missing(id.name()))
    }

    fn wrong_type<K: BundleId>(id: K, expected: &str, actual: &ParameterValue) -> Error {
        Error::InvalidParameter(format!(
            "{} must be a {expected}, got {}",
            id.name(),
            actual.kind()
        ))
    }

    pub fn get_f64<K: BundleId>(&self, id: K) -> Result<f64> {
        match self.get(id)? {
            ParameterValue::Scalar(v) => Ok(*v),
            other => Err(Self::wrong_type(id, "scalar", other)),
        }
    }

    pub fn get_usize<K: BundleId>(&self, id: K) -> Result<usize> {
        match self.get(id)? {
            ParameterValue::Integer(v) => usize::try_from(*v).map_err(|_| {
                Error::InvalidParameter(format!("{} = {v} does not fit in usize", id.name()))
            }),
            other => Err(Self::wrong_type(id, "integer", other)),
        }
    }

    pub fn get_flag<K: BundleId>(&self, id: K) -> Result<bool> {
        match self.get(id)? {
            ParameterValue::Flag(v) => Ok(*v),
            other => Err(Self::wrong_type(id, "flag", other)),
        }
    }

    pub fn get_choice<K: BundleId>(&self, id: K) -> Result<u32> {
        match self.get(id)? {
            ParameterValue::Choice(v) => Ok(*v),
            other => Err(Self::wrong_type(id, "choice", other)),
        }
    }

    pub fn get_vector<K: BundleId>(&self, id: K) -> Result<&[f64]> {
        match self.get(id)? {
            ParameterValue::Vector(v) => Ok(v),
            other => Err(Self::wrong_type(id, "vector", other)),
        }
    }

    /// Flag value, falling back to `default` when unset
    pub fn flag_or<K: BundleId>(&self, id: K, default: bool) -> Result<bool> {
        if self.contains(id) {
            self.get_flag(id)
        } else {
            Ok(default)
        }
    }

    /// Choice value, falling back to `default` when unset
    pub fn choice_or<K: BundleId>(&self, id: K, default: u32) -> Result<u32> {
        if self.contains(id) {
            self.get_choice(id)
        } else {
            Ok(default)
        }
    }
}
