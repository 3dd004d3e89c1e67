//! Partial results: sufficient statistics carried between increments

use super::{AlgorithmId, BundleId, MethodId};
use crate::error::{Error, Result};
use crate::numeric::Numeric;
use crate::table::DenseTable;
use std::collections::BTreeMap;

/// Accumulator state of an online or distributed computation
///
/// Table sizes depend only on the feature count and parameters, never on how
/// many increments were folded in.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialResult<T: Numeric> {
    algorithm: AlgorithmId,
    method: MethodId,
    n_observations: u64,
    tables: BTreeMap<u32, DenseTable<T>>,
}

impl<T: Numeric> PartialResult<T> {
    /// Empty accumulator for `(algorithm, method)`
    pub fn new(algorithm: AlgorithmId, method: MethodId) -> Self {
        Self {
            algorithm,
            method,
            n_observations: 0,
            tables: BTreeMap::new(),
        }
    }

    /// Add a zero-filled `rows x cols` statistic
    pub fn with_table<K: BundleId>(mut self, id: K, rows: usize, cols: usize) -> Result<Self> {
        self.tables.insert(id.code(), DenseTable::new(rows, cols)?);
        Ok(self)
    }

    /// Add a statistic filled with `value`
    pub fn with_filled<K: BundleId>(
        self,
        id: K,
        rows: usize,
        cols: usize,
        value: T,
    ) -> Result<Self> {
        let mut this = self.with_table(id, rows, cols)?;
        this.table_mut(id)?.fill(value);
        Ok(this)
    }

    #[inline]
    pub fn algorithm(&self) -> AlgorithmId {
        self.algorithm
    }

    #[inline]
    pub fn method(&self) -> MethodId {
        self.method
    }

    /// Number of observations folded in so far
    #[inline]
    pub fn n_observations(&self) -> u64 {
        self.n_observations
    }

    pub fn set_n_observations(&mut self, n: u64) {
        self.n_observations = n;
    }

    pub fn add_observations(&mut self, n: u64) {
        self.n_observations += n;
    }

    pub fn is_empty(&self) -> bool {
        self.n_observations == 0
    }

    pub fn table<K: BundleId>(&self, id: K) -> Result<&DenseTable<T>> {
        self.tables
            .get(&id.code())
            .ok_or_else(|| Error::missing(id.name()))
    }

    pub fn table_mut<K: BundleId>(&mut self, id: K) -> Result<&mut DenseTable<T>> {
        self.tables
            .get_mut(&id.code())
            .ok_or_else(|| Error::missing(id.name()))
    }

    /// (code, table) pairs in code order
    pub fn tables(&self) -> impl Iterator<Item = (u32, &DenseTable<T>)> + '_ {
        self.tables.iter().map(|(code, t)| (*code, t))
    }

    pub(crate) fn insert_raw(&mut self, code: u32, table: DenseTable<T>) {
        self.tables.insert(code, table);
    }

    /// Check that `other` can be merged into `self`
    ///
    /// Partials from a different algorithm or method are a type mismatch;
    /// differently-shaped statistics are a dimension mismatch.
    pub fn check_compatible(&self, other: &Self) -> Result<()> {
        if self.algorithm != other.algorithm || self.method != other.method {
            return Err(Error::type_mismatch(
                format!("partial of {}/{}", self.algorithm, self.method),
                format!("partial of {}/{}", other.algorithm, other.method),
            ));
        }
        if self.tables.len() != other.tables.len() {
            return Err(Error::size_mismatch(
                self.tables.len(),
                other.tables.len(),
                "partial result statistics",
            ));
        }
        for ((code_a, a), (code_b, b)) in self.tables.iter().zip(other.tables.iter()) {
            if code_a != code_b {
                return Err(Error::type_mismatch(
                    format!("statistic {code_a}"),
                    format!("statistic {code_b}"),
                ));
            }
            if a.rows() != b.rows() {
                return Err(Error::size_mismatch(
                    a.rows(),
                    b.rows(),
                    &format!("rows of partial statistic {code_a}"),
                ));
            }
            if a.cols() != b.cols() {
                return Err(Error::size_mismatch(
                    a.cols(),
                    b.cols(),
                    &format!("columns of partial statistic {code_a}"),
                ));
            }
        }
        Ok(())
    }
}
