//! Compressed sparse row tables

use super::dense::zeroed_storage;
use crate::error::{Error, Result};
use crate::numeric::Numeric;
use std::sync::OnceLock;

/// Compressed-sparse-row table
///
/// Row `i` owns the entries `row_offsets[i]..row_offsets[i + 1]` of `values`
/// and `column_indices`. Offsets and indices are zero-based and column
/// indices are strictly increasing within a row.
///
/// The first dense block request materializes a row-major copy that is cached
/// for the lifetime of the table.
#[derive(Clone, Debug)]
pub struct CsrTable<T: Numeric> {
    rows: usize,
    cols: usize,
    values: Vec<T>,
    column_indices: Vec<usize>,
    row_offsets: Vec<usize>,
    dense: OnceLock<Vec<T>>,
}

impl<T: Numeric> PartialEq for CsrTable<T> {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows
            && self.cols == other.cols
            && self.values == other.values
            && self.column_indices == other.column_indices
            && self.row_offsets == other.row_offsets
    }
}

impl<T: Numeric> CsrTable<T> {
    /// Build a CSR table from its three arrays, validating their structure
    pub fn new(
        rows: usize,
        cols: usize,
        values: Vec<T>,
        column_indices: Vec<usize>,
        row_offsets: Vec<usize>,
    ) -> Result<Self> {
        if cols == 0 {
            return Err(Error::Allocation {
                rows,
                cols,
                reason: "dimensions must be positive".to_string(),
            });
        }
        if row_offsets.len() != rows + 1 {
            return Err(Error::size_mismatch(rows + 1, row_offsets.len(), "csr row offsets"));
        }
        if values.len() != column_indices.len() {
            return Err(Error::size_mismatch(
                values.len(),
                column_indices.len(),
                "csr column indices",
            ));
        }
        if row_offsets[0] != 0 || row_offsets[rows] != values.len() {
            return Err(Error::size_mismatch(
                values.len(),
                row_offsets[rows],
                "csr final row offset",
            ));
        }
        for i in 0..rows {
            let (start, end) = (row_offsets[i], row_offsets[i + 1]);
            if start > end || end > values.len() {
                return Err(Error::type_mismatch(
                    "non-decreasing csr row offsets",
                    format!("offset {start} > {end} at row {i}"),
                ));
            }
            let cols_in_row = &column_indices[start..end];
            if cols_in_row.iter().any(|&c| c >= cols) {
                return Err(Error::type_mismatch(
                    format!("column indices below {cols}"),
                    format!("out-of-range column in row {i}"),
                ));
            }
            if cols_in_row.windows(2).any(|w| w[0] >= w[1]) {
                return Err(Error::type_mismatch(
                    "strictly increasing column indices",
                    format!("unsorted or duplicate column in row {i}"),
                ));
            }
        }
        Ok(Self {
            rows,
            cols,
            values,
            column_indices,
            row_offsets,
            dense: OnceLock::new(),
        })
    }

    /// Compress a dense row-major table, dropping exact zeros
    pub fn from_dense(table: &super::DenseTable<T>) -> Self {
        let mut values = Vec::new();
        let mut column_indices = Vec::new();
        let mut row_offsets = Vec::with_capacity(table.rows() + 1);
        row_offsets.push(0);
        for i in 0..table.rows() {
            for (j, &v) in table.row(i).iter().enumerate() {
                if v != T::zero() {
                    values.push(v);
                    column_indices.push(j);
                }
            }
            row_offsets.push(values.len());
        }
        Self {
            rows: table.rows(),
            cols: table.cols(),
            values,
            column_indices,
            row_offsets,
            dense: OnceLock::new(),
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of stored (non-zero) entries
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    #[inline]
    pub fn column_indices(&self) -> &[usize] {
        &self.column_indices
    }

    #[inline]
    pub fn row_offsets(&self) -> &[usize] {
        &self.row_offsets
    }

    /// Column indices and values of row `i`
    #[inline]
    pub fn row(&self, i: usize) -> (&[usize], &[T]) {
        let (start, end) = (self.row_offsets[i], self.row_offsets[i + 1]);
        (&self.column_indices[start..end], &self.values[start..end])
    }

    /// Whether the dense view has been materialized
    pub fn is_materialized(&self) -> bool {
        self.dense.get().is_some()
    }

    /// Row-major dense copy, built on first use and cached
    pub(crate) fn materialized(&self) -> Result<&[T]> {
        if let Some(dense) = self.dense.get() {
            return Ok(dense);
        }
        let mut dense = zeroed_storage::<T>(self.rows.max(1), self.cols)?;
        dense.truncate(self.rows * self.cols);
        for i in 0..self.rows {
            let (cols, vals) = self.row(i);
            let base = i * self.cols;
            for (&c, &v) in cols.iter().zip(vals) {
                dense[base + c] = v;
            }
        }
        log::trace!(
            "materialized {}x{} csr table ({} non-zeros)",
            self.rows,
            self.cols,
            self.nnz()
        );
        Ok(self.dense.get_or_init(|| dense))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::DenseTable;

    fn sample() -> CsrTable<f64> {
        // [[1, 0, 2], [0, 0, 0], [0, 3, 0]]
        CsrTable::new(3, 3, vec![1.0, 2.0, 3.0], vec![0, 2, 1], vec![0, 2, 2, 3]).unwrap()
    }

    #[test]
    fn test_structure_accessors() {
        let t = sample();
        assert_eq!(t.nnz(), 3);
        assert_eq!(t.row_offsets(), &[0, 2, 2, 3]);
        assert_eq!(t.column_indices(), &[0, 2, 1]);
        let (cols, vals) = t.row(1);
        assert!(cols.is_empty() && vals.is_empty());
    }

    #[test]
    fn test_invalid_structures_rejected() {
        assert!(CsrTable::<f64>::new(2, 2, vec![1.0], vec![0], vec![0, 1]).is_err());
        assert!(CsrTable::<f64>::new(1, 2, vec![1.0], vec![5], vec![0, 1]).is_err());
        assert!(
            CsrTable::<f64>::new(1, 3, vec![1.0, 2.0], vec![2, 1], vec![0, 2]).is_err()
        );
        assert!(CsrTable::<f64>::new(1, 2, vec![1.0], vec![0, 1], vec![0, 1]).is_err());
    }

    #[test]
    fn test_materialization_is_cached() {
        let t = sample();
        assert!(!t.is_materialized());
        let first = t.materialized().unwrap().as_ptr();
        assert!(t.is_materialized());
        let second = t.materialized().unwrap();
        assert_eq!(first, second.as_ptr());
        assert_eq!(second, &[1.0, 0.0, 2.0, 0.0, 0.0, 0.0, 0.0, 3.0, 0.0]);
    }

    #[test]
    fn test_from_dense_round_trip() {
        let dense = DenseTable::from_rows(&[[0.0f32, 4.0], [5.0, 0.0]]).unwrap();
        let csr = CsrTable::from_dense(&dense);
        assert_eq!(csr.nnz(), 2);
        assert_eq!(csr.materialized().unwrap(), dense.as_slice());
    }
}
