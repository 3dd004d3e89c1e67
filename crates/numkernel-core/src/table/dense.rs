//! Dense row-major tables

use crate::error::{Error, Result};
use crate::numeric::Numeric;

/// Contiguous row-major `rows x cols` table
///
/// The column count is fixed once allocated. Rows can only be added or
/// removed through [`DenseTable::resize_rows`], which reallocates.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseTable<T: Numeric> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

/// Reserve `rows * cols` zeroed elements, reporting failure instead of aborting
pub(crate) fn zeroed_storage<T: Numeric>(rows: usize, cols: usize) -> Result<Vec<T>> {
    if rows == 0 || cols == 0 {
        return Err(Error::Allocation {
            rows,
            cols,
            reason: "dimensions must be positive".to_string(),
        });
    }
    let len = rows.checked_mul(cols).ok_or_else(|| Error::Allocation {
        rows,
        cols,
        reason: "element count overflows usize".to_string(),
    })?;
    let mut data = Vec::new();
    data.try_reserve_exact(len).map_err(|e| Error::Allocation {
        rows,
        cols,
        reason: e.to_string(),
    })?;
    data.resize(len, T::zero());
    Ok(data)
}

impl<T: Numeric> DenseTable<T> {
    /// Allocate a zero-filled table
    ///
    /// Fails with [`Error::Allocation`] for non-positive dimensions or when
    /// the memory cannot be reserved.
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        let data = zeroed_storage(rows, cols)?;
        Ok(Self { rows, cols, data })
    }

    /// Take ownership of row-major data
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        if cols == 0 {
            return Err(Error::Allocation {
                rows,
                cols,
                reason: "dimensions must be positive".to_string(),
            });
        }
        let expected = rows.checked_mul(cols).ok_or_else(|| Error::Allocation {
            rows,
            cols,
            reason: "element count overflows usize".to_string(),
        })?;
        if data.len() != expected {
            return Err(Error::size_mismatch(expected, data.len(), "dense table payload"));
        }
        Ok(Self { rows, cols, data })
    }

    /// Build a table from row slices, all of the same length
    pub fn from_rows<R: AsRef<[T]>>(rows: &[R]) -> Result<Self> {
        let cols = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(Error::size_mismatch(cols, row.len(), "row length"));
            }
            data.extend_from_slice(row);
        }
        Self::from_vec(rows.len(), cols, data)
    }

    /// A zero-row table with a fixed feature count
    ///
    /// Useful as an input that must be rejected by kernels; it cannot be
    /// produced by [`DenseTable::new`].
    pub fn empty(cols: usize) -> Self {
        Self {
            rows: 0,
            cols,
            data: Vec::new(),
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

    /// (rows, cols)
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Row `i` as a slice
    ///
    /// # Panics
    /// If `i >= rows`
    #[inline]
    pub fn row(&self, i: usize) -> &[T] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    #[inline]
    pub fn row_mut(&mut self, i: usize) -> &mut [T] {
        &mut self.data[i * self.cols..(i + 1) * self.cols]
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        self.data[row * self.cols + col] = value;
    }

    /// Overwrite every element with `value`
    pub fn fill(&mut self, value: T) {
        self.data.iter_mut().for_each(|x| *x = value);
    }

    /// Reallocate to `new_rows` rows, keeping the leading rows
    ///
    /// New rows are zero-filled.
    pub fn resize_rows(&mut self, new_rows: usize) -> Result<()> {
        let mut data = zeroed_storage::<T>(new_rows, self.cols)?;
        let keep = new_rows.min(self.rows) * self.cols;
        data[..keep].copy_from_slice(&self.data[..keep]);
        self.data = data;
        self.rows = new_rows;
        Ok(())
    }

    /// Copy column `j` into `out`
    pub fn column_into(&self, j: usize, out: &mut Vec<T>) {
        out.clear();
        out.extend((0..self.rows).map(|i| self.data[i * self.cols + j]));
    }

    /// Row-major values widened to f64
    pub fn to_f64_vec(&self) -> Vec<f64> {
        self.data.iter().map(|x| x.as_f64()).collect()
    }

    /// Overwrite the table from f64 values, narrowing as needed
    pub fn assign_f64(&mut self, values: &[f64]) -> Result<()> {
        if values.len() != self.data.len() {
            return Err(Error::size_mismatch(self.data.len(), values.len(), "table assignment"));
        }
        for (dst, &src) in self.data.iter_mut().zip(values) {
            *dst = T::from_f64(src);
        }
        Ok(())
    }
}
