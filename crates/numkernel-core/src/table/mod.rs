//! Numeric containers
//!
//! A [`NumericTable`] is a 2-D table of one floating-point width in either
//! dense row-major or CSR layout. Kernels read it through row blocks, which
//! hide the layout: a dense table lends its own storage, a CSR table lends a
//! cached dense materialization.

mod csr;
mod dense;

pub use csr::CsrTable;
pub use dense::DenseTable;

use crate::error::{Error, Result};
use crate::numeric::{FloatType, Numeric};
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// Storage layout of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layout {
    Dense,
    Csr,
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dense => f.write_str("dense"),
            Self::Csr => f.write_str("csr"),
        }
    }
}

/// A 2-D numeric table in one of the supported layouts
#[derive(Clone, Debug, PartialEq)]
pub enum NumericTable<T: Numeric> {
    Dense(DenseTable<T>),
    Csr(CsrTable<T>),
}

impl<T: Numeric> From<DenseTable<T>> for NumericTable<T> {
    fn from(table: DenseTable<T>) -> Self {
        Self::Dense(table)
    }
}

impl<T: Numeric> From<CsrTable<T>> for NumericTable<T> {
    fn from(table: CsrTable<T>) -> Self {
        Self::Csr(table)
    }
}

/// Conversion into a shared read-only table handle
///
/// Lets input setters accept owned tables of either layout as well as
/// handles the caller keeps sharing.
pub trait IntoSharedTable<T: Numeric> {
    fn into_shared(self) -> Arc<NumericTable<T>>;
}

impl<T: Numeric> IntoSharedTable<T> for Arc<NumericTable<T>> {
    fn into_shared(self) -> Arc<NumericTable<T>> {
        self
    }
}

impl<T: Numeric> IntoSharedTable<T> for NumericTable<T> {
    fn into_shared(self) -> Arc<NumericTable<T>> {
        Arc::new(self)
    }
}

impl<T: Numeric> IntoSharedTable<T> for DenseTable<T> {
    fn into_shared(self) -> Arc<NumericTable<T>> {
        Arc::new(NumericTable::Dense(self))
    }
}

impl<T: Numeric> IntoSharedTable<T> for CsrTable<T> {
    fn into_shared(self) -> Arc<NumericTable<T>> {
        Arc::new(NumericTable::Csr(self))
    }
}

impl<T: Numeric> NumericTable<T> {
    #[inline]
    pub fn rows(&self) -> usize {
        match self {
            Self::Dense(t) => t.rows(),
            Self::Csr(t) => t.rows(),
        }
    }

    #[inline]
    pub fn cols(&self) -> usize {
        match self {
            Self::Dense(t) => t.cols(),
            Self::Csr(t) => t.cols(),
        }
    }

    #[inline]
    pub fn layout(&self) -> Layout {
        match self {
            Self::Dense(_) => Layout::Dense,
            Self::Csr(_) => Layout::Csr,
        }
    }

    #[inline]
    pub fn float_type(&self) -> FloatType {
        T::FLOAT_TYPE
    }

    pub fn as_dense(&self) -> Option<&DenseTable<T>> {
        match self {
            Self::Dense(t) => Some(t),
            Self::Csr(_) => None,
        }
    }

    pub fn as_csr(&self) -> Option<&CsrTable<T>> {
        match self {
            Self::Csr(t) => Some(t),
            Self::Dense(_) => None,
        }
    }

    /// Dense table or [`Error::TypeMismatch`]
    pub fn dense(&self) -> Result<&DenseTable<T>> {
        self.as_dense()
            .ok_or_else(|| Error::type_mismatch("dense table", format!("{} table", self.layout())))
    }

    /// CSR table or [`Error::TypeMismatch`]
    pub fn csr(&self) -> Result<&CsrTable<T>> {
        self.as_csr()
            .ok_or_else(|| Error::type_mismatch("csr table", format!("{} table", self.layout())))
    }

    fn check_range(&self, rows: &Range<usize>) -> Result<()> {
        if rows.start > rows.end || rows.end > self.rows() {
            return Err(Error::RowRange {
                start: rows.start,
                end: rows.end,
                rows: self.rows(),
            });
        }
        Ok(())
    }

    /// Read-only view of `rows` in dense row-major form
    ///
    /// For CSR tables the first call materializes a dense copy, which later
    /// calls reuse.
    pub fn block(&self, rows: Range<usize>) -> Result<RowBlock<'_, T>> {
        self.check_range(&rows)?;
        let cols = self.cols();
        let storage = match self {
            Self::Dense(t) => t.as_slice(),
            Self::Csr(t) => t.materialized()?,
        };
        Ok(RowBlock {
            first_row: rows.start,
            rows: rows.end - rows.start,
            cols,
            data: &storage[rows.start * cols..rows.end * cols],
        })
    }

    /// Read-write view of `rows`, dense tables only
    pub fn block_mut(&mut self, rows: Range<usize>) -> Result<RowBlockMut<'_, T>> {
        self.check_range(&rows)?;
        let layout = self.layout();
        match self {
            Self::Dense(t) => {
                let cols = t.cols();
                Ok(RowBlockMut {
                    first_row: rows.start,
                    rows: rows.end - rows.start,
                    cols,
                    data: &mut t.as_mut_slice()[rows.start * cols..rows.end * cols],
                })
            }
            Self::Csr(_) => Err(Error::type_mismatch(
                "dense table for write access",
                format!("{layout} table"),
            )),
        }
    }
}

/// Borrowed row-major block of a table
#[derive(Debug, Clone, Copy)]
pub struct RowBlock<'a, T> {
    first_row: usize,
    rows: usize,
    cols: usize,
    data: &'a [T],
}

impl<'a, T: Numeric> RowBlock<'a, T> {
    /// Index of the first row in the owning table
    #[inline]
    pub fn first_row(&self) -> usize {
        self.first_row
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    /// Row `i` relative to the block
    #[inline]
    pub fn row(&self, i: usize) -> &'a [T] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &'a [T]> + 'a {
        self.data.chunks_exact(self.cols.max(1))
    }

    /// Give the block back to its table
    pub fn release(self) {}
}

/// Mutable row-major block of a dense table
#[derive(Debug)]
pub struct RowBlockMut<'a, T> {
    first_row: usize,
    rows: usize,
    cols: usize,
    data: &'a mut [T],
}

impl<'a, T: Numeric> RowBlockMut<'a, T> {
    #[inline]
    pub fn first_row(&self) -> usize {
        self.first_row
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn row_mut(&mut self, i: usize) -> &mut [T] {
        &mut self.data[i * self.cols..(i + 1) * self.cols]
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut *self.data
    }

    /// Give the block back; writes are already visible in the table
    pub fn release(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dense() -> NumericTable<f64> {
        DenseTable::from_rows(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0], [7.0, 8.0]])
            .unwrap()
            .into()
    }

    #[test]
    fn test_dense_block_borrows_rows() {
        let t = dense();
        let block = t.block(1..3).unwrap();
        assert_eq!(block.first_row(), 1);
        assert_eq!(block.rows(), 2);
        assert_eq!(block.row(0), &[3.0, 4.0]);
        assert_eq!(block.iter_rows().count(), 2);
        block.release();
    }

    #[test]
    fn test_block_out_of_range() {
        let t = dense();
        assert!(matches!(
            t.block(2..5),
            Err(Error::RowRange { start: 2, end: 5, rows: 4 })
        ));
        let empty = t.block(4..4).unwrap();
        assert_eq!(empty.rows(), 0);
    }

    #[test]
    fn test_csr_block_matches_dense() {
        let d = dense();
        let csr: NumericTable<f64> = CsrTable::from_dense(d.dense().unwrap()).into();
        assert_eq!(csr.layout(), Layout::Csr);
        assert_eq!(csr.block(0..4).unwrap().as_slice(), d.block(0..4).unwrap().as_slice());
        assert!(csr.as_csr().unwrap().is_materialized());
    }

    #[test]
    fn test_block_mut_writes_through() {
        let mut t = dense();
        {
            let mut block = t.block_mut(2..3).unwrap();
            block.row_mut(0)[1] = -1.0;
            block.release();
        }
        assert_eq!(t.dense().unwrap().get(2, 1), -1.0);

        let mut csr: NumericTable<f64> = CsrTable::from_dense(t.dense().unwrap()).into();
        assert!(matches!(csr.block_mut(0..1), Err(Error::TypeMismatch { .. })));
    }

    #[test]
    fn test_layout_accessors() {
        let t = dense();
        assert!(t.dense().is_ok());
        assert!(matches!(t.csr(), Err(Error::TypeMismatch { .. })));
        assert_eq!(t.float_type(), FloatType::F64);
    }
}
