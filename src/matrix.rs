//! Dense byte matrices over GF(2^8)
//!
//! Matrices are row vectors of bytes with runtime dimensions. Inversion is
//! Gauss-Jordan elimination over the augmented matrix `[A | I]`: row
//! operations reduce the left half to the identity and the right half
//! becomes the inverse. A failed pivot search surfaces as
//! [`Error::SingularMatrix`].
//!
//! # Note
//! This module is public for benchmarks and tests but not part of the stable
//! API. Use `ReedSolomon` from the crate root instead.

use crate::errors::{Error, Result};
use crate::galois::{gal_divide, gal_exp, gal_multiply};

/// A matrix over GF(2^8). All rows share the same column count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Matrix {
    data: Vec<Vec<u8>>,
}

impl Matrix {
    /// Create a zero-filled matrix
    pub fn new(rows: usize, cols: usize) -> Matrix {
        Matrix {
            data: vec![vec![0u8; cols]; rows],
        }
    }

    /// Create an identity matrix
    pub fn identity(size: usize) -> Matrix {
        let mut m = Matrix::new(size, size);
        for i in 0..size {
            m.data[i][i] = 1;
        }
        m
    }

    /// Create a Vandermonde matrix: `m[r][c] = r^c`
    ///
    /// Any square subset of rows is invertible, which is the property the
    /// systematic code construction relies on.
    pub fn vandermonde(rows: usize, cols: usize) -> Matrix {
        let mut m = Matrix::new(rows, cols);
        for r in 0..rows {
            for c in 0..cols {
                m.data[r][c] = gal_exp(r as u8, c);
            }
        }
        m
    }

    pub fn rows(&self) -> usize {
        self.data.len()
    }

    pub fn cols(&self) -> usize {
        self.data.first().map_or(0, Vec::len)
    }

    pub fn is_square(&self) -> bool {
        self.rows() == self.cols()
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.data[row][col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: u8) {
        self.data[row][col] = value;
    }

    /// Borrow a row as a byte slice
    #[inline]
    pub fn row(&self, row: usize) -> &[u8] {
        &self.data[row]
    }

    /// Matrix product `self * right`
    pub fn multiply(&self, right: &Matrix) -> Result<Matrix> {
        if self.cols() != right.rows() {
            return Err(Error::MatrixSize);
        }
        let mut result = Matrix::new(self.rows(), right.cols());
        for r in 0..self.rows() {
            for c in 0..right.cols() {
                let mut value = 0u8;
                for i in 0..self.cols() {
                    value ^= gal_multiply(self.data[r][i], right.data[i][c]);
                }
                result.data[r][c] = value;
            }
        }
        Ok(result)
    }

    /// Concatenate `right` onto the end of each row
    pub fn augment(&self, right: &Matrix) -> Result<Matrix> {
        if self.rows() != right.rows() {
            return Err(Error::MatrixSize);
        }
        let mut result = Matrix::new(self.rows(), self.cols() + right.cols());
        for r in 0..self.rows() {
            result.data[r][..self.cols()].copy_from_slice(&self.data[r]);
            result.data[r][self.cols()..].copy_from_slice(&right.data[r]);
        }
        Ok(result)
    }

    /// Materialized copy of the rectangle `[rmin, rmax) x [cmin, cmax)`
    pub fn sub_matrix(&self, rmin: usize, cmin: usize, rmax: usize, cmax: usize) -> Matrix {
        let mut result = Matrix::new(rmax - rmin, cmax - cmin);
        for r in rmin..rmax {
            result.data[r - rmin].copy_from_slice(&self.data[r][cmin..cmax]);
        }
        result
    }

    pub fn swap_rows(&mut self, r1: usize, r2: usize) {
        self.data.swap(r1, r2);
    }

    /// Invert a square matrix
    ///
    /// Returns [`Error::SingularMatrix`] if no pivot can be found for some
    /// column, [`Error::MatrixSize`] if the matrix is not square.
    pub fn invert(&self) -> Result<Matrix> {
        if !self.is_square() {
            return Err(Error::MatrixSize);
        }
        let size = self.rows();
        let mut work = self.augment(&Matrix::identity(size))?;
        work.gaussian_elimination()?;
        Ok(work.sub_matrix(0, size, size, size * 2))
    }

    fn gaussian_elimination(&mut self) -> Result<()> {
        let rows = self.rows();
        let cols = self.cols();

        // Clear the area below the main diagonal
        for r in 0..rows {
            if self.data[r][r] == 0 {
                let below = ((r + 1)..rows).find(|&below| self.data[below][r] != 0);
                match below {
                    Some(below) => self.swap_rows(r, below),
                    None => return Err(Error::SingularMatrix),
                }
            }
            // Scale to 1
            if self.data[r][r] != 1 {
                let scale = gal_divide(1, self.data[r][r]);
                for c in 0..cols {
                    self.data[r][c] = gal_multiply(self.data[r][c], scale);
                }
            }
            // Make everything below the 1 be a 0
            for below in (r + 1)..rows {
                if self.data[below][r] != 0 {
                    let scale = self.data[below][r];
                    for c in 0..cols {
                        self.data[below][c] ^= gal_multiply(scale, self.data[r][c]);
                    }
                }
            }
        }

        // Clear the area above the main diagonal
        for d in 0..rows {
            for above in 0..d {
                if self.data[above][d] != 0 {
                    let scale = self.data[above][d];
                    for c in 0..cols {
                        self.data[above][c] ^= gal_multiply(scale, self.data[d][c]);
                    }
                }
            }
        }
        Ok(())
    }
}
