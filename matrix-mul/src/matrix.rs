//! Dense row-major matrix storage.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::Error;

/// A dense matrix stored as one flat row-major buffer.
///
/// The buffer always holds exactly `rows * cols` values. Element accessors
/// are bounds-checked and panic on an out-of-range index, like slice
/// indexing does.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl Matrix {
    /// Creates a zero-filled `rows` x `cols` matrix.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            values: vec![0.0; rows * cols],
        }
    }

    pub fn from_values(rows: usize, cols: usize, values: Vec<f64>) -> Result<Self, Error> {
        if values.len() != rows * cols {
            return Err(Error::BadLength {
                rows,
                cols,
                values: values.len(),
            });
        }
        Ok(Self { rows, cols, values })
    }

    /// Builds a matrix from nested rows; every row must have the same length.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, Error> {
        let cols = rows.first().map_or(0, |row| row.len());
        let mut values = Vec::with_capacity(rows.len() * cols);

        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(Error::RaggedRow {
                    row: i,
                    len: row.len(),
                    cols,
                });
            }
            values.extend_from_slice(row);
        }

        Ok(Self {
            rows: rows.len(),
            cols,
            values,
        })
    }

    /// Fills the matrix with 1, 2, 3, ... in row-major order.
    pub fn sequential(rows: usize, cols: usize) -> Self {
        let values = (1..=rows * cols).map(|v| v as f64).collect();
        Self { rows, cols, values }
    }

    /// Uniform values in `[-1, 1)`, reproducible from `seed`.
    pub fn random(rows: usize, cols: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let values = (0..rows * cols).map(|_| rng.gen_range(-1.0..1.0)).collect();
        Self { rows, cols, values }
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn col_count(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[self.offset(row, col)]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        let offset = self.offset(row, col);
        self.values[offset] = value;
    }

    pub fn accumulate(&mut self, row: usize, col: usize, delta: f64) {
        let offset = self.offset(row, col);
        self.values[offset] += delta;
    }

    /// The flat row-major buffer, for bulk transfer.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    pub fn fill(&mut self, value: f64) {
        self.values.fill(value);
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        if self.cols == 0 {
            return vec![Vec::new(); self.rows];
        }
        self.values.chunks(self.cols).map(<[f64]>::to_vec).collect()
    }

    /// Compares shape and every element within a relative tolerance.
    ///
    /// Values close to zero are compared with `rel_tol` as an absolute bound.
    pub fn approx_eq(&self, other: &Matrix, rel_tol: f64) -> bool {
        self.rows == other.rows
            && self.cols == other.cols
            && self.values.iter().zip(&other.values).all(|(&x, &y)| {
                let scale = x.abs().max(y.abs()).max(1.0);
                (x - y).abs() <= rel_tol * scale
            })
    }

    fn offset(&self, row: usize, col: usize) -> usize {
        assert!(
            row < self.rows && col < self.cols,
            "index ({}, {}) out of bounds for a {}x{} matrix",
            row,
            col,
            self.rows,
            self.cols
        );
        row * self.cols + col
    }
}
