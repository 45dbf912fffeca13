//! Error types for matrix-mul operations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(#[from] rank_transport::Error),

    #[error("matrix dimension mismatch: A is {0}x{1}, B is {2}x{3}")]
    DimensionMismatch(usize, usize, usize, usize),

    #[error("output matrix is {actual_rows}x{actual_cols}, expected {rows}x{cols}")]
    OutputShape {
        rows: usize,
        cols: usize,
        actual_rows: usize,
        actual_cols: usize,
    },

    #[error("{values} values do not fill a {rows}x{cols} matrix")]
    BadLength {
        rows: usize,
        cols: usize,
        values: usize,
    },

    #[error("row {row} has {len} values, expected {cols}")]
    RaggedRow { row: usize, len: usize, cols: usize },

    #[error("a world needs at least one rank")]
    EmptyWorld,

    #[error("rank task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
