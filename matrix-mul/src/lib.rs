//! Distributed matrix multiplication over message-passing ranks.
//!
//! `matrix-mul` computes C = A × B across a fixed world of ranks that share
//! no memory. Rank 0 is the coordinator: it holds the inputs and ends up with
//! the full product. Every rank runs the same program (SPMD).
//!
//! # Protocol
//!
//! - **Partition**: rows of C are split into contiguous ranges of
//!   `ceil(rows / ranks)` rows, one per rank ([`plan`])
//! - **Distribution**: the coordinator sends each worker its rows of A
//!   (tagged with the worker's rank) and broadcasts all of B
//! - **Compute**: each rank multiplies its own rows ([`compute_rows`])
//! - **Collection**: workers send their rows of C back to the coordinator,
//!   which waits for all of them at once
//!
//! # Example
//!
//! ```no_run
//! use matrix_mul::{Matrix, simulate};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let a = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]])?;
//!     let b = Matrix::from_rows(vec![vec![5.0, 6.0], vec![7.0, 8.0]])?;
//!
//!     let c = simulate(&a, &b, 2).await?;
//!     assert_eq!(c.to_rows(), vec![vec![19.0, 22.0], vec![43.0, 50.0]]);
//!
//!     Ok(())
//! }
//! ```

mod error;
mod matrix;
mod matrix_mul;
mod partition;
mod simulate;

pub use error::Error;
pub use matrix::Matrix;
pub use matrix_mul::{COORDINATOR, Role, compute_rows, multiply, multiply_sequential};
pub use partition::{RowRange, chunk_size, plan, plan_all};
pub use simulate::simulate;
