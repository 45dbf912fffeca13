//! Error types for transport operations.

use rank_hub_types::{Rank, WireError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("gRPC transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("gRPC status error: {0}")]
    Status(#[from] tonic::Status),

    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    #[error("rank {rank} is outside a world of {size} ranks")]
    InvalidRank { rank: Rank, size: usize },

    #[error("expected {expected} values, received {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("receive region {start}..{end} exceeds a buffer of {len} values")]
    RegionOutOfBounds { start: usize, end: usize, len: usize },

    #[error("connection closed")]
    Disconnected,
}
