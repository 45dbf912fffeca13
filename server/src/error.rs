//! Error types for hub registration.

use rank_hub_types::Rank;
use thiserror::Error;
use tonic::Status;

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("stream did not open with a hello frame")]
    MissingHello,

    #[error("rank {rank} is outside a world of {size} ranks")]
    InvalidRank { rank: Rank, size: usize },

    #[error("announced world size {announced} differs from the current {current}")]
    SizeMismatch { announced: usize, current: usize },

    #[error("rank {0} is already connected")]
    DuplicateRank(Rank),
}

impl From<RouteError> for Status {
    fn from(e: RouteError) -> Self {
        match e {
            RouteError::MissingHello | RouteError::InvalidRank { .. } => {
                Status::invalid_argument(e.to_string())
            }
            RouteError::SizeMismatch { .. } => Status::failed_precondition(e.to_string()),
            RouteError::DuplicateRank(_) => Status::already_exists(e.to_string()),
        }
    }
}
