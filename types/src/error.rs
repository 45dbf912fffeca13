//! Error types for converting between ranks and protocol messages.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("unknown lane kind: {0}")]
    UnknownLane(i32),

    #[error("{0} does not fit in a u32 field")]
    FieldOverflow(usize),
}
