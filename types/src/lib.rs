//! gRPC protocol spoken between ranks and the rank-hub.
//!
//! Every rank opens one bidirectional `Exchange` stream to the hub. The first
//! [`Frame`] it sends is a [`Hello`] announcing its rank and the world size;
//! every following frame carries an [`Envelope`] that the hub routes to its
//! destination rank. The response stream delivers the envelopes addressed to
//! the announced rank, in the order the hub received them.

mod envelope;
mod error;

pub mod rank {
    tonic::include_proto!("rank");
}

pub use error::WireError;
pub use rank::rank_hub_client::RankHubClient;
pub use rank::rank_hub_server::{RankHub, RankHubServer};
pub use rank::{Envelope, Frame, Hello, LaneKind};

/// Largest encoded message either side of the hub accepts.
pub const MAX_MESSAGE_BYTES: usize = 1 << 30;

/// Zero-based index of a participant in the computation.
pub type Rank = usize;

/// Point-to-point message tag.
pub type Tag = u32;

/// Matching channel between a pair of ranks.
///
/// Receives are matched by `(source rank, lane)`. Collective traffic uses the
/// reserved [`Lane::Broadcast`] lane so that it never matches a user tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lane {
    Direct(Tag),
    Broadcast,
}
