//! Message passing between the ranks of a fixed-size world.
//!
//! `rank-transport` provides the [`Transport`] trait used by SPMD programs:
//! blocking and non-blocking point-to-point operations, a rooted broadcast,
//! and single-use [`PendingRequest`] handles that are resolved with `wait` or
//! [`wait_all`].
//!
//! # Implementations
//!
//! - [`LocalTransport`]: every rank lives in the same process; messages are
//!   handed over through shared mailboxes.
//! - [`RemoteTransport`]: each rank opens a gRPC stream to a `rank-hub` and
//!   the hub routes envelopes between them.
//!
//! # Example
//!
//! ```no_run
//! use rank_transport::{LocalTransport, Transport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), rank_transport::Error> {
//!     let mut world = LocalTransport::world(2);
//!     let worker = world.pop().unwrap();
//!     let coordinator = world.pop().unwrap();
//!
//!     coordinator.send(&[1.0, 2.0], 1, 7).await?;
//!
//!     let mut buffer = vec![0.0; 2];
//!     let request = worker.irecv(0..2, 0, 7)?;
//!     worker.wait(request, &mut buffer).await?;
//!     assert_eq!(buffer, vec![1.0, 2.0]);
//!     Ok(())
//! }
//! ```

mod collective;
mod error;
mod inbound;
mod local;
mod mailbox;
mod remote;
mod request;

use std::ops::Range;

use async_trait::async_trait;

pub use error::Error;
pub use local::LocalTransport;
pub use rank_hub_types::{Lane, Rank, Tag};
pub use remote::{HubAddr, RemoteTransport};
pub use request::{PendingRequest, wait_all};

/// A rank's endpoint into the world.
///
/// Implementors supply the two posting primitives; every user-facing
/// operation is built on top of them. Point-to-point messages between a pair
/// of ranks are matched in FIFO order per tag.
#[async_trait]
pub trait Transport: Send + Sync {
    /// This endpoint's rank.
    fn rank(&self) -> Rank;

    /// Number of ranks in the world.
    fn size(&self) -> usize;

    /// Starts delivering `payload` to `dest` on `lane`.
    fn post_send(&self, payload: Vec<f64>, dest: Rank, lane: Lane)
    -> Result<PendingRequest, Error>;

    /// Posts a receive for the next payload from `src` on `lane`; the payload
    /// lands in `region` of the buffer passed to `wait`.
    fn post_receive(
        &self,
        region: Range<usize>,
        src: Rank,
        lane: Lane,
    ) -> Result<PendingRequest, Error>;

    /// Sends `data` to `dest` and suspends until the transport accepted it.
    async fn send(&self, data: &[f64], dest: Rank, tag: Tag) -> Result<(), Error> {
        self.isend(data, dest, tag)?.wait(&mut []).await
    }

    fn isend(&self, data: &[f64], dest: Rank, tag: Tag) -> Result<PendingRequest, Error> {
        check_peer(dest, self.size())?;
        self.post_send(data.to_vec(), dest, Lane::Direct(tag))
    }

    fn irecv(&self, region: Range<usize>, src: Rank, tag: Tag) -> Result<PendingRequest, Error> {
        check_peer(src, self.size())?;
        self.post_receive(region, src, Lane::Direct(tag))
    }

    /// Copies `buffer` from `root` into `buffer` on every other rank.
    ///
    /// Every rank must call this with a buffer of the same length.
    async fn broadcast(&self, buffer: &mut [f64], root: Rank) -> Result<(), Error> {
        collective::broadcast(self, buffer, root).await
    }

    async fn wait(&self, request: PendingRequest, buffer: &mut [f64]) -> Result<(), Error> {
        request.wait(buffer).await
    }

    async fn wait_all(
        &self,
        requests: Vec<PendingRequest>,
        buffer: &mut [f64],
    ) -> Result<(), Error> {
        wait_all(requests, buffer).await
    }
}

pub(crate) fn check_peer(rank: Rank, size: usize) -> Result<(), Error> {
    if rank < size {
        Ok(())
    } else {
        Err(Error::InvalidRank { rank, size })
    }
}
