//! Collective operations built on point-to-point primitives.

use rank_hub_types::{Lane, Rank};
use tracing::trace;

use crate::{Error, Transport, check_peer, wait_all};

/// Binomial-tree broadcast from `root`.
///
/// Ranks are renumbered relative to the root. A rank receives from the peer
/// that differs in its lowest set bit, then forwards to the peers below that
/// bit, so the broadcast finishes in `ceil(log2(size))` rounds.
pub(crate) async fn broadcast<T>(transport: &T, buffer: &mut [f64], root: Rank) -> Result<(), Error>
where
    T: Transport + ?Sized,
{
    let size = transport.size();
    check_peer(root, size)?;
    let relative = (transport.rank() + size - root) % size;

    let mut mask = 1;
    while mask < size {
        if relative & mask != 0 {
            let parent = (relative - mask + root) % size;
            trace!(rank = transport.rank(), parent, "broadcast receive");
            transport
                .post_receive(0..buffer.len(), parent, Lane::Broadcast)?
                .wait(buffer)
                .await?;
            break;
        }
        mask <<= 1;
    }

    let mut sends = Vec::new();
    mask >>= 1;
    while mask > 0 {
        if relative + mask < size {
            let child = (relative + mask + root) % size;
            trace!(rank = transport.rank(), child, "broadcast forward");
            sends.push(transport.post_send(buffer.to_vec(), child, Lane::Broadcast)?);
        }
        mask >>= 1;
    }

    wait_all(sends, buffer).await
}
