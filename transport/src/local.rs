//! In-process transport where every rank shares the same mailboxes.

use std::ops::Range;
use std::sync::Arc;

use async_trait::async_trait;
use rank_hub_types::{Lane, Rank};

use crate::mailbox::Mailbox;
use crate::{Error, PendingRequest, Transport, check_peer};

/// One rank of an in-process world.
///
/// Sends are delivered straight into the destination's mailbox, so a send
/// request is already complete when it is returned.
#[derive(Clone)]
pub struct LocalTransport {
    rank: Rank,
    mailboxes: Arc<Vec<Mailbox>>,
}

impl LocalTransport {
    /// Creates the endpoints of a world with `size` ranks, ordered by rank.
    pub fn world(size: usize) -> Vec<LocalTransport> {
        let mailboxes: Arc<Vec<Mailbox>> = Arc::new((0..size).map(|_| Mailbox::new()).collect());
        (0..size)
            .map(|rank| LocalTransport {
                rank,
                mailboxes: Arc::clone(&mailboxes),
            })
            .collect()
    }
}

#[async_trait]
impl Transport for LocalTransport {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.mailboxes.len()
    }

    fn post_send(
        &self,
        payload: Vec<f64>,
        dest: Rank,
        lane: Lane,
    ) -> Result<PendingRequest, Error> {
        let mailbox = self.mailboxes.get(dest).ok_or(Error::InvalidRank {
            rank: dest,
            size: self.size(),
        })?;
        mailbox.deliver(self.rank, lane, payload);
        Ok(PendingRequest::complete())
    }

    fn post_receive(
        &self,
        region: Range<usize>,
        src: Rank,
        lane: Lane,
    ) -> Result<PendingRequest, Error> {
        check_peer(src, self.size())?;
        let payload = self.mailboxes[self.rank].post(src, lane)?;
        Ok(PendingRequest::receive(region, payload))
    }
}
