//! Background task feeding envelopes from the hub into a rank's mailbox.

use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use rank_hub_types::{Envelope, Rank};
use tonic::Status;
use tracing::{debug, warn};

use crate::Error;
use crate::mailbox::Mailbox;

pub struct InboundTask {
    rank: Rank,
    mailbox: Arc<Mailbox>,
}

impl InboundTask {
    pub fn new(rank: Rank, mailbox: Arc<Mailbox>) -> Self {
        Self { rank, mailbox }
    }

    /// Delivers envelopes until the stream ends, then closes the mailbox.
    pub async fn run<S>(self, mut stream: S) -> Result<(), Error>
    where
        S: Stream<Item = Result<Envelope, Status>> + Unpin,
    {
        let mut outcome = Ok(());
        while let Some(result) = stream.next().await {
            match result {
                Ok(envelope) => self.process_envelope(envelope),
                Err(status) => {
                    outcome = Err(Error::from(status));
                    break;
                }
            }
        }

        debug!(rank = self.rank, "hub stream closed");
        self.mailbox.close();
        outcome
    }

    fn process_envelope(&self, envelope: Envelope) {
        if envelope.destination() != self.rank {
            warn!(
                rank = self.rank,
                dest = envelope.dest,
                src = envelope.src,
                "dropping misrouted envelope"
            );
            return;
        }
        match envelope.decode_lane() {
            Ok(lane) => self
                .mailbox
                .deliver(envelope.source(), lane, envelope.payload),
            Err(e) => warn!(rank = self.rank, src = envelope.src, error = %e, "dropping envelope"),
        }
    }
}
