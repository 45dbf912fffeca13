//! Transport that reaches the other ranks through a rank-hub.

use std::ops::Range;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::Stream;
use rank_hub_types::{Envelope, Frame, Hello, Lane, MAX_MESSAGE_BYTES, Rank, RankHubClient};
use tokio::sync::{mpsc, oneshot};
use tonic::transport::Endpoint;
use tracing::{info, warn};

use crate::inbound::InboundTask;
use crate::mailbox::Mailbox;
use crate::{Error, PendingRequest, Transport, check_peer};

/// One rank connected to a rank-hub.
///
/// The rank holds a single `Exchange` stream open for its lifetime. Outbound
/// envelopes are queued onto the request stream in the order they were
/// posted, and a send request completes once the stream has taken its
/// envelope. Inbound envelopes are read by a background task that feeds the
/// local mailbox.
///
/// # Example
///
/// ```no_run
/// use rank_transport::{RemoteTransport, Transport};
///
/// #[tokio::main]
/// async fn main() -> Result<(), rank_transport::Error> {
///     let transport = RemoteTransport::connect("localhost:50051", 1, 4).await?;
///
///     let mut row = vec![0.0; 8];
///     transport.broadcast(&mut row, 0).await?;
///     transport.send(&row, 0, 1).await?;
///     Ok(())
/// }
/// ```
pub struct RemoteTransport {
    rank: Rank,
    size: usize,
    mailbox: Arc<Mailbox>,
    outbound: mpsc::UnboundedSender<Outgoing>,
}

struct Outgoing {
    envelope: Envelope,
    acked: oneshot::Sender<Result<(), Error>>,
}

impl RemoteTransport {
    /// Connects to a rank-hub and announces this rank.
    ///
    /// Returns once the hub has accepted the rank into its world. A hub that
    /// refuses the announcement (duplicate rank, disagreeing world size)
    /// fails the connect with [`Error::Status`].
    ///
    /// # Arguments
    ///
    /// * `addr` - Hub address (e.g., `"localhost:50051"`)
    /// * `rank` - This process's rank
    /// * `size` - Number of ranks every participant agrees on
    pub async fn connect(
        addr: impl Into<HubAddr>,
        rank: Rank,
        size: usize,
    ) -> Result<Self, Error> {
        check_peer(rank, size)?;
        let hello = Hello::announce(rank, size)?;
        let hub_addr = addr.into();

        let endpoint = Endpoint::from_shared(format!("http://{}", hub_addr.0))?.tcp_nodelay(true);
        let channel = endpoint.connect().await?;
        let mut client = RankHubClient::new(channel)
            .max_decoding_message_size(MAX_MESSAGE_BYTES)
            .max_encoding_message_size(MAX_MESSAGE_BYTES);

        let (outbound, queue) = mpsc::unbounded_channel();
        let inbound = client
            .exchange(outgoing_frames(hello, queue))
            .await?
            .into_inner();

        let mailbox = Arc::new(Mailbox::new());
        let task = InboundTask::new(rank, Arc::clone(&mailbox));
        tokio::spawn(async move {
            // keeps the connection up until the hub ends the stream
            let _client = client;
            if let Err(e) = task.run(inbound).await {
                warn!(rank, error = %e, "inbound task error");
            }
        });

        info!(rank, size, hub = %hub_addr.0, "connected to hub");

        Ok(Self {
            rank,
            size,
            mailbox,
            outbound,
        })
    }
}

/// The hello, then every queued envelope in posting order. Dropping the
/// transport closes the queue, which ends the request stream.
fn outgoing_frames(
    hello: Hello,
    mut queue: mpsc::UnboundedReceiver<Outgoing>,
) -> impl Stream<Item = Frame> {
    async_stream::stream! {
        yield Frame::from(hello);
        while let Some(Outgoing { envelope, acked }) = queue.recv().await {
            yield Frame::from(envelope);
            let _ = acked.send(Ok(()));
        }
    }
}

#[async_trait]
impl Transport for RemoteTransport {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn post_send(
        &self,
        payload: Vec<f64>,
        dest: Rank,
        lane: Lane,
    ) -> Result<PendingRequest, Error> {
        check_peer(dest, self.size)?;

        if dest == self.rank {
            self.mailbox.deliver(self.rank, lane, payload);
            return Ok(PendingRequest::complete());
        }

        let (acked, ack_rx) = oneshot::channel();
        let envelope = Envelope::addressed(self.rank, dest, lane, payload)?;
        self.outbound
            .send(Outgoing { envelope, acked })
            .map_err(|_| Error::Disconnected)?;
        Ok(PendingRequest::send(ack_rx))
    }

    fn post_receive(
        &self,
        region: Range<usize>,
        src: Rank,
        lane: Lane,
    ) -> Result<PendingRequest, Error> {
        check_peer(src, self.size)?;
        let payload = self.mailbox.post(src, lane)?;
        Ok(PendingRequest::receive(region, payload))
    }
}

/// Hub address wrapper for type-safe connection.
#[derive(Clone, Debug)]
pub struct HubAddr(pub String);

impl From<String> for HubAddr {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for HubAddr {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn hello_leads_and_sends_are_acknowledged_in_order() {
        let (outbound, queue) = mpsc::unbounded_channel();
        let frames = outgoing_frames(Hello::announce(1, 3).unwrap(), queue);
        tokio::pin!(frames);

        let mut acks = Vec::new();
        for value in [1.0, 2.0] {
            let (acked, ack_rx) = oneshot::channel();
            let envelope = Envelope::addressed(1, 0, Lane::Direct(1), vec![value]).unwrap();
            outbound.send(Outgoing { envelope, acked }).unwrap();
            acks.push(ack_rx);
        }
        drop(outbound);

        let hello = frames.next().await.unwrap();
        assert_eq!(hello.as_hello().map(Hello::world), Some((1, 3)));

        let first = frames.next().await.unwrap().into_envelope().unwrap();
        assert_eq!(first.payload, vec![1.0]);
        let second = frames.next().await.unwrap().into_envelope().unwrap();
        assert_eq!(second.payload, vec![2.0]);
        assert!(frames.next().await.is_none());

        for ack in acks {
            assert!(ack.await.unwrap().is_ok());
        }
    }
}
