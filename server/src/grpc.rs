use crate::error::RouteError;
use crate::router::Router;
use futures_util::stream::{Stream, StreamExt};
use rank_hub_types::{Envelope, Frame, RankHub, RankHubServer, Rank};
use std::pin::Pin;
use std::sync::Arc;
use tonic::{Request, Response, Status, Streaming};
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct HubService {
    router: Arc<Router>,
}

impl HubService {
    pub fn new(router: Arc<Router>) -> Self {
        Self { router }
    }
}

type ExchangeStream = Pin<Box<dyn Stream<Item = Result<Envelope, Status>> + Send>>;

#[tonic::async_trait]
impl RankHub for HubService {
    type ExchangeStream = ExchangeStream;

    async fn exchange(
        &self,
        request: Request<Streaming<Frame>>,
    ) -> Result<Response<Self::ExchangeStream>, Status> {
        let mut inbound = request.into_inner();

        let (rank, size) = match inbound.next().await {
            Some(Ok(frame)) => frame
                .as_hello()
                .map(|hello| hello.world())
                .ok_or(RouteError::MissingHello)?,
            Some(Err(status)) => return Err(status),
            None => return Err(Status::cancelled("stream closed before hello")),
        };

        let mut link = self.router.register(rank, size)?;
        info!(rank, size, "rank connected");

        tokio::spawn(relay(rank, inbound, Arc::clone(&self.router)));

        let output = async_stream::stream! {
            while let Some(envelope) = link.recv().await {
                yield Ok(envelope);
            }
        };

        Ok(Response::new(Box::pin(output)))
    }
}

/// Routes a rank's envelopes until its request stream ends, then takes the
/// rank out of the world.
async fn relay(rank: Rank, mut inbound: Streaming<Frame>, router: Arc<Router>) {
    while let Some(result) = inbound.next().await {
        match result {
            Ok(frame) => match frame.into_envelope() {
                Some(envelope) if envelope.source() != rank => {
                    warn!(rank, claimed = envelope.src, "dropping envelope with forged source");
                }
                Some(envelope) => {
                    debug!(
                        src = envelope.src,
                        dest = envelope.dest,
                        values = envelope.payload.len(),
                        "routing envelope"
                    );
                    router.route(envelope);
                }
                None => warn!(rank, "ignoring frame without an envelope"),
            },
            Err(e) => {
                warn!(rank, error = %e, "rank stream failed");
                break;
            }
        }
    }

    router.unregister(rank);
    info!(rank, "rank disconnected");
}

pub fn create_server(router: Arc<Router>, max_message_bytes: usize) -> RankHubServer<HubService> {
    RankHubServer::new(HubService::new(router))
        .max_decoding_message_size(max_message_bytes)
        .max_encoding_message_size(max_message_bytes)
}
