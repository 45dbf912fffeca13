//! Envelope router connecting the ranks of a distributed computation.
//!
//! Every rank opens one gRPC `Exchange` stream to the hub and announces
//! itself with a hello frame. The hub then forwards each envelope to the
//! stream of its destination rank, preserving the order envelopes arrived in.

pub mod error;
pub mod grpc;
pub mod router;

use std::sync::Arc;

use rank_hub_types::MAX_MESSAGE_BYTES;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;

pub use error::RouteError;
pub use router::Router;

/// Serves the hub on `listener` until the server fails.
pub async fn serve(listener: TcpListener, router: Arc<Router>) -> Result<(), tonic::transport::Error> {
    serve_with_limit(listener, router, MAX_MESSAGE_BYTES).await
}

/// Like [`serve`], refusing any message larger than `max_message_bytes`.
pub async fn serve_with_limit(
    listener: TcpListener,
    router: Arc<Router>,
    max_message_bytes: usize,
) -> Result<(), tonic::transport::Error> {
    Server::builder()
        .add_service(grpc::create_server(router, max_message_bytes))
        .serve_with_incoming(TcpListenerStream::new(listener))
        .await
}
