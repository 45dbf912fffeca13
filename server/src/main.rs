use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use rank_hub::{serve_with_limit, Router};
use rank_hub_types::MAX_MESSAGE_BYTES;

#[derive(Parser)]
#[command(name = "rank-hub")]
#[command(about = "Routes envelopes between the ranks of a distributed computation")]
#[command(version)]
struct Cli {
    /// Address to accept rank connections on.
    #[arg(long, env = "RANK_HUB_LISTEN", default_value = "127.0.0.1:50051")]
    listen: String,

    /// Largest message a rank may send, in bytes.
    #[arg(long, env = "RANK_HUB_MAX_MESSAGE_BYTES", default_value_t = MAX_MESSAGE_BYTES)]
    max_message_bytes: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let listener = TcpListener::bind(&cli.listen).await?;
    info!(addr = %listener.local_addr()?, "rank-hub listening");

    serve_with_limit(listener, Arc::new(Router::new()), cli.max_message_bytes).await?;

    Ok(())
}
