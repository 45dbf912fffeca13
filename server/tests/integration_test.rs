use futures_util::StreamExt;
use rank_hub::Router;
use rank_hub_types::{Envelope, Frame, Hello, Lane, RankHubClient};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tonic::transport::Channel;
use tonic::{Code, Status, Streaming};

async fn start_test_hub(
    max_message_bytes: usize,
) -> (SocketAddr, Arc<Router>, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = Arc::new(Router::new());

    let serving = Arc::clone(&router);
    let handle = tokio::spawn(async move {
        rank_hub::serve_with_limit(listener, serving, max_message_bytes)
            .await
            .unwrap();
    });

    (addr, router, handle)
}

struct Peer {
    _client: RankHubClient<Channel>,
    outbound: mpsc::UnboundedSender<Frame>,
    inbound: Streaming<Envelope>,
}

impl Peer {
    fn send(&self, envelope: Envelope) {
        self.outbound.send(envelope.into()).unwrap();
    }

    async fn next(&mut self) -> Option<Envelope> {
        timeout(Duration::from_secs(5), self.inbound.next())
            .await
            .expect("hub stalled")
            .map(|result| result.unwrap())
    }
}

async fn join(addr: SocketAddr, rank: usize, size: usize) -> Result<Peer, Status> {
    let mut client = RankHubClient::connect(format!("http://{}", addr))
        .await
        .unwrap();

    let (outbound, queue) = mpsc::unbounded_channel();
    outbound
        .send(Hello::announce(rank, size).unwrap().into())
        .unwrap();
    let inbound = client
        .exchange(UnboundedReceiverStream::new(queue))
        .await?
        .into_inner();

    Ok(Peer {
        _client: client,
        outbound,
        inbound,
    })
}

async fn wait_for_connections(router: &Router, count: usize) {
    for _ in 0..100 {
        if router.connected() == count {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("hub never saw {} connections", count);
}

fn data(src: usize, dest: usize, tag: u32, payload: Vec<f64>) -> Envelope {
    Envelope::addressed(src, dest, Lane::Direct(tag), payload).unwrap()
}

#[tokio::test]
async fn test_route_between_ranks() {
    let (addr, router, _handle) = start_test_hub(1 << 20).await;

    let mut coordinator = join(addr, 0, 2).await.unwrap();
    let mut worker = join(addr, 1, 2).await.unwrap();
    assert_eq!(router.connected(), 2);

    coordinator.send(data(0, 1, 1, vec![1.0, 2.0]));
    worker.send(data(1, 0, 1, vec![3.0]));

    assert_eq!(worker.next().await, Some(data(0, 1, 1, vec![1.0, 2.0])));
    assert_eq!(coordinator.next().await, Some(data(1, 0, 1, vec![3.0])));
}

#[tokio::test]
async fn test_late_rank_receives_parked_envelopes() {
    let (addr, _router, _handle) = start_test_hub(1 << 20).await;

    let coordinator = join(addr, 0, 3).await.unwrap();
    coordinator.send(data(0, 2, 2, vec![7.0]));
    coordinator.send(data(0, 2, 2, vec![8.0]));
    sleep(Duration::from_millis(50)).await;

    let mut late = join(addr, 2, 3).await.unwrap();
    assert_eq!(late.next().await, Some(data(0, 2, 2, vec![7.0])));
    assert_eq!(late.next().await, Some(data(0, 2, 2, vec![8.0])));
}

#[tokio::test]
async fn test_mismatched_world_size_is_refused() {
    let (addr, router, _handle) = start_test_hub(1 << 20).await;

    let _coordinator = join(addr, 0, 2).await.unwrap();

    let refused = join(addr, 1, 5).await.err().unwrap();
    assert_eq!(refused.code(), Code::FailedPrecondition);
    assert_eq!(router.connected(), 1);
}

#[tokio::test]
async fn test_duplicate_rank_is_refused() {
    let (addr, _router, _handle) = start_test_hub(1 << 20).await;

    let _first = join(addr, 1, 2).await.unwrap();

    let refused = join(addr, 1, 2).await.err().unwrap();
    assert_eq!(refused.code(), Code::AlreadyExists);
}

#[tokio::test]
async fn test_stream_must_open_with_hello() {
    let (addr, _router, _handle) = start_test_hub(1 << 20).await;

    let mut client = RankHubClient::connect(format!("http://{}", addr))
        .await
        .unwrap();
    let first: Frame = data(0, 1, 0, vec![1.0]).into();

    let refused = client
        .exchange(tokio_stream::once(first))
        .await
        .err()
        .unwrap();
    assert_eq!(refused.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn test_forged_source_is_dropped() {
    let (addr, _router, _handle) = start_test_hub(1 << 20).await;

    let mut coordinator = join(addr, 0, 3).await.unwrap();
    let liar = join(addr, 1, 3).await.unwrap();

    liar.send(data(2, 0, 0, vec![666.0]));
    liar.send(data(1, 0, 0, vec![1.0]));

    assert_eq!(coordinator.next().await, Some(data(1, 0, 0, vec![1.0])));
}

#[tokio::test]
async fn test_oversized_envelope_disconnects_its_sender() {
    let (addr, router, _handle) = start_test_hub(1024).await;

    let mut coordinator = join(addr, 0, 2).await.unwrap();
    let mut worker = join(addr, 1, 2).await.unwrap();

    // 200 doubles encode to well over the 1 KiB limit
    worker.send(data(1, 0, 1, vec![0.5; 200]));
    wait_for_connections(&router, 1).await;

    // the hub ends the offender's stream without forwarding anything
    let ended = timeout(Duration::from_secs(5), worker.inbound.next())
        .await
        .expect("hub stalled");
    assert!(!matches!(ended, Some(Ok(_))));
    coordinator.send(data(0, 0, 9, vec![2.0]));
    assert_eq!(coordinator.next().await, Some(data(0, 0, 9, vec![2.0])));
}

#[tokio::test]
async fn test_world_resets_after_everyone_leaves() {
    let (addr, router, _handle) = start_test_hub(1 << 20).await;

    let first = join(addr, 0, 2).await.unwrap();
    assert_eq!(router.world_size(), Some(2));
    drop(first);
    wait_for_connections(&router, 0).await;
    assert_eq!(router.world_size(), None);

    let _second = join(addr, 0, 4).await.unwrap();
    assert_eq!(router.world_size(), Some(4));
}
