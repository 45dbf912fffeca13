//! Single-use handles for in-flight sends and receives.

use std::ops::Range;

use futures_util::future::try_join_all;
use tokio::sync::oneshot;

use crate::Error;

/// An asynchronous send or receive that has been started but not observed.
///
/// A request is consumed by [`PendingRequest::wait`] or [`wait_all`], so it
/// cannot be waited on twice. A receive request lands its payload into the
/// region of the buffer it was posted for.
#[must_use = "a pending request must be waited on"]
#[derive(Debug)]
pub struct PendingRequest {
    kind: Kind,
}

#[derive(Debug)]
enum Kind {
    Complete,
    Send(oneshot::Receiver<Result<(), Error>>),
    Receive {
        region: Range<usize>,
        payload: oneshot::Receiver<Vec<f64>>,
    },
}

enum Landing {
    Nothing,
    Into {
        region: Range<usize>,
        payload: Vec<f64>,
    },
}

impl PendingRequest {
    pub(crate) fn complete() -> Self {
        Self {
            kind: Kind::Complete,
        }
    }

    pub(crate) fn send(acked: oneshot::Receiver<Result<(), Error>>) -> Self {
        Self {
            kind: Kind::Send(acked),
        }
    }

    pub(crate) fn receive(region: Range<usize>, payload: oneshot::Receiver<Vec<f64>>) -> Self {
        Self {
            kind: Kind::Receive { region, payload },
        }
    }

    pub fn is_receive(&self) -> bool {
        matches!(self.kind, Kind::Receive { .. })
    }

    /// Suspends until the operation completes.
    ///
    /// `buffer` is only touched by receive requests; sends may pass an empty
    /// slice.
    pub async fn wait(self, buffer: &mut [f64]) -> Result<(), Error> {
        self.settle().await?.land(buffer)
    }

    async fn settle(self) -> Result<Landing, Error> {
        match self.kind {
            Kind::Complete => Ok(Landing::Nothing),
            Kind::Send(acked) => {
                acked.await.map_err(|_| Error::Disconnected)??;
                Ok(Landing::Nothing)
            }
            Kind::Receive { region, payload } => {
                let payload = payload.await.map_err(|_| Error::Disconnected)?;
                Ok(Landing::Into { region, payload })
            }
        }
    }
}

impl Landing {
    fn land(self, buffer: &mut [f64]) -> Result<(), Error> {
        let Landing::Into { region, payload } = self else {
            return Ok(());
        };

        if payload.len() != region.len() {
            return Err(Error::LengthMismatch {
                expected: region.len(),
                actual: payload.len(),
            });
        }

        let len = buffer.len();
        let target = buffer
            .get_mut(region.clone())
            .ok_or(Error::RegionOutOfBounds {
                start: region.start,
                end: region.end,
                len,
            })?;
        target.copy_from_slice(&payload);
        Ok(())
    }
}

/// Suspends until every request has completed, then lands all received
/// payloads into `buffer`.
pub async fn wait_all(requests: Vec<PendingRequest>, buffer: &mut [f64]) -> Result<(), Error> {
    let landings = try_join_all(requests.into_iter().map(PendingRequest::settle)).await?;
    for landing in landings {
        landing.land(buffer)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receive(region: Range<usize>) -> (oneshot::Sender<Vec<f64>>, PendingRequest) {
        let (tx, rx) = oneshot::channel();
        (tx, PendingRequest::receive(region, rx))
    }

    #[tokio::test]
    async fn receive_lands_in_its_region() {
        let (tx, request) = receive(2..4);
        tx.send(vec![5.0, 6.0]).unwrap();

        let mut buffer = vec![0.0; 6];
        request.wait(&mut buffer).await.unwrap();
        assert_eq!(buffer, vec![0.0, 0.0, 5.0, 6.0, 0.0, 0.0]);
    }

    #[tokio::test]
    async fn short_payload_is_rejected() {
        let (tx, request) = receive(0..3);
        tx.send(vec![1.0]).unwrap();

        let mut buffer = vec![0.0; 3];
        let err = request.wait(&mut buffer).await.unwrap_err();
        assert!(matches!(
            err,
            Error::LengthMismatch {
                expected: 3,
                actual: 1
            }
        ));
        assert_eq!(buffer, vec![0.0; 3]);
    }

    #[tokio::test]
    async fn region_past_the_buffer_is_rejected() {
        let (tx, request) = receive(4..6);
        tx.send(vec![1.0, 2.0]).unwrap();

        let mut buffer = vec![0.0; 5];
        let err = request.wait(&mut buffer).await.unwrap_err();
        assert!(matches!(err, Error::RegionOutOfBounds { len: 5, .. }));
    }

    #[tokio::test]
    async fn dropped_peer_is_disconnected() {
        let (tx, request) = receive(0..1);
        drop(tx);

        let err = request.wait(&mut [0.0]).await.unwrap_err();
        assert!(matches!(err, Error::Disconnected));
    }

    #[tokio::test]
    async fn send_failure_is_reported_on_wait() {
        let (tx, rx) = oneshot::channel();
        tx.send(Err(Error::Disconnected)).unwrap();

        let err = PendingRequest::send(rx).wait(&mut []).await.unwrap_err();
        assert!(matches!(err, Error::Disconnected));
    }

    #[tokio::test]
    async fn wait_all_lands_every_receive() {
        let (first_tx, first) = receive(0..2);
        let (second_tx, second) = receive(3..4);
        let requests = vec![second, PendingRequest::complete(), first];

        second_tx.send(vec![9.0]).unwrap();
        first_tx.send(vec![1.0, 2.0]).unwrap();

        let mut buffer = vec![0.0; 4];
        wait_all(requests, &mut buffer).await.unwrap();
        assert_eq!(buffer, vec![1.0, 2.0, 0.0, 9.0]);
    }

    #[tokio::test]
    async fn wait_all_of_nothing_returns() {
        wait_all(Vec::new(), &mut []).await.unwrap();
    }
}
