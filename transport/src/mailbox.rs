//! Thread-safe receive matching for a single rank.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rank_hub_types::{Lane, Rank};
use tokio::sync::oneshot;

use crate::Error;

type Key = (Rank, Lane);

/// Matches incoming payloads with posted receives.
///
/// Matching is FIFO per `(source, lane)`: the oldest posted receive takes the
/// next payload, and payloads that arrive with no receive posted wait in the
/// unexpected queue until one is.
pub struct Mailbox {
    inner: Mutex<State>,
}

#[derive(Default)]
struct State {
    unexpected: HashMap<Key, VecDeque<Vec<f64>>>,
    posted: HashMap<Key, VecDeque<oneshot::Sender<Vec<f64>>>>,
    closed: bool,
}

impl Mailbox {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn deliver(&self, src: Rank, lane: Lane, payload: Vec<f64>) {
        let key = (src, lane);
        let mut state = self.state();
        if state.closed {
            return;
        }

        let mut payload = payload;
        while let Some(waiter) = state.posted.get_mut(&key).and_then(VecDeque::pop_front) {
            match waiter.send(payload) {
                Ok(()) => return,
                // request was dropped without a wait
                Err(returned) => payload = returned,
            }
        }

        state.unexpected.entry(key).or_default().push_back(payload);
    }

    pub fn post(&self, src: Rank, lane: Lane) -> Result<oneshot::Receiver<Vec<f64>>, Error> {
        let key = (src, lane);
        let (tx, rx) = oneshot::channel();
        let mut state = self.state();

        if let Some(payload) = state.unexpected.get_mut(&key).and_then(VecDeque::pop_front) {
            let _ = tx.send(payload);
            return Ok(rx);
        }

        if state.closed {
            return Err(Error::Disconnected);
        }

        state.posted.entry(key).or_default().push_back(tx);
        Ok(rx)
    }

    /// Fails every outstanding receive. Payloads already queued stay receivable.
    pub fn close(&self) {
        let mut state = self.state();
        state.closed = true;
        state.posted.clear();
    }

    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.state().closed
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}
