use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rank_hub_types::{Envelope, Rank};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::RouteError;

/// Routing table of the hub.
///
/// Each connected rank owns one outbound link. Envelopes addressed to a rank
/// that has not connected yet are parked and handed over when it registers.
pub struct Router {
    inner: Mutex<RouterState>,
}

#[derive(Default)]
struct RouterState {
    size: Option<usize>,
    links: HashMap<Rank, mpsc::UnboundedSender<Envelope>>,
    parked: HashMap<Rank, Vec<Envelope>>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RouterState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, RouterState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds `rank` to the world and returns the envelopes routed to it.
    pub fn register(
        &self,
        rank: Rank,
        size: usize,
    ) -> Result<mpsc::UnboundedReceiver<Envelope>, RouteError> {
        let mut guard = self.state();
        let state = &mut *guard;

        if let Some(current) = state.size {
            if current != size {
                return Err(RouteError::SizeMismatch {
                    announced: size,
                    current,
                });
            }
        }
        if rank >= size {
            return Err(RouteError::InvalidRank { rank, size });
        }
        if state.links.contains_key(&rank) {
            return Err(RouteError::DuplicateRank(rank));
        }

        state.size = Some(size);
        let (tx, rx) = mpsc::unbounded_channel();
        for envelope in state.parked.remove(&rank).unwrap_or_default() {
            let _ = tx.send(envelope);
        }
        state.links.insert(rank, tx);

        Ok(rx)
    }

    /// Removes `rank`. When the last rank leaves, the world is reset and
    /// envelopes parked for ranks that never connected are discarded.
    pub fn unregister(&self, rank: Rank) {
        let mut guard = self.state();
        let state = &mut *guard;

        state.links.remove(&rank);
        if !state.links.is_empty() {
            return;
        }

        let stranded: usize = state.parked.values().map(Vec::len).sum();
        if stranded > 0 {
            warn!(envelopes = stranded, "discarding envelopes for ranks that never connected");
        }
        state.parked.clear();
        state.size = None;
        info!("world drained");
    }

    pub fn route(&self, envelope: Envelope) {
        let mut guard = self.state();
        let state = &mut *guard;

        let Some(size) = state.size else {
            warn!(src = envelope.src, "dropping envelope routed outside a world");
            return;
        };
        if envelope.destination() >= size {
            warn!(
                src = envelope.src,
                dest = envelope.dest,
                size,
                "dropping envelope for a rank outside the world"
            );
            return;
        }

        let dest = envelope.destination();
        let undelivered = match state.links.get(&dest) {
            Some(link) => link.send(envelope).err().map(|returned| returned.0),
            None => Some(envelope),
        };
        if let Some(envelope) = undelivered {
            state.parked.entry(dest).or_default().push(envelope);
        }
    }

    pub fn connected(&self) -> usize {
        self.state().links.len()
    }

    pub fn world_size(&self) -> Option<usize> {
        self.state().size
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
