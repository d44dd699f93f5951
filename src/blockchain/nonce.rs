//! Process-local nonce sequencing for the deployer account.
//!
//! The node's pending transaction count is authoritative; the local state
//! only covers nonces this process has reserved but the node has not yet
//! counted. Nothing is persisted across restarts.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use crate::observability::metrics;

#[derive(Debug, Default)]
struct NonceState {
    /// Next never-used nonce, once anything has been reserved.
    next: Option<u64>,
    /// Reserved nonces that were never broadcast, reused lowest first.
    released: BTreeSet<u64>,
}

/// Serializes nonce acquisition across all writers in this process.
#[derive(Debug, Default)]
pub struct NonceManager {
    state: Mutex<NonceState>,
    /// Reservations whose submission attempt has not finished yet.
    in_flight: AtomicUsize,
}

impl NonceManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Enter the critical section. Other writers wait until the returned slot
    /// is dropped.
    pub async fn lock(self: &Arc<Self>) -> NonceSlot<'_> {
        NonceSlot {
            state: self.state.lock().await,
            manager: self,
        }
    }

    /// Next fresh nonce this process would hand out, if it has handed out any.
    pub async fn peek(&self) -> Option<u64> {
        self.state.lock().await.next
    }

    /// Number of reservations still being submitted.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    async fn release(&self, nonce: u64) {
        let mut state = self.state.lock().await;
        if state.next == Some(nonce + 1) {
            let mut next = nonce;
            while next > 0 && state.released.remove(&(next - 1)) {
                next -= 1;
            }
            state.next = Some(next);
        } else {
            state.released.insert(nonce);
        }
        tracing::debug!(nonce, "Nonce released");
    }
}

/// Exclusive access to the nonce state, held while nonce and gas price are fetched.
pub struct NonceSlot<'a> {
    state: MutexGuard<'a, NonceState>,
    manager: &'a Arc<NonceManager>,
}

impl NonceSlot<'_> {
    /// Reserve a nonce given the node's pending count.
    ///
    /// Never returns a value that is still reserved by another writer. With
    /// nothing in flight the node's count wins, so a nonce lost on the way to
    /// the node is reused instead of leaving a gap.
    pub fn reserve(mut self, chain_nonce: u64) -> NonceReservation {
        let state = &mut *self.state;

        if self.manager.in_flight() == 0 {
            if let Some(local) = state.next.filter(|local| *local > chain_nonce) {
                tracing::warn!(local, chain_nonce, "Local nonce ahead of node; resynchronizing");
                state.next = Some(chain_nonce);
                state.released.clear();
            }
        }

        // Anything below the node's count was used by someone else meanwhile.
        state.released = state.released.split_off(&chain_nonce);
        let nonce = match state.released.pop_first() {
            Some(nonce) => nonce,
            None => {
                let nonce = match state.next {
                    Some(local) => local.max(chain_nonce),
                    None => chain_nonce,
                };
                state.next = Some(nonce + 1);
                metrics::record_pending_nonce(nonce + 1);
                nonce
            }
        };

        self.manager.in_flight.fetch_add(1, Ordering::SeqCst);
        NonceReservation {
            nonce,
            manager: self.manager.clone(),
        }
    }
}

/// A reserved nonce. Dropping it marks the submission attempt as finished;
/// the nonce then counts as used unless it was [released](Self::release).
#[derive(Debug)]
pub struct NonceReservation {
    nonce: u64,
    manager: Arc<NonceManager>,
}

impl NonceReservation {
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Hand the nonce back: its transaction never reached a node.
    ///
    /// Must not be called when the submission outcome is unknown.
    pub async fn release(self) {
        self.manager.release(self.nonce).await;
    }
}

impl Drop for NonceReservation {
    fn drop(&mut self) {
        self.manager.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
