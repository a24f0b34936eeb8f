//! Single-flight token refresh
//!
//! The coordinator owns the in-flight flag and the ordered waiter queue for
//! one client. A caller that needs a new token calls [`RefreshCoordinator::join`]:
//! the first caller of a cycle becomes the leader and must start the refresh;
//! everyone else just waits. [`RefreshCoordinator::complete`] hands the single
//! outcome to every waiter in enqueue order and closes the cycle.
//!
//! Completion names the cycle it closes. A late or duplicate completion for a
//! cycle that is already closed is ignored, so a supervisor may close a cycle
//! whose driver died without risking a newer cycle's waiters.
//!
//! The flag and queue live behind one tokio Mutex, so "is a refresh already
//! running?" and "I am starting one" are a single atomic step, and a caller
//! arriving after `complete` always starts a fresh cycle instead of joining a
//! finished one.

use common::Secret;
use tokio::sync::{Mutex, oneshot};
use tracing::debug;

use crate::error::RefreshError;

/// What every waiter of one refresh cycle receives.
pub type RefreshOutcome = std::result::Result<Secret<String>, RefreshError>;

/// A place in the current refresh cycle.
#[derive(Debug)]
pub struct Ticket {
    /// Whether this caller opened the cycle and must drive the refresh.
    pub leader: bool,
    /// Cycle this ticket belongs to; the leader passes it to `complete`.
    pub cycle: u64,
    pub outcome: oneshot::Receiver<RefreshOutcome>,
}

impl Ticket {
    /// Wait for the cycle's outcome.
    pub async fn wait(self) -> RefreshOutcome {
        self.outcome.await.unwrap_or(Err(RefreshError::Abandoned))
    }
}

#[derive(Debug, Default)]
struct PendingRefresh {
    in_flight: bool,
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
    cycles: u64,
}

#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    state: Mutex<PendingRefresh>,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a waiter, opening a new cycle if none is in flight.
    pub async fn join(&self) -> Ticket {
        let (tx, rx) = oneshot::channel();
        let mut state = self.state.lock().await;
        state.waiters.push(tx);
        let leader = !state.in_flight;
        if leader {
            state.in_flight = true;
            state.cycles += 1;
            debug!(cycle = state.cycles, "refresh cycle opened");
        } else {
            debug!(
                cycle = state.cycles,
                waiters = state.waiters.len(),
                "refresh in flight, queued"
            );
        }
        Ticket {
            leader,
            cycle: state.cycles,
            outcome: rx,
        }
    }

    /// Close cycle `cycle` and deliver `outcome` to its waiters in enqueue
    /// order. Returns how many waiters were still listening; 0 when `cycle`
    /// is not the open one.
    pub async fn complete(&self, cycle: u64, outcome: RefreshOutcome) -> usize {
        let waiters = {
            let mut state = self.state.lock().await;
            if !state.in_flight || state.cycles != cycle {
                debug!(cycle, current = state.cycles, "stale refresh completion ignored");
                return 0;
            }
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };
        let mut delivered = 0;
        for waiter in waiters {
            // A dropped receiver is a caller that gave up; skip it.
            if waiter.send(outcome.clone()).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    pub async fn is_in_flight(&self) -> bool {
        self.state.lock().await.in_flight
    }

    /// Number of cycles opened so far.
    pub async fn cycles(&self) -> u64 {
        self.state.lock().await.cycles
    }
}
