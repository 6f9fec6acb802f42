//! # Status bus.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that lets every worker
//! of a module publish [`Status`] records without blocking.
//!
//! ```text
//! Publishers (many):                     Subscriber (one per module):
//!   worker-0 (connection supervisor) ──┐
//!   worker-1 (connection supervisor) ──┼──► Bus ──► status listener ──► SubscriberSet
//!   module (lifecycle, depth reports) ─┘
//! ```
//!
//! ## Rules
//! - `publish()` never blocks.
//! - A single ring buffer of `capacity` records is shared by all receivers.
//! - Slow receivers get `RecvError::Lagged(n)` and skip the `n` oldest records.
//! - Records published while nobody is subscribed are lost.

use tokio::sync::broadcast;

use super::status::Status;

/// Broadcast channel for status records. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Status>,
}

impl Bus {
    /// Creates a new bus with the given capacity (clamped to at least 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Status>(capacity.max(1));
        Self { tx }
    }

    /// Publishes a status to all active receivers.
    pub fn publish(&self, status: Status) {
        let _ = self.tx.send(status);
    }

    /// Creates a receiver that observes records published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Status> {
        self.tx.subscribe()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new(1024)
    }
}
