//! # Bounded mailbox.
//!
//! [`Mailbox`] is a fixed-capacity FIFO of [`Event`]s shared between a module's
//! workers and the rest of the pipeline. It is a bounded `tokio::sync::mpsc`
//! channel whose receiving half sits behind an async mutex, so any number of
//! producers and consumers can hold a clone.
//!
//! ## Rules
//! - `len() <= capacity()` at all times.
//! - [`Mailbox::put`] waits while the mailbox is full (backpressure); it never drops.
//! - [`Mailbox::try_put`] hands the event back on a full mailbox.
//! - FIFO per mailbox; concurrent producers interleave in arrival order.
//!
//! ```rust
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! use actorvisor::{Event, Mailbox, Payload};
//!
//! let outbox = Mailbox::new("outbox", 2);
//! outbox.put(Event::new("a")).await.unwrap();
//! outbox.put(Event::new("b")).await.unwrap();
//! assert!(outbox.is_full());
//!
//! assert_eq!(outbox.get().await.unwrap().data, Payload::from("a"));
//! assert_eq!(outbox.len(), 1);
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, mpsc};

use crate::pipeline::Event;

/// Errors returned by non-waiting mailbox operations.
#[derive(Error, Debug)]
pub enum MailboxError {
    /// The mailbox is at capacity; the event is handed back.
    #[error("mailbox `{name}` is full")]
    Full {
        name: Arc<str>,
        event: Box<Event>,
    },
    /// The receiving side is gone.
    #[error("mailbox `{name}` is closed")]
    Closed { name: Arc<str> },
}

struct Inner {
    name: Arc<str>,
    capacity: usize,
    tx: mpsc::Sender<Event>,
    rx: Mutex<mpsc::Receiver<Event>>,
}

/// Bounded FIFO of events. Cheap to clone; clones share the same queue.
#[derive(Clone)]
pub struct Mailbox {
    inner: Arc<Inner>,
}

impl Mailbox {
    /// Creates a mailbox holding at most `capacity` events (clamped to at least 1).
    pub fn new(name: impl Into<Arc<str>>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                capacity,
                tx,
                rx: Mutex::new(rx),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.inner.capacity - self.inner.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.inner.tx.capacity() == 0
    }

    /// Enqueues `event`, waiting for room while the mailbox is full.
    ///
    /// Cancel-safe: if the returned future is dropped before completion the event
    /// was not enqueued.
    pub async fn put(&self, event: Event) -> Result<(), MailboxError> {
        self.inner.tx.send(event).await.map_err(|_| MailboxError::Closed {
            name: self.inner.name.clone(),
        })
    }

    /// Enqueues `event` only if there is room right now.
    pub fn try_put(&self, event: Event) -> Result<(), MailboxError> {
        self.inner.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(event) => MailboxError::Full {
                name: self.inner.name.clone(),
                event: Box::new(event),
            },
            mpsc::error::TrySendError::Closed(_) => MailboxError::Closed {
                name: self.inner.name.clone(),
            },
        })
    }

    /// Dequeues the oldest event, waiting while the mailbox is empty.
    ///
    /// Returns `None` only once the queue is closed and drained, which cannot
    /// happen while any clone of this mailbox is alive.
    pub async fn get(&self) -> Option<Event> {
        self.inner.rx.lock().await.recv().await
    }

    /// Dequeues the oldest event if one is queued and no other consumer holds the queue.
    pub fn try_get(&self) -> Option<Event> {
        self.inner.rx.try_lock().ok()?.try_recv().ok()
    }
}

impl fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox")
            .field("name", &self.inner.name)
            .field("len", &self.len())
            .field("capacity", &self.inner.capacity)
            .finish()
    }
}
