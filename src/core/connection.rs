//! # Connection supervisor.
//!
//! Keeps one worker's link to an outer system usable. The worker asks for a
//! connection, uses it until an operation fails, reports the failure with
//! [`ConnectionSupervisor::invalidate`] and asks again.
//!
//! ```text
//!            connect() ok                      invalidate(reason)
//! Disconnected ────────────► Connected ─────────────────────────► Disconnected
//!     ▲   │                                                            │
//!     │   └─ fail: ConnectFailed + BackoffScheduled, sleep(delay) ─┐   │
//!     └────────────────────────────────────────────────────────────┘   │
//!     └──────────── sleep(delay) before the next attempt ◄─────────────┘
//! ```
//!
//! ## Rules
//! - Attempts never overlap; consecutive attempts are at least one delay apart.
//! - Every sleep and attempt is raced against the worker's cancellation token, so
//!   a stop is observed within one delay.
//! - Errors never escape: `connect` returns `None` only when cancelled.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::io::LinkError;
use crate::policies::BackoffPolicy;
use crate::status::{Bus, Status, StatusKind};

/// Opens connections to one outer-system target.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Connection handle produced on success.
    type Conn: Send + 'static;

    /// Printable target (endpoint list, socket path).
    fn target(&self) -> &str;

    /// One connection attempt.
    async fn connect(&self) -> Result<Self::Conn, LinkError>;
}

/// Link state as seen by the supervisor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// Per-worker reconnect loop.
pub struct ConnectionSupervisor<C: Connector> {
    connector: C,
    backoff: BackoffPolicy,
    bus: Bus,
    worker: Arc<str>,
    state: ConnectionState,
    attempt: u32,
    lost: bool,
}

impl<C: Connector> ConnectionSupervisor<C> {
    pub fn new(connector: C, backoff: BackoffPolicy, bus: Bus, worker: Arc<str>) -> Self {
        Self {
            connector,
            backoff,
            bus,
            worker,
            state: ConnectionState::Disconnected,
            attempt: 0,
            lost: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn target(&self) -> &str {
        self.connector.target()
    }

    /// Returns a fresh connection, retrying until one succeeds.
    ///
    /// Returns `None` only if `ctx` is cancelled first.
    pub async fn connect(&mut self, ctx: &CancellationToken) -> Option<C::Conn> {
        if std::mem::take(&mut self.lost) {
            let delay = self.backoff.next(0);
            self.publish_backoff(delay);
            if !sleep_or_cancel(ctx, delay).await {
                return None;
            }
        }

        loop {
            if ctx.is_cancelled() {
                return None;
            }
            self.attempt = self.attempt.saturating_add(1);

            let res = tokio::select! {
                biased;
                _ = ctx.cancelled() => return None,
                res = self.connector.connect() => res,
            };

            match res {
                Ok(conn) => {
                    self.state = ConnectionState::Connected;
                    self.bus.publish(
                        self.status(StatusKind::Connected)
                            .with_attempt(self.attempt),
                    );
                    self.attempt = 0;
                    return Some(conn);
                }
                Err(e) => {
                    self.bus.publish(
                        self.status(StatusKind::ConnectFailed)
                            .with_attempt(self.attempt)
                            .with_reason(e.to_string()),
                    );
                    let delay = self.backoff.next(self.attempt - 1);
                    self.publish_backoff(delay);
                    if !sleep_or_cancel(ctx, delay).await {
                        return None;
                    }
                }
            }
        }
    }

    /// Marks the current connection unusable.
    ///
    /// The next [`connect`](Self::connect) waits one delay before its first attempt.
    pub fn invalidate(&mut self, reason: impl Display) {
        self.state = ConnectionState::Disconnected;
        self.lost = true;
        self.bus.publish(
            self.status(StatusKind::Disconnected)
                .with_reason(reason.to_string()),
        );
    }

    fn publish_backoff(&self, delay: Duration) {
        self.bus.publish(
            self.status(StatusKind::BackoffScheduled)
                .with_attempt(self.attempt.saturating_add(1))
                .with_delay(delay),
        );
    }

    fn status(&self, kind: StatusKind) -> Status {
        Status::new(kind)
            .with_worker(self.worker.clone())
            .with_target(self.connector.target())
    }
}

/// Sleeps for `delay`; returns `false` if `ctx` was cancelled first.
async fn sleep_or_cancel(ctx: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        biased;
        _ = ctx.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
