//! # Status records emitted by modules and their workers.
//!
//! [`StatusKind`] classifies records in four groups:
//! - **Module lifecycle**: started, stop requested, stopped within grace / grace exceeded
//! - **Worker lifecycle**: starting, stopped, failed
//! - **Connectivity**: connected, connect failed, disconnected, backoff scheduled
//! - **Data path**: payload dropped, mailbox depth
//!
//! Each record carries a process-wide sequence number (`seq`) so subscribers can
//! restore the publish order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use actorvisor::{Status, StatusKind};
//!
//! let st = Status::new(StatusKind::BackoffScheduled)
//!     .with_worker("gearman_in.worker-0")
//!     .with_target("localhost:4730")
//!     .with_attempt(3)
//!     .with_delay(Duration::from_secs(1));
//!
//! assert_eq!(st.kind, StatusKind::BackoffScheduled);
//! assert_eq!(st.delay_ms, Some(1000));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

static STATUS_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of status records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    // === Module lifecycle ===
    /// Module entered `Running`.
    ///
    /// Sets: `module`
    ModuleStarted,
    /// Stop was requested; workers are being cancelled.
    ///
    /// Sets: `module`
    StopRequested,
    /// All workers exited within the grace period.
    ///
    /// Sets: `module`
    AllStoppedWithin,
    /// Some workers did not exit within the grace period and were aborted.
    ///
    /// Sets: `module`, `reason` (stuck worker names)
    GraceExceeded,

    // === Worker lifecycle ===
    /// Worker loop is starting.
    ///
    /// Sets: `module`, `worker`
    WorkerStarting,
    /// Worker loop returned normally (usually after cancellation).
    ///
    /// Sets: `module`, `worker`
    WorkerStopped,
    /// Worker loop returned an error and will not run again.
    ///
    /// Sets: `module`, `worker`, `reason`
    WorkerFailed,

    // === Connectivity ===
    /// Connection established.
    ///
    /// Sets: `worker`, `target`, `attempt`
    Connected,
    /// A connection attempt failed.
    ///
    /// Sets: `worker`, `target`, `attempt`, `reason`
    ConnectFailed,
    /// A live connection was invalidated by a send/receive/probe failure.
    ///
    /// Sets: `worker`, `target`, `reason`
    Disconnected,
    /// Next connection attempt scheduled.
    ///
    /// Sets: `worker`, `target`, `attempt`, `delay_ms`
    BackoffScheduled,

    // === Data path ===
    /// A unit of work could not be decoded and was dropped.
    ///
    /// Sets: `worker`, `reason`
    PayloadDropped,
    /// Periodic mailbox depth report.
    ///
    /// Sets: `module`, `target` (mailbox name), `depth`, `capacity`
    MailboxDepth,

    // === Subscribers ===
    /// A subscriber queue was full or closed; the record was dropped for it.
    ///
    /// Sets: `worker` (subscriber name), `reason`
    SubscriberOverflow,
    /// A subscriber panicked while handling a record.
    ///
    /// Sets: `worker` (subscriber name), `reason`
    SubscriberPanicked,
}

/// Status record with optional metadata.
#[derive(Clone, Debug)]
pub struct Status {
    /// Process-wide, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Record classification.
    pub kind: StatusKind,

    /// Module name.
    pub module: Option<Arc<str>>,
    /// Worker (or subscriber) name.
    pub worker: Option<Arc<str>>,
    /// Endpoint, socket path or mailbox the record is about.
    pub target: Option<Arc<str>>,
    /// Human-readable reason (errors, stuck workers...).
    pub reason: Option<Arc<str>>,
    /// Connection attempt counter (starting from 1).
    pub attempt: Option<u32>,
    /// Delay before the next attempt in milliseconds.
    pub delay_ms: Option<u32>,
    /// Mailbox depth.
    pub depth: Option<u32>,
    /// Mailbox capacity.
    pub capacity: Option<u32>,
}

impl Status {
    /// Creates a record of the given kind with the current timestamp and next sequence number.
    pub fn new(kind: StatusKind) -> Self {
        Self {
            seq: STATUS_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            module: None,
            worker: None,
            target: None,
            reason: None,
            attempt: None,
            delay_ms: None,
            depth: None,
            capacity: None,
        }
    }

    #[inline]
    pub fn with_module(mut self, module: impl Into<Arc<str>>) -> Self {
        self.module = Some(module.into());
        self
    }

    #[inline]
    pub fn with_worker(mut self, worker: impl Into<Arc<str>>) -> Self {
        self.worker = Some(worker.into());
        self
    }

    #[inline]
    pub fn with_target(mut self, target: impl Into<Arc<str>>) -> Self {
        self.target = Some(target.into());
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a delay (stored as milliseconds, saturating at `u32::MAX`).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(d.as_millis().min(u128::from(u32::MAX)) as u32);
        self
    }

    /// Attaches a mailbox depth and capacity.
    #[inline]
    pub fn with_depth(mut self, depth: usize, capacity: usize) -> Self {
        self.depth = Some(depth.min(u32::MAX as usize) as u32);
        self.capacity = Some(capacity.min(u32::MAX as usize) as u32);
        self
    }

    /// Creates a subscriber overflow record.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Status::new(StatusKind::SubscriberOverflow)
            .with_worker(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic record.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Status::new(StatusKind::SubscriberPanicked)
            .with_worker(subscriber)
            .with_reason(info)
    }
}
