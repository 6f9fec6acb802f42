//! # LogWriter: statuses as `tracing` events
//!
//! Renders every [`Status`] as one structured `tracing` event. Connectivity
//! trouble is logged at `warn`, dropped payloads and grace overruns at `error`,
//! periodic depth reports and backoff scheduling at `debug`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO  actorvisor: connected worker="gearman_in.worker-0" target_addr="localhost:4730" attempt=1
//! WARN  actorvisor: connection failed, retrying worker="uds_out.sink" target_addr="/tmp/actorvisor.sock" attempt=2 reason="connection refused"
//! DEBUG actorvisor: mailbox depth module="gearman_in" mailbox="outbox" depth=12 capacity=100
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::status::{Status, StatusKind};
use crate::subscribers::Subscribe;

/// Status subscriber backed by `tracing`.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_status(&self, s: &Status) {
        let module = s.module.as_deref().unwrap_or("-");
        let worker = s.worker.as_deref().unwrap_or("-");
        let target = s.target.as_deref().unwrap_or("-");
        let reason = s.reason.as_deref().unwrap_or("");

        match s.kind {
            StatusKind::ModuleStarted => info!(target: "actorvisor", module, "module started"),
            StatusKind::StopRequested => info!(target: "actorvisor", module, "stop requested"),
            StatusKind::AllStoppedWithin => {
                info!(target: "actorvisor", module, "all workers stopped within grace")
            }
            StatusKind::GraceExceeded => {
                error!(target: "actorvisor", module, stuck = reason, "stop grace exceeded")
            }
            StatusKind::WorkerStarting => {
                info!(target: "actorvisor", module, worker, "worker instance started")
            }
            StatusKind::WorkerStopped => info!(target: "actorvisor", module, worker, "worker stopped"),
            StatusKind::WorkerFailed => {
                error!(target: "actorvisor", module, worker, reason, "worker failed")
            }
            StatusKind::Connected => {
                info!(target: "actorvisor", worker, target_addr = target, attempt = s.attempt, "connected")
            }
            StatusKind::ConnectFailed => warn!(
                target: "actorvisor",
                worker,
                target_addr = target,
                attempt = s.attempt,
                reason,
                "connection failed, retrying"
            ),
            StatusKind::Disconnected => {
                warn!(target: "actorvisor", worker, target_addr = target, reason, "connection lost")
            }
            StatusKind::BackoffScheduled => debug!(
                target: "actorvisor",
                worker,
                target_addr = target,
                attempt = s.attempt,
                delay_ms = s.delay_ms,
                "reconnect scheduled"
            ),
            StatusKind::PayloadDropped => {
                error!(target: "actorvisor", worker, reason, "payload dropped")
            }
            StatusKind::MailboxDepth => debug!(
                target: "actorvisor",
                module,
                mailbox = target,
                depth = s.depth,
                capacity = s.capacity,
                "mailbox depth"
            ),
            StatusKind::SubscriberOverflow => {
                warn!(target: "actorvisor", subscriber = worker, reason, "subscriber dropped status")
            }
            StatusKind::SubscriberPanicked => {
                error!(target: "actorvisor", subscriber = worker, reason, "subscriber panicked")
            }
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
