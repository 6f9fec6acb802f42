//! # Runs one worker loop to completion.
//!
//! ```text
//! WorkerStarting ──► task.spawn(ctx) ──► Ok | Err(Canceled) ──► WorkerStopped
//!                                   └──► Err(Fatal)         ──► WorkerFailed
//! ```
//!
//! Workers are never restarted here: their loops heal connectivity failures
//! themselves, so an error return is final.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;
use crate::status::{Bus, Status, StatusKind};
use crate::tasks::TaskRef;

/// Names of workers that have not returned yet.
pub(crate) type AliveSet = Arc<Mutex<BTreeSet<String>>>;

/// Removes the worker from the alive set even if its loop panics.
struct AliveGuard {
    alive: AliveSet,
    name: String,
}

impl Drop for AliveGuard {
    fn drop(&mut self) {
        self.alive
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.name);
    }
}

/// Executes `task` once. The caller has already inserted its name in `alive`.
pub(crate) async fn run_worker(
    task: TaskRef,
    ctx: CancellationToken,
    bus: Bus,
    module: Arc<str>,
    alive: AliveSet,
) {
    let _guard = AliveGuard {
        alive,
        name: task.name().to_string(),
    };
    let status = |kind| {
        Status::new(kind)
            .with_module(module.clone())
            .with_worker(task.name())
    };

    bus.publish(status(StatusKind::WorkerStarting));
    match task.spawn(ctx).await {
        Ok(()) | Err(WorkerError::Canceled) => bus.publish(status(StatusKind::WorkerStopped)),
        Err(e) => bus.publish(status(StatusKind::WorkerFailed).with_reason(e.to_string())),
    }
}
