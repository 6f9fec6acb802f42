//! # Task abstraction.
//!
//! A [`Task`] receives a [`CancellationToken`] and must return once it is
//! cancelled, at the latest one retry delay later.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;

/// Boxed future returned by [`Task::spawn`].
pub type BoxTaskFuture = Pin<Box<dyn Future<Output = Result<(), WorkerError>> + Send + 'static>>;

/// Shared handle to a task.
pub type TaskRef = Arc<dyn Task>;

/// # Cancellable worker loop.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use actorvisor::{BoxTaskFuture, Task};
///
/// struct Idle;
///
/// impl Task for Idle {
///     fn name(&self) -> &str { "idle" }
///
///     fn spawn(&self, ctx: CancellationToken) -> BoxTaskFuture {
///         Box::pin(async move {
///             ctx.cancelled().await;
///             Ok(())
///         })
///     }
/// }
/// ```
pub trait Task: Send + Sync + 'static {
    /// Stable, human-readable name (`<module>.<role>`).
    fn name(&self) -> &str;

    /// Creates the loop future. Called once per module start.
    fn spawn(&self, ctx: CancellationToken) -> BoxTaskFuture;
}
