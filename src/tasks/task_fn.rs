//! # Closure-backed task (`TaskFn`)
//!
//! [`TaskFn`] wraps `F: Fn(CancellationToken) -> Fut`; each spawn creates a fresh
//! future that owns its state. Shared state goes through explicit `Arc`s captured
//! by the closure.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use actorvisor::{TaskFn, TaskRef, WorkerError};
//!
//! let t: TaskRef = TaskFn::arc("null.drain", |ctx: CancellationToken| async move {
//!     ctx.cancelled().await;
//!     Ok::<_, WorkerError>(())
//! });
//! assert_eq!(t.name(), "null.drain");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;
use crate::tasks::task::{BoxTaskFuture, Task};

/// Function-backed task.
#[derive(Debug)]
pub struct TaskFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> TaskFn<F> {
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the task and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F, Fut> Task for TaskFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), WorkerError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn spawn(&self, ctx: CancellationToken) -> BoxTaskFuture {
        Box::pin((self.f)(ctx))
    }
}
