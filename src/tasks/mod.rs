//! # Worker tasks.
//!
//! A module's workers are [`Task`]s: named, cancellable loops spawned once when
//! the module starts.
//! - [`Task`] - trait for a cancellable worker loop
//! - [`TaskFn`] - closure-backed implementation
//! - [`TaskRef`] - shared handle (`Arc<dyn Task>`)

mod task;
mod task_fn;

pub use task::{BoxTaskFuture, Task, TaskRef};
pub use task_fn::TaskFn;
