//! Reconnect delay policies.
//!
//! A worker that loses its connection waits between attempts according to a
//! [`BackoffPolicy`]. The default is a **fixed 1 second** delay with no jitter and
//! no attempt limit: the connection is retried forever until the module stops.
//!
//! Growth (`factor > 1.0`) and [`JitterPolicy`] are opt-in, set explicitly through
//! [`ModuleConfig::with_backoff`](crate::ModuleConfig::with_backoff).

mod backoff;
mod jitter;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
