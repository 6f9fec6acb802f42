//! # Status subscribers.
//!
//! A module publishes [`Status`](crate::Status) records on its [`Bus`](crate::Bus);
//! subscribers observe them without ever slowing a worker down.
//!
//! ```text
//!   workers ── publish(Status) ──► Bus ──► status listener ──► SubscriberSet::emit
//!                                                         ┌────────┴────────┐
//!                                                         ▼                 ▼
//!                                                     LogWriter           Custom
//! ```
//!
//! - [`Subscribe`]: the extension trait.
//! - [`SubscriberSet`]: fan-out with one bounded queue and worker per subscriber.
//! - [`LogWriter`]: renders statuses through `tracing`.

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
