//! Runtime core: connections, workers and the module lifecycle.
//!
//! - [`connection`]: per-worker reconnect loop behind the [`Connector`] seam;
//! - [`actor`]: what a module kind contributes (mailboxes, worker loops);
//! - [`module`]: composition root, lifecycle and graceful stop;
//! - [`runner`]: runs one worker loop and reports how it ended;
//! - [`shutdown`]: termination signals for `Module::run`.

mod actor;
mod builder;
mod connection;
mod module;
mod runner;
mod shutdown;

pub use actor::Actor;
pub use builder::ModuleBuilder;
pub use connection::{ConnectionState, ConnectionSupervisor, Connector};
pub use module::{Module, ModuleState};
