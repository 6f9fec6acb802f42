//! # What a module kind contributes.
//!
//! An [`Actor`] is the kind-specific half of a module: it owns the mailboxes and
//! knows how to build its worker loops. [`Module`](crate::core::Module) supplies
//! the other half (lifecycle, cancellation, status fan-out) and is identical for
//! every kind.

use crate::config::ModuleConfig;
use crate::pipeline::Mailbox;
use crate::status::Bus;
use crate::tasks::TaskRef;

/// Kind-specific part of a module.
pub trait Actor: Send + Sync + 'static {
    /// Validated configuration the actor was built with.
    fn config(&self) -> &ModuleConfig;

    /// Mailboxes owned by the module (e.g. `outbox`, `inbox`).
    fn mailboxes(&self) -> Vec<Mailbox>;

    /// Builds the worker loops. Called once, when the module starts.
    ///
    /// Workers publish their statuses on `bus`.
    fn tasks(&self, bus: &Bus) -> Vec<TaskRef>;
}
