//! Error types used by modules and their workers.
//!
//! This module defines two main error enums:
//!
//! - [`ModuleError`]: errors raised by module construction and lifecycle.
//! - [`WorkerError`]: errors returned by an individual worker loop.
//!
//! Connectivity errors ([`LinkError`](crate::io::LinkError)) and payload errors
//! ([`TransformError`](crate::transform::TransformError)) are handled inside the
//! worker that hit them and never surface here.

use std::time::Duration;
use thiserror::Error;

use crate::core::ModuleState;

/// # Errors produced by a module.
///
/// Configuration errors are returned at construction time, so a module with a
/// self-inconsistent configuration never starts.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ModuleError {
    /// A configuration field failed validation.
    #[error("invalid config field `{field}`: {reason}")]
    InvalidConfig {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// A lifecycle operation was requested from a state that does not allow it.
    #[error("cannot {op} a module in state {state:?}")]
    InvalidState {
        /// The requested operation (`"start"`).
        op: &'static str,
        /// The state the module was in.
        state: ModuleState,
    },

    /// Stop grace period was exceeded; the listed workers were aborted.
    #[error("stop timeout {grace:?} exceeded; stuck: {stuck:?}; workers aborted")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of the workers that did not stop in time.
        stuck: Vec<String>,
    },

    /// No registry entry for the requested `category.group.name`.
    #[error("unknown module `{path}`")]
    UnknownModule {
        /// Dotted module path.
        path: String,
    },

    /// A registry entry with the same `category.group.name` already exists.
    #[error("module `{path}` is already registered")]
    DuplicateModule {
        /// Dotted module path.
        path: String,
    },

    /// Installing the OS signal handlers failed.
    #[error("signal handler: {0}")]
    Signal(#[from] std::io::Error),
}

impl ModuleError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use actorvisor::ModuleError;
    ///
    /// let err = ModuleError::InvalidConfig { field: "workers", reason: "must be at least 1".into() };
    /// assert_eq!(err.as_label(), "module_invalid_config");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ModuleError::InvalidConfig { .. } => "module_invalid_config",
            ModuleError::InvalidState { .. } => "module_invalid_state",
            ModuleError::GraceExceeded { .. } => "module_grace_exceeded",
            ModuleError::UnknownModule { .. } => "module_unknown",
            ModuleError::DuplicateModule { .. } => "module_duplicate",
            ModuleError::Signal(_) => "module_signal",
        }
    }

    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ModuleError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

/// # Errors returned by a worker loop.
///
/// Worker loops heal transient failures themselves; an error here always ends
/// the worker.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Non-recoverable error; the worker exits.
    #[error("fatal error (no retry): {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// Worker observed the module's stop signal.
    #[error("context cancelled")]
    Canceled,
}

impl WorkerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerError::Fatal { .. } => "worker_fatal",
            WorkerError::Canceled => "worker_canceled",
        }
    }
}
