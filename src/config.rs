//! # Module configuration.
//!
//! [`ModuleConfig`] carries every setting a module reads: mailbox sizing, the
//! broker endpoints and queue for input modules, the socket path and delimiter for
//! output modules, the decryption secret, worker count and stop grace.
//!
//! Configs deserialize from any serde format; missing fields take their defaults.
//! A config is moved into the module when it is built and never changes afterwards.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use actorvisor::ModuleConfig;
//!
//! let cfg: ModuleConfig = serde_json::from_str(r#"{
//!     "name": "gearman_in",
//!     "endpoints": ["gearmand-1:4730", "gearmand-2:4730"],
//!     "workers": 4,
//!     "source": "check_results"
//! }"#).unwrap();
//!
//! assert_eq!(cfg.mailbox_capacity, 100);
//! assert_eq!(cfg.grace(), Duration::from_secs(5));
//! assert!(cfg.validate().is_ok());
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ModuleError;
use crate::policies::BackoffPolicy;

/// Default Gearman port, used when an endpoint omits one.
pub const DEFAULT_GEARMAN_PORT: u16 = 4730;

/// Settings for one module instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    /// Instance name; prefixes worker names and status records.
    pub name: String,
    /// Capacity of each mailbox the module owns.
    pub mailbox_capacity: usize,
    /// Period of mailbox depth reports in seconds (`0` disables them).
    pub metrics_interval_secs: u64,
    /// Broker endpoints (`host:port`), tried in order.
    pub endpoints: Vec<String>,
    /// Decryption secret; `None` selects the identity transform.
    pub secret: Option<String>,
    /// Number of concurrent consumer workers.
    pub workers: usize,
    /// Broker queue (function name) to consume.
    pub source: String,
    /// Unix socket path output modules deliver to.
    pub target_path: PathBuf,
    /// Appended after every rendered event; also joins list payloads.
    pub delimiter: String,
    /// Maximum time `stop()` waits for workers, in seconds.
    pub grace_secs: u64,
    /// Capacity of the module's status bus.
    pub bus_capacity: usize,
    /// Delay policy between connection attempts.
    #[serde(skip)]
    pub backoff: BackoffPolicy,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            mailbox_capacity: 100,
            metrics_interval_secs: 1,
            endpoints: vec![format!("localhost:{DEFAULT_GEARMAN_PORT}")],
            secret: None,
            workers: 1,
            source: "actorvisor".into(),
            target_path: PathBuf::from("/tmp/actorvisor.sock"),
            delimiter: String::new(),
            grace_secs: 5,
            bus_capacity: 1024,
            backoff: BackoffPolicy::default(),
        }
    }
}

impl ModuleConfig {
    /// Default configuration with the given instance name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity;
        self
    }

    pub fn with_metrics_interval(mut self, secs: u64) -> Self {
        self.metrics_interval_secs = secs;
        self
    }

    pub fn with_endpoints<I, S>(mut self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.endpoints = endpoints.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_target_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.target_path = path.into();
        self
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    pub fn with_grace_secs(mut self, secs: u64) -> Self {
        self.grace_secs = secs;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Stop grace period.
    pub fn grace(&self) -> Duration {
        Duration::from_secs(self.grace_secs)
    }

    /// Period of mailbox depth reports, `None` when disabled.
    pub fn metrics_interval(&self) -> Option<Duration> {
        match self.metrics_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Checks the settings every module relies on.
    ///
    /// Module constructors call this, so an inconsistent config never starts.
    /// Broker endpoints are checked separately by [`validate_endpoints`](Self::validate_endpoints).
    pub fn validate(&self) -> Result<(), ModuleError> {
        if self.name.trim().is_empty() {
            return Err(ModuleError::invalid("name", "must not be empty"));
        }
        if self.mailbox_capacity == 0 {
            return Err(ModuleError::invalid("mailbox_capacity", "must be at least 1"));
        }
        if self.workers == 0 {
            return Err(ModuleError::invalid("workers", "must be at least 1"));
        }
        if matches!(self.secret.as_deref(), Some("")) {
            return Err(ModuleError::invalid("secret", "must not be empty"));
        }
        Ok(())
    }

    /// Checks `endpoints`; called only by modules that dial a broker.
    pub fn validate_endpoints(&self) -> Result<(), ModuleError> {
        if self.endpoints.is_empty() {
            return Err(ModuleError::invalid("endpoints", "at least one endpoint is required"));
        }
        for endpoint in &self.endpoints {
            validate_endpoint(endpoint)?;
        }
        Ok(())
    }
}

fn validate_endpoint(endpoint: &str) -> Result<(), ModuleError> {
    let (host, port) = match endpoint.rsplit_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (endpoint, None),
    };
    if host.trim().is_empty() {
        return Err(ModuleError::invalid(
            "endpoints",
            format!("`{endpoint}` has no host"),
        ));
    }
    if let Some(port) = port {
        match port.parse::<u16>() {
            Ok(p) if p > 0 => {}
            _ => {
                return Err(ModuleError::invalid(
                    "endpoints",
                    format!("`{endpoint}` has an invalid port"),
                ));
            }
        }
    }
    Ok(())
}

/// Splits `host[:port]`, falling back to the default Gearman port.
pub(crate) fn split_endpoint(endpoint: &str) -> (&str, u16) {
    match endpoint.rsplit_once(':') {
        Some((host, port)) => (host, port.parse().unwrap_or(DEFAULT_GEARMAN_PORT)),
        None => (endpoint, DEFAULT_GEARMAN_PORT),
    }
}
