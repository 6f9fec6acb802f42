//! # actorvisor
//!
//! **Actorvisor** runs the I/O modules of an event pipeline: each module owns
//! bounded mailboxes, a pool of cancellable workers and, for modules that talk to
//! an outer system, one reconnecting link per worker.
//!
//! ## Architecture
//! ```text
//!        broker (Gearman)                                   Unix socket sink
//!              ▲  ▲                                                ▲
//!   ┌──────────┴──┴───────────────┐               ┌────────────────┴──────────┐
//!   │ GearmanIn                   │               │ UdsOut                    │
//!   │  worker-0 ─ ConnSupervisor  │   outbox ──►  │  sink ─ ConnSupervisor    │
//!   │  worker-1 ─ ConnSupervisor  │ (Mailbox)     │   probe / send / retry    │
//!   │  decode: identity | AES-256 │     ──► inbox │                           │
//!   └──────────────┬──────────────┘               └─────────────┬─────────────┘
//!                  │ publish(Status)                            │ publish(Status)
//!                  ▼                                            ▼
//!          Bus ──► status listener ──► SubscriberSet ──► LogWriter (tracing), custom
//! ```
//!
//! ### Lifecycle
//! ```text
//! Created ──start()──► Running ──stop()──► Stopping ──► Stopped
//!
//! worker loop {
//!   ├─► link.connect(ctx)        (1s between attempts, cancellable)
//!   ├─► receive / send           (raced against ctx)
//!   │      └─ link error ──► invalidate ──► reconnect
//!   └─ exit when ctx is cancelled
//! }
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types                                  |
//! |-------------------|--------------------------------------------------------------|--------------------------------------------|
//! | **Modules**       | Lifecycle, graceful stop, run-until-signal                   | [`Module`], [`Actor`], [`ModuleState`]     |
//! | **Built-ins**     | Gearman input, Unix socket output, null sink                 | [`GearmanIn`], [`UdsOut`], [`Null`]        |
//! | **Mailboxes**     | Bounded FIFO with backpressure                               | [`Mailbox`], [`Event`], [`Payload`]        |
//! | **Transform**     | Identity or base64 + AES-256 decode                          | [`PayloadTransform`]                       |
//! | **Connections**   | Per-worker reconnect loop                                    | [`ConnectionSupervisor`], [`Connector`]    |
//! | **Policies**      | Reconnect delay (fixed 1s by default)                        | [`BackoffPolicy`], [`JitterPolicy`]        |
//! | **Observability** | Status records, subscribers, `tracing` output                | [`Status`], [`Subscribe`], [`LogWriter`]   |
//! | **Registry**      | Static `category.group.name` lookup with metadata            | [`Registry`], [`ModuleMeta`]               |
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use actorvisor::{GearmanBroker, GearmanIn, Module, ModuleConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = ModuleConfig::new("gearman_in")
//!         .with_endpoints(["gearmand:4730"])
//!         .with_source("check_results")
//!         .with_secret("should-be-changed")
//!         .with_workers(4);
//!
//!     let input = GearmanIn::new(cfg, Arc::new(GearmanBroker::new()))?;
//!     let outbox = input.outbox();
//!     let module = Module::new(input);
//!
//!     tokio::spawn(async move {
//!         while let Some(event) = outbox.get().await {
//!             println!("{:?}", event.data);
//!         }
//!     });
//!
//!     // Runs until SIGINT/SIGTERM/SIGQUIT, then stops within the grace period.
//!     module.run().await?;
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod error;
mod io;
mod modules;
mod pipeline;
mod policies;
mod registry;
mod status;
mod subscribers;
mod tasks;
pub mod transform;

// ---- Public re-exports ----

pub use config::{DEFAULT_GEARMAN_PORT, ModuleConfig};
pub use crate::core::{
    Actor, ConnectionState, ConnectionSupervisor, Connector, Module, ModuleBuilder, ModuleState,
};
pub use error::{ModuleError, WorkerError};
pub use io::{
    Broker, BrokerConnector, BrokerSession, Dialer, GearmanBroker, Job, LinkError, SinkConnection,
    SinkConnector, UnixDialer,
};
pub use modules::{GearmanIn, Null, UdsOut};
pub use pipeline::{Event, Header, Mailbox, MailboxError, Payload};
pub use policies::{BackoffPolicy, JitterPolicy};
pub use registry::{BUILTIN_CATEGORY, ModuleGroup, ModuleMeta, Registry, RegistryEntry};
pub use status::{Bus, Status, StatusKind};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use tasks::{BoxTaskFuture, Task, TaskFn, TaskRef};
pub use transform::{PayloadTransform, TransformError};
