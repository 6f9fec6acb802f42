//! # Unix socket output module.
//!
//! Delivers every `inbox` event to a Unix domain stream socket as
//! `render(data, delimiter) ++ delimiter`, where list payloads are joined with the
//! delimiter first.
//!
//! A single sink worker connects eagerly at start and keeps the link alive:
//! - while the inbox is idle the link is probed once per retry interval;
//! - before each send the link is probed again;
//! - any probe or send failure invalidates the link, and the same event is
//!   retried on the next connection, so events are never dropped;
//! - a stop interrupts the liveness check or send in flight, so a peer that
//!   stops reading cannot hold the worker past cancellation.
//!
//! ```text
//! inbox.get ──► frame ──► probe ─ok─► send ─ok─► next event
//!                           │          │
//!                           └── err ───┴──► invalidate ──► connect (1s cadence) ──► retry same frame
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::ModuleConfig;
use crate::core::{Actor, ConnectionSupervisor};
use crate::error::{ModuleError, WorkerError};
use crate::io::{Dialer, SinkConnection, SinkConnector};
use crate::pipeline::{Event, Mailbox};
use crate::policies::BackoffPolicy;
use crate::status::Bus;
use crate::tasks::{TaskFn, TaskRef};

/// Output module writing to a Unix domain socket.
pub struct UdsOut {
    config: ModuleConfig,
    dialer: Arc<dyn Dialer>,
    inbox: Mailbox,
}

impl UdsOut {
    pub fn new(config: ModuleConfig, dialer: Arc<dyn Dialer>) -> Result<Self, ModuleError> {
        config.validate()?;
        if config.target_path.as_os_str().is_empty() {
            return Err(ModuleError::invalid("target_path", "must not be empty"));
        }
        let inbox = Mailbox::new("inbox", config.mailbox_capacity);
        Ok(Self {
            config,
            dialer,
            inbox,
        })
    }

    pub fn inbox(&self) -> Mailbox {
        self.inbox.clone()
    }
}

impl Actor for UdsOut {
    fn config(&self) -> &ModuleConfig {
        &self.config
    }

    fn mailboxes(&self) -> Vec<Mailbox> {
        vec![self.inbox.clone()]
    }

    fn tasks(&self, bus: &Bus) -> Vec<TaskRef> {
        let sink = Sink {
            name: Arc::from(format!("{}.sink", self.config.name)),
            dialer: self.dialer.clone(),
            path: self.config.target_path.clone(),
            delimiter: Arc::from(self.config.delimiter.as_str()),
            inbox: self.inbox.clone(),
            backoff: self.config.backoff,
            bus: bus.clone(),
        };
        let task: TaskRef = TaskFn::arc(sink.name.to_string(), move |ctx: CancellationToken| {
            sink.clone().run(ctx)
        });
        vec![task]
    }
}

/// Wire form of one event.
fn frame(event: &Event, delimiter: &str) -> Vec<u8> {
    let mut buf = event.data.render(delimiter);
    buf.extend_from_slice(delimiter.as_bytes());
    buf
}

#[derive(Clone)]
struct Sink {
    name: Arc<str>,
    dialer: Arc<dyn Dialer>,
    path: PathBuf,
    delimiter: Arc<str>,
    inbox: Mailbox,
    backoff: BackoffPolicy,
    bus: Bus,
}

type Link = ConnectionSupervisor<SinkConnector>;

impl Sink {
    async fn run(self, ctx: CancellationToken) -> Result<(), WorkerError> {
        let connector = SinkConnector::new(self.dialer.clone(), self.path.clone());
        let mut link = Link::new(connector, self.backoff, self.bus.clone(), self.name.clone());
        let idle_probe = self.backoff.first.max(Duration::from_millis(1));

        let Some(mut conn) = link.connect(&ctx).await else {
            return Ok(());
        };

        loop {
            let event = tokio::select! {
                biased;
                _ = ctx.cancelled() => return Ok(()),
                event = self.inbox.get() => match event {
                    Some(event) => event,
                    None => return Ok(()),
                },
                _ = tokio::time::sleep(idle_probe) => {
                    let alive = tokio::select! {
                        biased;
                        _ = ctx.cancelled() => return Ok(()),
                        alive = conn.probe() => alive,
                    };
                    if let Err(e) = alive {
                        link.invalidate(e);
                        conn = match link.connect(&ctx).await {
                            Some(conn) => conn,
                            None => return Ok(()),
                        };
                    }
                    continue;
                }
            };

            let bytes = frame(&event, &self.delimiter);
            conn = match deliver(&mut link, conn, &bytes, &ctx).await {
                Some(conn) => conn,
                None => return Ok(()),
            };
        }
    }
}

/// Sends `frame`, reconnecting until it goes through.
///
/// Returns the connection it was delivered on, or `None` if cancelled first.
async fn deliver(
    link: &mut Link,
    mut conn: Box<dyn SinkConnection>,
    frame: &[u8],
    ctx: &CancellationToken,
) -> Option<Box<dyn SinkConnection>> {
    loop {
        let sent = tokio::select! {
            biased;
            _ = ctx.cancelled() => return None,
            sent = async {
                conn.probe().await?;
                conn.send(frame).await
            } => sent,
        };
        match sent {
            Ok(()) => return Some(conn),
            Err(e) => {
                link.invalidate(e);
                conn = link.connect(ctx).await?;
            }
        }
    }
}
