//! # Broker input module.
//!
//! Runs `workers` independent consumers against the configured broker queue.
//! Each consumer owns its own connection supervisor, so one worker's outage never
//! stalls the others.
//!
//! ```text
//! worker-i: connect ──► next_job ──► decode ──ok──► outbox.put(Event) ──► complete(job, plain)
//!              ▲            │           └─err─► PayloadDropped ──► fail(job)
//!              └─ invalidate ◄─ link error (receive, complete, fail)
//! ```
//!
//! ## Rules
//! - Decoded events land in `outbox` with an empty header and the decoded bytes as data.
//! - A job is answered only after its event is enqueued; a full outbox stalls the worker.
//! - A unit that fails to decode is dropped alone; the worker keeps consuming.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::ModuleConfig;
use crate::core::{Actor, ConnectionSupervisor};
use crate::error::{ModuleError, WorkerError};
use crate::io::{Broker, BrokerConnector, BrokerSession, Job};
use crate::pipeline::{Event, Mailbox};
use crate::policies::BackoffPolicy;
use crate::status::{Bus, Status, StatusKind};
use crate::tasks::{TaskFn, TaskRef};
use crate::transform::PayloadTransform;

/// Input module consuming a broker queue.
pub struct GearmanIn {
    config: ModuleConfig,
    broker: Arc<dyn Broker>,
    transform: PayloadTransform,
    outbox: Mailbox,
}

impl GearmanIn {
    /// Validates `config` and selects the payload transform from its secret.
    pub fn new(config: ModuleConfig, broker: Arc<dyn Broker>) -> Result<Self, ModuleError> {
        config.validate()?;
        config.validate_endpoints()?;
        let transform = PayloadTransform::from_secret(config.secret.as_deref())?;
        let outbox = Mailbox::new("outbox", config.mailbox_capacity);
        Ok(Self {
            config,
            broker,
            transform,
            outbox,
        })
    }

    pub fn outbox(&self) -> Mailbox {
        self.outbox.clone()
    }

    pub fn transform(&self) -> &PayloadTransform {
        &self.transform
    }
}

impl Actor for GearmanIn {
    fn config(&self) -> &ModuleConfig {
        &self.config
    }

    fn mailboxes(&self) -> Vec<Mailbox> {
        vec![self.outbox.clone()]
    }

    fn tasks(&self, bus: &Bus) -> Vec<TaskRef> {
        let endpoints: Arc<[String]> = Arc::from(self.config.endpoints.clone());
        let queue: Arc<str> = Arc::from(self.config.source.as_str());

        (0..self.config.workers)
            .map(|i| {
                let consumer = Consumer {
                    name: Arc::from(format!("{}.worker-{i}", self.config.name)),
                    broker: self.broker.clone(),
                    endpoints: endpoints.clone(),
                    queue: queue.clone(),
                    transform: self.transform.clone(),
                    outbox: self.outbox.clone(),
                    backoff: self.config.backoff,
                    bus: bus.clone(),
                };
                let task: TaskRef = TaskFn::arc(
                    consumer.name.to_string(),
                    move |ctx: CancellationToken| consumer.clone().run(ctx),
                );
                task
            })
            .collect()
    }
}

/// State of one consumer worker.
#[derive(Clone)]
struct Consumer {
    name: Arc<str>,
    broker: Arc<dyn Broker>,
    endpoints: Arc<[String]>,
    queue: Arc<str>,
    transform: PayloadTransform,
    outbox: Mailbox,
    backoff: BackoffPolicy,
    bus: Bus,
}

enum Handled {
    Done,
    LinkLost(String),
    Cancelled,
}

impl Consumer {
    async fn run(self, ctx: CancellationToken) -> Result<(), WorkerError> {
        let connector =
            BrokerConnector::new(self.broker.clone(), self.endpoints.clone(), self.queue.clone());
        let mut link =
            ConnectionSupervisor::new(connector, self.backoff, self.bus.clone(), self.name.clone());

        'connect: loop {
            let Some(mut session) = link.connect(&ctx).await else {
                return Ok(());
            };

            loop {
                let job = tokio::select! {
                    biased;
                    _ = ctx.cancelled() => return Ok(()),
                    job = session.next_job() => job,
                };
                let job = match job {
                    Ok(job) => job,
                    Err(e) => {
                        link.invalidate(e);
                        continue 'connect;
                    }
                };

                match self.handle(&mut *session, job, &ctx).await? {
                    Handled::Done => {}
                    Handled::Cancelled => return Ok(()),
                    Handled::LinkLost(reason) => {
                        link.invalidate(reason);
                        continue 'connect;
                    }
                }
            }
        }
    }

    async fn handle(
        &self,
        session: &mut dyn BrokerSession,
        job: Job,
        ctx: &CancellationToken,
    ) -> Result<Handled, WorkerError> {
        let answer = match self.transform.decode(&job.data) {
            Ok(plain) => {
                let event = Event::new(plain.clone());
                let put = tokio::select! {
                    biased;
                    _ = ctx.cancelled() => return Ok(Handled::Cancelled),
                    put = self.outbox.put(event) => put,
                };
                put.map_err(|e| WorkerError::Fatal {
                    error: e.to_string(),
                })?;
                tokio::select! {
                    biased;
                    _ = ctx.cancelled() => return Ok(Handled::Cancelled),
                    sent = session.complete(&job, &plain) => sent,
                }
            }
            Err(e) => {
                self.bus.publish(
                    Status::new(StatusKind::PayloadDropped)
                        .with_worker(self.name.clone())
                        .with_target(self.queue.clone())
                        .with_reason(e.to_string()),
                );
                tokio::select! {
                    biased;
                    _ = ctx.cancelled() => return Ok(Handled::Cancelled),
                    sent = session.fail(&job) => sent,
                }
            }
        };

        Ok(match answer {
            Ok(()) => Handled::Done,
            Err(e) => Handled::LinkLost(e.to_string()),
        })
    }
}
