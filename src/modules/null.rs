//! # Null sink.
//!
//! Drains its `inbox` and discards every event. Useful to terminate a pipeline
//! branch or to measure upstream throughput.

use tokio_util::sync::CancellationToken;

use crate::config::ModuleConfig;
use crate::core::Actor;
use crate::error::{ModuleError, WorkerError};
use crate::pipeline::Mailbox;
use crate::status::Bus;
use crate::tasks::{TaskFn, TaskRef};

/// Sink module that discards events.
pub struct Null {
    config: ModuleConfig,
    inbox: Mailbox,
}

impl Null {
    pub fn new(config: ModuleConfig) -> Result<Self, ModuleError> {
        config.validate()?;
        let inbox = Mailbox::new("inbox", config.mailbox_capacity);
        Ok(Self { config, inbox })
    }

    pub fn inbox(&self) -> Mailbox {
        self.inbox.clone()
    }
}

impl Actor for Null {
    fn config(&self) -> &ModuleConfig {
        &self.config
    }

    fn mailboxes(&self) -> Vec<Mailbox> {
        vec![self.inbox.clone()]
    }

    fn tasks(&self, _bus: &Bus) -> Vec<TaskRef> {
        let inbox = self.inbox.clone();
        let task: TaskRef = TaskFn::arc(
            format!("{}.drain", self.config.name),
            move |ctx: CancellationToken| drain(inbox.clone(), ctx),
        );
        vec![task]
    }
}

async fn drain(inbox: Mailbox, ctx: CancellationToken) -> Result<(), WorkerError> {
    loop {
        tokio::select! {
            biased;
            _ = ctx.cancelled() => return Ok(()),
            event = inbox.get() => {
                if event.is_none() {
                    return Ok(());
                }
            }
        }
    }
}
