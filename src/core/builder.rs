use std::sync::Arc;

use super::{actor::Actor, module::Module};
use crate::subscribers::{LogWriter, Subscribe};

/// Builder for a [`Module`] with custom status subscribers.
pub struct ModuleBuilder {
    actor: Box<dyn Actor>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl ModuleBuilder {
    /// Starts from `actor` with the default [`LogWriter`] subscriber.
    pub fn new(actor: impl Actor) -> Self {
        Self {
            actor: Box::new(actor),
            subscribers: vec![Arc::new(LogWriter::new())],
        }
    }

    /// Replaces the status subscribers (including the default [`LogWriter`]).
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds one status subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    pub fn build(self) -> Module {
        Module::new_internal(self.actor, self.subscribers)
    }
}
