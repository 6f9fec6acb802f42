//! # Broker client seam.
//!
//! A [`Broker`] opens [`BrokerSession`]s; a session registers for one queue and
//! then hands out [`Job`]s one at a time. Each job is answered exactly once, with
//! [`BrokerSession::complete`] or [`BrokerSession::fail`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::Connector;
use crate::io::LinkError;

/// One unit of work assigned by the broker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Job {
    /// Broker-assigned handle, echoed back in the answer.
    pub handle: Vec<u8>,
    /// Queue (function) the job was submitted to.
    pub function: String,
    /// Raw payload.
    pub data: Vec<u8>,
}

/// Factory of broker sessions.
#[async_trait]
pub trait Broker: Send + Sync + 'static {
    /// Opens a session to the first reachable endpoint.
    async fn connect(&self, endpoints: &[String]) -> Result<Box<dyn BrokerSession>, LinkError>;
}

/// A live connection to the broker.
#[async_trait]
pub trait BrokerSession: Send {
    /// Address of the connected endpoint.
    fn peer(&self) -> &str;

    /// Announces that this session consumes `queue`.
    async fn register(&mut self, queue: &str) -> Result<(), LinkError>;

    /// Waits for the next job. Dropping the future abandons the session.
    async fn next_job(&mut self) -> Result<Job, LinkError>;

    /// Reports `job` as done with `result`.
    async fn complete(&mut self, job: &Job, result: &[u8]) -> Result<(), LinkError>;

    /// Reports `job` as failed.
    async fn fail(&mut self, job: &Job) -> Result<(), LinkError>;
}

/// Connects and registers a session for one queue.
pub struct BrokerConnector {
    broker: Arc<dyn Broker>,
    endpoints: Arc<[String]>,
    queue: Arc<str>,
    target: String,
}

impl BrokerConnector {
    pub fn new(broker: Arc<dyn Broker>, endpoints: Arc<[String]>, queue: Arc<str>) -> Self {
        let target = endpoints.join(",");
        Self {
            broker,
            endpoints,
            queue,
            target,
        }
    }
}

#[async_trait]
impl Connector for BrokerConnector {
    type Conn = Box<dyn BrokerSession>;

    fn target(&self) -> &str {
        &self.target
    }

    async fn connect(&self) -> Result<Self::Conn, LinkError> {
        if self.endpoints.is_empty() {
            return Err(LinkError::NoEndpoints);
        }
        let mut session = self.broker.connect(&self.endpoints).await?;
        session.register(&self.queue).await?;
        Ok(session)
    }
}
