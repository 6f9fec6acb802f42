//! # Outer-system clients.
//!
//! Modules never touch sockets directly. Input modules talk to a job broker through
//! [`Broker`]/[`BrokerSession`], output modules to a stream socket through
//! [`Dialer`]/[`SinkConnection`]. Both seams are wrapped in a
//! [`Connector`](crate::core::Connector) so the connection supervisor can drive
//! (re)connection uniformly.
//!
//! - [`GearmanBroker`]: Gearman worker protocol over TCP.
//! - [`UnixDialer`]: Unix domain stream sockets.
//!
//! Every failure is a [`LinkError`]; it is handled inside the worker that hit it
//! and never reaches the pipeline.

mod broker;
mod gearman;
mod sink;
#[cfg(test)]
pub(crate) mod testkit;
mod unix;

pub use broker::{Broker, BrokerConnector, BrokerSession, Job};
pub use gearman::GearmanBroker;
pub use sink::{Dialer, SinkConnection, SinkConnector};
pub use unix::UnixDialer;

use thiserror::Error;

/// Connectivity failure on a broker or sink link.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LinkError {
    /// Socket-level failure (refused, reset, broken pipe...).
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
    /// The peer sent something the client does not understand.
    #[error("protocol: {0}")]
    Protocol(String),
    /// The peer closed the connection.
    #[error("connection closed by peer")]
    Closed,
    /// No endpoint is configured.
    #[error("no endpoints configured")]
    NoEndpoints,
}

impl LinkError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            LinkError::Io(_) => "link_io",
            LinkError::Protocol(_) => "link_protocol",
            LinkError::Closed => "link_closed",
            LinkError::NoEndpoints => "link_no_endpoints",
        }
    }
}
