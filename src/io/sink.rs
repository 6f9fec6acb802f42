//! # Stream socket sink seam.
//!
//! A [`Dialer`] opens [`SinkConnection`]s to a socket path. Connections carry
//! opaque frames one way; [`SinkConnection::probe`] checks liveness without
//! sending data.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::Connector;
use crate::io::LinkError;

/// Opens connections to a socket path.
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    async fn dial(&self, path: &Path) -> Result<Box<dyn SinkConnection>, LinkError>;
}

/// A live connection to the sink.
#[async_trait]
pub trait SinkConnection: Send {
    /// Writes the whole frame.
    async fn send(&mut self, frame: &[u8]) -> Result<(), LinkError>;

    /// Fails if the peer is known to be gone.
    async fn probe(&mut self) -> Result<(), LinkError>;
}

/// Dials one fixed socket path.
pub struct SinkConnector {
    dialer: Arc<dyn Dialer>,
    path: PathBuf,
    target: String,
}

impl SinkConnector {
    pub fn new(dialer: Arc<dyn Dialer>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let target = path.display().to_string();
        Self {
            dialer,
            path,
            target,
        }
    }
}

#[async_trait]
impl Connector for SinkConnector {
    type Conn = Box<dyn SinkConnection>;

    fn target(&self) -> &str {
        &self.target
    }

    async fn connect(&self) -> Result<Self::Conn, LinkError> {
        self.dialer.dial(&self.path).await
    }
}
