//! # Unix domain socket sink client.

use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::io::{AsyncWriteExt, Interest};
use tokio::net::UnixStream;

use crate::io::{Dialer, LinkError, SinkConnection};

/// [`Dialer`] for Unix domain stream sockets.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnixDialer;

impl UnixDialer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Dialer for UnixDialer {
    async fn dial(&self, path: &Path) -> Result<Box<dyn SinkConnection>, LinkError> {
        let stream = UnixStream::connect(path).await?;
        Ok(Box::new(UnixConnection { stream }))
    }
}

struct UnixConnection {
    stream: UnixStream,
}

#[async_trait]
impl SinkConnection for UnixConnection {
    async fn send(&mut self, frame: &[u8]) -> Result<(), LinkError> {
        self.stream.write_all(frame).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Checks the socket's readiness without waiting.
    ///
    /// A fully closed peer hangs up the write side and is reported as
    /// [`LinkError::Closed`]. A peer that only shut down its own write side
    /// still reads, so EOF on the read side is not an error. Anything the peer
    /// sent is drained and discarded. A zero-length `write` on a stream socket
    /// never reaches the kernel, so none is issued.
    async fn probe(&mut self) -> Result<(), LinkError> {
        let interest = Interest::READABLE | Interest::WRITABLE;
        let Some(ready) = self.stream.ready(interest).now_or_never() else {
            return Ok(());
        };
        let ready = ready?;
        if ready.is_write_closed() {
            return Err(LinkError::Closed);
        }
        if ready.is_readable() {
            let mut scratch = [0u8; 512];
            loop {
                match self.stream.try_read(&mut scratch) {
                    Ok(0) => break,
                    Ok(_) => continue,
                    Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                    Err(e) => return Err(LinkError::Io(e)),
                }
            }
        }
        Ok(())
    }
}
