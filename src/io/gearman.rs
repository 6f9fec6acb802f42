//! # Gearman worker client.
//!
//! Speaks the binary worker side of the Gearman protocol over TCP. Every packet is
//!
//! ```text
//! magic (4 bytes) | type: u32 BE | length: u32 BE | payload (length bytes)
//! ```
//!
//! with magic `"\0REQ"` for packets the worker sends and `"\0RES"` for packets the
//! server sends. A session runs:
//!
//! ```text
//! CAN_DO(queue)
//! loop {
//!     GRAB_JOB ──► NO_JOB     ──► PRE_SLEEP ──► (wait) NOOP ──► again
//!              └─► JOB_ASSIGN(handle \0 function \0 data)
//!                      └─► WORK_COMPLETE(handle \0 result) | WORK_FAIL(handle)
//! }
//! ```

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::config::split_endpoint;
use crate::io::{Broker, BrokerSession, Job, LinkError};

const REQ_MAGIC: [u8; 4] = *b"\0REQ";
const RES_MAGIC: [u8; 4] = *b"\0RES";
const HEADER_LEN: usize = 12;

/// Largest payload accepted from the server.
pub const MAX_PACKET_LEN: usize = 64 * 1024 * 1024;

pub(crate) mod packet {
    pub const CAN_DO: u32 = 1;
    pub const PRE_SLEEP: u32 = 4;
    pub const NOOP: u32 = 6;
    pub const GRAB_JOB: u32 = 9;
    pub const NO_JOB: u32 = 10;
    pub const JOB_ASSIGN: u32 = 11;
    pub const WORK_COMPLETE: u32 = 13;
    pub const WORK_FAIL: u32 = 14;
    pub const ERROR: u32 = 19;
}

/// Encodes one worker request.
pub(crate) fn encode_request(kind: u32, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    buf.extend_from_slice(&REQ_MAGIC);
    buf.extend_from_slice(&kind.to_be_bytes());
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Reads one packet carrying `magic`.
pub(crate) async fn read_packet<R>(r: &mut R, magic: [u8; 4]) -> Result<(u32, Vec<u8>), LinkError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    if let Err(e) = r.read_exact(&mut header).await {
        return Err(match e.kind() {
            std::io::ErrorKind::UnexpectedEof => LinkError::Closed,
            _ => LinkError::Io(e),
        });
    }
    if header[..4] != magic {
        return Err(LinkError::Protocol(format!(
            "bad packet magic {:?}",
            &header[..4]
        )));
    }
    let kind = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
    let len = u32::from_be_bytes([header[8], header[9], header[10], header[11]]) as usize;
    if len > MAX_PACKET_LEN {
        return Err(LinkError::Protocol(format!(
            "packet of {len} bytes exceeds {MAX_PACKET_LEN}"
        )));
    }

    let mut payload = vec![0u8; len];
    if let Err(e) = r.read_exact(&mut payload).await {
        return Err(match e.kind() {
            std::io::ErrorKind::UnexpectedEof => LinkError::Closed,
            _ => LinkError::Io(e),
        });
    }
    Ok((kind, payload))
}

fn parse_job(payload: &[u8]) -> Result<Job, LinkError> {
    let mut parts = payload.splitn(3, |b| *b == 0);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(handle), Some(function), Some(data)) => Ok(Job {
            handle: handle.to_vec(),
            function: String::from_utf8_lossy(function).into_owned(),
            data: data.to_vec(),
        }),
        _ => Err(LinkError::Protocol("malformed JOB_ASSIGN".into())),
    }
}

fn server_error(payload: &[u8]) -> LinkError {
    let text = String::from_utf8_lossy(payload).replace('\0', ": ");
    LinkError::Protocol(format!("server error: {text}"))
}

/// [`Broker`] speaking the Gearman worker protocol over TCP.
#[derive(Clone, Copy, Debug, Default)]
pub struct GearmanBroker;

impl GearmanBroker {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Broker for GearmanBroker {
    async fn connect(&self, endpoints: &[String]) -> Result<Box<dyn BrokerSession>, LinkError> {
        let mut last = LinkError::NoEndpoints;
        for endpoint in endpoints {
            let (host, port) = split_endpoint(endpoint);
            match TcpStream::connect((host, port)).await {
                Ok(stream) => {
                    let _ = stream.set_nodelay(true);
                    return Ok(Box::new(GearmanSession::new(stream, endpoint.clone())));
                }
                Err(e) => last = LinkError::Io(e),
            }
        }
        Err(last)
    }
}

/// One worker connection to a Gearman server.
pub struct GearmanSession<S = TcpStream> {
    stream: S,
    peer: String,
}

impl<S> GearmanSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, peer: String) -> Self {
        Self { stream, peer }
    }

    async fn send(&mut self, kind: u32, payload: &[u8]) -> Result<(), LinkError> {
        self.stream.write_all(&encode_request(kind, payload)).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<(u32, Vec<u8>), LinkError> {
        match read_packet(&mut self.stream, RES_MAGIC).await? {
            (packet::ERROR, payload) => Err(server_error(&payload)),
            other => Ok(other),
        }
    }

    /// Sleeps on the server until it wakes the worker with `NOOP`.
    async fn pre_sleep(&mut self) -> Result<(), LinkError> {
        self.send(packet::PRE_SLEEP, &[]).await?;
        loop {
            let (kind, _) = self.recv().await?;
            if kind == packet::NOOP {
                return Ok(());
            }
        }
    }
}

#[async_trait]
impl<S> BrokerSession for GearmanSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn peer(&self) -> &str {
        &self.peer
    }

    async fn register(&mut self, queue: &str) -> Result<(), LinkError> {
        self.send(packet::CAN_DO, queue.as_bytes()).await
    }

    async fn next_job(&mut self) -> Result<Job, LinkError> {
        loop {
            self.send(packet::GRAB_JOB, &[]).await?;
            loop {
                let (kind, payload) = self.recv().await?;
                match kind {
                    packet::JOB_ASSIGN => return parse_job(&payload),
                    packet::NO_JOB => {
                        self.pre_sleep().await?;
                        break;
                    }
                    // A wakeup that raced with GRAB_JOB.
                    packet::NOOP => continue,
                    other => {
                        return Err(LinkError::Protocol(format!(
                            "unexpected packet type {other} while grabbing a job"
                        )));
                    }
                }
            }
        }
    }

    async fn complete(&mut self, job: &Job, result: &[u8]) -> Result<(), LinkError> {
        let mut payload = Vec::with_capacity(job.handle.len() + 1 + result.len());
        payload.extend_from_slice(&job.handle);
        payload.push(0);
        payload.extend_from_slice(result);
        self.send(packet::WORK_COMPLETE, &payload).await
    }

    async fn fail(&mut self, job: &Job) -> Result<(), LinkError> {
        self.send(packet::WORK_FAIL, &job.handle).await
    }
}
