//! In-memory broker and sink doubles for unit tests.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{Notify, watch};
use tokio::time::Instant;

use crate::io::{Broker, BrokerSession, Dialer, Job, LinkError, SinkConnection};

#[derive(Default)]
struct BrokerState {
    queue: VecDeque<Job>,
    next_handle: u64,
    fail_connects: usize,
    max_sessions: Option<usize>,
    sessions: usize,
    connects: Vec<Instant>,
    registered: Vec<String>,
    completed: Vec<(Vec<u8>, Vec<u8>)>,
    failed: Vec<Vec<u8>>,
}

/// Scriptable broker: a shared job queue plus connection failure knobs.
pub(crate) struct MemoryBroker {
    state: Arc<Mutex<BrokerState>>,
    jobs: Arc<Notify>,
    generation: watch::Sender<u64>,
}

impl MemoryBroker {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Arc::default(),
            jobs: Arc::new(Notify::new()),
            generation: watch::Sender::new(0),
        })
    }

    fn state(&self) -> std::sync::MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap()
    }

    /// Queues a job carrying `data`.
    pub(crate) fn push_job(&self, data: impl Into<Vec<u8>>) {
        let mut st = self.state();
        st.next_handle += 1;
        let job = Job {
            handle: format!("H:mem:{}", st.next_handle).into_bytes(),
            function: "test".into(),
            data: data.into(),
        };
        st.queue.push_back(job);
        drop(st);
        self.jobs.notify_waiters();
        self.jobs.notify_one();
    }

    /// The next `n` connection attempts fail.
    pub(crate) fn fail_connects(&self, n: usize) {
        self.state().fail_connects = n;
    }

    /// Connection attempts beyond `n` live sessions fail.
    pub(crate) fn max_sessions(&self, n: usize) {
        self.state().max_sessions = Some(n);
    }

    /// Breaks every live session; their next call fails with `Closed`.
    pub(crate) fn drop_sessions(&self) {
        self.generation.send_modify(|g| *g += 1);
    }

    pub(crate) fn connects(&self) -> Vec<Instant> {
        self.state().connects.clone()
    }

    pub(crate) fn sessions(&self) -> usize {
        self.state().sessions
    }

    pub(crate) fn registered(&self) -> Vec<String> {
        self.state().registered.clone()
    }

    pub(crate) fn completed(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.state().completed.clone()
    }

    pub(crate) fn failed(&self) -> Vec<Vec<u8>> {
        self.state().failed.clone()
    }

    pub(crate) fn pending(&self) -> usize {
        self.state().queue.len()
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn connect(&self, endpoints: &[String]) -> Result<Box<dyn BrokerSession>, LinkError> {
        let mut st = self.state();
        st.connects.push(Instant::now());
        if st.fail_connects > 0 {
            st.fail_connects -= 1;
            return Err(LinkError::Io(std::io::ErrorKind::ConnectionRefused.into()));
        }
        if st.max_sessions.is_some_and(|max| st.sessions >= max) {
            return Err(LinkError::Io(std::io::ErrorKind::ConnectionRefused.into()));
        }
        st.sessions += 1;
        Ok(Box::new(MemorySession {
            peer: endpoints.first().cloned().unwrap_or_default(),
            state: self.state.clone(),
            jobs: self.jobs.clone(),
            born: *self.generation.borrow(),
            generation: self.generation.subscribe(),
        }))
    }
}

struct MemorySession {
    peer: String,
    state: Arc<Mutex<BrokerState>>,
    jobs: Arc<Notify>,
    born: u64,
    generation: watch::Receiver<u64>,
}

impl MemorySession {
    fn check(&self) -> Result<(), LinkError> {
        if *self.generation.borrow() != self.born {
            return Err(LinkError::Closed);
        }
        Ok(())
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.state.lock().unwrap().sessions -= 1;
    }
}

#[async_trait]
impl BrokerSession for MemorySession {
    fn peer(&self) -> &str {
        &self.peer
    }

    async fn register(&mut self, queue: &str) -> Result<(), LinkError> {
        self.check()?;
        self.state.lock().unwrap().registered.push(queue.to_string());
        Ok(())
    }

    async fn next_job(&mut self) -> Result<Job, LinkError> {
        loop {
            self.check()?;
            let notified = self.jobs.notified();
            let job = self.state.lock().unwrap().queue.pop_front();
            if let Some(job) = job {
                return Ok(job);
            }
            tokio::select! {
                _ = notified => {}
                _ = self.generation.changed() => {}
            }
        }
    }

    async fn complete(&mut self, job: &Job, result: &[u8]) -> Result<(), LinkError> {
        self.check()?;
        let mut st = self.state.lock().unwrap();
        st.completed.push((job.handle.clone(), result.to_vec()));
        Ok(())
    }

    async fn fail(&mut self, job: &Job) -> Result<(), LinkError> {
        self.check()?;
        self.state.lock().unwrap().failed.push(job.handle.clone());
        Ok(())
    }
}

#[derive(Default)]
struct DialerState {
    fail_dials: usize,
    fail_sends: usize,
    fail_probes: usize,
    stall_sends: bool,
    dials: Vec<Instant>,
    probes: usize,
    received: Vec<Vec<u8>>,
}

/// Scriptable sink: records delivered frames, fails dials/sends/probes on demand.
#[derive(Default)]
pub(crate) struct MemoryDialer {
    state: Arc<Mutex<DialerState>>,
}

impl MemoryDialer {
    pub(crate) fn new() -> Arc<Self> {
        Arc::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, DialerState> {
        self.state.lock().unwrap()
    }

    pub(crate) fn fail_dials(&self, n: usize) {
        self.state().fail_dials = n;
    }

    pub(crate) fn fail_sends(&self, n: usize) {
        self.state().fail_sends = n;
    }

    pub(crate) fn fail_probes(&self, n: usize) {
        self.state().fail_probes = n;
    }

    /// Sends never complete, like a peer that stopped reading.
    pub(crate) fn stall_sends(&self, stall: bool) {
        self.state().stall_sends = stall;
    }

    pub(crate) fn dials(&self) -> Vec<Instant> {
        self.state().dials.clone()
    }

    pub(crate) fn probes(&self) -> usize {
        self.state().probes
    }

    pub(crate) fn received(&self) -> Vec<Vec<u8>> {
        self.state().received.clone()
    }
}

#[async_trait]
impl Dialer for MemoryDialer {
    async fn dial(&self, _path: &Path) -> Result<Box<dyn SinkConnection>, LinkError> {
        let mut st = self.state();
        st.dials.push(Instant::now());
        if st.fail_dials > 0 {
            st.fail_dials -= 1;
            return Err(LinkError::Io(std::io::ErrorKind::NotFound.into()));
        }
        Ok(Box::new(MemoryConnection {
            state: self.state.clone(),
        }))
    }
}

struct MemoryConnection {
    state: Arc<Mutex<DialerState>>,
}

#[async_trait]
impl SinkConnection for MemoryConnection {
    async fn send(&mut self, frame: &[u8]) -> Result<(), LinkError> {
        let stalled = self.state.lock().unwrap().stall_sends;
        if stalled {
            std::future::pending::<()>().await;
        }
        let mut st = self.state.lock().unwrap();
        if st.fail_sends > 0 {
            st.fail_sends -= 1;
            return Err(LinkError::Io(std::io::ErrorKind::BrokenPipe.into()));
        }
        st.received.push(frame.to_vec());
        Ok(())
    }

    async fn probe(&mut self) -> Result<(), LinkError> {
        let mut st = self.state.lock().unwrap();
        st.probes += 1;
        if st.fail_probes > 0 {
            st.fail_probes -= 1;
            return Err(LinkError::Closed);
        }
        Ok(())
    }
}
