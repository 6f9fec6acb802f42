//! End-to-end tests of the Gearman input module against an in-process gearmand.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actorvisor::{
    Event, GearmanBroker, GearmanIn, Mailbox, Module, ModuleConfig, Payload, PayloadTransform,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Notify, mpsc};
use tokio::time::timeout;

const CAN_DO: u32 = 1;
const PRE_SLEEP: u32 = 4;
const NOOP: u32 = 6;
const GRAB_JOB: u32 = 9;
const NO_JOB: u32 = 10;
const JOB_ASSIGN: u32 = 11;
const WORK_COMPLETE: u32 = 13;
const WORK_FAIL: u32 = 14;

/// Answer a worker sent back for a job.
#[derive(Debug, PartialEq)]
enum Answer {
    Complete { handle: String, result: Vec<u8> },
    Fail { handle: String },
}

/// Minimal gearmand: one shared queue, worker protocol only.
struct FakeGearmand {
    addr: String,
    jobs: Arc<Mutex<VecDeque<Vec<u8>>>>,
    wake: Arc<Notify>,
    answers: mpsc::UnboundedReceiver<Answer>,
    queues: Arc<Mutex<Vec<String>>>,
}

impl FakeGearmand {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let jobs = Arc::new(Mutex::new(VecDeque::new()));
        let wake = Arc::new(Notify::new());
        let queues = Arc::new(Mutex::new(Vec::new()));
        let (tx, answers) = mpsc::unbounded_channel();

        {
            let (jobs, wake, queues) = (jobs.clone(), wake.clone(), queues.clone());
            tokio::spawn(async move {
                let mut next_handle = 0u64;
                loop {
                    let (stream, _) = listener.accept().await.unwrap();
                    next_handle += 1000;
                    tokio::spawn(serve(
                        stream,
                        jobs.clone(),
                        wake.clone(),
                        queues.clone(),
                        tx.clone(),
                        next_handle,
                    ));
                }
            });
        }

        Self {
            addr,
            jobs,
            wake,
            answers,
            queues,
        }
    }

    fn submit(&self, data: impl Into<Vec<u8>>) {
        self.jobs.lock().unwrap().push_back(data.into());
        self.wake.notify_waiters();
    }

    async fn answer(&mut self) -> Answer {
        timeout(Duration::from_secs(10), self.answers.recv())
            .await
            .expect("no answer in time")
            .expect("server gone")
    }
}

async fn read_request(stream: &mut TcpStream) -> Option<(u32, Vec<u8>)> {
    let mut header = [0u8; 12];
    stream.read_exact(&mut header).await.ok()?;
    assert_eq!(&header[..4], b"\0REQ");
    let kind = u32::from_be_bytes(header[4..8].try_into().unwrap());
    let len = u32::from_be_bytes(header[8..12].try_into().unwrap()) as usize;
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await.ok()?;
    Some((kind, payload))
}

async fn write_response(stream: &mut TcpStream, kind: u32, payload: &[u8]) {
    let mut buf = b"\0RES".to_vec();
    buf.extend_from_slice(&kind.to_be_bytes());
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(payload);
    let _ = stream.write_all(&buf).await;
}

async fn serve(
    mut stream: TcpStream,
    jobs: Arc<Mutex<VecDeque<Vec<u8>>>>,
    wake: Arc<Notify>,
    queues: Arc<Mutex<Vec<String>>>,
    answers: mpsc::UnboundedSender<Answer>,
    mut handle: u64,
) {
    while let Some((kind, payload)) = read_request(&mut stream).await {
        match kind {
            CAN_DO => queues
                .lock()
                .unwrap()
                .push(String::from_utf8(payload).unwrap()),
            GRAB_JOB => {
                let job = jobs.lock().unwrap().pop_front();
                match job {
                    Some(data) => {
                        handle += 1;
                        let mut body = format!("H:fake:{handle}\0q\0").into_bytes();
                        body.extend_from_slice(&data);
                        write_response(&mut stream, JOB_ASSIGN, &body).await;
                    }
                    None => write_response(&mut stream, NO_JOB, &[]).await,
                }
            }
            PRE_SLEEP => {
                loop {
                    let notified = wake.notified();
                    if !jobs.lock().unwrap().is_empty() {
                        break;
                    }
                    notified.await;
                }
                write_response(&mut stream, NOOP, &[]).await;
            }
            WORK_COMPLETE => {
                let split = payload.iter().position(|b| *b == 0).unwrap();
                let _ = answers.send(Answer::Complete {
                    handle: String::from_utf8(payload[..split].to_vec()).unwrap(),
                    result: payload[split + 1..].to_vec(),
                });
            }
            WORK_FAIL => {
                let _ = answers.send(Answer::Fail {
                    handle: String::from_utf8(payload).unwrap(),
                });
            }
            other => panic!("unexpected request type {other}"),
        }
    }
}

async fn next(outbox: &Mailbox) -> Event {
    timeout(Duration::from_secs(10), outbox.get())
        .await
        .expect("no event in time")
        .expect("outbox closed")
}

fn input(server: &FakeGearmand, cfg: ModuleConfig) -> (Module, Mailbox) {
    let cfg = cfg.with_endpoints([server.addr.clone()]).with_source("q");
    let input = GearmanIn::new(cfg, Arc::new(GearmanBroker::new())).unwrap();
    let outbox = input.outbox();
    (Module::new(input), outbox)
}

#[tokio::test]
async fn raw_unit_passes_through_unchanged() {
    let mut server = FakeGearmand::start().await;
    let (module, outbox) = input(&server, ModuleConfig::new("gearman_in"));
    module.start().unwrap();

    server.submit(b"hello".to_vec());
    let event = next(&outbox).await;
    assert_eq!(event.data, Payload::from(b"hello".to_vec()));
    assert!(event.header.is_empty());

    match server.answer().await {
        Answer::Complete { result, .. } => assert_eq!(result, b"hello"),
        other => panic!("expected WORK_COMPLETE, got {other:?}"),
    }
    assert_eq!(*server.queues.lock().unwrap(), vec!["q".to_string()]);
    module.stop().await.unwrap();
}

#[tokio::test]
async fn encrypted_unit_is_decrypted() {
    let secret = "k".repeat(10);
    let mut server = FakeGearmand::start().await;
    let (module, outbox) = input(&server, ModuleConfig::new("gearman_in").with_secret(&secret));
    module.start().unwrap();

    let producer = PayloadTransform::from_secret(Some(secret.as_str())).unwrap();
    server.submit(producer.encode(b"payload"));
    assert_eq!(next(&outbox).await.data, Payload::from(b"payload".to_vec()));
    assert!(matches!(server.answer().await, Answer::Complete { .. }));

    server.submit(b"%%% not base64 %%%".to_vec());
    assert!(matches!(server.answer().await, Answer::Fail { .. }));

    server.submit(producer.encode(b"still running"));
    assert_eq!(next(&outbox).await.data, Payload::from(b"still running".to_vec()));
    module.stop().await.unwrap();
}

#[tokio::test]
async fn worker_pool_shares_the_queue() {
    let server = FakeGearmand::start().await;
    let (module, outbox) = input(&server, ModuleConfig::new("gearman_in").with_workers(3));
    module.start().unwrap();

    for i in 0..30 {
        server.submit(format!("unit-{i}").into_bytes());
    }
    let mut seen = Vec::new();
    for _ in 0..30 {
        seen.push(next(&outbox).await.data);
    }
    for i in 0..30 {
        assert!(seen.contains(&Payload::from(format!("unit-{i}").into_bytes())));
    }
    timeout(Duration::from_secs(10), async {
        while server.queues.lock().unwrap().len() < 3 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("every worker registers");
    module.stop().await.unwrap();
}

#[tokio::test]
async fn unreachable_broker_does_not_block_stop() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let cfg = ModuleConfig::new("gearman_in").with_endpoints([addr]);
    let module = Module::new(GearmanIn::new(cfg, Arc::new(GearmanBroker::new())).unwrap());
    module.start().unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let started = std::time::Instant::now();
    module.stop().await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));
}
