//! End-to-end tests of the Unix socket output module against a real listener.

use std::sync::Arc;
use std::time::Duration;

use actorvisor::{Event, Module, ModuleConfig, UdsOut, UnixDialer};
use tokio::io::AsyncReadExt;
use tokio::net::{UnixListener, UnixStream};
use tokio::time::timeout;

async fn read_exactly(stream: &mut UnixStream, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    timeout(Duration::from_secs(10), stream.read_exact(&mut buf))
        .await
        .expect("no bytes in time")
        .unwrap();
    buf
}

async fn accept(listener: &UnixListener) -> UnixStream {
    timeout(Duration::from_secs(10), listener.accept())
        .await
        .expect("no connection in time")
        .unwrap()
        .0
}

#[tokio::test]
async fn list_event_is_joined_and_delimited() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.sock");
    let listener = UnixListener::bind(&path).unwrap();

    let cfg = ModuleConfig::new("uds_out")
        .with_target_path(&path)
        .with_delimiter("\n");
    let out = UdsOut::new(cfg, Arc::new(UnixDialer::new())).unwrap();
    let inbox = out.inbox();
    let module = Module::new(out);
    module.start().unwrap();

    let mut peer = accept(&listener).await;
    inbox
        .put(Event::new(vec!["a".to_string(), "b".to_string(), "c".to_string()]))
        .await
        .unwrap();
    inbox.put(Event::new("d")).await.unwrap();

    assert_eq!(read_exactly(&mut peer, 8).await, b"a\nb\nc\nd\n");
    module.stop().await.unwrap();
}

#[tokio::test]
async fn reconnects_after_listener_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.sock");
    let listener = UnixListener::bind(&path).unwrap();

    let cfg = ModuleConfig::new("uds_out")
        .with_target_path(&path)
        .with_delimiter("\n");
    let out = UdsOut::new(cfg, Arc::new(UnixDialer::new())).unwrap();
    let inbox = out.inbox();
    let module = Module::new(out);
    module.start().unwrap();

    let mut peer = accept(&listener).await;
    inbox.put(Event::new("first")).await.unwrap();
    assert_eq!(read_exactly(&mut peer, 6).await, b"first\n");

    drop(peer);
    drop(listener);
    std::fs::remove_file(&path).unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;

    inbox.put(Event::new("second")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    let listener = UnixListener::bind(&path).unwrap();
    let mut peer = accept(&listener).await;

    assert_eq!(read_exactly(&mut peer, 7).await, b"second\n");
    module.stop().await.unwrap();
}

#[tokio::test]
async fn stop_returns_while_socket_is_missing() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = ModuleConfig::new("uds_out").with_target_path(dir.path().join("absent.sock"));
    let out = UdsOut::new(cfg, Arc::new(UnixDialer::new())).unwrap();
    let inbox = out.inbox();
    let module = Module::new(out);
    module.start().unwrap();
    inbox.put(Event::new("stranded")).await.unwrap();

    tokio::time::sleep(Duration::from_millis(2500)).await;
    let started = std::time::Instant::now();
    module.stop().await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn stop_interrupts_write_to_peer_that_never_reads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.sock");
    let listener = UnixListener::bind(&path).unwrap();

    let cfg = ModuleConfig::new("uds_out")
        .with_target_path(&path)
        .with_grace_secs(3);
    let out = UdsOut::new(cfg, Arc::new(UnixDialer::new())).unwrap();
    let inbox = out.inbox();
    let module = Module::new(out);
    module.start().unwrap();

    let _peer = accept(&listener).await;
    inbox.put(Event::new(vec![b'x'; 4 << 20])).await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(inbox.is_empty());

    let started = std::time::Instant::now();
    module.stop().await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));
}
