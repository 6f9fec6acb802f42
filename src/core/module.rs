//! # Module: composition root and lifecycle.
//!
//! A [`Module`] pairs an [`Actor`] (mailboxes + worker loops) with the machinery
//! every module kind shares: a status [`Bus`], the subscriber fan-out, a
//! cancellation token and the set of running workers.
//!
//! ```text
//! Created ──start()──► Running ──stop()──► Stopping ──(workers joined or aborted)──► Stopped
//!    └──────────────────────stop()──────────────────────────────────────────────────►┘
//! ```
//!
//! ## Rules
//! - `start()` is accepted only in `Created`; a stopped module is never restarted.
//! - `stop()` cancels every worker and waits up to `grace`; workers still running
//!   after that are aborted and reported in [`ModuleError::GraceExceeded`].
//! - `stop()` in `Stopping`/`Stopped` is a no-op; in `Created` it goes straight to
//!   `Stopped`.
//! - Statuses published before `stop()` returns reach every subscriber.
//!
//! ## Example
//! ```rust
//! use actorvisor::{Module, ModuleConfig, ModuleState, Null};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), actorvisor::ModuleError> {
//! let module = Module::new(Null::new(ModuleConfig::new("null"))?);
//! module.start()?;
//! assert_eq!(module.state(), ModuleState::Running);
//!
//! module.stop().await?;
//! assert_eq!(module.state(), ModuleState::Stopped);
//! assert!(module.start().is_err());
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use super::{
    actor::Actor,
    builder::ModuleBuilder,
    runner::{AliveSet, run_worker},
    shutdown,
};
use crate::error::ModuleError;
use crate::pipeline::Mailbox;
use crate::status::{Bus, Status, StatusKind};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Lifecycle state of a module.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModuleState {
    Created,
    Running,
    Stopping,
    Stopped,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A running unit of the pipeline.
pub struct Module {
    name: Arc<str>,
    actor: Box<dyn Actor>,
    bus: Bus,
    subscribers: Mutex<Vec<Arc<dyn Subscribe>>>,
    state: Mutex<ModuleState>,
    token: CancellationToken,
    listener_token: CancellationToken,
    listener: Mutex<Option<JoinHandle<()>>>,
    workers: Mutex<Option<JoinSet<()>>>,
    alive: AliveSet,
}

impl Module {
    /// Wraps `actor` with the default [`LogWriter`](crate::LogWriter) subscriber.
    pub fn new(actor: impl Actor) -> Self {
        ModuleBuilder::new(actor).build()
    }

    pub fn builder(actor: impl Actor) -> ModuleBuilder {
        ModuleBuilder::new(actor)
    }

    pub(crate) fn new_internal(actor: Box<dyn Actor>, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let name: Arc<str> = Arc::from(actor.config().name.as_str());
        let bus = Bus::new(actor.config().bus_capacity);
        Self {
            name,
            bus,
            actor,
            subscribers: Mutex::new(subscribers),
            state: Mutex::new(ModuleState::Created),
            token: CancellationToken::new(),
            listener_token: CancellationToken::new(),
            listener: Mutex::new(None),
            workers: Mutex::new(None),
            alive: AliveSet::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ModuleState {
        *lock(&self.state)
    }

    /// Mailbox owned by this module, by name (`"outbox"`, `"inbox"`).
    pub fn mailbox(&self, name: &str) -> Option<Mailbox> {
        self.actor
            .mailboxes()
            .into_iter()
            .find(|mb| mb.name() == name)
    }

    /// Status bus of this module.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Token cancelled when the module stops. Cancelling it makes [`run`](Self::run) return.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Spawns the status listener and every worker, then returns.
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(&self) -> Result<(), ModuleError> {
        {
            let mut state = lock(&self.state);
            if *state != ModuleState::Created {
                return Err(ModuleError::InvalidState {
                    op: "start",
                    state: *state,
                });
            }
            *state = ModuleState::Running;
        }

        self.spawn_listener();
        self.bus
            .publish(Status::new(StatusKind::ModuleStarted).with_module(self.name.clone()));

        let mut set = JoinSet::new();
        for task in self.actor.tasks(&self.bus) {
            lock(&self.alive).insert(task.name().to_string());
            set.spawn(run_worker(
                task,
                self.token.child_token(),
                self.bus.clone(),
                self.name.clone(),
                self.alive.clone(),
            ));
        }
        if let Some(period) = self.actor.config().metrics_interval() {
            set.spawn(report_depth(
                self.name.clone(),
                self.actor.mailboxes(),
                self.bus.clone(),
                period,
                self.token.child_token(),
            ));
        }
        *lock(&self.workers) = Some(set);
        Ok(())
    }

    /// Cancels all workers and waits for them, at most `grace`.
    pub async fn stop(&self) -> Result<(), ModuleError> {
        {
            let mut state = lock(&self.state);
            match *state {
                ModuleState::Created => {
                    *state = ModuleState::Stopped;
                    self.token.cancel();
                    return Ok(());
                }
                ModuleState::Stopping | ModuleState::Stopped => return Ok(()),
                ModuleState::Running => *state = ModuleState::Stopping,
            }
        }

        self.bus
            .publish(Status::new(StatusKind::StopRequested).with_module(self.name.clone()));
        self.token.cancel();

        let mut set = lock(&self.workers).take().unwrap_or_default();
        let grace = self.actor.config().grace();
        let res = self.join_within(&mut set, grace).await;

        *lock(&self.state) = ModuleState::Stopped;
        self.close_listener().await;
        res
    }

    /// Starts the module and stops it on a termination signal or when the
    /// [`cancellation_token`](Self::cancellation_token) is cancelled.
    pub async fn run(&self) -> Result<(), ModuleError> {
        self.start()?;
        let signal = tokio::select! {
            res = shutdown::wait_for_shutdown_signal() => res,
            _ = self.token.cancelled() => Ok(()),
        };
        let stopped = self.stop().await;
        signal.and(stopped)
    }

    async fn join_within(&self, set: &mut JoinSet<()>, grace: Duration) -> Result<(), ModuleError> {
        let done = async { while set.join_next().await.is_some() {} };
        if tokio::time::timeout(grace, done).await.is_ok() {
            self.bus
                .publish(Status::new(StatusKind::AllStoppedWithin).with_module(self.name.clone()));
            return Ok(());
        }

        let stuck: Vec<String> = lock(&self.alive).iter().cloned().collect();
        self.bus.publish(
            Status::new(StatusKind::GraceExceeded)
                .with_module(self.name.clone())
                .with_reason(stuck.join(", ")),
        );
        set.abort_all();
        while set.join_next().await.is_some() {}
        Err(ModuleError::GraceExceeded { grace, stuck })
    }

    /// Forwards bus records to the subscriber set until the listener token is cancelled.
    fn spawn_listener(&self) {
        let subs = std::mem::take(&mut *lock(&self.subscribers));
        let mut rx = self.bus.subscribe();
        let set = SubscriberSet::new(subs, self.bus.clone());
        let token = self.listener_token.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    res = rx.recv() => match res {
                        Ok(status) => set.emit(status),
                        Err(RecvError::Lagged(_)) => continue,
                        Err(RecvError::Closed) => break,
                    },
                    _ = token.cancelled() => break,
                }
            }
            while let Ok(status) = rx.try_recv() {
                set.emit(status);
            }
            set.shutdown().await;
        });
        *lock(&self.listener) = Some(handle);
    }

    async fn close_listener(&self) {
        self.listener_token.cancel();
        let handle = lock(&self.listener).take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

impl Drop for Module {
    fn drop(&mut self) {
        self.token.cancel();
        self.listener_token.cancel();
    }
}

/// Publishes the depth of every mailbox once per `period`.
async fn report_depth(
    module: Arc<str>,
    mailboxes: Vec<Mailbox>,
    bus: Bus,
    period: Duration,
    ctx: CancellationToken,
) {
    let mut tick = tokio::time::interval(period);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            biased;
            _ = ctx.cancelled() => return,
            _ = tick.tick() => {
                for mb in &mailboxes {
                    bus.publish(
                        Status::new(StatusKind::MailboxDepth)
                            .with_module(module.clone())
                            .with_target(mb.name())
                            .with_depth(mb.len(), mb.capacity()),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModuleConfig;
    use crate::error::WorkerError;
    use crate::pipeline::{Event, Payload};
    use crate::tasks::{TaskFn, TaskRef};
    use async_trait::async_trait;
    use tokio::time::Instant;

    struct TestActor {
        config: ModuleConfig,
        outbox: Mailbox,
        stuck: bool,
    }

    impl TestActor {
        fn new(config: ModuleConfig) -> Self {
            let outbox = Mailbox::new("outbox", config.mailbox_capacity);
            Self {
                config,
                outbox,
                stuck: false,
            }
        }
    }

    impl Actor for TestActor {
        fn config(&self) -> &ModuleConfig {
            &self.config
        }

        fn mailboxes(&self) -> Vec<Mailbox> {
            vec![self.outbox.clone()]
        }

        fn tasks(&self, _bus: &Bus) -> Vec<TaskRef> {
            let mut tasks: Vec<TaskRef> = Vec::new();
            let outbox = self.outbox.clone();
            tasks.push(TaskFn::arc("t.producer", move |ctx: CancellationToken| {
                let outbox = outbox.clone();
                async move {
                    let _ = outbox.put(Event::new("hello")).await;
                    ctx.cancelled().await;
                    Ok::<_, WorkerError>(())
                }
            }));
            if self.stuck {
                tasks.push(TaskFn::arc("t.stuck", |_ctx: CancellationToken| async {
                    std::future::pending::<()>().await;
                    Ok::<_, WorkerError>(())
                }));
            }
            tasks
        }
    }

    #[derive(Default)]
    struct Recorder {
        seen: std::sync::Mutex<Vec<Status>>,
    }

    impl Recorder {
        fn kinds(&self) -> Vec<StatusKind> {
            self.seen.lock().unwrap().iter().map(|s| s.kind).collect()
        }
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_status(&self, status: &Status) {
            self.seen.lock().unwrap().push(status.clone());
        }
        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    fn module(actor: TestActor) -> (Module, Arc<Recorder>) {
        let rec = Arc::new(Recorder::default());
        let module = Module::builder(actor)
            .with_subscribers(vec![rec.clone() as Arc<dyn Subscribe>])
            .build();
        (module, rec)
    }

    #[tokio::test]
    async fn test_lifecycle_and_restart_refused() {
        let (m, rec) = module(TestActor::new(ModuleConfig::new("t").with_metrics_interval(0)));
        assert_eq!(m.state(), ModuleState::Created);

        m.start().unwrap();
        assert_eq!(m.state(), ModuleState::Running);
        assert!(matches!(
            m.start(),
            Err(ModuleError::InvalidState { op: "start", state: ModuleState::Running })
        ));

        let outbox = m.mailbox("outbox").unwrap();
        assert_eq!(outbox.get().await.unwrap().data, Payload::from("hello"));

        m.stop().await.unwrap();
        assert_eq!(m.state(), ModuleState::Stopped);
        assert!(matches!(
            m.start(),
            Err(ModuleError::InvalidState { state: ModuleState::Stopped, .. })
        ));
        m.stop().await.unwrap();

        let kinds = rec.kinds();
        assert_eq!(kinds.first(), Some(&StatusKind::ModuleStarted));
        assert!(kinds.contains(&StatusKind::WorkerStarting));
        assert!(kinds.contains(&StatusKind::StopRequested));
        assert!(kinds.contains(&StatusKind::WorkerStopped));
        assert_eq!(kinds.last(), Some(&StatusKind::AllStoppedWithin));
    }

    #[tokio::test]
    async fn test_stop_before_start() {
        let (m, _rec) = module(TestActor::new(ModuleConfig::new("t")));
        m.stop().await.unwrap();
        assert_eq!(m.state(), ModuleState::Stopped);
        assert!(m.cancellation_token().is_cancelled());
        assert!(m.start().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_grace_exceeded_aborts_stuck_workers() {
        let mut actor = TestActor::new(ModuleConfig::new("t").with_grace_secs(2));
        actor.stuck = true;
        let (m, rec) = module(actor);
        m.start().unwrap();

        let started = Instant::now();
        match m.stop().await {
            Err(ModuleError::GraceExceeded { grace, stuck }) => {
                assert_eq!(grace, Duration::from_secs(2));
                assert_eq!(stuck, vec!["t.stuck".to_string()]);
            }
            other => panic!("expected GraceExceeded, got {other:?}"),
        }
        assert!(started.elapsed() >= Duration::from_secs(2));
        assert_eq!(m.state(), ModuleState::Stopped);
        assert!(rec.kinds().contains(&StatusKind::GraceExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn test_depth_reports_follow_interval() {
        let (m, rec) = module(TestActor::new(ModuleConfig::new("t").with_metrics_interval(1)));
        m.start().unwrap();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        m.stop().await.unwrap();

        let depths: Vec<Status> = rec
            .seen
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.kind == StatusKind::MailboxDepth)
            .cloned()
            .collect();
        assert_eq!(depths.len(), 3);
        assert_eq!(depths[0].target.as_deref(), Some("outbox"));
        assert_eq!(depths[0].capacity, Some(100));
        assert_eq!(depths.last().unwrap().depth, Some(1));
    }

    #[tokio::test]
    async fn test_run_returns_when_token_is_cancelled() {
        let (m, _rec) = module(TestActor::new(ModuleConfig::new("t")));
        let token = m.cancellation_token();
        let cancel = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });
        m.run().await.unwrap();
        cancel.await.unwrap();
        assert_eq!(m.state(), ModuleState::Stopped);
    }
}
