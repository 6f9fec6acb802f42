//! # Non-blocking status fan-out.
//!
//! ```text
//! emit(status) ──try_send──► [queue: log_writer] ──► driver ──► on_status()
//!              └─try_send──► [queue: custom]     ──► driver ──► on_status()
//!                                                        └── panic ──► SubscriberPanicked
//! ```
//!
//! Each subscriber gets its own bounded queue drained by its own driver task, in
//! emit order. A full or closed queue loses the record for that subscriber only
//! and is reported as `SubscriberOverflow`, except for overflow records
//! themselves. A panicking `on_status` is caught and reported as
//! `SubscriberPanicked`; the driver keeps going.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::status::{Bus, Status, StatusKind};
use crate::subscribers::Subscribe;

struct Route {
    subscriber: &'static str,
    queue: mpsc::Sender<Arc<Status>>,
}

/// Delivers statuses to every subscriber without waiting on any of them.
pub struct SubscriberSet {
    routes: Vec<Route>,
    drivers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Spawns one driver per subscriber. Must be called inside a tokio runtime.
    ///
    /// Panic and overflow reports are published on `bus`.
    #[must_use]
    pub fn new(subscribers: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let (routes, drivers): (Vec<_>, Vec<_>) = subscribers
            .into_iter()
            .map(|sub| {
                let (queue, rx) = mpsc::channel(sub.queue_capacity().max(1));
                let route = Route {
                    subscriber: sub.name(),
                    queue,
                };
                (route, tokio::spawn(drive(sub, rx, bus.clone())))
            })
            .unzip();
        Self {
            routes,
            drivers,
            bus,
        }
    }

    /// Queues `status` for every subscriber and returns immediately.
    pub fn emit(&self, status: Status) {
        let report_overflow = status.kind != StatusKind::SubscriberOverflow;
        let status = Arc::new(status);

        for route in &self.routes {
            let reason = match route.queue.try_send(status.clone()) {
                Ok(()) => continue,
                Err(TrySendError::Full(_)) => "full",
                Err(TrySendError::Closed(_)) => "closed",
            };
            if report_overflow {
                self.bus
                    .publish(Status::subscriber_overflow(route.subscriber, reason));
            }
        }
    }

    /// Closes every queue and waits until the drivers have handled what was queued.
    pub async fn shutdown(self) {
        drop(self.routes);
        for driver in self.drivers {
            let _ = driver.await;
        }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

async fn drive(sub: Arc<dyn Subscribe>, mut rx: mpsc::Receiver<Arc<Status>>, bus: Bus) {
    while let Some(status) = rx.recv().await {
        let handled = AssertUnwindSafe(sub.on_status(&status)).catch_unwind().await;
        if let Err(payload) = handled {
            bus.publish(Status::subscriber_panicked(sub.name(), panic_message(&*payload)));
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
