//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for plugging custom status handlers into a
//! module. Each subscriber is driven by a dedicated worker fed by a bounded queue
//! owned by the [`SubscriberSet`](crate::subscribers::SubscriberSet).
//!
//! ## Contract
//! - Implementations may be slow (I/O, batching); they do **not** block workers
//!   nor other subscribers.
//! - On queue overflow, records for that subscriber are **dropped** and a
//!   `SubscriberOverflow` status is published.

use crate::status::Status;
use async_trait::async_trait;

/// Contract for status subscribers.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single status record.
    async fn on_status(&self, status: &Status);

    /// Human-readable name (for logs/metrics).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
