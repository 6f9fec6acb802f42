//! Built-in module kinds.
//!
//! - [`GearmanIn`]: input; a pool of workers consuming a broker queue into `outbox`.
//! - [`UdsOut`]: output; delivers `inbox` events to a Unix domain socket.
//! - [`Null`]: output; discards `inbox` events.

mod gearman_in;
mod null;
mod uds_out;

pub use gearman_in::GearmanIn;
pub use null::Null;
pub use uds_out::UdsOut;
