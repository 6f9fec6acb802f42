//! Runtime status records and the bus that carries them.
//!
//! - [`Status`] / [`StatusKind`] describe what a module and its workers are doing
//!   (connecting, backing off, dropping a payload, stopping...).
//! - [`Bus`] broadcasts statuses to subscribers without ever blocking a worker.

mod bus;
mod status;

pub use bus::Bus;
pub use status::{Status, StatusKind};
