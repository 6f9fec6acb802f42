//! Pipeline-facing data: the [`Event`] that flows between modules and the
//! bounded [`Mailbox`] that carries it.

mod event;
mod mailbox;

pub use event::{Event, Header, Payload};
pub use mailbox::{Mailbox, MailboxError};
