//! # Pipeline events.
//!
//! An [`Event`] is a `header` mapping plus a `data` [`Payload`]. Input modules
//! create events with an empty header; routers and later modules may annotate it.
//! Once placed on a mailbox an event is owned by whoever dequeues it.

use serde_json::{Map, Value};

/// Event header: string keys to arbitrary JSON values.
pub type Header = Map<String, Value>;

/// Event payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Raw bytes, as received from a source.
    Bytes(Vec<u8>),
    /// Text.
    Text(String),
    /// Sequence of strings; sinks join it with their delimiter.
    List(Vec<String>),
    /// Any decoded structured value.
    Json(Value),
}

impl Payload {
    /// Serializes the payload for a byte-stream sink.
    ///
    /// Lists are joined with `delimiter`, and so are JSON arrays holding only
    /// strings. Everything else is rendered as is (`Json` through its compact
    /// string form). The trailing delimiter is the caller's business.
    pub fn render(&self, delimiter: &str) -> Vec<u8> {
        match self {
            Payload::Bytes(b) => b.clone(),
            Payload::Text(t) => t.as_bytes().to_vec(),
            Payload::List(items) => items.join(delimiter).into_bytes(),
            Payload::Json(Value::String(s)) => s.as_bytes().to_vec(),
            Payload::Json(Value::Array(items)) if items.iter().all(Value::is_string) => items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(delimiter)
                .into_bytes(),
            Payload::Json(v) => v.to_string().into_bytes(),
        }
    }
}

impl From<Vec<u8>> for Payload {
    fn from(v: Vec<u8>) -> Self {
        Payload::Bytes(v)
    }
}

impl From<&[u8]> for Payload {
    fn from(v: &[u8]) -> Self {
        Payload::Bytes(v.to_vec())
    }
}

impl From<String> for Payload {
    fn from(v: String) -> Self {
        Payload::Text(v)
    }
}

impl From<&str> for Payload {
    fn from(v: &str) -> Self {
        Payload::Text(v.to_string())
    }
}

impl From<Vec<String>> for Payload {
    fn from(v: Vec<String>) -> Self {
        Payload::List(v)
    }
}

impl From<Value> for Payload {
    fn from(v: Value) -> Self {
        Payload::Json(v)
    }
}

/// Unit of data flowing through mailboxes.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub header: Header,
    pub data: Payload,
}

impl Event {
    /// Creates an event with an empty header.
    pub fn new(data: impl Into<Payload>) -> Self {
        Self {
            header: Header::new(),
            data: data.into(),
        }
    }

    /// Returns the event with `key` set in its header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.header.insert(key.into(), value.into());
        self
    }
}
