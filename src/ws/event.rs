//! Typed events published by a [`super::WebsocketClient`].
//!
//! Every channel payload is published twice: once as a typed
//! [`Event::Stream`] for consumers that care about one stream, and once as
//! the untyped [`Event::Envelope`] for consumers that log or forward
//! everything.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::stream::StreamName;
use crate::server::ServerInfo;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A socket opened. Not yet usable until [`Event::Ready`].
    Open,
    /// A socket closed. Streams are considered stopped.
    Close,
    /// Transport error. The client recovers on its own if reconnect is on.
    Error(String),
    /// The socket accepts stream control frames.
    Ready,
    /// The remote peer attached.
    Connected,
    /// The remote peer detached.
    Disconnected,
    /// New server snapshot pushed on the status stream.
    Status(Box<ServerInfo>),
    /// Typed per-stream event.
    Stream { stream: StreamName, event: StreamEvent },
    /// Generic `{stream, type, data}` envelope for every channel payload.
    Envelope(EventEnvelope),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Started,
    Stopped,
    Line(ConsoleLine),
    Tick(TickData),
    Stats(StatsData),
    Heap(HeapData),
    /// Payload the stream has no typed decoding for.
    Data { kind: String, data: Value },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventEnvelope {
    pub stream: StreamName,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Value,
}

/// One console line. `line` is display-ready, `raw_line` is untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleLine {
    pub raw_line: String,
    pub line: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickData {
    /// Milliseconds per tick, averaged by the server.
    pub average_tick_time: f64,
    /// Derived ticks per second, capped at 20.
    pub tps: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatsData {
    pub memory: MemoryUsage,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub percent: f64,
    pub usage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeapData {
    pub usage: f64,
}

/// Named notification republished by the management stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub name: String,
    #[serde(default)]
    pub data: Value,
}
