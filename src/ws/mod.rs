//! Server websocket: one socket per server, multiplexing named streams.
//!
//! ARCHITECTURE
//! ============
//! - `connection`: synchronous state machine (registry, flags, cached status)
//! - `client`: async socket task, reconnect loop and public handles
//! - `stream`: stream kinds and the start/stop state machine
//! - `console`, `tick`, `telemetry`, `management`: per-kind payload handling
//! - `event`: everything published to subscribers

mod client;
mod connection;
mod console;
mod event;
mod management;
mod stream;
mod telemetry;
mod tick;

pub use client::{ConsoleStream, ManagementStream, StreamHandle, WebsocketClient};
pub use connection::{Connection, Inbound};
pub use console::{collapse_returns, parse_line, strip_ansi};
pub use event::{
    ConsoleLine, Event, EventEnvelope, HeapData, MemoryUsage, Notification, StatsData, StreamEvent, TickData,
};
pub use management::{ManagementProxy, ManagementTransport};
pub use stream::StreamName;
pub use tick::ticks_per_second;
