//! Stream kinds and the per-stream start/stop state machine.
//!
//! DESIGN
//! ======
//! A stream never talks to the socket directly. Every method that may send or
//! publish takes a [`Link`], a short-lived view over the owning connection's
//! socket sender, readiness flag, cached status and event channel. This keeps
//! the registry and the connection state in one struct without streams
//! holding a back-reference to their parent.
//!
//! The state machine has two flags:
//! - `should_start`: the caller wants the stream running.
//! - `started`: the remote end confirmed it is running.
//!
//! A stream should be running exactly when `should_start` is set and the
//! cached server status is one of the kind's eligible statuses.

use serde_json::Value;
use tokio::sync::{broadcast, mpsc};

use frames::{Frame, TYPE_START, TYPE_STARTED, TYPE_STOP, TYPE_STOPPED, encode_frame};

use super::event::{Event, EventEnvelope, StreamEvent};
use super::management::ManagementChannel;
use super::{console, telemetry, tick};
use crate::status::ServerStatus;

// =============================================================================
// STREAM NAME
// =============================================================================

/// The closed set of stream kinds the socket multiplexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamName {
    Console,
    Tick,
    Stats,
    Heap,
    Management,
}

const ONLINE_ONLY: &[ServerStatus] = &[ServerStatus::Online];
const CONSOLE_STATUSES: &[ServerStatus] =
    &[ServerStatus::Online, ServerStatus::Starting, ServerStatus::Stopping, ServerStatus::Restarting];

impl StreamName {
    pub const ALL: [Self; 5] = [Self::Console, Self::Tick, Self::Stats, Self::Heap, Self::Management];

    /// Wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Console => "console",
            Self::Tick => "tick",
            Self::Stats => "stats",
            Self::Heap => "heap",
            Self::Management => "management",
        }
    }

    /// Look up a kind by wire name. Unknown names yield `None`.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// Server statuses in which this stream may run.
    #[must_use]
    pub fn start_statuses(self) -> &'static [ServerStatus] {
        match self {
            Self::Console => CONSOLE_STATUSES,
            Self::Tick | Self::Stats | Self::Heap | Self::Management => ONLINE_ONLY,
        }
    }

    /// Start payload a fresh stream uses until the caller supplies one.
    fn default_start_data(self) -> Option<Value> {
        match self {
            Self::Console => Some(serde_json::json!({ "tail": 0 })),
            Self::Tick | Self::Stats | Self::Heap | Self::Management => None,
        }
    }
}

impl std::fmt::Display for StreamName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// LINK
// =============================================================================

/// Borrowed view of the owning connection handed to stream methods.
pub(crate) struct Link<'a> {
    pub(crate) socket: Option<&'a mpsc::UnboundedSender<String>>,
    pub(crate) ready: bool,
    pub(crate) status: Option<ServerStatus>,
    pub(crate) events: &'a broadcast::Sender<Event>,
}

impl Link<'_> {
    /// Queue one frame on the socket. Returns `false` unless the socket is
    /// open and ready.
    pub(crate) fn send(&self, stream: &str, kind: &str, data: Option<Value>) -> bool {
        let Some(socket) = self.socket else {
            return false;
        };
        if !self.ready {
            return false;
        }

        let frame = match data {
            Some(data) => Frame::new(stream, kind).with_data(data),
            None => Frame::new(stream, kind),
        };
        tracing::debug!(stream, kind, "ws: send frame");
        socket.send(encode_frame(&frame)).is_ok()
    }

    pub(crate) fn emit(&self, event: Event) {
        // No receivers is not an error; events are fire-and-forget.
        let _ = self.events.send(event);
    }

    pub(crate) fn emit_stream(&self, stream: StreamName, event: StreamEvent) {
        self.emit(Event::Stream { stream, event });
    }

    /// Publish a channel payload as both the typed event and the envelope.
    pub(crate) fn emit_payload(&self, stream: StreamName, kind: &str, event: StreamEvent, data: Value) {
        self.emit_stream(stream, event);
        self.emit(Event::Envelope(EventEnvelope { stream, kind: kind.to_owned(), data }));
    }
}

// =============================================================================
// STREAM
// =============================================================================

/// Kind-specific state carried by a stream.
#[derive(Debug)]
enum Channel {
    Console,
    Tick,
    Telemetry,
    Management(ManagementChannel),
}

#[derive(Debug)]
pub(crate) struct Stream {
    name: StreamName,
    should_start: bool,
    started: bool,
    start_data: Option<Value>,
    channel: Channel,
}

impl StreamName {
    /// Fresh, idle stream of this kind.
    pub(crate) fn create(self) -> Stream {
        let channel = match self {
            Self::Console => Channel::Console,
            Self::Tick => Channel::Tick,
            Self::Stats | Self::Heap => Channel::Telemetry,
            Self::Management => Channel::Management(ManagementChannel::new()),
        };
        Stream { name: self, should_start: false, started: false, start_data: self.default_start_data(), channel }
    }
}

impl Stream {
    pub(crate) fn is_started(&self) -> bool {
        self.started
    }

    pub(crate) fn wants_start(&self) -> bool {
        self.should_start
    }

    pub(crate) fn should_be_started(&self, status: Option<ServerStatus>) -> bool {
        self.should_start && status.is_some_and(|status| self.name.start_statuses().contains(&status))
    }

    /// Record the intent to run and try to start right away.
    ///
    /// `data` replaces the start payload; `None` keeps the current one.
    pub(crate) fn start(&mut self, data: Option<Value>, link: &Link<'_>) -> bool {
        self.should_start = true;
        if let Some(data) = data {
            self.start_data = Some(data);
        }
        self.try_start(link)
    }

    /// Send `start` if the stream should run, is not running, and the socket
    /// is ready. Safe to call repeatedly; it is also the retry path.
    pub(crate) fn try_start(&mut self, link: &Link<'_>) -> bool {
        if self.started || !link.ready || !self.should_be_started(link.status) {
            return false;
        }
        link.send(self.name.as_str(), TYPE_START, self.start_data.clone())
    }

    /// Send `stop` if the stream is running but should not be.
    pub(crate) fn try_stop(&mut self, link: &Link<'_>) -> bool {
        if !self.started || self.should_be_started(link.status) {
            return false;
        }
        link.send(self.name.as_str(), TYPE_STOP, None)
    }

    /// Drop the intent to run and stop if running.
    pub(crate) fn stop(&mut self, link: &Link<'_>) -> bool {
        self.should_start = false;
        self.try_stop(link)
    }

    /// Re-evaluate after the socket became ready or the status changed.
    pub(crate) fn on_status_change(&mut self, link: &Link<'_>) {
        self.try_start(link);
        self.try_stop(link);
    }

    /// The socket closed or the remote peer went away.
    pub(crate) fn on_disconnected(&mut self) {
        self.started = false;
    }

    /// Route one inbound frame addressed to this stream.
    pub(crate) fn on_frame(&mut self, kind: &str, data: Option<Value>, link: &Link<'_>) {
        match kind {
            TYPE_STARTED => {
                self.started = true;
                tracing::debug!(stream = %self.name, "ws: stream started");
                link.emit_stream(self.name, StreamEvent::Started);
                if let Channel::Management(management) = &mut self.channel {
                    management.on_started(link);
                }
            }
            TYPE_STOPPED => {
                self.started = false;
                tracing::debug!(stream = %self.name, "ws: stream stopped");
                link.emit_stream(self.name, StreamEvent::Stopped);
            }
            _ => {
                let data = data.unwrap_or(Value::Null);
                match &mut self.channel {
                    Channel::Console => console::on_data(kind, data, link),
                    Channel::Tick => tick::on_data(kind, data, link),
                    Channel::Telemetry => telemetry::on_data(self.name, kind, data, link),
                    Channel::Management(management) => management.on_data(kind, data, link),
                }
            }
        }
    }

    pub(crate) fn management(&self) -> Option<&ManagementChannel> {
        match &self.channel {
            Channel::Management(management) => Some(management),
            Channel::Console | Channel::Tick | Channel::Telemetry => None,
        }
    }

    pub(crate) fn management_mut(&mut self) -> Option<&mut ManagementChannel> {
        match &mut self.channel {
            Channel::Management(management) => Some(management),
            Channel::Console | Channel::Tick | Channel::Telemetry => None,
        }
    }
}

#[cfg(test)]
#[path = "stream_test.rs"]
mod tests;
