//! Connection state machine.
//!
//! DESIGN
//! ======
//! `Connection` is the synchronous core of the websocket client. It performs
//! no IO: outbound frames go to an unbounded channel the socket task drains,
//! and events go to a broadcast channel. Every transition (socket opened,
//! frame received, status changed, caller asked for a stream) is one method
//! call that runs to completion, so the core can be driven by the async
//! socket task in production and called directly in tests.
//!
//! Owns:
//! - the stream registry (at most one stream per kind)
//! - `should_connect`, `ready` and `peer_connected` flags
//! - the last server snapshot pushed on the status stream

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};

use frames::{
    TYPE_CONNECTED, TYPE_DISCONNECTED, TYPE_KEEP_ALIVE, TYPE_READY, TYPE_STATUS, decode_frame,
};

use super::console;
use super::event::{Event, Notification};
use super::management::ManagementChannel;
use super::stream::{Link, Stream, StreamName};
use crate::error::{Error, Result};
use crate::server::ServerInfo;
use crate::status::ServerStatus;

const EVENT_CAPACITY: usize = 1024;

/// Connection-level frame types, matched regardless of the stream field.
const CONTROL_TYPES: [&str; 4] = [TYPE_KEEP_ALIVE, TYPE_READY, TYPE_CONNECTED, TYPE_DISCONNECTED];

/// What the socket task has to do after an inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    /// Nothing beyond what the core already did.
    Handled,
    /// The socket became ready; refresh the status if unknown.
    Ready,
    /// The remote peer detached; retry streams after the reconnect interval.
    PeerDisconnected,
    /// The frame was malformed or addressed to no registered stream.
    Dropped,
}

pub struct Connection {
    server_id: String,
    should_connect: bool,
    socket: Option<mpsc::UnboundedSender<String>>,
    ready: bool,
    peer_connected: bool,
    status: Option<ServerStatus>,
    server: Option<ServerInfo>,
    streams: HashMap<StreamName, Stream>,
    events: broadcast::Sender<Event>,
}

impl Connection {
    pub fn new(server_id: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            server_id: server_id.into(),
            should_connect: false,
            socket: None,
            ready: false,
            peer_connected: false,
            status: None,
            server: None,
            streams: HashMap::new(),
            events,
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// The caller wants the socket open.
    pub fn wants_connection(&self) -> bool {
        self.should_connect
    }

    pub fn set_should_connect(&mut self, should_connect: bool) {
        self.should_connect = should_connect;
    }

    pub fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    pub fn is_ready(&self) -> bool {
        self.socket.is_some() && self.ready
    }

    pub fn is_peer_connected(&self) -> bool {
        self.peer_connected
    }

    pub fn status(&self) -> Option<ServerStatus> {
        self.status
    }

    pub fn server(&self) -> Option<&ServerInfo> {
        self.server.as_ref()
    }

    pub fn has_stream(&self, name: StreamName) -> bool {
        self.streams.contains_key(&name)
    }

    pub fn stream_started(&self, name: StreamName) -> bool {
        self.streams.get(&name).is_some_and(Stream::is_started)
    }

    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    /// The status is unknown and some stream is waiting on it.
    pub fn needs_status(&self) -> bool {
        self.status.is_none() && self.streams.values().any(Stream::wants_start)
    }

    /// Record a status obtained outside the socket and re-evaluate streams.
    pub fn set_status(&mut self, status: ServerStatus) {
        self.status = Some(status);
        self.on_status_change();
    }

    /// Apply a fetched status unless one became known while it was in
    /// flight. Returns the status now cached.
    pub fn adopt_status(&mut self, fetched: ServerStatus) -> ServerStatus {
        if let Some(current) = self.status {
            return current;
        }
        self.set_status(fetched);
        fetched
    }

    // =========================================================================
    // SOCKET LIFECYCLE
    // =========================================================================

    pub fn handle_open(&mut self, socket: mpsc::UnboundedSender<String>) {
        tracing::info!(server_id = %self.server_id, "ws: socket open");
        self.socket = Some(socket);
        self.ready = false;
        self.emit(Event::Open);
    }

    pub fn handle_close(&mut self) {
        if self.socket.take().is_some() {
            tracing::info!(server_id = %self.server_id, "ws: socket closed");
        }
        self.ready = false;
        self.peer_connected = false;
        for stream in self.streams.values_mut() {
            stream.on_disconnected();
        }
        self.emit(Event::Close);
    }

    pub fn handle_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(server_id = %self.server_id, error = %message, "ws: socket error");
        self.emit(Event::Error(message));
    }

    /// Apply one inbound text frame.
    pub fn handle_text(&mut self, text: &str) -> Inbound {
        let frame = match decode_frame(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(server_id = %self.server_id, error = %e, "ws: dropping undecodable frame");
                return Inbound::Dropped;
            }
        };

        if frame.is_status_push() {
            return self.handle_status_push(frame.data);
        }

        if CONTROL_TYPES.contains(&frame.kind.as_str()) {
            return self.handle_control(&frame.kind);
        }
        let Some(stream_name) = frame.stream.as_deref() else {
            tracing::debug!(kind = %frame.kind, "ws: ignored control frame");
            return Inbound::Dropped;
        };

        let Some(name) = StreamName::parse(stream_name) else {
            tracing::debug!(stream = stream_name, kind = %frame.kind, "ws: frame for unknown stream");
            return Inbound::Dropped;
        };
        let (link, streams) = self.parts();
        let Some(stream) = streams.get_mut(&name) else {
            tracing::debug!(stream = stream_name, kind = %frame.kind, "ws: frame for unregistered stream");
            return Inbound::Dropped;
        };
        stream.on_frame(&frame.kind, frame.data, &link);
        Inbound::Handled
    }

    fn handle_control(&mut self, kind: &str) -> Inbound {
        match kind {
            TYPE_KEEP_ALIVE => Inbound::Handled,
            TYPE_READY => {
                tracing::info!(server_id = %self.server_id, "ws: ready");
                self.ready = true;
                self.emit(Event::Ready);
                self.on_status_change();
                Inbound::Ready
            }
            TYPE_CONNECTED => {
                self.peer_connected = true;
                self.emit(Event::Connected);
                Inbound::Handled
            }
            TYPE_DISCONNECTED => {
                tracing::info!(server_id = %self.server_id, "ws: peer disconnected");
                self.peer_connected = false;
                for stream in self.streams.values_mut() {
                    stream.on_disconnected();
                }
                self.emit(Event::Disconnected);
                Inbound::PeerDisconnected
            }
            _ => Inbound::Dropped,
        }
    }

    fn handle_status_push(&mut self, data: Option<Value>) -> Inbound {
        let server = match data.map(serde_json::from_value::<ServerInfo>) {
            Some(Ok(server)) => server,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "ws: malformed status push");
                return Inbound::Dropped;
            }
            None => {
                tracing::warn!(kind = TYPE_STATUS, "ws: status push without data");
                return Inbound::Dropped;
            }
        };

        if let Some(status) = server.status {
            tracing::debug!(server_id = %self.server_id, %status, "ws: status push");
            self.status = Some(status);
        }
        self.server = Some(server.clone());
        self.emit(Event::Status(Box::new(server)));
        self.on_status_change();
        Inbound::Handled
    }

    // =========================================================================
    // STREAMS
    // =========================================================================

    /// Registered stream of this kind, created on first use.
    fn ensure_stream(&mut self, name: StreamName) -> &mut Stream {
        self.streams.entry(name).or_insert_with(|| name.create())
    }

    /// Register a stream of this kind so frames addressed to it are routed.
    pub fn register_stream(&mut self, name: StreamName) {
        self.ensure_stream(name);
    }

    /// Register the stream if needed and try to start it.
    ///
    /// Returns `true` if a `start` frame was sent now. When it was not, the
    /// stream starts later on readiness, status change or the retry sweep.
    pub fn start_stream(&mut self, name: StreamName, data: Option<Value>) -> bool {
        self.ensure_stream(name);
        let (link, streams) = self.parts();
        streams.get_mut(&name).is_some_and(|stream| stream.start(data, &link))
    }

    /// Stop the stream and drop it from the registry.
    ///
    /// Returns `true` if a `stop` frame was sent.
    pub fn stop_stream(&mut self, name: StreamName) -> bool {
        let Some(mut stream) = self.streams.remove(&name) else {
            return false;
        };
        let (link, _) = self.parts();
        stream.stop(&link)
    }

    /// Retry `start` for every stream that should run but is not running.
    pub fn try_start_streams(&mut self) {
        let (link, streams) = self.parts();
        for stream in streams.values_mut() {
            stream.try_start(&link);
        }
    }

    fn on_status_change(&mut self) {
        let (link, streams) = self.parts();
        for stream in streams.values_mut() {
            stream.on_status_change(&link);
        }
    }

    // =========================================================================
    // CHANNEL OPERATIONS
    // =========================================================================

    /// Send a raw frame. Returns `false` unless the socket is open and ready.
    pub fn send(&self, stream: &str, kind: &str, data: Option<Value>) -> bool {
        let link = Link { socket: self.socket.as_ref(), ready: self.ready, status: self.status, events: &self.events };
        link.send(stream, kind, data)
    }

    /// Send one console command over the socket.
    pub fn send_command(&self, command: &str) -> bool {
        self.send(StreamName::Console.as_str(), console::TYPE_COMMAND, Some(Value::String(command.to_owned())))
    }

    /// Submit a management request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StreamInactive`] unless the management stream wants
    /// to run and the server status allows it.
    pub fn management_request(&mut self, method: &str, params: Value) -> Result<oneshot::Receiver<Value>> {
        let inactive = Error::StreamInactive { stream: StreamName::Management.as_str() };
        let (link, streams) = self.parts();
        let Some(stream) = streams.get_mut(&StreamName::Management) else {
            return Err(inactive);
        };
        if !stream.should_be_started(link.status) {
            return Err(inactive);
        }
        let started = stream.is_started();
        let management = stream.management_mut().ok_or(inactive)?;
        Ok(management.request(method, params, started, &link))
    }

    /// Notification receiver of the registered management stream.
    pub fn management_notifications(&self) -> Option<broadcast::Receiver<Notification>> {
        self.streams
            .get(&StreamName::Management)
            .and_then(Stream::management)
            .map(ManagementChannel::subscribe)
    }

    /// Pending and queued request counts of the management stream.
    pub fn management_backlog(&self) -> Option<(usize, usize)> {
        self.streams
            .get(&StreamName::Management)
            .and_then(Stream::management)
            .map(|management| (management.pending_len(), management.queued_len()))
    }

    // =========================================================================
    // TEARDOWN
    // =========================================================================

    /// Forget every stream and the socket. The caller no longer wants a
    /// connection; nothing restarts until `should_connect` is set again.
    pub fn disconnect(&mut self) {
        tracing::info!(server_id = %self.server_id, "ws: disconnect requested");
        self.should_connect = false;
        self.streams.clear();
        self.ready = false;
        self.peer_connected = false;
        if self.socket.take().is_some() {
            self.emit(Event::Close);
        }
    }

    fn parts(&mut self) -> (Link<'_>, &mut HashMap<StreamName, Stream>) {
        let link = Link { socket: self.socket.as_ref(), ready: self.ready, status: self.status, events: &self.events };
        (link, &mut self.streams)
    }

    fn emit(&self, event: Event) {
        let _ = self.events.send(event);
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("server_id", &self.server_id)
            .field("should_connect", &self.should_connect)
            .field("open", &self.socket.is_some())
            .field("ready", &self.ready)
            .field("peer_connected", &self.peer_connected)
            .field("status", &self.status)
            .field("streams", &self.streams.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
#[path = "connection_test.rs"]
mod tests;
