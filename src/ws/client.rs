//! Websocket client handle and the socket task behind it.
//!
//! ARCHITECTURE
//! ============
//! [`WebsocketClient`] is a cheap clonable handle. State lives in one
//! [`Connection`] behind a mutex that is never held across an await. A single
//! driver task per client owns the socket:
//!
//! ```text
//! connect() ──► driver task ──► open socket ──► read / write / sweep loop
//!                    ▲                               │
//!                    └──── reconnect interval ◄──────┘ (socket closed)
//! ```
//!
//! The driver holds a `watch` receiver. `disconnect()` clears the state and
//! flips the watch while holding the state lock, and the driver re-checks the
//! flag every time it takes the lock, so no frame, reconnect or retry is
//! applied after a disconnect returns.

use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::{AUTHORIZATION, USER_AGENT};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::connection::{Connection, Inbound};
use super::event::{Event, Notification};
use super::management::{ManagementProxy, ManagementTransport};
use super::stream::StreamName;
use crate::api::StatusSource;
use crate::config::{ClientConfig, DEFAULT_STREAM_RETRY_SECS, WebsocketOptions};
use crate::error::{Error, Result};
use crate::server::ServerInfo;
use crate::status::ServerStatus;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

// =============================================================================
// CLIENT
// =============================================================================

/// Handle to the websocket of one server.
#[derive(Clone)]
pub struct WebsocketClient {
    shared: Arc<Shared>,
}

struct Shared {
    server_id: String,
    url: String,
    api_token: String,
    user_agent: String,
    options: WebsocketOptions,
    connect_timeout: Duration,
    status_source: Arc<dyn StatusSource>,
    state: Mutex<Connection>,
    driver: Mutex<Option<Driver>>,
}

struct Driver {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl WebsocketClient {
    /// Create an idle client. Nothing connects until [`WebsocketClient::connect`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBaseUrl`] if the configured base URL has no
    /// http scheme.
    pub fn new(config: &ClientConfig, server_id: &str, status_source: Arc<dyn StatusSource>) -> Result<Self> {
        let url = config.websocket_url(server_id)?;
        let shared = Shared {
            server_id: server_id.to_owned(),
            url,
            api_token: config.api_token.clone(),
            user_agent: config.user_agent.clone(),
            options: config.websocket,
            connect_timeout: Duration::from_secs(config.timeouts.connect_secs),
            status_source,
            state: Mutex::new(Connection::new(server_id)),
            driver: Mutex::new(None),
        };
        Ok(Self { shared: Arc::new(shared) })
    }

    pub fn server_id(&self) -> &str {
        &self.shared.server_id
    }

    pub fn url(&self) -> &str {
        &self.shared.url
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.shared.state().subscribe()
    }

    /// Open the socket and keep it open until [`WebsocketClient::disconnect`].
    ///
    /// Must be called inside a tokio runtime. Calling it while already
    /// connected is a no-op.
    pub fn connect(&self) {
        let mut driver = lock(&self.shared.driver);
        self.shared.state().set_should_connect(true);
        if driver.as_ref().is_some_and(|running| !running.task.is_finished()) {
            return;
        }

        tracing::info!(server_id = %self.shared.server_id, url = %self.shared.url, "ws: connect");
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(drive(Arc::clone(&self.shared), shutdown_rx));
        *driver = Some(Driver { shutdown, task });
    }

    /// Close the socket, forget every stream and cancel pending reconnects
    /// and retries.
    pub fn disconnect(&self) {
        let mut driver = lock(&self.shared.driver);
        let mut state = self.shared.state();
        state.disconnect();
        if let Some(running) = driver.take() {
            let _ = running.shutdown.send(true);
        }
    }

    /// The caller wants a connection, whether or not the socket is open.
    pub fn is_connected(&self) -> bool {
        self.shared.state().wants_connection()
    }

    pub fn is_open(&self) -> bool {
        self.shared.state().is_open()
    }

    pub fn is_ready(&self) -> bool {
        self.shared.state().is_ready()
    }

    pub fn is_peer_connected(&self) -> bool {
        self.shared.state().is_peer_connected()
    }

    /// Last server snapshot pushed over the socket.
    pub fn server(&self) -> Option<ServerInfo> {
        self.shared.state().server().cloned()
    }

    /// Cached server status, fetched over REST when none is known yet.
    ///
    /// # Errors
    ///
    /// Returns the status source's error when the lookup fails.
    pub async fn server_status(&self) -> Result<ServerStatus> {
        if let Some(status) = self.shared.state().status() {
            return Ok(status);
        }
        let fetched = self.shared.status_source.fetch_status(&self.shared.server_id).await?;
        Ok(self.shared.state().adopt_status(fetched))
    }

    /// Stream registered under `name`, registering it if needed. Unknown
    /// names yield `None`.
    pub fn stream(&self, name: &str) -> Option<StreamHandle> {
        StreamName::parse(name).map(|name| self.handle(name))
    }

    pub fn has_stream(&self, name: &str) -> bool {
        StreamName::parse(name).is_some_and(|name| self.shared.state().has_stream(name))
    }

    pub fn console(&self) -> ConsoleStream {
        ConsoleStream(self.handle(StreamName::Console))
    }

    pub fn tick(&self) -> StreamHandle {
        self.handle(StreamName::Tick)
    }

    pub fn stats(&self) -> StreamHandle {
        self.handle(StreamName::Stats)
    }

    pub fn heap(&self) -> StreamHandle {
        self.handle(StreamName::Heap)
    }

    pub fn management(&self) -> ManagementStream {
        ManagementStream(self.handle(StreamName::Management))
    }

    /// Send a raw frame. Returns `false` unless the socket is open and ready.
    pub fn send(&self, stream: &str, kind: &str, data: Option<Value>) -> bool {
        self.shared.state().send(stream, kind, data)
    }

    /// Retry `start` for every stream that wants to run.
    pub fn try_start_streams(&self) {
        self.shared.state().try_start_streams();
    }

    fn handle(&self, name: StreamName) -> StreamHandle {
        self.shared.state().register_stream(name);
        StreamHandle { client: self.clone(), name }
    }

    async fn ensure_status(&self) {
        if let Err(e) = self.server_status().await {
            tracing::warn!(server_id = %self.shared.server_id, error = %e, "ws: status lookup failed");
        }
    }

    #[cfg(test)]
    pub(crate) fn driver_running(&self) -> bool {
        lock(&self.shared.driver).as_ref().is_some_and(|running| !running.task.is_finished())
    }
}

impl std::fmt::Debug for WebsocketClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebsocketClient")
            .field("server_id", &self.shared.server_id)
            .field("url", &self.shared.url)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// STREAM HANDLES
// =============================================================================

/// Handle to one registered stream.
#[derive(Debug, Clone)]
pub struct StreamHandle {
    client: WebsocketClient,
    name: StreamName,
}

impl StreamHandle {
    pub fn name(&self) -> StreamName {
        self.name
    }

    /// The remote end confirmed the stream is running.
    pub fn is_started(&self) -> bool {
        self.client.shared.state().stream_started(self.name)
    }

    /// Ask for the stream to run. `data` replaces the start payload.
    ///
    /// Returns `true` if a `start` frame went out now; otherwise the stream
    /// starts once the socket is ready and the server status allows it.
    pub async fn start(&self, data: Option<Value>) -> bool {
        self.client.ensure_status().await;
        self.client.shared.state().start_stream(self.name, data)
    }

    /// Stop the stream and remove it from the client.
    pub fn stop(&self) -> bool {
        self.client.shared.state().stop_stream(self.name)
    }
}

/// Console stream handle.
#[derive(Debug, Clone)]
pub struct ConsoleStream(StreamHandle);

impl ConsoleStream {
    /// Send a console command over the socket.
    pub fn send_command(&self, command: &str) -> bool {
        self.0.client.shared.state().send_command(command)
    }
}

impl Deref for ConsoleStream {
    type Target = StreamHandle;

    fn deref(&self) -> &StreamHandle {
        &self.0
    }
}

/// Management stream handle.
#[derive(Debug, Clone)]
pub struct ManagementStream(StreamHandle);

impl ManagementStream {
    /// Send one request and wait for its response payload.
    ///
    /// The request is queued until the stream has started. There is no
    /// timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StreamInactive`] if the stream was not started or
    /// the server status does not allow it, and [`Error::ConnectionDropped`]
    /// if the stream was stopped or disconnected while waiting.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value> {
        self.0.client.ensure_status().await;
        let response = self.0.client.shared.state().management_request(method, params)?;
        response.await.map_err(|_| Error::ConnectionDropped)
    }

    pub fn notifications(&self) -> Option<broadcast::Receiver<Notification>> {
        self.0.client.shared.state().management_notifications()
    }

    /// Method-call facade over this stream.
    pub fn proxy(self) -> ManagementProxy<Self> {
        ManagementProxy::new(self)
    }
}

impl Deref for ManagementStream {
    type Target = StreamHandle;

    fn deref(&self) -> &StreamHandle {
        &self.0
    }
}

#[async_trait::async_trait]
impl ManagementTransport for ManagementStream {
    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        ManagementStream::request(self, method, params).await
    }

    fn notifications(&self) -> Option<broadcast::Receiver<Notification>> {
        ManagementStream::notifications(self)
    }

    fn close(&self) {
        self.stop();
    }
}

// =============================================================================
// DRIVER
// =============================================================================

impl Shared {
    fn state(&self) -> MutexGuard<'_, Connection> {
        lock(&self.state)
    }

    /// Run `f` on the state unless the driver was shut down.
    fn with_state<R>(&self, shutdown: &watch::Receiver<bool>, f: impl FnOnce(&mut Connection) -> R) -> Option<R> {
        let mut state = self.state();
        if *shutdown.borrow() {
            return None;
        }
        Some(f(&mut state))
    }

    /// Record the closed socket and decide whether to reconnect.
    fn after_close(&self, shutdown: &watch::Receiver<bool>) -> bool {
        let mut driver = lock(&self.driver);
        let mut state = self.state();
        if *shutdown.borrow() {
            return false;
        }
        state.handle_close();
        if self.options.auto_reconnect && state.wants_connection() {
            return true;
        }
        state.set_should_connect(false);
        *driver = None;
        false
    }

    async fn refresh_status(&self, shutdown: &watch::Receiver<bool>) {
        if !self.with_state(shutdown, |state| state.needs_status()).unwrap_or(false) {
            return;
        }
        match self.status_source.fetch_status(&self.server_id).await {
            Ok(status) => {
                self.with_state(shutdown, |state| state.adopt_status(status));
            }
            Err(e) => tracing::warn!(server_id = %self.server_id, error = %e, "ws: status lookup failed"),
        }
    }

    async fn sweep(&self, shutdown: &watch::Receiver<bool>) {
        self.refresh_status(shutdown).await;
        self.with_state(shutdown, Connection::try_start_streams);
    }

    async fn open_socket(&self) -> Result<Socket> {
        let mut request = self.url.as_str().into_client_request()?;
        let headers = request.headers_mut();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_token))
                .map_err(|e| Error::InvalidHeader(e.to_string()))?,
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.user_agent).map_err(|e| Error::InvalidHeader(e.to_string()))?,
        );

        tracing::debug!(url = %self.url, "ws: opening socket");
        let (socket, _) = tokio::time::timeout(self.connect_timeout, connect_async(request))
            .await
            .map_err(|_| Error::from(tokio_tungstenite::tungstenite::Error::Io(std::io::ErrorKind::TimedOut.into())))??;
        Ok(socket)
    }
}

async fn drive(shared: Arc<Shared>, mut shutdown: watch::Receiver<bool>) {
    loop {
        let opened = tokio::select! {
            biased;
            _ = shutdown.changed() => return,
            opened = shared.open_socket() => opened,
        };

        match opened {
            Ok(socket) => run_socket(&shared, socket, &mut shutdown).await,
            Err(e) => {
                if shared.with_state(&shutdown, |state| state.handle_error(e.to_string())).is_none() {
                    return;
                }
            }
        }

        if !shared.after_close(&shutdown) {
            tracing::debug!(server_id = %shared.server_id, "ws: driver stopped");
            return;
        }

        tracing::debug!(
            server_id = %shared.server_id,
            delay_ms = shared.options.reconnect_interval.as_millis(),
            "ws: reconnecting"
        );
        tokio::select! {
            biased;
            _ = shutdown.changed() => return,
            () = tokio::time::sleep(shared.options.reconnect_interval) => {}
        }
    }
}

async fn run_socket(shared: &Shared, socket: Socket, shutdown: &mut watch::Receiver<bool>) {
    let (mut sink, mut source) = socket.split();
    let (outbound_tx, mut outbound) = mpsc::unbounded_channel::<String>();
    if shared.with_state(shutdown, |state| state.handle_open(outbound_tx)).is_none() {
        let _ = sink.close().await;
        return;
    }

    let mut period = shared.options.stream_retry_interval;
    if period.is_zero() {
        period = Duration::from_secs(DEFAULT_STREAM_RETRY_SECS);
    }
    let mut sweep = tokio::time::interval_at(Instant::now() + period, period);
    sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut peer_retry_at: Option<Instant> = None;

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => {
                let _ = sink.send(Message::Close(None)).await;
                return;
            }
            Some(text) = outbound.recv() => {
                if let Err(e) = sink.send(Message::Text(text.into())).await {
                    shared.with_state(shutdown, |state| state.handle_error(e.to_string()));
                    return;
                }
            }
            message = source.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    let Some(inbound) = shared.with_state(shutdown, |state| state.handle_text(text.as_str())) else {
                        return;
                    };
                    match inbound {
                        Inbound::Ready => shared.refresh_status(shutdown).await,
                        Inbound::PeerDisconnected => {
                            peer_retry_at = Some(Instant::now() + shared.options.reconnect_interval);
                        }
                        Inbound::Handled | Inbound::Dropped => {}
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(?frame, "ws: close frame received");
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    shared.with_state(shutdown, |state| state.handle_error(e.to_string()));
                    return;
                }
                None => return,
            },
            _ = sweep.tick() => shared.sweep(shutdown).await,
            () = tokio::time::sleep_until(peer_retry_at.unwrap_or_else(Instant::now)), if peer_retry_at.is_some() => {
                peer_retry_at = None;
                shared.sweep(shutdown).await;
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
