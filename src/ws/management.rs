//! Management stream: request/response RPC and notifications over one socket
//! stream.
//!
//! ARCHITECTURE
//! ============
//! Each request gets a random id and a oneshot resolver in `pending`. If the
//! stream is running the request goes out immediately, otherwise it is queued
//! and flushed in order once the remote confirms `started`. A `response`
//! frame resolves and removes the matching entry; ids nobody is waiting for
//! are ignored.
//!
//! There is no request timeout. Callers that need one wrap the future in
//! `tokio::time::timeout`. Stopping the stream or disconnecting drops the
//! pending resolvers, which surfaces as [`Error::ConnectionDropped`] for the
//! waiting caller.

use std::collections::{HashMap, VecDeque};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{broadcast, oneshot};

use super::event::{Notification, StreamEvent};
use super::stream::{Link, StreamName};
use crate::error::{Error, Result};

pub(crate) const TYPE_REQUEST: &str = "request";
pub(crate) const TYPE_RESPONSE: &str = "response";
pub(crate) const TYPE_NOTIFICATION: &str = "notification";

const NOTIFICATION_CAPACITY: usize = 256;

// =============================================================================
// WIRE SHAPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
struct RpcRequest {
    id: String,
    method: String,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    id: String,
    #[serde(default)]
    data: Value,
}

// =============================================================================
// CHANNEL STATE
// =============================================================================

#[derive(Debug)]
pub(crate) struct ManagementChannel {
    pending: HashMap<String, oneshot::Sender<Value>>,
    queue: VecDeque<RpcRequest>,
    notifications: broadcast::Sender<Notification>,
}

impl ManagementChannel {
    pub(crate) fn new() -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self { pending: HashMap::new(), queue: VecDeque::new(), notifications }
    }

    /// Register a request and send or queue it.
    pub(crate) fn request(
        &mut self,
        method: &str,
        params: Value,
        started: bool,
        link: &Link<'_>,
    ) -> oneshot::Receiver<Value> {
        let id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id.clone(), tx);

        let request = RpcRequest { id, method: method.to_owned(), params };
        if started {
            send_request(&request, link);
        } else {
            tracing::debug!(id = %request.id, method, "ws: management request queued");
            self.queue.push_back(request);
        }
        rx
    }

    /// Flush queued requests in submission order.
    pub(crate) fn on_started(&mut self, link: &Link<'_>) {
        for request in self.queue.drain(..) {
            send_request(&request, link);
        }
    }

    pub(crate) fn on_data(&mut self, kind: &str, data: Value, link: &Link<'_>) {
        match kind {
            TYPE_RESPONSE => match RpcResponse::deserialize(&data) {
                Ok(response) => self.resolve(response),
                Err(e) => tracing::warn!(error = %e, "ws: malformed management response"),
            },
            TYPE_NOTIFICATION => match Notification::deserialize(&data) {
                Ok(notification) => {
                    let _ = self.notifications.send(notification.clone());
                    link.emit_payload(
                        StreamName::Management,
                        kind,
                        StreamEvent::Data { kind: notification.name, data: notification.data },
                        data,
                    );
                }
                Err(e) => tracing::warn!(error = %e, "ws: malformed management notification"),
            },
            _ => tracing::debug!(kind, "ws: management ignored frame"),
        }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn queued_len(&self) -> usize {
        self.queue.len()
    }

    fn resolve(&mut self, response: RpcResponse) {
        match self.pending.remove(&response.id) {
            Some(resolver) => {
                // The caller may have given up on the future; that is fine.
                let _ = resolver.send(response.data);
            }
            None => tracing::debug!(id = %response.id, "ws: management response for unknown id"),
        }
    }
}

fn send_request(request: &RpcRequest, link: &Link<'_>) {
    let data = serde_json::to_value(request).unwrap_or(Value::Null);
    if !link.send(StreamName::Management.as_str(), TYPE_REQUEST, Some(data)) {
        tracing::warn!(id = %request.id, method = %request.method, "ws: management request not sent");
    }
}

// =============================================================================
// FACADE
// =============================================================================

/// Transport behind a [`ManagementProxy`].
#[async_trait::async_trait]
pub trait ManagementTransport: Send + Sync {
    /// Send one request and wait for its response payload.
    async fn request(&self, method: &str, params: Value) -> Result<Value>;

    /// Subscribe to server notifications. `None` if the stream is gone.
    fn notifications(&self) -> Option<broadcast::Receiver<Notification>>;

    /// Stop the stream.
    fn close(&self);
}

/// Typed method-call facade over the management stream.
///
/// ```ignore
/// let proxy = client.management().proxy();
/// let players: Vec<String> = proxy.call("players/list", json!({})).await?;
/// ```
pub struct ManagementProxy<T = super::client::ManagementStream> {
    transport: T,
}

impl<T: ManagementTransport> ManagementProxy<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Call a method and return the raw response payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StreamInactive`] if the stream cannot run for the
    /// current server status, or [`Error::ConnectionDropped`] if the request
    /// was discarded before a response arrived.
    pub async fn call_raw(&self, method: &str, params: Value) -> Result<Value> {
        self.transport.request(method, params).await
    }

    /// Call a method and decode the response payload.
    ///
    /// # Errors
    ///
    /// Same as [`ManagementProxy::call_raw`], plus [`Error::Json`] if the
    /// payload does not match `R`.
    pub async fn call<R: DeserializeOwned>(&self, method: &str, params: Value) -> Result<R> {
        let data = self.call_raw(method, params).await?;
        serde_json::from_value(data).map_err(Error::from)
    }

    pub fn notifications(&self) -> Option<broadcast::Receiver<Notification>> {
        self.transport.notifications()
    }

    pub fn close(&self) {
        self.transport.close();
    }
}

#[cfg(test)]
#[path = "management_test.rs"]
mod tests;
