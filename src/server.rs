//! Server snapshot and the per-server facade.
//!
//! [`Server`] ties the REST calls for one server to its websocket. The
//! websocket is created on first use and shared by every caller of the same
//! `Server` value.

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Deserializer, Serialize};

use crate::api::{ApiClient, StatusSource};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::status::ServerStatus;
use crate::ws::{StreamName, WebsocketClient};

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Server snapshot as returned by the API and pushed on the status stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerInfo {
    pub id: String,
    pub name: Option<String>,
    pub address: Option<String>,
    pub motd: Option<String>,
    /// `None` when absent or when the code is not one this crate knows.
    #[serde(deserialize_with = "lenient_status")]
    pub status: Option<ServerStatus>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub shared: bool,
    pub software: Option<Software>,
    pub players: Players,
}

impl ServerInfo {
    /// The snapshot's status is one of `statuses`.
    #[must_use]
    pub fn has_status(&self, statuses: &[ServerStatus]) -> bool {
        self.status.is_some_and(|status| statuses.contains(&status))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Software {
    pub id: Option<String>,
    pub name: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Players {
    pub max: Option<u32>,
    pub count: u32,
    pub list: Vec<String>,
}

fn lenient_status<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<ServerStatus>, D::Error> {
    let code = Option::<i64>::deserialize(deserializer)?;
    Ok(code.and_then(ServerStatus::from_code))
}

// =============================================================================
// FACADE
// =============================================================================

/// How [`Server::execute_command`] delivered the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandRoute {
    Websocket,
    Rest,
}

/// One server: REST actions plus its websocket.
pub struct Server {
    id: String,
    api: ApiClient,
    config: ClientConfig,
    websocket: Mutex<Option<WebsocketClient>>,
}

impl Server {
    pub(crate) fn new(id: &str, api: ApiClient, config: ClientConfig) -> Self {
        Self { id: id.to_owned(), api, config, websocket: Mutex::new(None) }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Fetch a fresh snapshot.
    ///
    /// # Errors
    ///
    /// Propagates REST failures.
    pub async fn get(&self) -> Result<ServerInfo> {
        self.api.get_server(&self.id).await
    }

    /// # Errors
    ///
    /// Propagates REST failures.
    pub async fn start(&self) -> Result<()> {
        self.api.start_server(&self.id).await
    }

    /// # Errors
    ///
    /// Propagates REST failures.
    pub async fn stop(&self) -> Result<()> {
        self.api.stop_server(&self.id).await
    }

    /// # Errors
    ///
    /// Propagates REST failures.
    pub async fn restart(&self) -> Result<()> {
        self.api.restart_server(&self.id).await
    }

    /// The server's websocket, created on first call.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidBaseUrl`] if no socket URL can be built.
    pub fn websocket(&self) -> Result<WebsocketClient> {
        let mut slot = self.websocket.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(websocket) = slot.as_ref() {
            return Ok(websocket.clone());
        }
        let status_source: Arc<dyn StatusSource> = Arc::new(self.api.clone());
        let websocket = WebsocketClient::new(&self.config, &self.id, status_source)?;
        *slot = Some(websocket.clone());
        Ok(websocket)
    }

    /// Connect if needed and start every named stream.
    ///
    /// Returns `false` at the first unknown name; streams before it stay
    /// requested.
    ///
    /// # Errors
    ///
    /// See [`Server::websocket`].
    pub async fn subscribe(&self, streams: &[&str]) -> Result<bool> {
        let websocket = self.websocket()?;
        if !websocket.is_connected() {
            websocket.connect();
        }
        for name in streams {
            let Some(stream) = websocket.stream(name) else {
                tracing::warn!(server_id = %self.id, stream = name, "server: unknown stream");
                return Ok(false);
            };
            stream.start(None).await;
        }
        Ok(true)
    }

    /// Stop the named streams, or disconnect entirely when `streams` is
    /// `None`. Unknown and unregistered names are skipped.
    ///
    /// # Errors
    ///
    /// See [`Server::websocket`].
    pub fn unsubscribe(&self, streams: Option<&[&str]>) -> Result<()> {
        let websocket = self.websocket()?;
        let Some(streams) = streams else {
            websocket.disconnect();
            return Ok(());
        };
        for name in streams {
            if !websocket.has_stream(name) {
                tracing::debug!(server_id = %self.id, stream = name, "server: nothing to unsubscribe");
                continue;
            }
            if let Some(stream) = websocket.stream(name) {
                stream.stop();
            }
        }
        Ok(())
    }

    /// Run a console command, over the socket when the console stream is
    /// running and over REST otherwise.
    ///
    /// # Errors
    ///
    /// Propagates REST failures on the fallback path.
    pub async fn execute_command(&self, command: &str) -> Result<CommandRoute> {
        let websocket = self.websocket.lock().unwrap_or_else(PoisonError::into_inner).clone();
        if let Some(websocket) = websocket {
            if websocket.has_stream(StreamName::Console.as_str()) {
                let console = websocket.console();
                if console.is_started() && console.send_command(command) {
                    return Ok(CommandRoute::Websocket);
                }
            }
        }
        self.api.execute_command(&self.id, command).await?;
        Ok(CommandRoute::Rest)
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server").field("id", &self.id).finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "server_test.rs"]
mod tests;
