//! REST collaborator.
//!
//! Thin HTTP wrapper over the `{success, error?, data?}` envelope. Only the
//! endpoints the websocket layer and the [`crate::server::Server`] facade
//! need live here. Pure parsing in `parse_envelope` for testability.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::server::ServerInfo;
use crate::status::ServerStatus;

// =============================================================================
// STATUS SOURCE
// =============================================================================

/// Where the websocket client gets a server status it has not been pushed yet.
#[async_trait::async_trait]
pub trait StatusSource: Send + Sync {
    /// Fetch the current status of one server.
    async fn fetch_status(&self, server_id: &str) -> Result<ServerStatus>;
}

// =============================================================================
// CLIENT
// =============================================================================

/// Authenticated HTTP client for the API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client that sends the bearer token and user agent on every call.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not a valid header value or the HTTP
    /// client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.api_token))
                .map_err(|e| Error::InvalidHeader(e.to_string()))?,
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).map_err(|e| Error::InvalidHeader(e.to_string()))?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()?;

        Ok(Self { http, base_url: config.base_url.clone() })
    }

    /// Send one request and unwrap the envelope's `data`.
    ///
    /// `path` is relative to the base URL, without a leading `/`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on transport failure and [`Error::Api`] when
    /// the envelope reports `success: false` or the status is not 2xx.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Option<T>> {
        let url = format!("{}{}", self.base_url, path.trim_start_matches('/'));
        tracing::debug!(%method, %url, "api: request");

        let request = self.http.request(method, &url);
        let request = if let Some(json) = body { request.json(&json) } else { request };

        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        parse_envelope(status, &text)
    }

    /// List every server the token can access.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn get_servers(&self) -> Result<Vec<ServerInfo>> {
        let servers = self.request(reqwest::Method::GET, "servers/", None).await?;
        Ok(servers.unwrap_or_default())
    }

    /// Fetch one server snapshot.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`]. A success envelope without data is an
    /// [`Error::Api`].
    pub async fn get_server(&self, server_id: &str) -> Result<ServerInfo> {
        let path = format!("servers/{server_id}/");
        self.request(reqwest::Method::GET, &path, None)
            .await?
            .ok_or_else(|| Error::Api { status: 200, message: "response contained no server data".to_owned() })
    }

    /// Ask the API to start the server.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn start_server(&self, server_id: &str) -> Result<()> {
        self.server_action(server_id, "start").await
    }

    /// Ask the API to stop the server.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn stop_server(&self, server_id: &str) -> Result<()> {
        self.server_action(server_id, "stop").await
    }

    /// Ask the API to restart the server.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn restart_server(&self, server_id: &str) -> Result<()> {
        self.server_action(server_id, "restart").await
    }

    /// Run a console command through the REST endpoint.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn execute_command(&self, server_id: &str, command: &str) -> Result<()> {
        let path = format!("servers/{server_id}/command/");
        self.request::<Value>(reqwest::Method::POST, &path, Some(serde_json::json!({ "command": command })))
            .await?;
        Ok(())
    }

    async fn server_action(&self, server_id: &str, action: &str) -> Result<()> {
        let path = format!("servers/{server_id}/{action}/");
        self.request::<Value>(reqwest::Method::GET, &path, None).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl StatusSource for ApiClient {
    async fn fetch_status(&self, server_id: &str) -> Result<ServerStatus> {
        let server = self.get_server(server_id).await?;
        server
            .status
            .ok_or_else(|| Error::Api { status: 200, message: format!("server {server_id} reported no status") })
    }
}

// =============================================================================
// ENVELOPE
// =============================================================================

#[derive(Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    data: Option<T>,
}

/// Decode an API envelope, turning failures into [`Error::Api`].
pub(crate) fn parse_envelope<T: DeserializeOwned>(status: u16, text: &str) -> Result<Option<T>> {
    let envelope = match serde_json::from_str::<Envelope<T>>(text) {
        Ok(envelope) => envelope,
        Err(e) if (200..300).contains(&status) => return Err(Error::Json(e)),
        Err(_) => return Err(Error::Api { status, message: text.to_owned() }),
    };

    if !envelope.success {
        let message = envelope.error.unwrap_or_else(|| format!("request failed with HTTP {status}"));
        return Err(Error::Api { status, message });
    }
    if !(200..300).contains(&status) {
        return Err(Error::Api { status, message: format!("unexpected HTTP {status}") });
    }

    Ok(envelope.data)
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
