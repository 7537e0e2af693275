//! Client configuration parsed from environment variables.

use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.exaroton.com/v1/";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_RECONNECT_MS: u64 = 3000;
pub const DEFAULT_STREAM_RETRY_SECS: u64 = 15;

pub const ENV_API_TOKEN: &str = "EXAROTON_API_TOKEN";
pub const ENV_BASE_URL: &str = "EXAROTON_BASE_URL";
pub const ENV_USER_AGENT: &str = "EXAROTON_USER_AGENT";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "EXAROTON_REQUEST_TIMEOUT_SECS";
pub const ENV_CONNECT_TIMEOUT_SECS: &str = "EXAROTON_CONNECT_TIMEOUT_SECS";
pub const ENV_AUTO_RECONNECT: &str = "EXAROTON_AUTO_RECONNECT";
pub const ENV_RECONNECT_MS: &str = "EXAROTON_RECONNECT_MS";
pub const ENV_STREAM_RETRY_SECS: &str = "EXAROTON_STREAM_RETRY_SECS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

/// Socket-level behavior of a [`crate::ws::WebsocketClient`].
///
/// The reconnect policy is a fixed interval with no jitter and no attempt
/// cap. Lowering `reconnect_interval` far below the default can get the
/// token rate limited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebsocketOptions {
    /// Reopen the socket after it closes while a connection is still wanted.
    pub auto_reconnect: bool,
    /// Delay between reconnect attempts, and before re-requesting streams
    /// after the remote peer reported `disconnected`.
    pub reconnect_interval: Duration,
    /// Period of the sweep that re-sends `start` for streams that want to run
    /// but are not running yet. A zero period uses the default.
    pub stream_retry_interval: Duration,
}

impl Default for WebsocketOptions {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            reconnect_interval: Duration::from_millis(DEFAULT_RECONNECT_MS),
            stream_retry_interval: Duration::from_secs(DEFAULT_STREAM_RETRY_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_token: String,
    /// Always ends with `/`.
    pub base_url: String,
    pub user_agent: String,
    pub timeouts: Timeouts,
    pub websocket: WebsocketOptions,
}

impl ClientConfig {
    /// Config with every default and the given token.
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            user_agent: default_user_agent(),
            timeouts: Timeouts::default(),
            websocket: WebsocketOptions::default(),
        }
    }

    /// Build typed config from environment variables.
    ///
    /// Required:
    /// - `EXAROTON_API_TOKEN`
    ///
    /// Optional:
    /// - `EXAROTON_BASE_URL`: default `https://api.exaroton.com/v1/`
    /// - `EXAROTON_USER_AGENT`: default `exaroton-rs@<version>`
    /// - `EXAROTON_REQUEST_TIMEOUT_SECS`: default 30
    /// - `EXAROTON_CONNECT_TIMEOUT_SECS`: default 10
    /// - `EXAROTON_AUTO_RECONNECT`: default `true`
    /// - `EXAROTON_RECONNECT_MS`: default 3000
    /// - `EXAROTON_STREAM_RETRY_SECS`: default 15, zero falls back to it
    ///
    /// # Errors
    ///
    /// Returns an error if the token is missing or the base URL is invalid.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] with a caller-supplied lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is missing or the base URL is invalid.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_token = lookup(ENV_API_TOKEN)
            .filter(|token| !token.is_empty())
            .ok_or(Error::MissingApiToken { var: ENV_API_TOKEN })?;
        let base_url = normalize_base_url(lookup(ENV_BASE_URL).as_deref().unwrap_or(DEFAULT_BASE_URL))?;
        let user_agent = lookup(ENV_USER_AGENT).unwrap_or_else(default_user_agent);

        let timeouts = Timeouts {
            request_secs: parse_or(&lookup, ENV_REQUEST_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_or(&lookup, ENV_CONNECT_TIMEOUT_SECS, DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        let websocket = WebsocketOptions {
            auto_reconnect: parse_or(&lookup, ENV_AUTO_RECONNECT, true),
            reconnect_interval: Duration::from_millis(parse_or(&lookup, ENV_RECONNECT_MS, DEFAULT_RECONNECT_MS)),
            stream_retry_interval: Duration::from_secs(
                parse_with(&lookup, ENV_STREAM_RETRY_SECS)
                    .filter(|secs| *secs > 0)
                    .unwrap_or(DEFAULT_STREAM_RETRY_SECS),
            ),
        };

        Ok(Self { api_token, base_url, user_agent, timeouts, websocket })
    }

    /// Replace the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBaseUrl`] for anything but `http(s)://` URLs.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        self.base_url = normalize_base_url(base_url)?;
        Ok(self)
    }

    /// Replace the websocket options.
    #[must_use]
    pub fn with_websocket(mut self, websocket: WebsocketOptions) -> Self {
        self.websocket = websocket;
        self
    }

    /// Socket URL for one server: `{ws|wss}://{host}{basePath}servers/{id}/websocket`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBaseUrl`] if the base URL has no http scheme.
    pub fn websocket_url(&self, server_id: &str) -> Result<String> {
        if let Some(rest) = self.base_url.strip_prefix("https://") {
            return Ok(format!("wss://{rest}servers/{server_id}/websocket"));
        }
        if let Some(rest) = self.base_url.strip_prefix("http://") {
            return Ok(format!("ws://{rest}servers/{server_id}/websocket"));
        }
        Err(Error::InvalidBaseUrl(self.base_url.clone()))
    }
}

fn default_user_agent() -> String {
    format!("exaroton-rs@{}", env!("CARGO_PKG_VERSION"))
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let has_host = ["https://", "http://"]
        .iter()
        .any(|scheme| trimmed.strip_prefix(scheme).is_some_and(|rest| !rest.is_empty() && !rest.starts_with('/')));
    if !has_host {
        return Err(Error::InvalidBaseUrl(raw.to_owned()));
    }
    if trimmed.ends_with('/') {
        Ok(trimmed.to_owned())
    } else {
        Ok(format!("{trimmed}/"))
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    parse_with(lookup, key).unwrap_or(default)
}

fn parse_with<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    lookup(key).and_then(|value| value.trim().parse::<T>().ok())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
