//! Library error type.
//!
//! Transport failures on the websocket are not surfaced here: the client
//! reconnects on its own and publishes them as [`crate::ws::Event::Error`].
//! This enum covers what a caller can actually act on.

/// Errors produced by REST calls, configuration and stream operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No API token was configured.
    #[error("missing API token; pass one explicitly or set {var}")]
    MissingApiToken { var: &'static str },

    /// The base URL is not an `http(s)://` URL.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// The underlying HTTP client could not be constructed or a request failed.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a `success: false` envelope.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// A header value contained characters HTTP does not allow.
    #[error("invalid header value: {0}")]
    InvalidHeader(String),

    /// The websocket handshake or transport failed.
    #[error("websocket error: {0}")]
    Websocket(Box<tokio_tungstenite::tungstenite::Error>),

    /// A JSON payload did not have the expected shape.
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The stream is not eligible to run for the current server status.
    #[error("the {stream} stream is not active")]
    StreamInactive { stream: &'static str },

    /// The connection task went away before a pending call resolved.
    #[error("websocket connection dropped")]
    ConnectionDropped,
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Websocket(Box::new(error))
    }
}

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;
