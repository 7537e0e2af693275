//! Shared frame model and JSON codec for the server websocket.
//!
//! This crate owns the wire representation of the `exaroton` library's
//! socket layer. Every socket message is one JSON text frame of the
//! shape `{stream?, type, data?}`: connection-level control frames carry no
//! stream, channel frames name the stream they belong to.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// RESERVED NAMES
// =============================================================================

/// Heartbeat sent by the remote end. Carries nothing.
pub const TYPE_KEEP_ALIVE: &str = "keep-alive";
/// The socket is authenticated and accepts stream control frames.
pub const TYPE_READY: &str = "ready";
/// The remote peer attached to the server side of the socket.
pub const TYPE_CONNECTED: &str = "connected";
/// The remote peer detached; it is expected to come back.
pub const TYPE_DISCONNECTED: &str = "disconnected";
/// Server snapshot push, only valid on [`STREAM_STATUS`].
pub const TYPE_STATUS: &str = "status";
/// Outbound request to begin a stream. `data` is the start payload.
pub const TYPE_START: &str = "start";
/// Outbound request to end a stream.
pub const TYPE_STOP: &str = "stop";
/// Inbound confirmation that a stream is running.
pub const TYPE_STARTED: &str = "started";
/// Inbound confirmation that a stream has ended.
pub const TYPE_STOPPED: &str = "stopped";

/// Reserved stream name for server snapshot pushes.
pub const STREAM_STATUS: &str = "status";

// =============================================================================
// ERRORS
// =============================================================================

/// Error returned by [`decode_frame`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The text is not a JSON object of the frame shape.
    #[error("failed to decode json frame: {0}")]
    Decode(#[from] serde_json::Error),
    /// The frame decoded but its `type` is empty.
    #[error("frame has an empty type")]
    MissingType,
}

// =============================================================================
// FRAME
// =============================================================================

/// A single message on the server websocket.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Channel the frame belongs to. `None` for connection-level frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<String>,
    /// Frame type, e.g. `"start"`, `"line"`, `"ready"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Arbitrary JSON payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Frame {
    /// Create a channel frame without payload.
    pub fn new(stream: impl Into<String>, kind: impl Into<String>) -> Self {
        Self { stream: Some(stream.into()), kind: kind.into(), data: None }
    }

    /// Attach a payload.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// True when this frame is a server snapshot push on the status stream.
    #[must_use]
    pub fn is_status_push(&self) -> bool {
        self.kind == TYPE_STATUS && self.stream.as_deref() == Some(STREAM_STATUS)
    }
}

/// Encode a frame into a JSON text message.
#[must_use]
pub fn encode_frame(frame: &Frame) -> String {
    // Serializing strings and `serde_json::Value` into a String cannot fail;
    // the only error source would be a map with non-string keys.
    serde_json::to_string(frame).unwrap_or_default()
}

/// Decode a JSON text message into a frame.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed JSON or a missing `type`
/// field and [`CodecError::MissingType`] for an empty `type`.
pub fn decode_frame(text: &str) -> Result<Frame, CodecError> {
    let frame: Frame = serde_json::from_str(text)?;
    if frame.kind.is_empty() {
        return Err(CodecError::MissingType);
    }
    Ok(frame)
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
