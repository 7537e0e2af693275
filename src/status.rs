//! Remote server lifecycle status.
//!
//! The API reports status as a bare integer. Code 9 is unassigned and stays
//! unassigned here so the numbering matches the wire.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Lifecycle status of a hosted server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerStatus {
    Offline,
    Online,
    Starting,
    Stopping,
    Restarting,
    Saving,
    Loading,
    Crashed,
    Pending,
    Preparing,
}

impl ServerStatus {
    /// Every known status, in wire order.
    pub const ALL: [Self; 10] = [
        Self::Offline,
        Self::Online,
        Self::Starting,
        Self::Stopping,
        Self::Restarting,
        Self::Saving,
        Self::Loading,
        Self::Crashed,
        Self::Pending,
        Self::Preparing,
    ];

    /// Wire integer for this status.
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            Self::Offline => 0,
            Self::Online => 1,
            Self::Starting => 2,
            Self::Stopping => 3,
            Self::Restarting => 4,
            Self::Saving => 5,
            Self::Loading => 6,
            Self::Crashed => 7,
            Self::Pending => 8,
            Self::Preparing => 10,
        }
    }

    /// Parse a wire integer. Unknown codes (including 9) yield `None`.
    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.code() == code)
    }

    /// Upper-case label as used in the API documentation.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Offline => "OFFLINE",
            Self::Online => "ONLINE",
            Self::Starting => "STARTING",
            Self::Stopping => "STOPPING",
            Self::Restarting => "RESTARTING",
            Self::Saving => "SAVING",
            Self::Loading => "LOADING",
            Self::Crashed => "CRASHED",
            Self::Pending => "PENDING",
            Self::Preparing => "PREPARING",
        }
    }
}

impl std::fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for ServerStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.code())
    }
}

impl<'de> Deserialize<'de> for ServerStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = i64::deserialize(deserializer)?;
        Self::from_code(code).ok_or_else(|| serde::de::Error::custom(format!("unknown server status code {code}")))
    }
}

#[cfg(test)]
#[path = "status_test.rs"]
mod tests;
