//! Client library for the exaroton server hosting API.
//!
//! ARCHITECTURE
//! ============
//! - [`Client`] holds the config and an authenticated REST client.
//! - [`Server`] is one hosted server: REST actions plus a lazily created
//!   [`ws::WebsocketClient`].
//! - The websocket multiplexes named streams (console, tick, stats, heap,
//!   management) over one socket and reconnects on its own.
//!
//! ```ignore
//! let client = exaroton::Client::from_env()?;
//! let server = client.server("abc123");
//! let socket = server.websocket()?;
//! let mut events = socket.subscribe();
//! server.subscribe(&["console"]).await?;
//! while let Ok(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! ```

pub mod api;
mod client;
pub mod config;
mod error;
pub mod server;
pub mod status;
pub mod ws;

pub use api::{ApiClient, StatusSource};
pub use client::Client;
pub use config::{ClientConfig, Timeouts, WebsocketOptions};
pub use error::{Error, Result};
pub use server::{CommandRoute, Players, Server, ServerInfo, Software};
pub use status::ServerStatus;
