//! Entry point: one authenticated API client that hands out [`Server`]s.

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::server::{Server, ServerInfo};

#[derive(Debug, Clone)]
pub struct Client {
    config: ClientConfig,
    api: ApiClient,
}

impl Client {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built from `config`.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let api = ApiClient::new(&config)?;
        Ok(Self { config, api })
    }

    /// Client configured from `EXAROTON_*` environment variables.
    ///
    /// # Errors
    ///
    /// See [`ClientConfig::from_env`] and [`Client::new`].
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Every server the token can access.
    ///
    /// # Errors
    ///
    /// Propagates REST failures.
    pub async fn get_servers(&self) -> Result<Vec<ServerInfo>> {
        self.api.get_servers().await
    }

    /// Handle to one server. Makes no request.
    pub fn server(&self, id: &str) -> Server {
        Server::new(id, self.api.clone(), self.config.clone())
    }
}
