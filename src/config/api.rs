//! Backend API Config

use std::time::Duration;

use clap::Args;
use thiserror::Error;

use crate::client::QuoteClientConfig;

/// Errors raised while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A setting needed by the requested command was not provided.
    #[error("missing required setting: {0}")]
    Missing(&'static str),
}

/// Storefront backend settings.
#[derive(Debug, Args)]
pub struct ApiConfig {
    /// Storefront API base URL
    #[arg(long, env = "STOREFRONT_API_URL")]
    pub api_url: Option<String>,

    /// Bearer token sent with API requests
    #[arg(long, env = "STOREFRONT_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, env = "STOREFRONT_REQUEST_TIMEOUT_SECONDS", default_value_t = 10u64)]
    pub request_timeout_seconds: u64,
}

impl ApiConfig {
    /// Build quote client settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if no API URL is configured.
    pub fn client_config(&self) -> Result<QuoteClientConfig, ConfigError> {
        let base_url = self
            .api_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or(ConfigError::Missing("--api-url / STOREFRONT_API_URL"))?;

        Ok(QuoteClientConfig {
            base_url: base_url.to_string(),
            token: self.api_token.clone().filter(|token| !token.is_empty()),
            timeout: Duration::from_secs(self.request_timeout_seconds),
        })
    }
}
