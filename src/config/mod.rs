//! Storefront client configuration

use clap::Args;

use crate::config::{api::ApiConfig, cart::CartConfig, observability::LoggingConfig};

pub mod api;
pub mod cart;
pub mod observability;

pub use api::ConfigError;
pub use observability::LogFormat;

/// Settings shared by every command.
#[derive(Debug, Args)]
pub struct StorefrontConfig {
    /// Storefront backend settings.
    #[command(flatten)]
    pub api: ApiConfig,

    /// Local cart storage settings.
    #[command(flatten)]
    pub cart: CartConfig,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,
}
