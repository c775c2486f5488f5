//! Cart Storage Config

use std::path::PathBuf;

use clap::Args;

/// Local cart storage settings.
#[derive(Debug, Args)]
pub struct CartConfig {
    /// Path of the persisted cart file
    #[arg(long, env = "STOREFRONT_CART_PATH", default_value = ".storefront/cart.json")]
    pub cart_path: PathBuf,

    /// ISO 4217 currency used to display prices
    #[arg(long, env = "STOREFRONT_CURRENCY", default_value = "USD")]
    pub currency: String,
}
