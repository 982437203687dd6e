//! Asset Store Config

use std::time::Duration;

use clap::Args;

use catalog_app::domain::assets::AssetStoreConfig;

/// Object store settings.
#[derive(Debug, Args)]
pub struct AssetStoreArgs {
    /// Object store URL, e.g. `s3://bucket/prefix`, `file:///var/lib/catalog` or `memory:///`
    #[arg(long, env = "ASSET_STORE_URL")]
    pub asset_store_url: String,

    /// Deadline for each object store call in seconds
    #[arg(long, env = "ASSET_STORE_TIMEOUT_SECONDS", default_value_t = 10_u64)]
    pub asset_store_timeout_seconds: u64,
}

impl AssetStoreArgs {
    #[must_use]
    pub fn store_config(&self) -> AssetStoreConfig {
        AssetStoreConfig {
            url: self.asset_store_url.clone(),
            timeout: Duration::from_secs(self.asset_store_timeout_seconds),
        }
    }
}
