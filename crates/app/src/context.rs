//! App Context

use std::sync::Arc;

use thiserror::Error;

use crate::{
    database,
    domain::{
        assets::{AssetStoreConfig, AssetStoreConfigError, ObjectStoreAssets},
        products::{CatalogProductsService, ProductsService},
    },
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to connect to database")]
    Database(#[source] sqlx::Error),

    #[error("failed to configure asset store")]
    AssetStore(#[from] AssetStoreConfigError),
}

#[derive(Clone)]
pub struct AppContext {
    pub products: Arc<dyn ProductsService>,
}

impl AppContext {
    /// Build application context from a database URL and asset store settings.
    ///
    /// # Errors
    ///
    /// Returns an error when establishing a database connection fails or the
    /// asset store URL is not usable.
    pub async fn from_config(
        database_url: &str,
        assets: &AssetStoreConfig,
    ) -> Result<Self, AppInitError> {
        let assets = ObjectStoreAssets::from_config(assets)?;

        let pool = database::connect(database_url)
            .await
            .map_err(AppInitError::Database)?;

        Ok(Self {
            products: Arc::new(CatalogProductsService::postgres(pool, Arc::new(assets))),
        })
    }
}
