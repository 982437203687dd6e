//! Object store gateway.

use std::{env, future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use mockall::automock;
use object_store::{
    Attribute, Attributes, ObjectStore, PutOptions, PutPayload, parse_url_opts, path::Path,
};
use tokio::time::timeout;
use tracing::debug;
use url::Url;

use crate::domain::assets::{
    errors::{AssetStoreConfigError, AssetStoreError},
    models::AssetKey,
};

/// Default deadline for a single object store call.
pub const DEFAULT_ASSET_STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// Object store connection settings.
#[derive(Debug, Clone)]
pub struct AssetStoreConfig {
    /// Store URL, e.g. `s3://bucket/prefix`, `file:///var/lib/catalog` or `memory:///`.
    pub url: String,

    /// Deadline applied to every put and delete.
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ObjectStoreAssets {
    store: Arc<dyn ObjectStore>,
    prefix: Path,
    timeout: Duration,
}

impl ObjectStoreAssets {
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, prefix: Path, timeout: Duration) -> Self {
        Self {
            store,
            prefix,
            timeout,
        }
    }

    /// Build the gateway from a store URL.
    ///
    /// `AWS_*` environment variables are passed through to the S3 builder so
    /// explicit credentials win over instance metadata.
    ///
    /// # Errors
    ///
    /// Returns an error when the URL cannot be parsed or names an unsupported store.
    pub fn from_config(config: &AssetStoreConfig) -> Result<Self, AssetStoreConfigError> {
        let url = Url::parse(&config.url)?;

        let options: Vec<(String, String)> = env::vars_os()
            .filter_map(|(key, value)| {
                let key = key.to_str()?;
                let value = value.to_str()?;

                if !key.starts_with("AWS_") {
                    return None;
                }

                Some((key.to_ascii_lowercase(), value.to_string()))
            })
            .collect();

        let (store, prefix) = parse_url_opts(&url, options)?;

        debug!(store = %store, prefix = %prefix, "asset store configured");

        Ok(Self::new(Arc::from(store), prefix, config.timeout))
    }

    fn location(&self, key: &AssetKey) -> Path {
        let relative = Path::from(key.as_str());

        self.prefix.parts().chain(relative.parts()).collect()
    }

    async fn with_deadline<T, F>(
        &self,
        key: &AssetKey,
        operation: &'static str,
        call: F,
    ) -> Result<T, AssetStoreError>
    where
        F: Future<Output = Result<T, AssetStoreError>>,
    {
        timeout(self.timeout, call)
            .await
            .map_err(|_elapsed| AssetStoreError::Timeout {
                key: key.clone(),
                operation,
            })?
    }
}

#[async_trait]
impl AssetStore for ObjectStoreAssets {
    async fn put(
        &self,
        key: AssetKey,
        content_type: String,
        bytes: Bytes,
    ) -> Result<AssetKey, AssetStoreError> {
        let location = self.location(&key);

        let options = PutOptions {
            attributes: Attributes::from_iter([(Attribute::ContentType, content_type)]),
            ..PutOptions::default()
        };

        self.with_deadline(&key, "put", async {
            self.store
                .put_opts(&location, PutPayload::from(bytes), options)
                .await
                .map_err(|source| AssetStoreError::Write {
                    key: key.clone(),
                    source,
                })
        })
        .await?;

        Ok(key)
    }

    async fn delete(&self, key: AssetKey) -> Result<(), AssetStoreError> {
        let location = self.location(&key);

        self.with_deadline(&key, "delete", async {
            self.store
                .delete(&location)
                .await
                .map_err(|source| AssetStoreError::Delete {
                    key: key.clone(),
                    source,
                })
        })
        .await
    }
}

/// Binary object storage for referenced assets.
#[automock]
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Upload bytes under `key`, returning the key as the durable reference.
    async fn put(
        &self,
        key: AssetKey,
        content_type: String,
        bytes: Bytes,
    ) -> Result<AssetKey, AssetStoreError>;

    /// Delete the object stored under `key`.
    async fn delete(&self, key: AssetKey) -> Result<(), AssetStoreError>;
}
