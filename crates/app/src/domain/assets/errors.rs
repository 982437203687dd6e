//! Asset store errors.

use thiserror::Error;

use crate::domain::assets::models::AssetKey;

#[derive(Debug, Error)]
pub enum AssetStoreError {
    #[error("failed to upload asset {key}")]
    Write {
        key: AssetKey,
        #[source]
        source: object_store::Error,
    },

    #[error("failed to delete asset {key}")]
    Delete {
        key: AssetKey,
        #[source]
        source: object_store::Error,
    },

    #[error("asset store {operation} timed out for {key}")]
    Timeout {
        key: AssetKey,
        operation: &'static str,
    },
}

impl AssetStoreError {
    /// Key of the object the failed call addressed.
    #[must_use]
    pub fn key(&self) -> &AssetKey {
        match self {
            Self::Write { key, .. } | Self::Delete { key, .. } | Self::Timeout { key, .. } => key,
        }
    }
}

#[derive(Debug, Error)]
pub enum AssetStoreConfigError {
    #[error("invalid asset store url")]
    InvalidUrl(#[from] url::ParseError),

    #[error("unsupported asset store url")]
    ObjectStore(#[from] object_store::Error),
}
