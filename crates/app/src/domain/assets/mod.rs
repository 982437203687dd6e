//! Product Assets

pub mod cleanup;
pub mod errors;
pub mod models;
pub mod slots;
pub mod store;

pub use errors::{AssetStoreConfigError, AssetStoreError};
pub use store::{AssetStore, AssetStoreConfig, MockAssetStore, ObjectStoreAssets};
