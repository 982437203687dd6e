//! Products service.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::Arc,
};

use async_trait::async_trait;
use futures::future::join_all;
use jiff::Timestamp;
use mockall::automock;
use smallvec::SmallVec;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::domain::{
    assets::{
        AssetStore, AssetStoreError,
        cleanup::delete_best_effort,
        models::{AssetBlob, AssetBody, AssetKey, AssetUpload, AssetUploads, NewAsset, StorageMode},
        slots::AssetAddress,
    },
    products::{
        data::{NewProduct, NewProductRecord, ProductChanges, ProductPatch},
        errors::ProductsServiceError,
        records::{ProductRecord, ProductUuid, UpdatedProduct},
        repository::{PgProductsRepository, ProductsRepository},
    },
};

/// Products service backed by a repository and an object store.
#[derive(Clone)]
pub struct CatalogProductsService {
    repository: Arc<dyn ProductsRepository>,
    assets: Arc<dyn AssetStore>,
}

impl CatalogProductsService {
    #[must_use]
    pub fn new(repository: Arc<dyn ProductsRepository>, assets: Arc<dyn AssetStore>) -> Self {
        Self { repository, assets }
    }

    /// Service over the `PostgreSQL` repository.
    #[must_use]
    pub fn postgres(pool: PgPool, assets: Arc<dyn AssetStore>) -> Self {
        Self::new(Arc::new(PgProductsRepository::new(pool)), assets)
    }

    /// Turn uploads into persistable assets.
    ///
    /// Inline mode makes no external calls. Referenced mode uploads every file
    /// concurrently; if any upload fails the ones that succeeded are deleted
    /// and the first failure is returned.
    async fn stage(
        &self,
        uploads: AssetUploads,
        mode: StorageMode,
    ) -> Result<Vec<NewAsset>, ProductsServiceError> {
        let entries = uploads.into_entries();

        if mode == StorageMode::Inline {
            return Ok(entries
                .into_iter()
                .map(|(address, upload)| NewAsset {
                    address,
                    content_type: upload.content_type,
                    body: AssetBody::Inline(upload.bytes),
                })
                .collect());
        }

        let now = Timestamp::now();

        let results = join_all(
            entries
                .into_iter()
                .map(|(address, upload)| self.upload(now, address, upload)),
        )
        .await;

        let mut staged = Vec::with_capacity(results.len());
        let mut failure = None;

        for result in results {
            match result {
                Ok(asset) => staged.push(asset),
                Err(error) if failure.is_none() => failure = Some(error),
                Err(error) => {
                    warn!(key = %error.key(), error = ?error, "additional upload failure");
                }
            }
        }

        if let Some(error) = failure {
            self.discard(staged_keys(&staged)).await;

            return Err(error.into());
        }

        Ok(staged)
    }

    async fn upload(
        &self,
        now: Timestamp,
        address: AssetAddress,
        upload: AssetUpload,
    ) -> Result<NewAsset, AssetStoreError> {
        let key = AssetKey::generate(address, now, &upload.file_name);

        let key = self
            .assets
            .put(key, upload.content_type.clone(), upload.bytes)
            .await?;

        Ok(NewAsset {
            address,
            content_type: upload.content_type,
            body: AssetBody::Referenced(key),
        })
    }

    async fn discard(&self, keys: SmallVec<[AssetKey; 4]>) {
        if keys.is_empty() {
            return;
        }

        warn!(count = keys.len(), "discarding staged uploads");

        delete_best_effort(self.assets.as_ref(), keys).await;
    }
}

impl Debug for CatalogProductsService {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("CatalogProductsService").finish_non_exhaustive()
    }
}

fn staged_keys(assets: &[NewAsset]) -> SmallVec<[AssetKey; 4]> {
    assets
        .iter()
        .filter_map(NewAsset::referenced_key)
        .cloned()
        .collect()
}

#[async_trait]
impl ProductsService for CatalogProductsService {
    async fn list_products(&self) -> Result<Vec<ProductRecord>, ProductsServiceError> {
        Ok(self.repository.list_products().await?)
    }

    async fn get_product(
        &self,
        product: ProductUuid,
    ) -> Result<ProductRecord, ProductsServiceError> {
        Ok(self.repository.get_product(product).await?)
    }

    async fn get_asset(
        &self,
        product: ProductUuid,
        address: AssetAddress,
    ) -> Result<AssetBlob, ProductsServiceError> {
        self.repository
            .get_asset(product, address)
            .await?
            .ok_or(ProductsServiceError::NotFound)
    }

    async fn create_product(
        &self,
        product: NewProduct,
        uploads: AssetUploads,
        mode: StorageMode,
    ) -> Result<ProductRecord, ProductsServiceError> {
        product.validate()?;

        if self
            .repository
            .product_code_exists(product.code.clone())
            .await?
        {
            return Err(ProductsServiceError::AlreadyExists);
        }

        let assets = self.stage(uploads, mode).await?;
        let staged = staged_keys(&assets);

        let record = NewProductRecord {
            uuid: ProductUuid::new(),
            product,
            assets,
        };

        match self.repository.create_product(record).await {
            Ok(created) => {
                info!(product = %created.uuid, code = %created.code, "product created");

                Ok(created)
            }
            Err(error) => {
                self.discard(staged).await;

                Err(error.into())
            }
        }
    }

    async fn update_product(
        &self,
        product: ProductUuid,
        patch: ProductPatch,
        uploads: AssetUploads,
        mode: StorageMode,
    ) -> Result<ProductRecord, ProductsServiceError> {
        patch.validate()?;

        let current = self.repository.get_product(product).await?;

        if patch.is_empty() && uploads.is_empty() {
            return Ok(current);
        }

        let replaced_slots = uploads.replaced_slots();
        let assets = self.stage(uploads, mode).await?;
        let staged = staged_keys(&assets);

        let changes = ProductChanges {
            patch,
            replaced_slots,
            assets,
        };

        match self.repository.update_product(product, changes).await {
            Ok(UpdatedProduct {
                product: updated,
                superseded,
            }) => {
                // A key reused by a fresh upload now holds the new bytes.
                let superseded: SmallVec<[AssetKey; 4]> = superseded
                    .into_iter()
                    .filter(|key| !staged.contains(key))
                    .collect();

                delete_best_effort(self.assets.as_ref(), superseded).await;

                info!(product = %updated.uuid, "product updated");

                Ok(updated)
            }
            Err(error) => {
                self.discard(staged).await;

                Err(error.into())
            }
        }
    }

    async fn delete_product(&self, product: ProductUuid) -> Result<(), ProductsServiceError> {
        let keys = self.repository.delete_product(product).await?;

        delete_best_effort(self.assets.as_ref(), keys).await;

        info!(product = %product, "product deleted");

        Ok(())
    }
}

#[automock]
#[async_trait]
pub trait ProductsService: Send + Sync {
    /// Retrieves all products, oldest first.
    async fn list_products(&self) -> Result<Vec<ProductRecord>, ProductsServiceError>;

    /// Retrieve a single product.
    async fn get_product(
        &self,
        product: ProductUuid,
    ) -> Result<ProductRecord, ProductsServiceError>;

    /// Retrieve the bytes of an inline asset.
    ///
    /// Referenced assets live in the object store and are reported as not found.
    async fn get_asset(
        &self,
        product: ProductUuid,
        address: AssetAddress,
    ) -> Result<AssetBlob, ProductsServiceError>;

    /// Creates a product, storing uploads according to `mode`.
    async fn create_product(
        &self,
        product: NewProduct,
        uploads: AssetUploads,
        mode: StorageMode,
    ) -> Result<ProductRecord, ProductsServiceError>;

    /// Patches fields and replaces the uploaded slots of a product.
    async fn update_product(
        &self,
        product: ProductUuid,
        patch: ProductPatch,
        uploads: AssetUploads,
        mode: StorageMode,
    ) -> Result<ProductRecord, ProductsServiceError>;

    /// Deletes a product and, best-effort, every object it referenced.
    async fn delete_product(&self, product: ProductUuid) -> Result<(), ProductsServiceError>;
}

#[cfg(test)]
mod tests {
    use std::{sync::Mutex, time::Duration};

    use bytes::Bytes;
    use futures::TryStreamExt;
    use mockall::predicate::eq;
    use object_store::{ObjectStore, memory::InMemory, path::Path};
    use rust_decimal::Decimal;
    use testresult::TestResult;

    use crate::{
        domain::{
            assets::{
                MockAssetStore, ObjectStoreAssets,
                models::{AssetLocator, StoredAsset},
                slots::AssetSlot,
            },
            products::{errors::ProductsRepositoryError, repository::MockProductsRepository},
        },
        test::InMemoryProductsRepository,
    };

    use super::*;

    fn new_product(code: &str) -> NewProduct {
        NewProduct {
            name: "Spinning top".to_string(),
            description: "Spins for a long time".to_string(),
            price: Decimal::new(1250, 2),
            previous_price: Some(Decimal::new(1500, 2)),
            code: code.to_string(),
        }
    }

    fn upload(file_name: &str, content_type: &str, bytes: &'static [u8]) -> AssetUpload {
        AssetUpload {
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            bytes: Bytes::from_static(bytes),
        }
    }

    fn gif() -> AssetUpload {
        upload("spin.gif", "image/gif", b"GIF89a")
    }

    fn in_memory_service() -> (Arc<InMemory>, CatalogProductsService) {
        let store = Arc::new(InMemory::new());

        let assets = ObjectStoreAssets::new(store.clone(), Path::default(), Duration::from_secs(5));

        let service = CatalogProductsService::new(
            Arc::new(InMemoryProductsRepository::default()),
            Arc::new(assets),
        );

        (store, service)
    }

    fn recording_store(
        puts: Arc<Mutex<Vec<AssetKey>>>,
        deletes: Arc<Mutex<Vec<AssetKey>>>,
    ) -> MockAssetStore {
        let mut store = MockAssetStore::new();

        store.expect_put().returning(move |key, _, _| {
            puts.lock().expect("puts lock").push(key.clone());

            Ok(key)
        });

        store.expect_delete().returning(move |key| {
            deletes.lock().expect("deletes lock").push(key);

            Ok(())
        });

        store
    }

    fn referenced_key(record: &ProductRecord, address: AssetAddress) -> Option<AssetKey> {
        record
            .assets
            .get(address)
            .and_then(StoredAsset::referenced_key)
            .cloned()
    }

    #[tokio::test]
    async fn create_then_get_returns_equal_fields_and_resolvable_slots() -> TestResult {
        let (store, service) = in_memory_service();

        let uploads = AssetUploads {
            name_image: Some(upload("name.png", "image/png", b"png")),
            additional_images: Some(vec![
                upload("a.png", "image/png", b"a"),
                upload("b.png", "image/png", b"b"),
            ]),
            ..AssetUploads::default()
        };

        let created = service
            .create_product(new_product("TOP-1"), uploads, StorageMode::Referenced)
            .await?;

        let fetched = service.get_product(created.uuid).await?;

        assert_eq!(fetched, created);
        assert_eq!(fetched.name, "Spinning top");
        assert_eq!(fetched.price, Decimal::new(1250, 2));
        assert_eq!(fetched.previous_price, Some(Decimal::new(1500, 2)));

        for (address, asset) in fetched.assets.iter() {
            let Some(AssetLocator::Reference(key)) = fetched.assets.locate(fetched.uuid, address)
            else {
                panic!("expected a reference for {address:?}, got {asset:?}");
            };

            store.head(&Path::from(key.as_str())).await?;
        }

        assert_eq!(fetched.assets.iter().count(), 3);

        Ok(())
    }

    #[tokio::test]
    async fn duplicate_code_is_rejected_before_any_upload() -> TestResult {
        let mut store = MockAssetStore::new();

        store.expect_put().never();
        store.expect_delete().never();

        let repository = Arc::new(InMemoryProductsRepository::default());
        let service = CatalogProductsService::new(repository.clone(), Arc::new(store));

        service
            .create_product(new_product("DUP"), AssetUploads::default(), StorageMode::Inline)
            .await?;

        let result = service
            .create_product(
                new_product("DUP"),
                AssetUploads::single(AssetSlot::Animated, gif()),
                StorageMode::Referenced,
            )
            .await;

        assert!(
            matches!(result, Err(ProductsServiceError::AlreadyExists)),
            "expected AlreadyExists, got {result:?}"
        );
        assert_eq!(service.list_products().await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn replacing_a_referenced_slot_puts_once_and_deletes_the_old_key_once() -> TestResult {
        let puts = Arc::new(Mutex::new(Vec::new()));
        let deletes = Arc::new(Mutex::new(Vec::new()));

        let service = CatalogProductsService::new(
            Arc::new(InMemoryProductsRepository::default()),
            Arc::new(recording_store(puts.clone(), deletes.clone())),
        );

        let animated = AssetAddress::single(AssetSlot::Animated);

        let created = service
            .create_product(
                new_product("TOP-2"),
                AssetUploads::single(AssetSlot::Animated, upload("old.gif", "image/gif", b"old")),
                StorageMode::Referenced,
            )
            .await?;

        let old_key = referenced_key(&created, animated).ok_or("missing old key")?;

        let updated = service
            .update_product(
                created.uuid,
                ProductPatch::default(),
                AssetUploads::single(AssetSlot::Animated, upload("new.gif", "image/gif", b"new")),
                StorageMode::Referenced,
            )
            .await?;

        let new_key = referenced_key(&updated, animated).ok_or("missing new key")?;

        let puts = puts.lock().map(|keys| keys.clone()).unwrap_or_default();
        let deletes = deletes.lock().map(|keys| keys.clone()).unwrap_or_default();

        assert_ne!(old_key, new_key);
        assert_eq!(puts, vec![old_key.clone(), new_key]);
        assert_eq!(deletes, vec![old_key]);

        Ok(())
    }

    #[tokio::test]
    async fn inline_replacement_of_a_referenced_slot_deletes_the_old_key() -> TestResult {
        let (store, service) = in_memory_service();
        let animated = AssetAddress::single(AssetSlot::Animated);

        let created = service
            .create_product(
                new_product("TOP-3"),
                AssetUploads::single(AssetSlot::Animated, gif()),
                StorageMode::Referenced,
            )
            .await?;

        let old_key = referenced_key(&created, animated).ok_or("missing old key")?;

        let updated = service
            .update_product(
                created.uuid,
                ProductPatch::default(),
                AssetUploads::single(AssetSlot::Animated, upload("new.gif", "image/gif", b"new")),
                StorageMode::Inline,
            )
            .await?;

        let head = store.head(&Path::from(old_key.as_str())).await;

        assert!(
            matches!(head, Err(object_store::Error::NotFound { .. })),
            "expected old object to be deleted, got {head:?}"
        );
        assert_eq!(
            updated.assets.locate(updated.uuid, animated),
            Some(AssetLocator::Retrieval {
                product: updated.uuid,
                address: animated,
            })
        );

        Ok(())
    }

    #[tokio::test]
    async fn delete_attempts_every_referenced_key_even_when_one_fails() -> TestResult {
        let puts = Arc::new(Mutex::new(Vec::new()));
        let deletes = Arc::new(Mutex::new(Vec::new()));

        let mut store = MockAssetStore::new();
        let recorded = puts.clone();

        store.expect_put().returning(move |key, _, _| {
            recorded.lock().expect("puts lock").push(key.clone());

            Ok(key)
        });

        let attempted = deletes.clone();

        store.expect_delete().times(3).returning(move |key| {
            attempted.lock().expect("deletes lock").push(key.clone());

            if key.as_str().starts_with("product-name/") {
                Err(AssetStoreError::Timeout {
                    key,
                    operation: "delete",
                })
            } else {
                Ok(())
            }
        });

        let service = CatalogProductsService::new(
            Arc::new(InMemoryProductsRepository::default()),
            Arc::new(store),
        );

        let created = service
            .create_product(
                new_product("TOP-4"),
                AssetUploads {
                    name_image: Some(upload("name.png", "image/png", b"png")),
                    animated_image: Some(gif()),
                    additional_images: Some(vec![upload("a.png", "image/png", b"a")]),
                    ..AssetUploads::default()
                },
                StorageMode::Referenced,
            )
            .await?;

        service.delete_product(created.uuid).await?;

        let result = service.get_product(created.uuid).await;

        let mut puts = puts.lock().map(|keys| keys.clone()).unwrap_or_default();
        let mut deletes = deletes.lock().map(|keys| keys.clone()).unwrap_or_default();
        puts.sort();
        deletes.sort();

        assert!(
            matches!(result, Err(ProductsServiceError::NotFound)),
            "expected NotFound after deletion, got {result:?}"
        );
        assert_eq!(deletes, puts);

        Ok(())
    }

    #[tokio::test]
    async fn get_of_unknown_product_is_not_found() {
        let (_, service) = in_memory_service();

        let result = service.get_product(ProductUuid::new()).await;

        assert!(
            matches!(result, Err(ProductsServiceError::NotFound)),
            "expected NotFound, got {result:?}"
        );
    }

    #[tokio::test]
    async fn update_of_unknown_product_is_not_found_before_uploading() {
        let mut store = MockAssetStore::new();

        store.expect_put().never();

        let service = CatalogProductsService::new(
            Arc::new(InMemoryProductsRepository::default()),
            Arc::new(store),
        );

        let result = service
            .update_product(
                ProductUuid::new(),
                ProductPatch::default(),
                AssetUploads::single(AssetSlot::Animated, gif()),
                StorageMode::Referenced,
            )
            .await;

        assert!(
            matches!(result, Err(ProductsServiceError::NotFound)),
            "expected NotFound, got {result:?}"
        );
    }

    #[tokio::test]
    async fn delete_of_unknown_product_is_not_found() {
        let mut store = MockAssetStore::new();

        store.expect_delete().never();

        let service = CatalogProductsService::new(
            Arc::new(InMemoryProductsRepository::default()),
            Arc::new(store),
        );

        let result = service.delete_product(ProductUuid::new()).await;

        assert!(
            matches!(result, Err(ProductsServiceError::NotFound)),
            "expected NotFound, got {result:?}"
        );
    }

    #[tokio::test]
    async fn inline_asset_round_trips_bytes_and_content_type() -> TestResult {
        let mut store = MockAssetStore::new();

        store.expect_put().never();
        store.expect_delete().never();

        let service = CatalogProductsService::new(
            Arc::new(InMemoryProductsRepository::default()),
            Arc::new(store),
        );

        let created = service
            .create_product(
                new_product("TOP-5"),
                AssetUploads::single(
                    AssetSlot::Features,
                    upload("f.jpg", "image/jpeg", b"\xff\xd8\xff"),
                ),
                StorageMode::Inline,
            )
            .await?;

        let blob = service
            .get_asset(created.uuid, AssetAddress::single(AssetSlot::Features))
            .await?;

        assert_eq!(blob.content_type, "image/jpeg");
        assert_eq!(blob.bytes.as_ref(), b"\xff\xd8\xff");

        Ok(())
    }

    #[tokio::test]
    async fn inline_additional_images_are_served_by_index() -> TestResult {
        let (store, service) = in_memory_service();

        let uploads = AssetUploads {
            additional_images: Some(vec![
                upload("front.png", "image/png", b"front"),
                upload("back.webp", "image/webp", b"back"),
            ]),
            ..AssetUploads::default()
        };

        let created = service
            .create_product(new_product("TOP-11"), uploads, StorageMode::Inline)
            .await?;

        let second = service
            .get_asset(created.uuid, AssetAddress::additional(1))
            .await?;

        let past_the_end = service
            .get_asset(created.uuid, AssetAddress::additional(5))
            .await;

        let listed: Vec<_> = store.list(None).try_collect().await?;

        assert_eq!(second.content_type, "image/webp");
        assert_eq!(second.bytes.as_ref(), b"back");
        assert!(
            matches!(past_the_end, Err(ProductsServiceError::NotFound)),
            "expected NotFound, got {past_the_end:?}"
        );
        assert!(listed.is_empty(), "inline images must not reach the store");

        Ok(())
    }

    #[tokio::test]
    async fn replaced_additional_images_drop_positions_beyond_the_new_sequence() -> TestResult {
        let (_, service) = in_memory_service();

        let created = service
            .create_product(
                new_product("TOP-12"),
                AssetUploads {
                    additional_images: Some(vec![
                        upload("1.png", "image/png", b"1"),
                        upload("2.png", "image/png", b"2"),
                        upload("3.png", "image/png", b"3"),
                    ]),
                    ..AssetUploads::default()
                },
                StorageMode::Inline,
            )
            .await?;

        service
            .update_product(
                created.uuid,
                ProductPatch::default(),
                AssetUploads {
                    additional_images: Some(vec![upload("new.jpg", "image/jpeg", b"new")]),
                    ..AssetUploads::default()
                },
                StorageMode::Inline,
            )
            .await?;

        let first = service
            .get_asset(created.uuid, AssetAddress::additional(0))
            .await?;

        let third = service
            .get_asset(created.uuid, AssetAddress::additional(2))
            .await;

        assert_eq!(first.content_type, "image/jpeg");
        assert_eq!(first.bytes.as_ref(), b"new");
        assert!(
            matches!(third, Err(ProductsServiceError::NotFound)),
            "expected NotFound, got {third:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn referenced_asset_bytes_are_not_served() -> TestResult {
        let (_, service) = in_memory_service();

        let created = service
            .create_product(
                new_product("TOP-6"),
                AssetUploads::single(AssetSlot::Animated, gif()),
                StorageMode::Referenced,
            )
            .await?;

        let result = service
            .get_asset(created.uuid, AssetAddress::single(AssetSlot::Animated))
            .await;

        assert!(
            matches!(result, Err(ProductsServiceError::NotFound)),
            "expected NotFound, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn referenced_animated_upload_is_keyed_under_gifs() -> TestResult {
        let (store, service) = in_memory_service();

        let created = service
            .create_product(
                new_product("TOP-7"),
                AssetUploads::single(AssetSlot::Animated, gif()),
                StorageMode::Referenced,
            )
            .await?;

        let key = referenced_key(&created, AssetAddress::single(AssetSlot::Animated))
            .ok_or("missing key")?;

        let stored = store.get(&Path::from(key.as_str())).await?.bytes().await?;

        assert!(key.as_str().starts_with("product-gifs/"));
        assert!(key.as_str().ends_with("-spin.gif"));
        assert_eq!(stored.as_ref(), b"GIF89a");

        Ok(())
    }

    #[tokio::test]
    async fn referenced_animated_key_is_deleted_exactly_once_with_the_product() -> TestResult {
        let key = Arc::new(Mutex::new(None::<AssetKey>));
        let uploaded = key.clone();

        let mut store = MockAssetStore::new();

        store.expect_put().once().returning(move |key, _, _| {
            *uploaded.lock().expect("key lock") = Some(key.clone());

            Ok(key)
        });

        let deleted = key.clone();

        store
            .expect_delete()
            .once()
            .withf(move |key| {
                deleted
                    .lock()
                    .map(|uploaded| uploaded.as_ref() == Some(key))
                    .unwrap_or(false)
            })
            .returning(|_| Ok(()));

        let service = CatalogProductsService::new(
            Arc::new(InMemoryProductsRepository::default()),
            Arc::new(store),
        );

        let created = service
            .create_product(
                new_product("TOP-8"),
                AssetUploads::single(AssetSlot::Animated, gif()),
                StorageMode::Referenced,
            )
            .await?;

        let stored = referenced_key(&created, AssetAddress::single(AssetSlot::Animated))
            .ok_or("missing key")?;

        assert!(stored.as_str().starts_with("product-gifs/"));

        service.delete_product(created.uuid).await?;

        Ok(())
    }

    #[tokio::test]
    async fn failed_upload_cleans_up_the_rest_and_persists_nothing() -> TestResult {
        let deletes = Arc::new(Mutex::new(Vec::new()));
        let attempted = deletes.clone();

        let mut store = MockAssetStore::new();

        store.expect_put().times(3).returning(|key, _, _| {
            if key.as_str().starts_with("product-features/") {
                Err(AssetStoreError::Timeout {
                    key,
                    operation: "put",
                })
            } else {
                Ok(key)
            }
        });

        store.expect_delete().times(2).returning(move |key| {
            attempted.lock().expect("deletes lock").push(key);

            Ok(())
        });

        let service = CatalogProductsService::new(
            Arc::new(InMemoryProductsRepository::default()),
            Arc::new(store),
        );

        let result = service
            .create_product(
                new_product("TOP-9"),
                AssetUploads {
                    name_image: Some(upload("name.png", "image/png", b"png")),
                    features_image: Some(upload("features.png", "image/png", b"png")),
                    animated_image: Some(gif()),
                    ..AssetUploads::default()
                },
                StorageMode::Referenced,
            )
            .await;

        let deletes = deletes.lock().map(|keys| keys.clone()).unwrap_or_default();

        assert!(
            matches!(result, Err(ProductsServiceError::AssetStore(_))),
            "expected AssetStore error, got {result:?}"
        );
        assert!(
            deletes
                .iter()
                .all(|key| !key.as_str().starts_with("product-features/"))
        );
        assert!(service.list_products().await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn persist_failure_cleans_up_staged_uploads() {
        let mut repository = MockProductsRepository::new();

        repository
            .expect_product_code_exists()
            .once()
            .with(eq("TOP-10".to_string()))
            .returning(|_| Ok(false));

        repository
            .expect_create_product()
            .once()
            .returning(|_| Err(ProductsRepositoryError::AlreadyExists));

        let mut store = MockAssetStore::new();

        store.expect_put().once().returning(|key, _, _| Ok(key));
        store
            .expect_delete()
            .once()
            .withf(|key| key.as_str().starts_with("product-gifs/"))
            .returning(|_| Ok(()));

        let service = CatalogProductsService::new(Arc::new(repository), Arc::new(store));

        let result = service
            .create_product(
                new_product("TOP-10"),
                AssetUploads::single(AssetSlot::Animated, gif()),
                StorageMode::Referenced,
            )
            .await;

        assert!(
            matches!(result, Err(ProductsServiceError::AlreadyExists)),
            "expected AlreadyExists, got {result:?}"
        );
    }

    #[tokio::test]
    async fn failed_replacement_upload_keeps_the_old_object() -> TestResult {
        let repository = Arc::new(InMemoryProductsRepository::default());

        let mut seed_store = MockAssetStore::new();
        seed_store.expect_put().once().returning(|key, _, _| Ok(key));

        let created = CatalogProductsService::new(repository.clone(), Arc::new(seed_store))
            .create_product(
                new_product("TOP-11"),
                AssetUploads::single(AssetSlot::Animated, gif()),
                StorageMode::Referenced,
            )
            .await?;

        let mut store = MockAssetStore::new();

        store.expect_put().once().returning(|key, _, _| {
            Err(AssetStoreError::Timeout {
                key,
                operation: "put",
            })
        });
        store.expect_delete().never();

        let service = CatalogProductsService::new(repository, Arc::new(store));

        let result = service
            .update_product(
                created.uuid,
                ProductPatch {
                    name: Some("Renamed".to_string()),
                    ..ProductPatch::default()
                },
                AssetUploads::single(AssetSlot::Animated, upload("new.gif", "image/gif", b"new")),
                StorageMode::Referenced,
            )
            .await;

        let current = service.get_product(created.uuid).await?;

        assert!(
            matches!(result, Err(ProductsServiceError::AssetStore(_))),
            "expected AssetStore error, got {result:?}"
        );
        assert_eq!(current, created);

        Ok(())
    }

    #[tokio::test]
    async fn patch_changes_only_the_given_fields() -> TestResult {
        let (_, service) = in_memory_service();

        let created = service
            .create_product(
                new_product("TOP-12"),
                AssetUploads::single(AssetSlot::Animated, gif()),
                StorageMode::Referenced,
            )
            .await?;

        let updated = service
            .update_product(
                created.uuid,
                ProductPatch {
                    price: Some(Decimal::new(999, 2)),
                    previous_price: Some(None),
                    ..ProductPatch::default()
                },
                AssetUploads::default(),
                StorageMode::Referenced,
            )
            .await?;

        assert_eq!(updated.name, created.name);
        assert_eq!(updated.code, created.code);
        assert_eq!(updated.price, Decimal::new(999, 2));
        assert_eq!(updated.previous_price, None);
        assert_eq!(updated.assets, created.assets);

        Ok(())
    }

    #[tokio::test]
    async fn patching_to_an_existing_code_is_rejected() -> TestResult {
        let (_, service) = in_memory_service();

        service
            .create_product(new_product("TAKEN"), AssetUploads::default(), StorageMode::Inline)
            .await?;

        let created = service
            .create_product(new_product("FREE"), AssetUploads::default(), StorageMode::Inline)
            .await?;

        let result = service
            .update_product(
                created.uuid,
                ProductPatch {
                    code: Some("TAKEN".to_string()),
                    ..ProductPatch::default()
                },
                AssetUploads::default(),
                StorageMode::Inline,
            )
            .await;

        assert!(
            matches!(result, Err(ProductsServiceError::AlreadyExists)),
            "expected AlreadyExists, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn missing_name_is_rejected_without_side_effects() {
        let mut store = MockAssetStore::new();

        store.expect_put().never();

        let mut repository = MockProductsRepository::new();

        repository.expect_product_code_exists().never();
        repository.expect_create_product().never();

        let service = CatalogProductsService::new(Arc::new(repository), Arc::new(store));

        let result = service
            .create_product(
                NewProduct {
                    name: String::new(),
                    ..new_product("TOP-13")
                },
                AssetUploads::single(AssetSlot::Animated, gif()),
                StorageMode::Referenced,
            )
            .await;

        assert!(
            matches!(result, Err(ProductsServiceError::MissingRequiredData("name"))),
            "expected MissingRequiredData, got {result:?}"
        );
    }

    #[tokio::test]
    async fn list_returns_products_oldest_first() -> TestResult {
        let (_, service) = in_memory_service();

        let first = service
            .create_product(new_product("A"), AssetUploads::default(), StorageMode::Inline)
            .await?;
        let second = service
            .create_product(new_product("B"), AssetUploads::default(), StorageMode::Inline)
            .await?;

        let uuids: Vec<ProductUuid> = service
            .list_products()
            .await?
            .iter()
            .map(|product| product.uuid)
            .collect();

        assert_eq!(uuids, vec![first.uuid, second.uuid]);

        Ok(())
    }
}
