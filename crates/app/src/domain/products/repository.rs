//! Products Repository

use async_trait::async_trait;
use bytes::Bytes;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use mockall::automock;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use sqlx::{
    FromRow, PgConnection, PgPool, Postgres, Row, postgres::PgRow, query, query_as, query_scalar,
};

use crate::domain::{
    assets::{
        models::{AssetBlob, AssetBody, AssetKey, NewAsset, ProductAssets, StoredAsset},
        slots::{AssetAddress, AssetSlot},
    },
    products::{
        data::{NewProductRecord, ProductChanges},
        errors::ProductsRepositoryError,
        records::{ProductRecord, ProductUuid, UpdatedProduct},
    },
};

const LIST_PRODUCTS_SQL: &str = include_str!("sql/list_products.sql");
const LIST_PRODUCT_ASSETS_SQL: &str = include_str!("sql/list_product_assets.sql");
const GET_PRODUCT_SQL: &str = include_str!("sql/get_product.sql");
const GET_PRODUCT_ASSETS_SQL: &str = include_str!("sql/get_product_assets.sql");
const PRODUCT_CODE_EXISTS_SQL: &str = include_str!("sql/product_code_exists.sql");
const GET_ASSET_DATA_SQL: &str = include_str!("sql/get_asset_data.sql");
const CREATE_PRODUCT_SQL: &str = include_str!("sql/create_product.sql");
const CREATE_PRODUCT_ASSET_SQL: &str = include_str!("sql/create_product_asset.sql");
const LOCK_PRODUCT_SQL: &str = include_str!("sql/lock_product.sql");
const UPDATE_PRODUCT_SQL: &str = include_str!("sql/update_product.sql");
const DELETE_PRODUCT_SLOT_SQL: &str = include_str!("sql/delete_product_slot.sql");
const REFERENCED_ASSET_KEYS_SQL: &str = include_str!("sql/referenced_asset_keys.sql");
const DELETE_PRODUCT_SQL: &str = include_str!("sql/delete_product.sql");

#[derive(Debug, Clone)]
pub struct PgProductsRepository {
    pool: PgPool,
}

impl PgProductsRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductsRepository for PgProductsRepository {
    async fn list_products(&self) -> Result<Vec<ProductRecord>, ProductsRepositoryError> {
        let mut tx = self.pool.begin().await?;

        let mut products = query_as::<Postgres, ProductRecord>(LIST_PRODUCTS_SQL)
            .fetch_all(&mut *tx)
            .await?;

        let rows = query_as::<Postgres, AssetRow>(LIST_PRODUCT_ASSETS_SQL)
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;

        let mut assets: FxHashMap<ProductUuid, ProductAssets> = FxHashMap::default();

        for row in rows {
            let (product, address, asset) = row.into_parts()?;

            assets.entry(product).or_default().place(address, asset);
        }

        for product in &mut products {
            if let Some(found) = assets.remove(&product.uuid) {
                product.assets = found;
            }
        }

        Ok(products)
    }

    async fn get_product(
        &self,
        product: ProductUuid,
    ) -> Result<ProductRecord, ProductsRepositoryError> {
        let mut tx = self.pool.begin().await?;

        let mut record = query_as::<Postgres, ProductRecord>(GET_PRODUCT_SQL)
            .bind(product)
            .fetch_one(&mut *tx)
            .await?;

        record.assets = fetch_assets(&mut tx, product).await?;

        tx.commit().await?;

        Ok(record)
    }

    async fn product_code_exists(&self, code: String) -> Result<bool, ProductsRepositoryError> {
        let exists = query_scalar::<Postgres, bool>(PRODUCT_CODE_EXISTS_SQL)
            .bind(code)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    async fn get_asset(
        &self,
        product: ProductUuid,
        address: AssetAddress,
    ) -> Result<Option<AssetBlob>, ProductsRepositoryError> {
        let row: Option<(String, Vec<u8>)> = query_as(GET_ASSET_DATA_SQL)
            .bind(product)
            .bind(address.slot.as_str())
            .bind(i32::from(address.index))
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(content_type, data)| AssetBlob {
            content_type,
            bytes: Bytes::from(data),
        }))
    }

    async fn create_product(
        &self,
        record: NewProductRecord,
    ) -> Result<ProductRecord, ProductsRepositoryError> {
        let NewProductRecord {
            uuid,
            product,
            assets,
        } = record;

        let mut tx = self.pool.begin().await?;

        let mut created = query_as::<Postgres, ProductRecord>(CREATE_PRODUCT_SQL)
            .bind(uuid)
            .bind(product.name)
            .bind(product.description)
            .bind(product.price)
            .bind(product.previous_price)
            .bind(product.code)
            .fetch_one(&mut *tx)
            .await?;

        for asset in &assets {
            insert_asset(&mut tx, uuid, asset).await?;

            created.assets.place(asset.address, asset.to_stored());
        }

        tx.commit().await?;

        Ok(created)
    }

    async fn update_product(
        &self,
        product: ProductUuid,
        changes: ProductChanges,
    ) -> Result<UpdatedProduct, ProductsRepositoryError> {
        let ProductChanges {
            patch,
            replaced_slots,
            assets,
        } = changes;

        let mut tx = self.pool.begin().await?;

        let locked: Option<ProductUuid> = query_scalar(LOCK_PRODUCT_SQL)
            .bind(product)
            .fetch_optional(&mut *tx)
            .await?;

        if locked.is_none() {
            return Err(ProductsRepositoryError::NotFound);
        }

        let mut superseded = SmallVec::new();

        for slot in replaced_slots {
            let keys: Vec<Option<String>> = query_scalar(DELETE_PRODUCT_SLOT_SQL)
                .bind(product)
                .bind(slot.as_str())
                .fetch_all(&mut *tx)
                .await?;

            superseded.extend(keys.into_iter().flatten().map(AssetKey::from));
        }

        for asset in &assets {
            insert_asset(&mut tx, product, asset).await?;
        }

        let mut updated = query_as::<Postgres, ProductRecord>(UPDATE_PRODUCT_SQL)
            .bind(product)
            .bind(patch.name)
            .bind(patch.description)
            .bind(patch.price)
            .bind(patch.previous_price.is_some())
            .bind(patch.previous_price.flatten())
            .bind(patch.code)
            .fetch_one(&mut *tx)
            .await?;

        updated.assets = fetch_assets(&mut tx, product).await?;

        tx.commit().await?;

        Ok(UpdatedProduct {
            product: updated,
            superseded,
        })
    }

    async fn delete_product(
        &self,
        product: ProductUuid,
    ) -> Result<SmallVec<[AssetKey; 4]>, ProductsRepositoryError> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<ProductUuid> = query_scalar(LOCK_PRODUCT_SQL)
            .bind(product)
            .fetch_optional(&mut *tx)
            .await?;

        if locked.is_none() {
            return Err(ProductsRepositoryError::NotFound);
        }

        let keys: Vec<String> = query_scalar(REFERENCED_ASSET_KEYS_SQL)
            .bind(product)
            .fetch_all(&mut *tx)
            .await?;

        let rows_affected = query(DELETE_PRODUCT_SQL)
            .bind(product)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if rows_affected == 0 {
            return Err(ProductsRepositoryError::NotFound);
        }

        tx.commit().await?;

        Ok(keys.into_iter().map(AssetKey::from).collect())
    }
}

/// Product persistence, including asset slot rows.
#[automock]
#[async_trait]
pub trait ProductsRepository: Send + Sync {
    /// Every product with asset metadata, oldest first. Inline bytes are not loaded.
    async fn list_products(&self) -> Result<Vec<ProductRecord>, ProductsRepositoryError>;

    /// A single product with asset metadata.
    async fn get_product(
        &self,
        product: ProductUuid,
    ) -> Result<ProductRecord, ProductsRepositoryError>;

    async fn product_code_exists(&self, code: String) -> Result<bool, ProductsRepositoryError>;

    /// Inline bytes stored at `address`, if that position holds an inline asset.
    async fn get_asset(
        &self,
        product: ProductUuid,
        address: AssetAddress,
    ) -> Result<Option<AssetBlob>, ProductsRepositoryError>;

    /// Insert a product and its asset rows in one transaction.
    async fn create_product(
        &self,
        record: NewProductRecord,
    ) -> Result<ProductRecord, ProductsRepositoryError>;

    /// Apply a field patch and replace slots in one transaction, returning
    /// the referenced keys of the rows that were replaced.
    async fn update_product(
        &self,
        product: ProductUuid,
        changes: ProductChanges,
    ) -> Result<UpdatedProduct, ProductsRepositoryError>;

    /// Delete a product and its asset rows, returning every referenced key.
    async fn delete_product(
        &self,
        product: ProductUuid,
    ) -> Result<SmallVec<[AssetKey; 4]>, ProductsRepositoryError>;
}

async fn insert_asset(
    conn: &mut PgConnection,
    product: ProductUuid,
    asset: &NewAsset,
) -> Result<(), sqlx::Error> {
    let (object_key, data): (Option<&str>, Option<&[u8]>) = match &asset.body {
        AssetBody::Inline(bytes) => (None, Some(bytes.as_ref())),
        AssetBody::Referenced(key) => (Some(key.as_str()), None),
    };

    query(CREATE_PRODUCT_ASSET_SQL)
        .bind(product)
        .bind(asset.address.slot.as_str())
        .bind(i32::from(asset.address.index))
        .bind(object_key)
        .bind(&asset.content_type)
        .bind(data)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

async fn fetch_assets(
    conn: &mut PgConnection,
    product: ProductUuid,
) -> Result<ProductAssets, sqlx::Error> {
    let rows = query_as::<Postgres, AssetRow>(GET_PRODUCT_ASSETS_SQL)
        .bind(product)
        .fetch_all(&mut *conn)
        .await?;

    let mut assets = ProductAssets::default();

    for row in rows {
        let (_, address, asset) = row.into_parts()?;

        assets.place(address, asset);
    }

    Ok(assets)
}

struct AssetRow {
    product_uuid: ProductUuid,
    slot: String,
    position: i32,
    object_key: Option<String>,
    content_type: String,
}

impl AssetRow {
    fn into_parts(self) -> Result<(ProductUuid, AssetAddress, StoredAsset), sqlx::Error> {
        let slot: AssetSlot = self.slot.parse().map_err(|e| sqlx::Error::ColumnDecode {
            index: "slot".to_string(),
            source: Box::new(e),
        })?;

        let index = u16::try_from(self.position).map_err(|e| sqlx::Error::ColumnDecode {
            index: "position".to_string(),
            source: Box::new(e),
        })?;

        let asset = match self.object_key {
            Some(key) => StoredAsset::Referenced {
                key: AssetKey::from(key),
                content_type: self.content_type,
            },
            None => StoredAsset::Inline {
                content_type: self.content_type,
            },
        };

        Ok((
            self.product_uuid,
            AssetAddress { slot, index },
            asset,
        ))
    }
}

impl<'r> FromRow<'r, PgRow> for AssetRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            product_uuid: row.try_get("product_uuid")?,
            slot: row.try_get("slot")?,
            position: row.try_get("position")?,
            object_key: row.try_get("object_key")?,
            content_type: row.try_get("content_type")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for ProductRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: row.try_get("uuid")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: row.try_get("price")?,
            previous_price: row.try_get("previous_price")?,
            code: row.try_get("code")?,
            assets: ProductAssets::default(),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}
