//! Product Records

use jiff::Timestamp;
use rust_decimal::Decimal;
use smallvec::SmallVec;

use crate::{
    domain::assets::models::{AssetKey, ProductAssets},
    uuids::TypedUuid,
};

/// Product UUID
pub type ProductUuid = TypedUuid<ProductRecord>;

/// Product Record
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    pub uuid: ProductUuid,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub previous_price: Option<Decimal>,
    pub code: String,
    pub assets: ProductAssets,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Result of a committed update.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatedProduct {
    pub product: ProductRecord,

    /// Object store keys no longer referenced once the update committed.
    pub superseded: SmallVec<[AssetKey; 4]>,
}
