//! Product response projections.

use rust_decimal::Decimal;
use salvo::oapi::ToSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use catalog_app::domain::{
    assets::{
        models::AssetLocator,
        slots::{AssetAddress, AssetSlot},
    },
    products::records::{ProductRecord, ProductUuid},
};

/// Product Response
///
/// Each asset field holds the object store key of a referenced asset. Inline
/// assets are rendered as the catalog path serving their bytes on a single
/// product, and as `null` in the product list.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct ProductResponse {
    pub uuid: Uuid,
    pub name: String,
    pub description: String,
    #[salvo(schema(value_type = f64))]
    pub price: Decimal,
    #[salvo(schema(value_type = Option<f64>))]
    pub previous_price: Option<Decimal>,
    pub code: String,
    pub name_image: Option<String>,
    pub features_image: Option<String>,
    pub animated_image: Option<String>,
    pub additional_images: Vec<Option<String>>,
    pub created_at: String,
    pub updated_at: String,
}

impl ProductResponse {
    /// Projection used in the product list, leaving inline assets unresolved.
    pub(crate) fn listed(record: ProductRecord) -> Self {
        Self::project(record, |locator| match locator {
            AssetLocator::Reference(key) => Some(key.into_string()),
            AssetLocator::Retrieval { .. } => None,
        })
    }

    fn project(record: ProductRecord, render: fn(AssetLocator) -> Option<String>) -> Self {
        let uuid = record.uuid;
        let single = |slot| {
            record
                .assets
                .locate(uuid, AssetAddress::single(slot))
                .and_then(render)
        };

        let name_image = single(AssetSlot::Name);
        let features_image = single(AssetSlot::Features);
        let animated_image = single(AssetSlot::Animated);

        let additional_images = record
            .assets
            .iter()
            .filter(|(address, _)| address.slot == AssetSlot::Additional)
            .map(|(address, asset)| render(asset.locate(uuid, address)))
            .collect();

        Self {
            uuid: uuid.into_uuid(),
            name: record.name,
            description: record.description,
            price: record.price,
            previous_price: record.previous_price,
            code: record.code,
            name_image,
            features_image,
            animated_image,
            additional_images,
            created_at: record.created_at.to_string(),
            updated_at: record.updated_at.to_string(),
        }
    }
}

impl From<ProductRecord> for ProductResponse {
    fn from(record: ProductRecord) -> Self {
        Self::project(record, |locator| match locator {
            AssetLocator::Reference(key) => Some(key.into_string()),
            AssetLocator::Retrieval { product, address } => Some(asset_path(product, address)),
        })
    }
}

/// Products Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct ProductsResponse {
    pub products: Vec<ProductResponse>,
}

impl FromIterator<ProductRecord> for ProductsResponse {
    fn from_iter<I: IntoIterator<Item = ProductRecord>>(iter: I) -> Self {
        Self {
            products: iter.into_iter().map(ProductResponse::listed).collect(),
        }
    }
}

/// Path serving the bytes of an inline asset.
pub(crate) fn asset_path(product: ProductUuid, address: AssetAddress) -> String {
    if address.slot.is_single() {
        format!("/products/{product}/asset/{}", address.slot)
    } else {
        format!("/products/{product}/asset/additional/{}", address.index)
    }
}
