//! Products Data

use rust_decimal::Decimal;
use smallvec::SmallVec;

use crate::domain::{
    assets::{models::NewAsset, slots::AssetSlot},
    products::{errors::ProductsServiceError, records::ProductUuid},
};

/// New Product Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub previous_price: Option<Decimal>,
    pub code: String,
}

impl NewProduct {
    /// Check required fields and price bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ProductsServiceError::MissingRequiredData`] for a blank text
    /// field and [`ProductsServiceError::InvalidData`] for a price that is
    /// negative, has more than two decimal places or exceeds the stored range.
    pub fn validate(&self) -> Result<(), ProductsServiceError> {
        require_text("name", &self.name)?;
        require_text("description", &self.description)?;
        require_text("code", &self.code)?;
        require_price("price", self.price)?;

        if let Some(previous_price) = self.previous_price {
            require_price("previous_price", previous_price)?;
        }

        Ok(())
    }
}

/// Partial product update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,

    /// `Some(None)` clears the previous price.
    pub previous_price: Option<Option<Decimal>>,
    pub code: Option<String>,
}

impl ProductPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Check the fields being changed.
    ///
    /// # Errors
    ///
    /// Same rules as [`NewProduct::validate`], applied to present fields only.
    pub fn validate(&self) -> Result<(), ProductsServiceError> {
        if let Some(name) = &self.name {
            require_text("name", name)?;
        }

        if let Some(description) = &self.description {
            require_text("description", description)?;
        }

        if let Some(code) = &self.code {
            require_text("code", code)?;
        }

        if let Some(price) = self.price {
            require_price("price", price)?;
        }

        if let Some(Some(previous_price)) = self.previous_price {
            require_price("previous_price", previous_price)?;
        }

        Ok(())
    }
}

/// Product and staged assets, ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProductRecord {
    pub uuid: ProductUuid,
    pub product: NewProduct,
    pub assets: Vec<NewAsset>,
}

/// Field patch plus slot replacements applied in one transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductChanges {
    pub patch: ProductPatch,

    /// Slots whose current contents are removed before `assets` are written.
    pub replaced_slots: SmallVec<[AssetSlot; 4]>,
    pub assets: Vec<NewAsset>,
}

fn require_text(field: &'static str, value: &str) -> Result<(), ProductsServiceError> {
    if value.trim().is_empty() {
        return Err(ProductsServiceError::MissingRequiredData(field));
    }

    Ok(())
}

/// Decimal places kept by the `NUMERIC(12, 2)` price columns.
const PRICE_SCALE: u32 = 2;

/// Integer digits kept by the `NUMERIC(12, 2)` price columns.
const PRICE_INTEGER_DIGITS: u32 = 10;

fn require_price(field: &'static str, value: Decimal) -> Result<(), ProductsServiceError> {
    let upper = Decimal::from(10_i64.pow(PRICE_INTEGER_DIGITS));

    if value < Decimal::ZERO || value >= upper || value.normalize().scale() > PRICE_SCALE {
        return Err(ProductsServiceError::InvalidData(field));
    }

    Ok(())
}
