//! Product Errors

use salvo::http::StatusError;
use tracing::{error, warn};

use catalog_app::domain::products::ProductsServiceError;

pub(crate) fn into_status_error(error: ProductsServiceError) -> StatusError {
    match error {
        ProductsServiceError::AlreadyExists => {
            StatusError::conflict().brief("A product with this code already exists")
        }
        ProductsServiceError::NotFound => StatusError::not_found(),
        ProductsServiceError::MissingRequiredData(field) => {
            StatusError::bad_request().brief(format!("Missing required field: {field}"))
        }
        ProductsServiceError::InvalidData(field) => {
            StatusError::bad_request().brief(format!("Invalid value for field: {field}"))
        }
        ProductsServiceError::AssetStore(source) => {
            error!(key = %source.key(), "asset store write failed: {source}");

            StatusError::internal_server_error().brief("Failed to store product asset")
        }
        ProductsServiceError::Sql(source) => {
            warn!("product query failed: {source}");

            StatusError::internal_server_error()
        }
    }
}
