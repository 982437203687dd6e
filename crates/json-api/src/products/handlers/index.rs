//! Product Index Handler

use salvo::prelude::*;

use crate::{
    extensions::*,
    products::{errors::into_status_error, responses::ProductsResponse},
};

/// List Products
///
/// Every product, oldest first. Referenced assets are reported as object
/// store keys. Inline assets are `null` and fetched per product and slot.
#[endpoint(
    tags("products"),
    summary = "List Products",
    responses(
        (status_code = StatusCode::OK, description = "Products"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(depot: &mut Depot) -> Result<Json<ProductsResponse>, StatusError> {
    let state = depot.state()?;

    let products = state
        .app
        .products
        .list_products()
        .await
        .map_err(into_status_error)?;

    Ok(Json(products.into_iter().collect()))
}
