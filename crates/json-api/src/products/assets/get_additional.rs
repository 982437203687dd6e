//! Get Additional Image Handler

use salvo::{oapi::extract::PathParam, prelude::*};
use uuid::Uuid;

use catalog_app::domain::assets::slots::AssetAddress;

use crate::{
    extensions::*,
    products::{assets::write_blob, errors::into_status_error},
};

/// Get Additional Image
///
/// Raw bytes of the inline additional image at `index`. An index that is not
/// a position in the sequence is not found.
#[endpoint(
    tags("assets"),
    summary = "Get Additional Image",
    responses(
        (status_code = StatusCode::OK, description = "Image bytes"),
        (status_code = StatusCode::NOT_FOUND, description = "Product, index or inline image not found"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(
    product: PathParam<Uuid>,
    index: PathParam<String>,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<StatusCode, StatusError> {
    let index: u16 = index
        .into_inner()
        .parse()
        .map_err(|_ignored| StatusError::not_found().brief("Asset not found"))?;

    let state = depot.state()?;

    let blob = state
        .app
        .products
        .get_asset(
            product.into_inner().into(),
            AssetAddress::additional(index),
        )
        .await
        .map_err(into_status_error)?;

    write_blob(res, blob)
}
