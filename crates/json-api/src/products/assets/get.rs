//! Get Product Asset Handler

use salvo::{oapi::extract::PathParam, prelude::*};
use uuid::Uuid;

use catalog_app::domain::assets::slots::AssetAddress;

use crate::{
    extensions::*,
    products::{
        assets::{single_slot, write_blob},
        errors::into_status_error,
    },
};

/// Get Product Asset
///
/// Raw bytes of the inline asset in `name`, `features` or `animated`.
/// Referenced assets live in the object store and are not served here.
#[endpoint(
    tags("assets"),
    summary = "Get Product Asset",
    responses(
        (status_code = StatusCode::OK, description = "Asset bytes"),
        (status_code = StatusCode::NOT_FOUND, description = "Product, slot or inline asset not found"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(
    product: PathParam<Uuid>,
    slot: PathParam<String>,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<StatusCode, StatusError> {
    let state = depot.state()?;
    let slot = single_slot(&slot.into_inner())?;

    let blob = state
        .app
        .products
        .get_asset(product.into_inner().into(), AssetAddress::single(slot))
        .await
        .map_err(into_status_error)?;

    write_blob(res, blob)
}
