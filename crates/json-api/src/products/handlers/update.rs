//! Update Product Handler

use salvo::{oapi::extract::PathParam, prelude::*};
use tracing::{Span, field::display, info};
use uuid::Uuid;

use crate::{
    extensions::*,
    products::{errors::into_status_error, form::ProductForm, responses::ProductResponse},
};

/// Update Product
///
/// Multipart form with an optional `patch` part holding a JSON object of the
/// fields to change, an optional `mode`, and any of the product file fields.
/// Each file field present replaces that whole slot.
#[endpoint(
    tags("products"),
    summary = "Update Product",
    responses(
        (status_code = StatusCode::OK, description = "Product updated"),
        (status_code = StatusCode::BAD_REQUEST, description = "Invalid patch or files"),
        (status_code = StatusCode::NOT_FOUND, description = "Product not found"),
        (status_code = StatusCode::CONFLICT, description = "Product code already exists"),
        (status_code = StatusCode::PAYLOAD_TOO_LARGE, description = "Uploaded file too large"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Asset store or database failure"),
    ),
)]
#[tracing::instrument(
    name = "products.update",
    skip(product, req, depot),
    fields(
        product_uuid = tracing::field::Empty,
        mode = tracing::field::Empty,
        replaced_slots = tracing::field::Empty
    ),
    err
)]
pub(crate) async fn handler(
    product: PathParam<Uuid>,
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<ProductResponse>, StatusError> {
    let state = depot.state()?;
    let product = product.into_inner();
    let form = ProductForm::read(req, state.max_upload_bytes).await?;
    let mode = form.mode()?;
    let patch = form.patch()?;

    let span = Span::current();

    span.record("product_uuid", display(product));
    span.record("mode", mode.as_str());
    span.record("replaced_slots", form.uploads.replaced_slots().len());

    form.observe_uploads(mode);

    let updated = state
        .app
        .products
        .update_product(product.into(), patch, form.uploads, mode)
        .await
        .map_err(into_status_error)?;

    info!(product_uuid = %product, "updated product");

    Ok(Json(updated.into()))
}
