//! Replace Product Asset Handler

use salvo::{oapi::extract::PathParam, prelude::*};
use tracing::{Span, field::display, info};
use uuid::Uuid;

use catalog_app::domain::{
    assets::models::{AssetUploads, StorageMode},
    products::data::ProductPatch,
};

use crate::{
    extensions::*,
    observability,
    products::{
        assets::single_slot,
        errors::into_status_error,
        form::read_part,
        responses::ProductResponse,
    },
};

const FILE_FIELD: &str = "file";

/// Replace Product Asset
///
/// Multipart form with a `file` and an optional `mode`. The previous object,
/// if the slot was referenced, is deleted once the new asset is saved.
#[endpoint(
    tags("assets"),
    summary = "Replace Product Asset",
    responses(
        (status_code = StatusCode::OK, description = "Asset replaced"),
        (status_code = StatusCode::BAD_REQUEST, description = "Missing file or invalid mode"),
        (status_code = StatusCode::NOT_FOUND, description = "Product or slot not found"),
        (status_code = StatusCode::PAYLOAD_TOO_LARGE, description = "Uploaded file too large"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Asset store or database failure"),
    ),
)]
#[tracing::instrument(
    name = "products.assets.replace",
    skip(product, slot, req, depot),
    fields(
        product_uuid = tracing::field::Empty,
        slot = tracing::field::Empty,
        mode = tracing::field::Empty
    ),
    err
)]
pub(crate) async fn handler(
    product: PathParam<Uuid>,
    slot: PathParam<String>,
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<ProductResponse>, StatusError> {
    let state = depot.state()?;
    let product = product.into_inner();
    let slot = single_slot(&slot.into_inner())?;

    let form = req.form_data().await.or_400("expected a multipart form")?;

    let mode = form
        .fields
        .get("mode")
        .map_or(Ok(StorageMode::default()), |mode| mode.parse())
        .or_400("invalid mode")?;

    let part = form
        .files
        .get(FILE_FIELD)
        .ok_or_else(|| StatusError::bad_request().brief("Missing file part"))?;

    let upload = read_part(part, state.max_upload_bytes).await?;

    let span = Span::current();

    span.record("product_uuid", display(product));
    span.record("slot", slot.as_str());
    span.record("mode", mode.as_str());

    observability::observe_upload(slot.as_str(), mode.as_str(), upload.bytes.len());

    let updated = state
        .app
        .products
        .update_product(
            product.into(),
            ProductPatch::default(),
            AssetUploads::single(slot, upload),
            mode,
        )
        .await
        .map_err(into_status_error)?;

    info!(product_uuid = %product, %slot, "replaced product asset");

    Ok(Json(updated.into()))
}
