//! Create Product Handler

use salvo::{http::header::LOCATION, prelude::*};
use tracing::{Span, field::display, info};

use crate::{
    extensions::*,
    products::{errors::into_status_error, form::ProductForm, responses::ProductResponse},
};

/// Create Product
///
/// Multipart form with `name`, `description`, `price`, optional
/// `previous_price`, `code` and `mode` (`inline` or `referenced`), plus
/// optional `name_image`, `features_image`, `animated_image` and up to ten
/// `additional_images` files.
#[endpoint(
    tags("products"),
    summary = "Create Product",
    responses(
        (status_code = StatusCode::CREATED, description = "Product created"),
        (status_code = StatusCode::BAD_REQUEST, description = "Invalid product fields or files"),
        (status_code = StatusCode::CONFLICT, description = "Product code already exists"),
        (status_code = StatusCode::PAYLOAD_TOO_LARGE, description = "Uploaded file too large"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Asset store or database failure"),
    ),
)]
#[tracing::instrument(
    name = "products.create",
    skip(req, depot, res),
    fields(
        product_uuid = tracing::field::Empty,
        code = tracing::field::Empty,
        mode = tracing::field::Empty
    ),
    err
)]
pub(crate) async fn handler(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<ProductResponse>, StatusError> {
    let state = depot.state()?;
    let form = ProductForm::read(req, state.max_upload_bytes).await?;
    let mode = form.mode()?;
    let product = form.new_product()?;

    let span = Span::current();

    span.record("code", display(&product.code));
    span.record("mode", mode.as_str());

    form.observe_uploads(mode);

    let created = state
        .app
        .products
        .create_product(product, form.uploads, mode)
        .await
        .map_err(into_status_error)?;

    span.record("product_uuid", display(created.uuid));

    res.add_header(LOCATION, format!("/products/{}", created.uuid), true)
        .or_500("failed to set location header")?
        .status_code(StatusCode::CREATED);

    info!(product_uuid = %created.uuid, "created product");

    Ok(Json(created.into()))
}
