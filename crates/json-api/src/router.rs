//! App Router

use salvo::{
    Router,
    size_limiter::{MaxSize, max_size},
};

use catalog_app::domain::assets::slots::MAX_ADDITIONAL_IMAGES;

use crate::{healthcheck, products};

/// Files a product form may carry: the three single slots plus additional images.
const MAX_FORM_FILES: u64 = 3 + MAX_ADDITIONAL_IMAGES as u64;

/// Allowance for text fields and multipart framing.
const FORM_OVERHEAD_BYTES: u64 = 64 * 1024;

/// Reject request bodies larger than a full product form before they are spooled.
pub(crate) fn request_size_limit(max_file_bytes: u64) -> MaxSize {
    max_size(
        max_file_bytes
            .saturating_mul(MAX_FORM_FILES)
            .saturating_add(FORM_OVERHEAD_BYTES),
    )
}

/// Product and asset routes.
pub(crate) fn app_router() -> Router {
    Router::new()
        .push(Router::with_path("healthcheck").get(healthcheck::handler))
        .push(
            Router::with_path("products")
                .get(products::index::handler)
                .post(products::create::handler)
                .push(
                    Router::with_path("{product}")
                        .get(products::get::handler)
                        .put(products::update::handler)
                        .delete(products::delete::handler)
                        .push(
                            Router::with_path("asset/additional/{index}")
                                .get(products::assets::get_additional::handler),
                        )
                        .push(
                            Router::with_path("asset/{slot}")
                                .get(products::assets::get::handler)
                                .put(products::assets::replace::handler),
                        ),
                ),
        )
}
