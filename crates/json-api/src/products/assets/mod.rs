//! Product asset handlers.

use salvo::{
    http::header::{CONTENT_TYPE, HeaderValue},
    prelude::*,
};

use catalog_app::domain::assets::{models::AssetBlob, slots::AssetSlot};

use crate::extensions::*;

pub(crate) mod get;
pub(crate) mod get_additional;
pub(crate) mod replace;

/// Resolve a `{slot}` path segment naming a single-asset slot.
fn single_slot(segment: &str) -> Result<AssetSlot, StatusError> {
    segment
        .parse::<AssetSlot>()
        .ok()
        .filter(|slot| slot.is_single())
        .ok_or_else(|| StatusError::not_found().brief(format!("No asset slot named {segment}")))
}

fn write_blob(res: &mut Response, blob: AssetBlob) -> Result<StatusCode, StatusError> {
    let content_type = HeaderValue::from_str(&blob.content_type)
        .or_500("stored content type is not a header value")?;

    res.headers_mut().insert(CONTENT_TYPE, content_type);
    res.write_body(blob.bytes).or_500("failed to write asset body")?;

    Ok(StatusCode::OK)
}
