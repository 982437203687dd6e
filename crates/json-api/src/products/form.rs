//! Multipart product forms.

use std::{collections::BTreeMap, str::FromStr};

use bytes::Bytes;
use rust_decimal::Decimal;
use salvo::{
    http::form::{FilePart, FormData},
    prelude::*,
};
use serde::{Deserialize, Deserializer};

use catalog_app::domain::{
    assets::{
        models::{AssetUpload, AssetUploads, StorageMode},
        slots::AssetSlot,
    },
    products::data::{NewProduct, ProductPatch},
};

use crate::{extensions::*, observability};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

const SINGLE_FILE_FIELDS: [(AssetSlot, &str); 3] = [
    (AssetSlot::Name, "name_image"),
    (AssetSlot::Features, "features_image"),
    (AssetSlot::Animated, "animated_image"),
];

const ADDITIONAL_FILES_FIELD: &str = "additional_images";

/// Text fields and files of a parsed multipart request.
#[derive(Debug, Default)]
pub(crate) struct ProductForm {
    fields: BTreeMap<String, String>,
    pub(crate) uploads: AssetUploads,
}

impl ProductForm {
    /// Parse the request body, reading every product file into memory.
    pub(crate) async fn read(
        req: &mut Request,
        max_file_bytes: u64,
    ) -> Result<Self, StatusError> {
        let form = req.form_data().await.or_400("expected a multipart form")?;

        let fields = form
            .fields
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        let mut uploads = AssetUploads::default();

        for (slot, field) in SINGLE_FILE_FIELDS {
            let upload = match files(form, field) {
                [] => None,
                [part] => Some(read_part(part, max_file_bytes).await?),
                _ => {
                    return Err(StatusError::bad_request()
                        .brief(format!("{field} accepts a single file")));
                }
            };

            match slot {
                AssetSlot::Name => uploads.name_image = upload,
                AssetSlot::Features => uploads.features_image = upload,
                AssetSlot::Animated => uploads.animated_image = upload,
                AssetSlot::Additional => {}
            }
        }

        let additional = files(form, ADDITIONAL_FILES_FIELD);

        if !additional.is_empty() {
            let mut images = Vec::with_capacity(additional.len());

            for part in additional {
                images.push(read_part(part, max_file_bytes).await?);
            }

            uploads.additional_images = Some(images);
        }

        uploads
            .check_cardinality()
            .or_400(ADDITIONAL_FILES_FIELD)?;

        Ok(Self { fields, uploads })
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Storage mode for the uploads, `referenced` unless the form says otherwise.
    pub(crate) fn mode(&self) -> Result<StorageMode, StatusError> {
        self.text("mode")
            .map_or(Ok(StorageMode::default()), StorageMode::from_str)
            .or_400("invalid mode")
    }

    /// Fields of a product to create. Absent text fields are left blank for the
    /// service to reject.
    pub(crate) fn new_product(&self) -> Result<NewProduct, StatusError> {
        let text = |name: &str| self.text(name).unwrap_or_default().to_owned();

        let price = self
            .text("price")
            .ok_or_else(|| StatusError::bad_request().brief("Missing required field: price"))?;

        Ok(NewProduct {
            name: text("name"),
            description: text("description"),
            price: parse_decimal(price, "price")?,
            previous_price: self
                .text("previous_price")
                .filter(|value| !value.trim().is_empty())
                .map(|value| parse_decimal(value, "previous_price"))
                .transpose()?,
            code: text("code"),
        })
    }

    /// Field patch carried as JSON in the `patch` part. An absent part patches nothing.
    pub(crate) fn patch(&self) -> Result<ProductPatch, StatusError> {
        let Some(raw) = self.text("patch") else {
            return Ok(ProductPatch::default());
        };

        let request: PatchRequest = serde_json::from_str(raw).or_400("invalid patch")?;

        Ok(request.into())
    }

    /// Record upload sizes once the request is known to be well formed.
    pub(crate) fn observe_uploads(&self, mode: StorageMode) {
        for (slot, upload) in [
            (AssetSlot::Name, &self.uploads.name_image),
            (AssetSlot::Features, &self.uploads.features_image),
            (AssetSlot::Animated, &self.uploads.animated_image),
        ] {
            if let Some(upload) = upload {
                observability::observe_upload(slot.as_str(), mode.as_str(), upload.bytes.len());
            }
        }

        for upload in self.uploads.additional_images.iter().flatten() {
            observability::observe_upload(
                AssetSlot::Additional.as_str(),
                mode.as_str(),
                upload.bytes.len(),
            );
        }
    }
}

fn files<'a>(form: &'a FormData, field: &str) -> &'a [FilePart] {
    form.files.get_vec(field).map_or(&[], Vec::as_slice)
}

/// Read one file part, rejecting it with 413 when it exceeds `max_bytes`.
pub(crate) async fn read_part(
    part: &FilePart,
    max_bytes: u64,
) -> Result<AssetUpload, StatusError> {
    if part.size() > max_bytes {
        return Err(StatusError::payload_too_large()
            .brief(format!("Files may be at most {max_bytes} bytes")));
    }

    let bytes = tokio::fs::read(part.path())
        .await
        .or_500("failed to read uploaded file")?;

    Ok(AssetUpload {
        file_name: part.name().unwrap_or_default().to_owned(),
        content_type: part
            .content_type()
            .map_or_else(|| DEFAULT_CONTENT_TYPE.to_owned(), |mime| mime.to_string()),
        bytes: Bytes::from(bytes),
    })
}

fn parse_decimal(value: &str, field: &'static str) -> Result<Decimal, StatusError> {
    Decimal::from_str(value.trim()).map_err(|_ignored| {
        StatusError::bad_request().brief(format!("Invalid value for field: {field}"))
    })
}

/// JSON body of the `patch` part.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PatchRequest {
    name: Option<String>,
    description: Option<String>,
    price: Option<Decimal>,
    #[serde(default, deserialize_with = "present")]
    previous_price: Option<Option<Decimal>>,
    code: Option<String>,
}

/// Distinguish an explicit `null` (clear) from an absent key (keep).
fn present<'de, D>(deserializer: D) -> Result<Option<Option<Decimal>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Decimal>::deserialize(deserializer).map(Some)
}

impl From<PatchRequest> for ProductPatch {
    fn from(request: PatchRequest) -> Self {
        Self {
            name: request.name,
            description: request.description,
            price: request.price,
            previous_price: request.previous_price,
            code: request.code,
        }
    }
}
