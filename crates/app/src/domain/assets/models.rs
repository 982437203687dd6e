//! Asset Models
//!
//! Every populated slot position holds exactly one [`StoredAsset`]: either the
//! bytes live inline in the product record, or the record keeps an
//! [`AssetKey`] pointing into the object store. An empty position has no
//! entry at all.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use bytes::Bytes;
use jiff::Timestamp;
use smallvec::SmallVec;
use thiserror::Error;

use crate::domain::{
    assets::slots::{AssetAddress, AssetSlot, MAX_ADDITIONAL_IMAGES},
    products::records::ProductUuid,
};

/// Object store key, persisted as the durable reference to an uploaded asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetKey(String);

impl AssetKey {
    /// Build a key of the form `{category}/{unix-millis}-{file name}`.
    ///
    /// Additional images also carry their position, since a whole sequence is
    /// uploaded within the same millisecond.
    #[must_use]
    pub fn generate(address: AssetAddress, at: Timestamp, file_name: &str) -> Self {
        let category = address.slot.key_category();
        let millis = at.as_millisecond();
        let file_name = sanitise_file_name(file_name);

        if address.slot.is_single() {
            Self(format!("{category}/{millis}-{file_name}"))
        } else {
            Self(format!("{category}/{millis}-{}-{file_name}", address.index))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for AssetKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for AssetKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Display for AssetKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// Keep keys within characters object stores accept without percent-encoding,
/// so the persisted key is the stored location.
fn sanitise_file_name(file_name: &str) -> String {
    let cleaned: String = file_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.chars().all(|c| c == '.') {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// Where newly uploaded asset bytes should be kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageMode {
    /// Bytes stored inside the product record.
    Inline,

    /// Bytes uploaded to the object store, key stored in the record.
    #[default]
    Referenced,
}

impl StorageMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::Referenced => "referenced",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown storage mode: {0}")]
pub struct UnknownStorageMode(pub String);

impl FromStr for StorageMode {
    type Err = UnknownStorageMode;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "inline" => Ok(Self::Inline),
            "referenced" => Ok(Self::Referenced),
            other => Err(UnknownStorageMode(other.to_string())),
        }
    }
}

/// A file received from a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Raw asset bytes with their content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetBlob {
    pub content_type: String,
    pub bytes: Bytes,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("at most {MAX_ADDITIONAL_IMAGES} additional images are allowed, got {0}")]
pub struct TooManyAdditionalImages(pub usize);

/// Optional upload per asset slot.
///
/// `None` leaves a slot untouched on update. `Some` replaces the whole slot,
/// including the full additional images sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetUploads {
    pub name_image: Option<AssetUpload>,
    pub features_image: Option<AssetUpload>,
    pub animated_image: Option<AssetUpload>,
    pub additional_images: Option<Vec<AssetUpload>>,
}

impl AssetUploads {
    /// Uploads replacing a single-asset slot only.
    #[must_use]
    pub fn single(slot: AssetSlot, upload: AssetUpload) -> Self {
        let mut uploads = Self::default();

        match slot {
            AssetSlot::Name => uploads.name_image = Some(upload),
            AssetSlot::Features => uploads.features_image = Some(upload),
            AssetSlot::Animated => uploads.animated_image = Some(upload),
            AssetSlot::Additional => uploads.additional_images = Some(vec![upload]),
        }

        uploads
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.replaced_slots().is_empty()
    }

    /// Slots these uploads replace.
    #[must_use]
    pub fn replaced_slots(&self) -> SmallVec<[AssetSlot; 4]> {
        let mut slots = SmallVec::new();

        if self.name_image.is_some() {
            slots.push(AssetSlot::Name);
        }

        if self.features_image.is_some() {
            slots.push(AssetSlot::Features);
        }

        if self.animated_image.is_some() {
            slots.push(AssetSlot::Animated);
        }

        if self.additional_images.is_some() {
            slots.push(AssetSlot::Additional);
        }

        slots
    }

    /// Check the additional images cardinality.
    ///
    /// # Errors
    ///
    /// Returns an error when more than [`MAX_ADDITIONAL_IMAGES`] are present.
    pub fn check_cardinality(&self) -> Result<(), TooManyAdditionalImages> {
        match &self.additional_images {
            Some(images) if images.len() > MAX_ADDITIONAL_IMAGES => {
                Err(TooManyAdditionalImages(images.len()))
            }
            _ => Ok(()),
        }
    }

    /// Flatten into one entry per slot position.
    #[must_use]
    pub fn into_entries(self) -> Vec<(AssetAddress, AssetUpload)> {
        let singles = [
            (AssetSlot::Name, self.name_image),
            (AssetSlot::Features, self.features_image),
            (AssetSlot::Animated, self.animated_image),
        ]
        .into_iter()
        .filter_map(|(slot, upload)| upload.map(|upload| (AssetAddress::single(slot), upload)));

        let additional = self
            .additional_images
            .unwrap_or_default()
            .into_iter()
            .zip(0_u16..)
            .map(|(upload, index)| (AssetAddress::additional(index), upload));

        singles.chain(additional).collect()
    }
}

/// Asset contents ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetBody {
    Inline(Bytes),
    Referenced(AssetKey),
}

/// Asset row to be written alongside a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAsset {
    pub address: AssetAddress,
    pub content_type: String,
    pub body: AssetBody,
}

impl NewAsset {
    #[must_use]
    pub fn referenced_key(&self) -> Option<&AssetKey> {
        match &self.body {
            AssetBody::Referenced(key) => Some(key),
            AssetBody::Inline(_) => None,
        }
    }

    /// Metadata view of this asset once persisted.
    #[must_use]
    pub fn to_stored(&self) -> StoredAsset {
        match &self.body {
            AssetBody::Inline(_) => StoredAsset::Inline {
                content_type: self.content_type.clone(),
            },
            AssetBody::Referenced(key) => StoredAsset::Referenced {
                key: key.clone(),
                content_type: self.content_type.clone(),
            },
        }
    }
}

/// Persisted asset metadata, without inline bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredAsset {
    Inline { content_type: String },
    Referenced { key: AssetKey, content_type: String },
}

impl StoredAsset {
    #[must_use]
    pub fn referenced_key(&self) -> Option<&AssetKey> {
        match self {
            Self::Referenced { key, .. } => Some(key),
            Self::Inline { .. } => None,
        }
    }

    /// Resolve how a client reaches this asset.
    #[must_use]
    pub fn locate(&self, product: ProductUuid, address: AssetAddress) -> AssetLocator {
        match self {
            Self::Referenced { key, .. } => AssetLocator::Reference(key.clone()),
            Self::Inline { .. } => AssetLocator::Retrieval { product, address },
        }
    }
}

/// Client-facing handle for a populated asset slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetLocator {
    /// Object store key.
    Reference(AssetKey),

    /// Bytes are served by the catalog itself, addressed by product and slot.
    Retrieval {
        product: ProductUuid,
        address: AssetAddress,
    },
}

/// Asset metadata for every slot of a product.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductAssets {
    pub name_image: Option<StoredAsset>,
    pub features_image: Option<StoredAsset>,
    pub animated_image: Option<StoredAsset>,
    pub additional_images: Vec<StoredAsset>,
}

impl ProductAssets {
    #[must_use]
    pub fn get(&self, address: AssetAddress) -> Option<&StoredAsset> {
        match address.slot {
            AssetSlot::Name => self.name_image.as_ref(),
            AssetSlot::Features => self.features_image.as_ref(),
            AssetSlot::Animated => self.animated_image.as_ref(),
            AssetSlot::Additional => self.additional_images.get(usize::from(address.index)),
        }
    }

    /// Place an asset at the given address.
    ///
    /// Additional images are appended in the order they are placed.
    pub fn place(&mut self, address: AssetAddress, asset: StoredAsset) {
        match address.slot {
            AssetSlot::Name => self.name_image = Some(asset),
            AssetSlot::Features => self.features_image = Some(asset),
            AssetSlot::Animated => self.animated_image = Some(asset),
            AssetSlot::Additional => self.additional_images.push(asset),
        }
    }

    /// Empty a slot, returning whatever it held.
    pub fn clear(&mut self, slot: AssetSlot) -> Vec<StoredAsset> {
        match slot {
            AssetSlot::Name => self.name_image.take().into_iter().collect(),
            AssetSlot::Features => self.features_image.take().into_iter().collect(),
            AssetSlot::Animated => self.animated_image.take().into_iter().collect(),
            AssetSlot::Additional => std::mem::take(&mut self.additional_images),
        }
    }

    /// Every populated position with its asset.
    pub fn iter(&self) -> impl Iterator<Item = (AssetAddress, &StoredAsset)> {
        let singles = [
            (AssetSlot::Name, self.name_image.as_ref()),
            (AssetSlot::Features, self.features_image.as_ref()),
            (AssetSlot::Animated, self.animated_image.as_ref()),
        ]
        .into_iter()
        .filter_map(|(slot, asset)| asset.map(|asset| (AssetAddress::single(slot), asset)));

        let additional = self
            .additional_images
            .iter()
            .zip(0_u16..)
            .map(|(asset, index)| (AssetAddress::additional(index), asset));

        singles.chain(additional)
    }

    /// Object store keys referenced by any slot.
    #[must_use]
    pub fn referenced_keys(&self) -> SmallVec<[AssetKey; 4]> {
        self.iter()
            .filter_map(|(_, asset)| asset.referenced_key().cloned())
            .collect()
    }

    /// Resolve the locator for one slot position.
    #[must_use]
    pub fn locate(&self, product: ProductUuid, address: AssetAddress) -> Option<AssetLocator> {
        self.get(address).map(|asset| asset.locate(product, address))
    }
}
