//! Asset Slots

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use thiserror::Error;

/// Maximum number of additional images a product may carry.
pub const MAX_ADDITIONAL_IMAGES: usize = 10;

/// One of the named asset slots on a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetSlot {
    /// Image shown alongside the product name.
    Name,

    /// Image listing the product features.
    Features,

    /// Animated image (usually a GIF).
    Animated,

    /// Ordered sequence of additional images.
    Additional,
}

impl AssetSlot {
    /// Stable identifier used in persistence and URLs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Features => "features",
            Self::Animated => "animated",
            Self::Additional => "additional",
        }
    }

    /// Object store key category for uploads into this slot.
    #[must_use]
    pub const fn key_category(self) -> &'static str {
        match self {
            Self::Name => "product-name",
            Self::Features => "product-features",
            Self::Animated => "product-gifs",
            Self::Additional => "additional-images",
        }
    }

    #[must_use]
    pub const fn is_single(self) -> bool {
        !matches!(self, Self::Additional)
    }
}

impl Display for AssetSlot {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown asset slot: {0}")]
pub struct UnknownAssetSlot(pub String);

impl FromStr for AssetSlot {
    type Err = UnknownAssetSlot;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "name" => Ok(Self::Name),
            "features" => Ok(Self::Features),
            "animated" => Ok(Self::Animated),
            "additional" => Ok(Self::Additional),
            other => Err(UnknownAssetSlot(other.to_string())),
        }
    }
}

/// A single position within a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetAddress {
    pub slot: AssetSlot,
    pub index: u16,
}

impl AssetAddress {
    /// Address of a single-asset slot.
    #[must_use]
    pub const fn single(slot: AssetSlot) -> Self {
        Self { slot, index: 0 }
    }

    /// Address of an entry in the additional images sequence.
    #[must_use]
    pub const fn additional(index: u16) -> Self {
        Self {
            slot: AssetSlot::Additional,
            index,
        }
    }
}

impl Display for AssetAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if self.slot.is_single() {
            Display::fmt(&self.slot, f)
        } else {
            write!(f, "{}[{}]", self.slot, self.index)
        }
    }
}
