//! Catalog item record.

use serde::{Deserialize, Serialize};

use super::{ItemId, Price, Rating};

/// Image shown when an item has no image of its own.
pub const PLACEHOLDER_IMAGE: &str = "/placeholder.svg";

/// A catalog entry.
///
/// Items are read-only snapshots of what the catalog returned. The field
/// names match the catalog's JSON so records can be stored and reloaded
/// without a translation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Catalog identifier, unique across the catalog.
    pub id: ItemId,
    /// Display name.
    pub title: String,
    /// Unit price.
    pub price: Price,
    pub description: String,
    /// Category label (e.g., "electronics").
    pub category: String,
    /// Image URL.
    pub image: String,
    pub rating: Rating,
}

impl Item {
    /// Image URL to render, falling back to [`PLACEHOLDER_IMAGE`].
    #[must_use]
    pub fn image_or_placeholder(&self) -> &str {
        if self.image.is_empty() {
            PLACEHOLDER_IMAGE
        } else {
            &self.image
        }
    }
}
