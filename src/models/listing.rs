use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::overlay::{OverlayAnnotation, OverlayKind};

// ---------------------------------------------------------------------------
// Listing — Catalog item (read-only to the engine)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub rich_description: Option<String>,
    /// Open attribute set (brand, size, releaseDate, ...).
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// AnnotatedListing — Transient response object
// ---------------------------------------------------------------------------

/// A listing plus the overlay annotations computed for it in one request.
///
/// Serializes flat: listing fields first, then one field per attached
/// overlay (`lowestBid`, `lastSale`, ...).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedListing {
    #[serde(flatten)]
    pub listing: Listing,
    #[serde(flatten)]
    pub overlays: BTreeMap<OverlayKind, OverlayAnnotation>,
}

impl AnnotatedListing {
    pub fn new(listing: Listing) -> Self {
        Self {
            listing,
            overlays: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.listing.id
    }

    pub fn overlay(&self, kind: OverlayKind) -> Option<&OverlayAnnotation> {
        self.overlays.get(&kind)
    }
}
