use super::computer::OverlayResult;
use crate::models::{AnnotatedListing, Listing};

/// Attach every overlay's annotation to the listings that have one.
///
/// Listings without a winner for a kind simply lack that field.
pub fn merge(listings: Vec<Listing>, overlays: &[OverlayResult]) -> Vec<AnnotatedListing> {
    listings
        .into_iter()
        .map(|listing| {
            let mut annotated = AnnotatedListing::new(listing);
            for result in overlays {
                if let Some(annotation) = result.get(annotated.id()) {
                    annotated.overlays.insert(result.kind, annotation.clone());
                }
            }
            annotated
        })
        .collect()
}
