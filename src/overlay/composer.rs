//! Combines the restriction sets of several requested overlays.

use std::collections::BTreeSet;

use super::computer::OverlayResult;
use crate::config::CompositionMode;
use crate::models::OverlayKind;

/// The single restriction and ordering that the rest of the pipeline applies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComposedOverlays {
    /// `None` when no overlay was requested.
    pub restriction: Option<BTreeSet<String>>,
    /// Overlay whose ranking orders the result; `None` keeps natural order.
    pub order_by: Option<OverlayKind>,
}

/// Walk the results in fixed overlay order and fold their restrictions.
///
/// In [`CompositionMode::Override`] each kind replaces the previous
/// restriction, so the last requested kind alone decides membership. In
/// [`CompositionMode::Intersect`] every kind narrows the set. Ordering
/// follows the last kind in both modes.
pub fn compose(mode: CompositionMode, results: &[OverlayResult]) -> ComposedOverlays {
    let mut ordered: Vec<&OverlayResult> = results.iter().collect();
    ordered.sort_by_key(|result| result.kind);

    let mut composed = ComposedOverlays::default();
    for result in ordered {
        let ids = result.restriction_ids();
        composed.restriction = match (mode, composed.restriction.take()) {
            (CompositionMode::Intersect, Some(active)) => {
                Some(active.intersection(&ids).cloned().collect())
            }
            _ => Some(ids),
        };
        composed.order_by = Some(result.kind);
    }
    composed
}
