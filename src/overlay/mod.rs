//! Price overlays: per-kind winner computation, composition of the
//! resulting restrictions, annotation of fetched listings, and ordering.

pub mod composer;
pub mod computer;
pub mod merger;
pub mod sorter;

pub use composer::{compose, ComposedOverlays};
pub use computer::{OverlayComputer, OverlayContext, OverlayResult};
pub use merger::merge;
pub use sorter::{sort_listings, RankKey};
