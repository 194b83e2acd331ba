//! Orders annotated listings by one overlay's ranking.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::models::{AnnotatedListing, OverlayKind, Ranking};

/// A rank value where absence is explicit and always sorts last,
/// whatever the direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RankKey<T> {
    Present(T),
    Missing,
}

impl<T> RankKey<T> {
    pub fn from_option(value: Option<T>) -> Self {
        value.map_or(RankKey::Missing, RankKey::Present)
    }

    /// Compare two keys, ordering present values with `order` and putting
    /// `Missing` after every present value.
    pub fn compare_by(&self, other: &Self, order: impl Fn(&T, &T) -> Ordering) -> Ordering {
        match (self, other) {
            (RankKey::Present(a), RankKey::Present(b)) => order(a, b),
            (RankKey::Present(_), RankKey::Missing) => Ordering::Less,
            (RankKey::Missing, RankKey::Present(_)) => Ordering::Greater,
            (RankKey::Missing, RankKey::Missing) => Ordering::Equal,
        }
    }
}

fn price_key(listing: &AnnotatedListing, kind: OverlayKind) -> RankKey<f64> {
    RankKey::from_option(listing.overlay(kind).and_then(|a| a.price))
}

fn time_key(listing: &AnnotatedListing, kind: OverlayKind) -> RankKey<DateTime<Utc>> {
    RankKey::from_option(listing.overlay(kind).map(|a| a.created_at))
}

/// Compare two listings under `kind`'s ranking.
pub fn compare(a: &AnnotatedListing, b: &AnnotatedListing, kind: OverlayKind) -> Ordering {
    match kind.ranking() {
        Ranking::PriceAscending => {
            price_key(a, kind).compare_by(&price_key(b, kind), |x, y| x.total_cmp(y))
        }
        Ranking::PriceDescending => {
            price_key(a, kind).compare_by(&price_key(b, kind), |x, y| y.total_cmp(x))
        }
        Ranking::MostRecent => time_key(a, kind).compare_by(&time_key(b, kind), |x, y| y.cmp(x)),
    }
}

/// Stable sort: listings that compare equal keep their natural order.
pub fn sort_listings(listings: &mut [AnnotatedListing], kind: OverlayKind) {
    listings.sort_by(|a, b| compare(a, b, kind));
}
