use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// RecordSource — Which collection an overlay aggregates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordSource {
    Bid,
    Ask,
    Sale,
}

// ---------------------------------------------------------------------------
// SortKey — One key of a winner ordering
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortField {
    /// The record's headline price (bid `price`, ask `sellingPrice`, sale `totalPrice`).
    Price,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SortKey {
    pub field: SortField,
    pub descending: bool,
}

impl SortKey {
    pub const fn asc(field: SortField) -> Self {
        Self {
            field,
            descending: false,
        }
    }

    pub const fn desc(field: SortField) -> Self {
        Self {
            field,
            descending: true,
        }
    }
}

// ---------------------------------------------------------------------------
// OverlayKind
// ---------------------------------------------------------------------------

/// The enumerated overlay kinds.
///
/// Declaration order is the fixed processing order used when composing
/// several requested overlays; `Ord` follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OverlayKind {
    #[serde(rename = "lowestBid")]
    LowestBid,
    #[serde(rename = "highestBid")]
    HighestBid,
    #[serde(rename = "lowestAsk")]
    LowestAsk,
    #[serde(rename = "highestAsk")]
    HighestAsk,
    /// Requested as `recentSales`, attached as `lastSale`.
    #[serde(rename = "lastSale")]
    RecentSale,
    #[serde(rename = "lowestSale")]
    LowestSale,
    #[serde(rename = "highestSale")]
    HighestSale,
}

/// How listings are ranked by an overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ranking {
    /// Annotation price ascending, missing last.
    PriceAscending,
    /// Annotation price descending, missing last.
    PriceDescending,
    /// Annotation timestamp descending, missing last.
    MostRecent,
}

impl OverlayKind {
    pub const ALL: [OverlayKind; 7] = [
        OverlayKind::LowestBid,
        OverlayKind::HighestBid,
        OverlayKind::LowestAsk,
        OverlayKind::HighestAsk,
        OverlayKind::RecentSale,
        OverlayKind::LowestSale,
        OverlayKind::HighestSale,
    ];

    /// The control key that requests this overlay.
    pub fn request_key(self) -> &'static str {
        match self {
            OverlayKind::LowestBid => "lowestBid",
            OverlayKind::HighestBid => "highestBid",
            OverlayKind::LowestAsk => "lowestAsk",
            OverlayKind::HighestAsk => "highestAsk",
            OverlayKind::RecentSale => "recentSales",
            OverlayKind::LowestSale => "lowestSale",
            OverlayKind::HighestSale => "highestSale",
        }
    }

    /// The response field the annotation is attached under.
    pub fn field_name(self) -> &'static str {
        match self {
            OverlayKind::RecentSale => "lastSale",
            other => other.request_key(),
        }
    }

    pub fn from_request_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.request_key() == key)
    }

    pub fn source(self) -> RecordSource {
        match self {
            OverlayKind::LowestBid | OverlayKind::HighestBid => RecordSource::Bid,
            OverlayKind::LowestAsk | OverlayKind::HighestAsk => RecordSource::Ask,
            OverlayKind::RecentSale | OverlayKind::LowestSale | OverlayKind::HighestSale => {
                RecordSource::Sale
            }
        }
    }

    /// Winner ordering within one listing's records, primary key first.
    pub fn sort_keys(self) -> Vec<SortKey> {
        match self {
            OverlayKind::LowestBid | OverlayKind::LowestAsk | OverlayKind::LowestSale => vec![
                SortKey::asc(SortField::Price),
                SortKey::asc(SortField::CreatedAt),
            ],
            OverlayKind::HighestBid | OverlayKind::HighestAsk | OverlayKind::HighestSale => vec![
                SortKey::desc(SortField::Price),
                SortKey::asc(SortField::CreatedAt),
            ],
            OverlayKind::RecentSale => vec![SortKey::desc(SortField::CreatedAt)],
        }
    }

    pub fn ranking(self) -> Ranking {
        match self {
            OverlayKind::LowestBid | OverlayKind::LowestAsk | OverlayKind::LowestSale => {
                Ranking::PriceAscending
            }
            OverlayKind::HighestBid | OverlayKind::HighestAsk | OverlayKind::HighestSale => {
                Ranking::PriceDescending
            }
            OverlayKind::RecentSale => Ranking::MostRecent,
        }
    }
}

impl fmt::Display for OverlayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

// ---------------------------------------------------------------------------
// OverlayAnnotation — Ephemeral per-request winner summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayAnnotation {
    /// Id of the winning bid, ask or sale record.
    pub record_id: String,
    pub price: Option<f64>,
    pub secondary_amount: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
}
