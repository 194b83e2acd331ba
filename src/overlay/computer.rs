//! Winner-per-listing computation for one overlay kind.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::models::{
    Ask, Bid, OrderRecord, OverlayAnnotation, OverlayKind, RecordSource, SaleRecord,
};
use crate::request::RawQuery;
use crate::store::{CatalogStore, MatchCriteria, WinnerStore};

// ---------------------------------------------------------------------------
// OverlayContext
// ---------------------------------------------------------------------------

/// Inputs shared by every overlay computation of one request.
///
/// `now` is captured once so all overlays judge expiry against the same instant.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayContext {
    pub now: DateTime<Utc>,
    pub bid_status: String,
    pub ask_status: String,
    pub sale_status: String,
    pub order_type: Option<String>,
}

impl OverlayContext {
    pub fn from_raw(raw: &RawQuery, config: &EngineConfig, now: DateTime<Utc>) -> Self {
        let non_empty = |key: &str| {
            raw.text(key)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };
        Self {
            now,
            bid_status: config.bid_status.clone(),
            ask_status: config.ask_status.clone(),
            sale_status: non_empty("orderStatus")
                .unwrap_or_else(|| config.default_sale_status.clone()),
            order_type: non_empty("orderType"),
        }
    }

    pub fn criteria(&self, source: RecordSource) -> MatchCriteria {
        match source {
            RecordSource::Bid => MatchCriteria::Open {
                status: self.bid_status.clone(),
                now: self.now,
            },
            RecordSource::Ask => MatchCriteria::Open {
                status: self.ask_status.clone(),
                now: self.now,
            },
            RecordSource::Sale => MatchCriteria::Completed {
                order_status: self.sale_status.clone(),
                order_type: self.order_type.clone(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// OverlayResult
// ---------------------------------------------------------------------------

/// The winners of one overlay kind, keyed by listing id.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayResult {
    pub kind: OverlayKind,
    pub annotations: HashMap<String, OverlayAnnotation>,
}

impl OverlayResult {
    /// Listing ids that have a qualifying record for this kind.
    pub fn restriction_ids(&self) -> BTreeSet<String> {
        self.annotations.keys().cloned().collect()
    }

    pub fn get(&self, listing_id: &str) -> Option<&OverlayAnnotation> {
        self.annotations.get(listing_id)
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }
}

// ---------------------------------------------------------------------------
// OverlayComputer
// ---------------------------------------------------------------------------

pub struct OverlayComputer<'a, S: ?Sized> {
    store: &'a S,
    context: &'a OverlayContext,
}

impl<'a, S: CatalogStore + ?Sized> OverlayComputer<'a, S> {
    pub fn new(store: &'a S, context: &'a OverlayContext) -> Self {
        Self { store, context }
    }

    pub fn compute(&self, kind: OverlayKind) -> Result<OverlayResult> {
        let criteria = self.context.criteria(kind.source());
        let sort = kind.sort_keys();

        let store = self.store;
        let annotations = match kind.source() {
            RecordSource::Bid => {
                first_per_listing(WinnerStore::<Bid>::grouped_winners(store, &criteria, &sort)?)
            }
            RecordSource::Ask => {
                first_per_listing(WinnerStore::<Ask>::grouped_winners(store, &criteria, &sort)?)
            }
            RecordSource::Sale => {
                let sales = WinnerStore::<SaleRecord>::grouped_winners(store, &criteria, &sort)?;
                first_per_listing(sales)
            }
        };

        debug!(overlay = %kind, listings = annotations.len(), "computed overlay");
        Ok(OverlayResult { kind, annotations })
    }
}

/// First record per listing wins.
fn first_per_listing<R: OrderRecord>(records: Vec<R>) -> HashMap<String, OverlayAnnotation> {
    let mut out = HashMap::with_capacity(records.len());
    for record in records {
        out.entry(record.listing_id().to_string())
            .or_insert_with(|| record.annotation());
    }
    out
}
