//! Listing queries over the loaded catalog.

use std::collections::BTreeSet;

use chrono::Utc;

use crate::engine::ListingEngine;
use crate::error::Result;
use crate::models::{Listing, ListingPage, OverlayKind};
use crate::overlay::{OverlayContext, OverlayResult};
use crate::request::{ListingFilter, RawQuery};
use crate::store::{DuckDbStore, ListingStore};

// ---------------------------------------------------------------------------
// ListingQuery
// ---------------------------------------------------------------------------

/// Query interface for listings backed by the `listings` table, with price
/// overlays drawn from `bids`, `asks` and `sales`.
pub struct ListingQuery<'a> {
    engine: &'a ListingEngine<DuckDbStore>,
}

impl<'a> ListingQuery<'a> {
    pub fn new(engine: &'a ListingEngine<DuckDbStore>) -> Self {
        Self { engine }
    }

    /// Run a full listing query: filters, overlays, ordering and pagination.
    pub fn query(&self, raw: &RawQuery) -> Result<ListingPage> {
        self.engine.query(raw)
    }

    /// Compute one overlay in isolation.
    ///
    /// `orderStatus` / `orderType` in `raw` apply to the sale overlays as
    /// they do in [`query`](Self::query); every other key is ignored.
    pub fn overlay(&self, kind: OverlayKind, raw: &RawQuery) -> Result<OverlayResult> {
        let context = OverlayContext::from_raw(raw, self.engine.config(), Utc::now());
        self.engine.compute_overlay(kind, &context)
    }

    /// Get a single listing by id, without overlays.
    pub fn get_by_id(&self, id: &str) -> Result<Option<Listing>> {
        let filter = ListingFilter {
            restrict_ids: Some(BTreeSet::from([id.to_string()])),
            ..ListingFilter::default()
        };
        Ok(self.engine.store().find(&filter)?.into_iter().next())
    }

    /// Number of listings matching the request's base predicate and overlay
    /// restriction, without building a page.
    pub fn count(&self, raw: &RawQuery) -> Result<usize> {
        let raw = raw.clone().with("resPerPage", "1").with("page", "1");
        Ok(self.engine.query(&raw)?.filtered_count)
    }
}
