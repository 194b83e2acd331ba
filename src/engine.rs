//! The listing query pipeline: normalize, compute overlays, compose,
//! fetch, annotate, sort, paginate.

use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::{CatalogError, Result};
use crate::models::{AnnotatedListing, ListingPage, OverlayKind};
use crate::overlay::{self, OverlayComputer, OverlayContext, OverlayResult};
use crate::paginate::{paginate, PageRequest};
use crate::request::{ListingFilter, QueryNormalizer, RawQuery};
use crate::store::CatalogStore;

// ---------------------------------------------------------------------------
// Deadline
// ---------------------------------------------------------------------------

/// Wall-clock bound on one request, checked between stages.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    pub fn start(limit: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    pub fn unbounded() -> Self {
        Self::start(None)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Fail with [`CatalogError::DeadlineExceeded`] once the limit has passed.
    pub fn check(&self, stage: &str) -> Result<()> {
        let Some(limit) = self.limit else {
            return Ok(());
        };
        let elapsed = self.elapsed();
        if elapsed > limit {
            warn!(stage, ?elapsed, ?limit, "listing query exceeded its deadline");
            return Err(CatalogError::DeadlineExceeded {
                stage: stage.to_string(),
                elapsed,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// QueryPlan
// ---------------------------------------------------------------------------

/// A normalized request, ready to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub filter: ListingFilter,
    /// Requested overlay kinds in fixed processing order.
    pub overlays: Vec<OverlayKind>,
    pub context: OverlayContext,
    pub page: PageRequest,
}

/// Overlay kinds whose control key is present with a truthy value.
pub fn requested_overlays(raw: &RawQuery) -> Vec<OverlayKind> {
    OverlayKind::ALL
        .into_iter()
        .filter(|kind| raw.get(kind.request_key()).is_some_and(|v| v.is_truthy()))
        .collect()
}

// ---------------------------------------------------------------------------
// ListingEngine
// ---------------------------------------------------------------------------

pub struct ListingEngine<S> {
    store: S,
    config: EngineConfig,
}

impl<S: CatalogStore> ListingEngine<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Normalize a raw request. Only invalid pagination input is an error;
    /// malformed filter fragments are dropped.
    pub fn plan(&self, raw: &RawQuery) -> Result<QueryPlan> {
        let page = PageRequest::from_raw(raw, self.config.default_res_per_page)?;
        let filter = QueryNormalizer::new(&self.config).normalize(raw);
        let overlays = requested_overlays(raw);
        let context = OverlayContext::from_raw(raw, &self.config, Utc::now());

        debug!(
            conditions = filter.conditions.len(),
            keyword = filter.keyword.is_some(),
            date_range = filter.date_range.is_some(),
            overlays = overlays.len(),
            "normalized listing query"
        );
        Ok(QueryPlan {
            filter,
            overlays,
            context,
            page,
        })
    }

    pub fn compute_overlay(
        &self,
        kind: OverlayKind,
        context: &OverlayContext,
    ) -> Result<OverlayResult> {
        OverlayComputer::new(&self.store, context).compute(kind)
    }

    /// Compose overlay restrictions, fetch, annotate, sort and paginate.
    ///
    /// `overlays` may arrive in any order; composition uses fixed kind order.
    pub fn assemble(
        &self,
        plan: QueryPlan,
        overlays: Vec<OverlayResult>,
        deadline: &Deadline,
    ) -> Result<ListingPage> {
        let composed = overlay::compose(self.config.composition, &overlays);

        let mut filter = plan.filter;
        filter.restrict_ids = composed.restriction;
        let listings = self.store.find(&filter)?;
        debug!(
            fetched = listings.len(),
            restricted = filter.restrict_ids.is_some(),
            "fetched listings"
        );
        deadline.check("fetch")?;

        let annotated = overlay::merge(listings, &overlays);
        self.finish(annotated, composed.order_by, plan.page, deadline)
    }

    /// Order annotated listings by `order_by`, if any, and cut out the page.
    pub fn finish(
        &self,
        mut annotated: Vec<AnnotatedListing>,
        order_by: Option<OverlayKind>,
        page: PageRequest,
        deadline: &Deadline,
    ) -> Result<ListingPage> {
        if let Some(kind) = order_by {
            overlay::sort_listings(&mut annotated, kind);
        }
        deadline.check("sort")?;

        let page = paginate(annotated, page);
        debug!(
            filtered = page.filtered_count,
            page = page.current_page,
            total_pages = page.total_pages,
            "paginated listings"
        );
        Ok(page)
    }

    /// Run the whole pipeline, computing overlays one after another.
    pub fn query(&self, raw: &RawQuery) -> Result<ListingPage> {
        let deadline = Deadline::start(self.config.deadline);
        let plan = self.plan(raw)?;
        deadline.check("normalize")?;

        let mut overlays = Vec::with_capacity(plan.overlays.len());
        for &kind in &plan.overlays {
            overlays.push(self.compute_overlay(kind, &plan.context)?);
            deadline.check(kind.field_name())?;
        }

        self.assemble(plan, overlays, &deadline)
    }
}
