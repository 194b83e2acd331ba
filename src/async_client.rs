//! Async front end for the listing engine (Tokio).
//!
//! Each requested overlay is computed on the blocking thread pool via
//! [`tokio::task::JoinSet::spawn_blocking`], so independent aggregations run
//! concurrently. Composition, the base fetch, sorting and pagination run on
//! the blocking pool once every overlay has finished. The whole request is
//! bounded by [`tokio::time::timeout`]; on expiry nothing partial is
//! returned.
//!
//! # Example
//!
//! ```no_run
//! use marketplace_catalog::{AsyncMarketplaceCatalog, RawQuery};
//!
//! #[tokio::main]
//! async fn main() {
//!     let catalog = AsyncMarketplaceCatalog::builder()
//!         .data_dir("./data")
//!         .build()
//!         .await
//!         .unwrap();
//!
//!     let page = catalog
//!         .query(RawQuery::new().with("lowestAsk", "true"))
//!         .await
//!         .unwrap();
//!     println!("{} listings", page.filtered_count);
//! }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::config::CompositionMode;
use crate::engine::{Deadline, ListingEngine};
use crate::error::{CatalogError, Result};
use crate::models::ListingPage;
use crate::request::RawQuery;
use crate::store::{CatalogStore, DuckDbStore};
use crate::{CatalogBuilder, MarketplaceCatalog};

fn join_error(e: tokio::task::JoinError) -> CatalogError {
    CatalogError::Task(format!("Task join error: {e}"))
}

// ---------------------------------------------------------------------------
// AsyncListingEngine
// ---------------------------------------------------------------------------

/// Shares one [`ListingEngine`] across blocking tasks.
pub struct AsyncListingEngine<S> {
    inner: Arc<ListingEngine<S>>,
}

impl<S> Clone for AsyncListingEngine<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> AsyncListingEngine<S>
where
    S: CatalogStore + Send + Sync + 'static,
{
    pub fn new(engine: ListingEngine<S>) -> Self {
        Self::from_shared(Arc::new(engine))
    }

    pub fn from_shared(inner: Arc<ListingEngine<S>>) -> Self {
        Self { inner }
    }

    pub fn engine(&self) -> &ListingEngine<S> {
        &self.inner
    }

    /// Run one listing query, computing overlays concurrently.
    pub async fn query(&self, raw: RawQuery) -> Result<ListingPage> {
        let started = Instant::now();
        match self.inner.config().deadline {
            Some(limit) => match tokio::time::timeout(limit, self.run_pipeline(raw)).await {
                Ok(result) => result,
                Err(_) => {
                    let elapsed = started.elapsed();
                    warn!(?elapsed, ?limit, "listing query exceeded its deadline");
                    Err(CatalogError::DeadlineExceeded {
                        stage: "query".to_string(),
                        elapsed,
                    })
                }
            },
            None => self.run_pipeline(raw).await,
        }
    }

    async fn run_pipeline(&self, raw: RawQuery) -> Result<ListingPage> {
        let plan = self.inner.plan(&raw)?;

        let mut tasks = JoinSet::new();
        for &kind in &plan.overlays {
            let engine = Arc::clone(&self.inner);
            let context = plan.context.clone();
            tasks.spawn_blocking(move || engine.compute_overlay(kind, &context));
        }

        // First failure aborts the request; dropping the set aborts the rest.
        let mut overlays = Vec::with_capacity(plan.overlays.len());
        while let Some(joined) = tasks.join_next().await {
            overlays.push(joined.map_err(join_error)??);
        }
        debug!(overlays = overlays.len(), "overlay tasks finished");

        let engine = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            engine.assemble(plan, overlays, &Deadline::unbounded())
        })
        .await
        .map_err(join_error)?
    }
}

// ---------------------------------------------------------------------------
// AsyncMarketplaceCatalogBuilder
// ---------------------------------------------------------------------------

/// Builder for an [`AsyncMarketplaceCatalog`]; mirrors [`CatalogBuilder`].
#[derive(Default)]
pub struct AsyncMarketplaceCatalogBuilder {
    data_dir: Option<PathBuf>,
    deadline: Option<Duration>,
    composition: Option<CompositionMode>,
    numeric_keyword_field: Option<String>,
    date_range_field: Option<String>,
    default_res_per_page: Option<usize>,
}

impl AsyncMarketplaceCatalogBuilder {
    pub fn data_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.data_dir = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn composition(mut self, mode: CompositionMode) -> Self {
        self.composition = Some(mode);
        self
    }

    pub fn numeric_keyword_field(mut self, field: &str) -> Self {
        self.numeric_keyword_field = Some(field.to_string());
        self
    }

    pub fn date_range_field(mut self, field: &str) -> Self {
        self.date_range_field = Some(field.to_string());
        self
    }

    pub fn default_res_per_page(mut self, n: usize) -> Self {
        self.default_res_per_page = Some(n);
        self
    }

    /// Load the data directory on the blocking pool and build the catalog.
    pub async fn build(self) -> Result<AsyncMarketplaceCatalog> {
        let catalog = tokio::task::spawn_blocking(move || {
            let mut builder = CatalogBuilder::default();
            if let Some(dir) = self.data_dir {
                builder = builder.data_dir(dir);
            }
            if let Some(deadline) = self.deadline {
                builder = builder.deadline(deadline);
            }
            if let Some(mode) = self.composition {
                builder = builder.composition(mode);
            }
            if let Some(field) = self.numeric_keyword_field {
                builder = builder.numeric_keyword_field(&field);
            }
            if let Some(field) = self.date_range_field {
                builder = builder.date_range_field(&field);
            }
            if let Some(n) = self.default_res_per_page {
                builder = builder.default_res_per_page(n);
            }
            builder.build()
        })
        .await
        .map_err(join_error)??;
        Ok(AsyncMarketplaceCatalog::from_catalog(catalog))
    }
}

// ---------------------------------------------------------------------------
// AsyncMarketplaceCatalog
// ---------------------------------------------------------------------------

/// Async wrapper around [`MarketplaceCatalog`].
pub struct AsyncMarketplaceCatalog {
    inner: Arc<MarketplaceCatalog>,
    engine: AsyncListingEngine<DuckDbStore>,
}

impl AsyncMarketplaceCatalog {
    pub fn builder() -> AsyncMarketplaceCatalogBuilder {
        AsyncMarketplaceCatalogBuilder::default()
    }

    pub fn from_catalog(catalog: MarketplaceCatalog) -> Self {
        let engine = AsyncListingEngine::from_shared(catalog.shared_engine());
        Self {
            inner: Arc::new(catalog),
            engine,
        }
    }

    /// Run a listing query with concurrent overlay computation.
    pub async fn query(&self, raw: RawQuery) -> Result<ListingPage> {
        self.engine.query(raw).await
    }

    /// Run any synchronous catalog operation on the blocking thread pool.
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&MarketplaceCatalog) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let catalog = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || f(&catalog))
            .await
            .map_err(join_error)?
    }

    /// Execute raw SQL on the blocking thread pool.
    pub async fn sql(
        &self,
        query: &str,
        params: &[String],
    ) -> Result<Vec<HashMap<String, serde_json::Value>>> {
        let query = query.to_string();
        let params = params.to_vec();
        self.run(move |catalog| catalog.sql(&query, &params)).await
    }

    pub async fn tables(&self) -> Result<Vec<String>> {
        self.run(|catalog| catalog.tables()).await
    }
}
