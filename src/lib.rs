//! Marketplace catalog browser for Rust.
//!
//! Queries a catalog of listings with free-text search, attribute filters
//! and price overlays: the best open bid or ask, or a historical sale, per
//! listing. Overlays can restrict the result to listings that have one and
//! order it by that price. Data is loaded into an in-process DuckDB
//! database from parquet or newline-delimited JSON files.
//!
//! # Quick start
//!
//! ```no_run
//! use marketplace_catalog::{MarketplaceCatalog, RawQuery};
//!
//! let catalog = MarketplaceCatalog::builder().data_dir("./data").build().unwrap();
//!
//! // Cheapest asks first, 20 per page
//! let page = catalog
//!     .listings()
//!     .query(&RawQuery::from_pairs([("lowestAsk", "true"), ("resPerPage", "20")]))
//!     .unwrap();
//! println!("{} of {} listings", page.data.len(), page.filtered_count);
//! ```

#[cfg(feature = "async")]
pub mod async_client;
pub mod config;
pub mod connection;
pub mod engine;
pub mod error;
pub mod models;
pub mod overlay;
pub mod paginate;
pub mod queries;
pub mod request;
pub mod sql_builder;
pub mod store;

#[cfg(feature = "async")]
pub use async_client::{AsyncListingEngine, AsyncMarketplaceCatalog};
pub use config::{CompositionMode, EngineConfig};
pub use connection::Connection;
pub use engine::{ListingEngine, QueryPlan};
pub use error::{CatalogError, Result};
pub use models::{AnnotatedListing, Listing, ListingPage, OverlayAnnotation, OverlayKind};
pub use request::{RawQuery, RawValue};
pub use sql_builder::SqlBuilder;
pub use store::{CatalogStore, DuckDbStore};

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// CatalogBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing a [`MarketplaceCatalog`].
///
/// Use [`MarketplaceCatalog::builder()`] to obtain a builder, chain
/// configuration methods, and call [`build()`](CatalogBuilder::build).
#[derive(Default)]
pub struct CatalogBuilder {
    data_dir: Option<PathBuf>,
    config: EngineConfig,
}

impl CatalogBuilder {
    /// Directory holding `listings`, `bids`, `asks` and `sales` data files.
    ///
    /// If not set, the platform data directory is used (e.g.
    /// `~/.local/share/marketplace-catalog` on Linux).
    pub fn data_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.data_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Bound every query's wall-clock time. Defaults to 30 seconds.
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.config.deadline = Some(deadline);
        self
    }

    /// Disable the per-query deadline.
    pub fn no_deadline(mut self) -> Self {
        self.config.deadline = None;
        self
    }

    pub fn composition(mut self, mode: CompositionMode) -> Self {
        self.config.composition = mode;
        self
    }

    /// Numeric attribute matched exactly when the keyword is a number.
    pub fn numeric_keyword_field(mut self, field: &str) -> Self {
        self.config.numeric_keyword_field = Some(field.to_string());
        self
    }

    pub fn date_range_field(mut self, field: &str) -> Self {
        self.config.date_range_field = field.to_string();
        self
    }

    pub fn default_res_per_page(mut self, n: usize) -> Self {
        self.config.default_res_per_page = n;
        self
    }

    /// Replace the whole engine configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Open the database and load the data directory.
    pub fn build(self) -> Result<MarketplaceCatalog> {
        if self.config.default_res_per_page == 0 {
            return Err(CatalogError::InvalidArgument(
                "default_res_per_page must be at least 1".into(),
            ));
        }
        let dir = self.data_dir.unwrap_or_else(config::default_data_dir);
        let conn = Connection::from_data_dir(dir)?;
        MarketplaceCatalog::from_connection(conn, self.config)
    }
}

// ---------------------------------------------------------------------------
// MarketplaceCatalog
// ---------------------------------------------------------------------------

/// The main entry point: a loaded catalog plus the listing engine over it.
///
/// Query interfaces are lightweight borrowing wrappers. The catalog is
/// `Send + Sync` and can be shared across threads.
pub struct MarketplaceCatalog {
    conn: Arc<Connection>,
    engine: Arc<ListingEngine<DuckDbStore>>,
}

impl MarketplaceCatalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// Wrap a connection whose tables the caller has already loaded.
    ///
    /// Missing `bids`, `asks` and `sales` tables are created empty.
    pub fn from_connection(conn: Connection, config: EngineConfig) -> Result<Self> {
        conn.ensure_record_tables()?;
        let conn = Arc::new(conn);
        let store = DuckDbStore::new(Arc::clone(&conn));
        Ok(Self {
            conn,
            engine: Arc::new(ListingEngine::new(store, config)),
        })
    }

    /// Access the listing query interface.
    pub fn listings(&self) -> queries::ListingQuery<'_> {
        queries::ListingQuery::new(&self.engine)
    }

    pub fn engine(&self) -> &ListingEngine<DuckDbStore> {
        &self.engine
    }

    pub(crate) fn shared_engine(&self) -> Arc<ListingEngine<DuckDbStore>> {
        Arc::clone(&self.engine)
    }

    /// Names of the tables in the database, sorted.
    pub fn tables(&self) -> Result<Vec<String>> {
        self.conn.tables()
    }

    /// Execute a raw SQL query against the DuckDB database.
    ///
    /// # Arguments
    ///
    /// * `query` - SQL string with `?` positional placeholders.
    /// * `params` - Parameter values corresponding to the placeholders.
    pub fn sql(
        &self,
        query: &str,
        params: &[String],
    ) -> Result<Vec<HashMap<String, serde_json::Value>>> {
        self.conn.execute(query, params)
    }

    /// Return a reference to the underlying [`Connection`] for advanced usage.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl fmt::Display for MarketplaceCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MarketplaceCatalog(tables=[{}], composition={:?})",
            self.conn.tables().unwrap_or_default().join(", "),
            self.engine.config().composition
        )
    }
}
