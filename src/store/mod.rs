//! Read-only store interfaces the engine consumes.
//!
//! Listings, bids, asks and sales are owned by other subsystems; the engine
//! only needs a filtered listing fetch and a "winner per listing" grouping
//! over each record type.

pub mod duckdb_store;

pub use duckdb_store::DuckDbStore;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Ask, Bid, Listing, OrderRecord, SaleRecord, SortKey};
use crate::request::ListingFilter;

/// Qualification predicate for winner selection.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchCriteria {
    /// Bids and asks: required status, and `validUntil` absent or after `now`.
    Open { status: String, now: DateTime<Utc> },
    /// Sales: required order status, optional order type.
    Completed {
        order_status: String,
        order_type: Option<String>,
    },
}

pub trait ListingStore {
    /// Listings matching `filter`, in the store's natural (stable) order.
    fn find(&self, filter: &ListingFilter) -> Result<Vec<Listing>>;
}

pub trait WinnerStore<R: OrderRecord> {
    /// At most one record per listing id: the first qualifying record under `sort`.
    fn grouped_winners(&self, criteria: &MatchCriteria, sort: &[SortKey]) -> Result<Vec<R>>;
}

/// Everything the listing engine reads from.
pub trait CatalogStore:
    ListingStore + WinnerStore<Bid> + WinnerStore<Ask> + WinnerStore<SaleRecord>
{
}

impl<T> CatalogStore for T where
    T: ListingStore + WinnerStore<Bid> + WinnerStore<Ask> + WinnerStore<SaleRecord>
{
}
