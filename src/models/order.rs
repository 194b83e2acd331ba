use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::overlay::{OverlayAnnotation, SortField};
use crate::config;

// ---------------------------------------------------------------------------
// OrderRecord — Common surface of bids, asks and sales
// ---------------------------------------------------------------------------

/// A record type that overlays can be computed from.
///
/// Rows are read with every `TIMESTAMP` column converted to epoch
/// milliseconds, which the record types deserialize with
/// `chrono::serde::ts_milliseconds`.
pub trait OrderRecord: DeserializeOwned + Send + 'static {
    /// Backing table name.
    const TABLE: &'static str;

    /// Column holding the value for a sort field.
    fn sort_column(field: SortField) -> &'static str;

    fn listing_id(&self) -> &str;

    fn annotation(&self) -> OverlayAnnotation;
}

// ---------------------------------------------------------------------------
// Bid — Buy-side order
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    pub id: String,
    pub listing_id: String,
    pub price: f64,
    pub total_price: Option<f64>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    pub status: Option<String>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub valid_until: Option<DateTime<Utc>>,
}

impl OrderRecord for Bid {
    const TABLE: &'static str = config::BIDS_TABLE;

    fn sort_column(field: SortField) -> &'static str {
        match field {
            SortField::Price => "price",
            SortField::CreatedAt => "createdAt",
        }
    }

    fn listing_id(&self) -> &str {
        &self.listing_id
    }

    fn annotation(&self) -> OverlayAnnotation {
        OverlayAnnotation {
            record_id: self.id.clone(),
            price: Some(self.price),
            secondary_amount: self.total_price,
            created_at: self.created_at,
            valid_until: self.valid_until,
        }
    }
}

// ---------------------------------------------------------------------------
// Ask — Sell-side order
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ask {
    pub id: String,
    pub listing_id: String,
    pub selling_price: f64,
    pub earnings: Option<f64>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    pub status: Option<String>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub valid_until: Option<DateTime<Utc>>,
}

impl OrderRecord for Ask {
    const TABLE: &'static str = config::ASKS_TABLE;

    fn sort_column(field: SortField) -> &'static str {
        match field {
            SortField::Price => "sellingPrice",
            SortField::CreatedAt => "createdAt",
        }
    }

    fn listing_id(&self) -> &str {
        &self.listing_id
    }

    fn annotation(&self) -> OverlayAnnotation {
        OverlayAnnotation {
            record_id: self.id.clone(),
            price: Some(self.selling_price),
            secondary_amount: self.earnings,
            created_at: self.created_at,
            valid_until: self.valid_until,
        }
    }
}

// ---------------------------------------------------------------------------
// SaleRecord — Completed transaction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRecord {
    pub id: String,
    pub listing_id: String,
    pub order_type: Option<String>,
    pub order_status: Option<String>,
    pub total_price: Option<f64>,
    pub offer_price: Option<f64>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl OrderRecord for SaleRecord {
    const TABLE: &'static str = config::SALES_TABLE;

    fn sort_column(field: SortField) -> &'static str {
        match field {
            SortField::Price => "totalPrice",
            SortField::CreatedAt => "createdAt",
        }
    }

    fn listing_id(&self) -> &str {
        &self.listing_id
    }

    fn annotation(&self) -> OverlayAnnotation {
        OverlayAnnotation {
            record_id: self.id.clone(),
            price: self.total_price,
            secondary_amount: self.offer_price,
            created_at: self.created_at,
            valid_until: None,
        }
    }
}
