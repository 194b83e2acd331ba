use std::path::PathBuf;
use std::time::Duration;

pub const LISTINGS_TABLE: &str = "listings";
pub const BIDS_TABLE: &str = "bids";
pub const ASKS_TABLE: &str = "asks";
pub const SALES_TABLE: &str = "sales";

/// Every table the catalog loads, listings first.
pub const TABLES: [&str; 4] = [LISTINGS_TABLE, BIDS_TABLE, ASKS_TABLE, SALES_TABLE];

/// Text columns searched by the `keyword` control key.
pub const KEYWORD_FIELDS: [&str; 3] = ["name", "description", "richDescription"];

pub const DEFAULT_RES_PER_PAGE: usize = 100;
pub const DEFAULT_BID_STATUS: &str = "active";
pub const DEFAULT_ASK_STATUS: &str = "pending";
pub const DEFAULT_SALE_STATUS: &str = "Sold";
pub const DEFAULT_NUMERIC_KEYWORD_FIELD: &str = "itemNumber";
pub const DEFAULT_DATE_RANGE_FIELD: &str = "releaseDate";
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

/// Fixed column schema for the order record tables.
///
/// Listings have an open schema and return `None`.
pub fn record_columns(table: &str) -> Option<&'static [(&'static str, &'static str)]> {
    match table {
        BIDS_TABLE => Some(&[
            ("id", "VARCHAR"),
            ("listingId", "VARCHAR"),
            ("price", "DOUBLE"),
            ("totalPrice", "DOUBLE"),
            ("createdAt", "TIMESTAMP"),
            ("status", "VARCHAR"),
            ("validUntil", "TIMESTAMP"),
        ]),
        ASKS_TABLE => Some(&[
            ("id", "VARCHAR"),
            ("listingId", "VARCHAR"),
            ("sellingPrice", "DOUBLE"),
            ("earnings", "DOUBLE"),
            ("createdAt", "TIMESTAMP"),
            ("status", "VARCHAR"),
            ("validUntil", "TIMESTAMP"),
        ]),
        SALES_TABLE => Some(&[
            ("id", "VARCHAR"),
            ("listingId", "VARCHAR"),
            ("orderType", "VARCHAR"),
            ("orderStatus", "VARCHAR"),
            ("totalPrice", "DOUBLE"),
            ("offerPrice", "DOUBLE"),
            ("createdAt", "TIMESTAMP"),
        ]),
        _ => None,
    }
}

/// Candidate file names for a table inside a data directory, in preference order.
pub fn data_files(table: &str) -> [String; 3] {
    [
        format!("{table}.parquet"),
        format!("{table}.ndjson"),
        format!("{table}.jsonl"),
    ]
}

pub fn default_data_dir() -> PathBuf {
    if let Some(data) = dirs::data_dir() {
        data.join("marketplace-catalog")
    } else {
        PathBuf::from(".marketplace-catalog")
    }
}

// ---------------------------------------------------------------------------
// CompositionMode
// ---------------------------------------------------------------------------

/// How restriction sets from several requested overlays combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositionMode {
    /// The last requested kind (in fixed overlay order) alone restricts
    /// and orders the result.
    #[default]
    Override,
    /// Every requested kind restricts; a listing must qualify for all of
    /// them. Ordering still follows the last requested kind.
    Intersect,
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Tunables for the listing engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Numeric listing attribute matched exactly when the keyword parses as a number.
    pub numeric_keyword_field: Option<String>,
    /// Listing attribute whose `gte`/`lte` sub-keys form a timestamp range.
    pub date_range_field: String,
    pub default_res_per_page: usize,
    pub bid_status: String,
    pub ask_status: String,
    pub default_sale_status: String,
    pub composition: CompositionMode,
    /// Upper bound on the whole request. `None` disables the check.
    pub deadline: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            numeric_keyword_field: Some(DEFAULT_NUMERIC_KEYWORD_FIELD.to_string()),
            date_range_field: DEFAULT_DATE_RANGE_FIELD.to_string(),
            default_res_per_page: DEFAULT_RES_PER_PAGE,
            bid_status: DEFAULT_BID_STATUS.to_string(),
            ask_status: DEFAULT_ASK_STATUS.to_string(),
            default_sale_status: DEFAULT_SALE_STATUS.to_string(),
            composition: CompositionMode::Override,
            deadline: Some(DEFAULT_DEADLINE),
        }
    }
}
