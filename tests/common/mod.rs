//! Shared test fixtures for the marketplace catalog integration tests.
//!
//! Fixtures write NDJSON files into a temporary data directory and load them
//! through [`MarketplaceCatalog::builder()`]. Record timestamps are relative
//! to `Utc::now()` so expiry checks behave the same whenever tests run.

#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use marketplace_catalog::{CompositionMode, EngineConfig, MarketplaceCatalog};
use serde_json::{json, Value};

/// Install a test-writer subscriber once; `RUST_LOG` controls verbosity.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// `now + offset`, rendered the way DuckDB reads a `TIMESTAMP`.
pub fn ts(offset: Duration) -> String {
    stamp(Utc::now() + offset)
}

pub fn stamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

pub fn days(n: i64) -> Duration {
    Duration::days(n)
}

pub fn hours(n: i64) -> Duration {
    Duration::hours(n)
}

// ---------------------------------------------------------------------------
// Record constructors
// ---------------------------------------------------------------------------

pub fn bid(id: &str, listing: &str, price: f64, created: Duration, status: &str) -> Value {
    json!({
        "id": id,
        "listingId": listing,
        "price": price,
        "totalPrice": price * 1.1,
        "createdAt": ts(created),
        "status": status,
    })
}

pub fn bid_until(
    id: &str,
    listing: &str,
    price: f64,
    created: Duration,
    valid_until: Duration,
) -> Value {
    let mut record = bid(id, listing, price, created, "active");
    record["validUntil"] = json!(ts(valid_until));
    record
}

pub fn ask(id: &str, listing: &str, selling_price: f64, created: Duration, status: &str) -> Value {
    json!({
        "id": id,
        "listingId": listing,
        "sellingPrice": selling_price,
        "earnings": selling_price * 0.9,
        "createdAt": ts(created),
        "status": status,
    })
}

pub fn ask_until(
    id: &str,
    listing: &str,
    selling_price: f64,
    created: Duration,
    valid_until: Duration,
) -> Value {
    let mut record = ask(id, listing, selling_price, created, "pending");
    record["validUntil"] = json!(ts(valid_until));
    record
}

pub fn sale(
    id: &str,
    listing: &str,
    total_price: Option<f64>,
    created: Duration,
    order_status: &str,
    order_type: &str,
) -> Value {
    json!({
        "id": id,
        "listingId": listing,
        "orderType": order_type,
        "orderStatus": order_status,
        "totalPrice": total_price,
        "offerPrice": total_price.map(|p| p * 0.95),
        "createdAt": ts(created),
    })
}

pub fn listing(id: &str, name: &str, brand: &str, item_number: i64) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": null,
        "richDescription": null,
        "brand": brand,
        "itemNumber": item_number,
    })
}

// ---------------------------------------------------------------------------
// Fixture builder
// ---------------------------------------------------------------------------

/// Collects table rows and materializes them as a loaded catalog.
#[derive(Default)]
pub struct Fixture {
    listings: Vec<Value>,
    bids: Vec<Value>,
    asks: Vec<Value>,
    sales: Vec<Value>,
    config: Option<EngineConfig>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listings(mut self, rows: Vec<Value>) -> Self {
        self.listings.extend(rows);
        self
    }

    pub fn bids(mut self, rows: Vec<Value>) -> Self {
        self.bids.extend(rows);
        self
    }

    pub fn asks(mut self, rows: Vec<Value>) -> Self {
        self.asks.extend(rows);
        self
    }

    pub fn sales(mut self, rows: Vec<Value>) -> Self {
        self.sales.extend(rows);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn composition(self, mode: CompositionMode) -> Self {
        let config = EngineConfig {
            composition: mode,
            ..EngineConfig::default()
        };
        self.config(config)
    }

    /// Write the data directory and build the catalog.
    ///
    /// The caller must keep the `TempDir` alive for the duration of the test.
    pub fn build(self) -> (MarketplaceCatalog, tempfile::TempDir) {
        init_tracing();
        let tmp_dir = tempfile::tempdir().unwrap();
        self.write_to(tmp_dir.path());

        let catalog = MarketplaceCatalog::builder()
            .data_dir(tmp_dir.path())
            .config(self.config.unwrap_or_default())
            .build()
            .unwrap();
        (catalog, tmp_dir)
    }

    /// Write one `<table>.ndjson` per non-empty table.
    pub fn write_to(&self, dir: &Path) {
        for (table, rows) in [
            ("listings", &self.listings),
            ("bids", &self.bids),
            ("asks", &self.asks),
            ("sales", &self.sales),
        ] {
            if rows.is_empty() {
                continue;
            }
            write_ndjson(&dir.join(format!("{table}.ndjson")), rows);
        }
    }
}

pub fn write_ndjson(path: &Path, rows: &[Value]) {
    let mut file = File::create(path).unwrap();
    for row in rows {
        writeln!(file, "{}", serde_json::to_string(row).unwrap()).unwrap();
    }
}

// ---------------------------------------------------------------------------
// Sample catalog
// ---------------------------------------------------------------------------

/// Five listings with a spread of bids, asks and sales.
///
/// | listing | lowestBid | highestBid | lowestAsk | highestAsk | lastSale | lowestSale | highestSale |
/// |---|---|---|---|---|---|---|---|
/// | p1 | 100 (b1) | 150 (b2) | 120 (a1) | 130 (a2) | s2 (-2d) | 110 (s1) | 140 (s2) |
/// | p2 | - | - | - (expired) | - | s3 (-1d) | 95 (s3) | 95 (s3) |
/// | p3 | 50 (b3) | 50 (b3) | - | - | - (cancelled) | - | - |
/// | p4 | - (expired, sold) | - | 200 (a4) | 200 (a4) | - | - | - |
/// | p5 | 80 (b7) | 80 (b7) | - (cancelled) | - | s5 (-6h) | - (no price) | - |
pub fn sample_fixture() -> Fixture {
    Fixture::new()
        .listings(vec![
            json!({
                "id": "p1",
                "name": "Air Runner Boot",
                "description": "Lightweight runner",
                "richDescription": null,
                "brand": "acme",
                "size": 10,
                "itemNumber": 1001,
                "releaseDate": "2024-01-15",
            }),
            json!({
                "id": "p2",
                "name": "Trail Sneaker",
                "description": "Grippy outsole",
                "richDescription": null,
                "brand": "acme",
                "size": 9,
                "itemNumber": 1002,
                "releaseDate": "2024-03-01",
            }),
            json!({
                "id": "p3",
                "name": "Classic Loafer",
                "description": null,
                "richDescription": "Hand-stitched leather upper",
                "brand": "bolt",
                "size": 10,
                "itemNumber": 2002,
                "releaseDate": "2023-11-20",
            }),
            json!({
                "id": "p4",
                "name": "Court Shoe",
                "description": "Retro court silhouette",
                "richDescription": null,
                "brand": "bolt",
                "size": 11,
                "itemNumber": 3003,
                "releaseDate": "2024-06-10",
            }),
            json!({
                "id": "p5",
                "name": "Winter Boot",
                "description": "Insulated",
                "richDescription": null,
                "brand": "crest",
                "size": 8,
                "itemNumber": 4004,
                "releaseDate": "2024-02-10",
            }),
        ])
        .bids(vec![
            bid("b1", "p1", 100.0, -days(5), "active"),
            bid("b2", "p1", 150.0, -days(4), "active"),
            bid("b3", "p3", 50.0, -days(3), "active"),
            bid("b4", "p3", 50.0, -days(1), "active"),
            bid_until("b5", "p4", 10.0, -days(2), -days(1)),
            bid("b6", "p4", 500.0, -days(2), "sold"),
            bid_until("b7", "p5", 80.0, -days(2), days(7)),
        ])
        .asks(vec![
            ask("a1", "p1", 120.0, -days(3), "pending"),
            ask("a2", "p1", 130.0, -days(2), "pending"),
            ask_until("a3", "p2", 90.0, -days(3), -days(1)),
            ask_until("a4", "p4", 200.0, -days(1), days(1)),
            ask("a5", "p5", 60.0, -days(1), "cancelled"),
        ])
        .sales(vec![
            sale("s1", "p1", Some(110.0), -days(10), "Sold", "buy"),
            sale("s2", "p1", Some(140.0), -days(2), "Sold", "sell"),
            sale("s3", "p2", Some(95.0), -days(1), "Sold", "buy"),
            sale("s4", "p3", Some(70.0), -hours(1), "Cancelled", "buy"),
            sale("s5", "p5", None, -hours(6), "Sold", "buy"),
        ])
}

pub fn sample_catalog() -> (MarketplaceCatalog, tempfile::TempDir) {
    sample_fixture().build()
}

/// Listing ids of a page, in order.
pub fn ids(page: &marketplace_catalog::ListingPage) -> Vec<String> {
    page.data.iter().map(|l| l.id().to_string()).collect()
}
