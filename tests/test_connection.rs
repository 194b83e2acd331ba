//! Connection integration tests: raw SQL execution, table loading, type conversion.

mod common;

use std::io::Write;

use marketplace_catalog::config;
use marketplace_catalog::{CatalogError, Connection};
use serde_json::json;
use tempfile::NamedTempFile;

fn ndjson_file(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file.flush().unwrap();
    file
}

// ---------------------------------------------------------------------------
// execute
// ---------------------------------------------------------------------------

#[test]
fn execute_returns_correct_rows() {
    let (catalog, _tmp) = common::sample_catalog();
    let conn = catalog.connection();

    let rows = conn
        .execute("SELECT * FROM listings ORDER BY id", &[])
        .unwrap();
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0]["id"], "p1");
    assert_eq!(rows[4]["id"], "p5");
}

#[test]
fn execute_with_params() {
    let (catalog, _tmp) = common::sample_catalog();

    let rows = catalog
        .sql(
            "SELECT * FROM listings WHERE brand = ?",
            &["acme".to_string()],
        )
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[test]
fn execute_returns_empty_for_no_matches() {
    let (catalog, _tmp) = common::sample_catalog();

    let rows = catalog
        .sql(
            "SELECT * FROM listings WHERE id = ?",
            &["nonexistent".to_string()],
        )
        .unwrap();
    assert!(rows.is_empty());
}

#[test]
fn execute_reports_sql_errors() {
    let (catalog, _tmp) = common::sample_catalog();

    let result = catalog.sql("SELECT * FROM no_such_table", &[]);
    assert!(matches!(result, Err(CatalogError::DuckDb(_))));
}

// ---------------------------------------------------------------------------
// execute_scalar
// ---------------------------------------------------------------------------

#[test]
fn execute_scalar_returns_single_value() {
    let (catalog, _tmp) = common::sample_catalog();

    let result = catalog
        .connection()
        .execute_scalar("SELECT COUNT(*) FROM bids", &[])
        .unwrap();
    assert_eq!(result.unwrap().as_i64().unwrap(), 7);
}

#[test]
fn execute_scalar_returns_none_for_empty_result() {
    let (catalog, _tmp) = common::sample_catalog();

    let result = catalog
        .connection()
        .execute_scalar(
            "SELECT id FROM bids WHERE id = ?",
            &["nonexistent".to_string()],
        )
        .unwrap();
    assert!(result.is_none());
}

// ---------------------------------------------------------------------------
// register_table_from_ndjson / register_records_from_ndjson
// ---------------------------------------------------------------------------

#[test]
fn register_table_from_ndjson_creates_queryable_table() {
    let conn = Connection::open_in_memory().unwrap();
    let file = ndjson_file(&[r#"{"id": 1, "name": "Alpha"}"#, r#"{"id": 2, "name": "Beta"}"#]);

    conn.register_table_from_ndjson("test_table", file.path().to_str().unwrap())
        .unwrap();

    let rows = conn.execute("SELECT * FROM test_table ORDER BY id", &[]).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["name"], "Alpha");
    assert_eq!(rows[1]["name"], "Beta");
}

#[test]
fn registered_table_is_visible() {
    let conn = Connection::open_in_memory().unwrap();
    let file = ndjson_file(&[r#"{"x": 1}"#]);

    assert!(!conn.has_table("my_table"));
    conn.register_table_from_ndjson("my_table", file.path().to_str().unwrap())
        .unwrap();
    assert!(conn.has_table("my_table"));
}

#[test]
fn register_table_replaces_existing_table() {
    let conn = Connection::open_in_memory().unwrap();

    let first = ndjson_file(&[r#"{"val": "old"}"#]);
    conn.register_table_from_ndjson("replaceable", first.path().to_str().unwrap())
        .unwrap();
    let second = ndjson_file(&[r#"{"val": "new"}"#]);
    conn.register_table_from_ndjson("replaceable", second.path().to_str().unwrap())
        .unwrap();

    let rows = conn.execute("SELECT * FROM replaceable", &[]).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["val"], "new");
}

#[test]
fn register_records_uses_fixed_schema() {
    let conn = Connection::open_in_memory().unwrap();
    // No validUntil, no totalPrice, plus a key outside the schema.
    let file = ndjson_file(&[
        r#"{"id": "b1", "listingId": "p1", "price": 10, "createdAt": "2024-05-01 12:00:00", "status": "active", "note": "x"}"#,
    ]);

    conn.register_records_from_ndjson("bids", file.path().to_str().unwrap())
        .unwrap();

    let schema = conn.table_schema("bids").unwrap();
    let names: Vec<&str> = schema.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(
        names,
        vec!["id", "listingId", "price", "totalPrice", "createdAt", "status", "validUntil"]
    );
    let created = schema.iter().find(|(n, _)| n == "createdAt").unwrap();
    assert_eq!(created.1, "TIMESTAMP");

    let rows = conn.execute("SELECT * FROM bids", &[]).unwrap();
    assert!(rows[0]["validUntil"].is_null());
    assert!(rows[0]["totalPrice"].is_null());
    assert_eq!(rows[0]["price"].as_f64(), Some(10.0));
}

#[test]
fn register_records_rejects_unknown_table() {
    let conn = Connection::open_in_memory().unwrap();
    let file = ndjson_file(&[r#"{"id": "x"}"#]);

    let result = conn.register_records_from_ndjson("listings", file.path().to_str().unwrap());
    assert!(matches!(result, Err(CatalogError::InvalidArgument(_))));
}

// ---------------------------------------------------------------------------
// load_data_dir
// ---------------------------------------------------------------------------

#[test]
fn load_data_dir_creates_missing_record_tables_empty() {
    let tmp = tempfile::tempdir().unwrap();
    common::write_ndjson(
        &tmp.path().join("listings.ndjson"),
        &[common::listing("p1", "Boot", "acme", 1)],
    );

    let conn = Connection::from_data_dir(tmp.path()).unwrap();
    assert_eq!(conn.tables().unwrap(), vec!["asks", "bids", "listings", "sales"]);

    let count = conn.execute_scalar("SELECT COUNT(*) FROM sales", &[]).unwrap();
    assert_eq!(count, Some(json!(0)));
}

#[test]
fn ensure_record_tables_keeps_existing_tables() {
    let conn = Connection::open_in_memory().unwrap();
    conn.handle()
        .unwrap()
        .execute_batch(
            "CREATE TABLE bids AS SELECT 'b1' AS id, 'p1' AS \"listingId\", 90.0 AS price",
        )
        .unwrap();

    conn.ensure_record_tables().unwrap();

    let count = conn.execute_scalar("SELECT COUNT(*) FROM bids", &[]).unwrap();
    assert_eq!(count, Some(json!(1)));
    assert_eq!(conn.tables().unwrap(), vec!["asks", "bids", "sales"]);
}

#[test]
fn parquet_records_are_coerced_to_fixed_schema() {
    let tmp = tempfile::tempdir().unwrap();
    common::write_ndjson(
        &tmp.path().join("listings.ndjson"),
        &[common::listing("p1", "Boot", "acme", 1)],
    );

    // No totalPrice or validUntil column, and createdAt stored as text.
    let writer = Connection::open_in_memory().unwrap();
    writer
        .handle()
        .unwrap()
        .execute_batch(&format!(
            "COPY (SELECT 'b1' AS id, 'p1' AS \"listingId\", 90.0 AS price, \
             '2024-01-15 10:30:00' AS \"createdAt\", 'active' AS status) \
             TO '{}' (FORMAT PARQUET)",
            tmp.path().join("bids.parquet").display()
        ))
        .unwrap();

    let conn = Connection::from_data_dir(tmp.path()).unwrap();
    let schema = conn.table_schema("bids").unwrap();
    let expected: Vec<(String, String)> = config::record_columns("bids")
        .unwrap()
        .iter()
        .map(|(name, ty)| (name.to_string(), ty.to_string()))
        .collect();
    assert_eq!(schema, expected);

    let rows = conn
        .execute("SELECT \"createdAt\", \"validUntil\", \"totalPrice\" FROM bids", &[])
        .unwrap();
    assert_eq!(rows[0]["createdAt"], "2024-01-15T10:30:00.000Z");
    assert!(rows[0]["validUntil"].is_null());
    assert!(rows[0]["totalPrice"].is_null());
}

#[test]
fn load_data_dir_reads_jsonl_files() {
    let tmp = tempfile::tempdir().unwrap();
    common::write_ndjson(
        &tmp.path().join("listings.jsonl"),
        &[common::listing("p1", "Boot", "acme", 1)],
    );

    let conn = Connection::from_data_dir(tmp.path()).unwrap();
    assert!(conn.has_table("listings"));
}

#[test]
fn load_data_dir_without_listings_is_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let result = Connection::from_data_dir(tmp.path());
    assert!(matches!(result, Err(CatalogError::NotFound(_))));
}

#[test]
fn load_missing_directory_is_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let result = Connection::from_data_dir(tmp.path().join("absent"));
    assert!(matches!(result, Err(CatalogError::NotFound(_))));
}

// ---------------------------------------------------------------------------
// execute_into
// ---------------------------------------------------------------------------

#[test]
fn execute_into_deserializes_rows() {
    let (catalog, _tmp) = common::sample_catalog();

    #[derive(serde::Deserialize, Debug)]
    struct SimpleListing {
        id: String,
        name: String,
    }

    let listings: Vec<SimpleListing> = catalog
        .connection()
        .execute_into("SELECT id, name FROM listings ORDER BY id", &[])
        .unwrap();
    assert_eq!(listings.len(), 5);
    assert_eq!(listings[0].id, "p1");
    assert_eq!(listings[0].name, "Air Runner Boot");
}

// ---------------------------------------------------------------------------
// Type conversions
// ---------------------------------------------------------------------------

#[test]
fn null_values_are_converted_to_json_null() {
    let (catalog, _tmp) = common::sample_catalog();

    let rows = catalog
        .sql(
            "SELECT description FROM listings WHERE id = ?",
            &["p3".to_string()],
        )
        .unwrap();
    assert!(rows[0]["description"].is_null());
}

#[test]
fn boolean_and_numeric_values_are_converted() {
    let conn = Connection::open_in_memory().unwrap();
    let rows = conn
        .execute("SELECT TRUE AS flag, 42 AS n, 2.5::DOUBLE AS x", &[])
        .unwrap();
    assert_eq!(rows[0]["flag"], true);
    assert_eq!(rows[0]["n"].as_i64(), Some(42));
    assert!((rows[0]["x"].as_f64().unwrap() - 2.5).abs() < f64::EPSILON);
}

#[test]
fn dates_and_timestamps_render_as_iso_strings() {
    let conn = Connection::open_in_memory().unwrap();
    let rows = conn
        .execute(
            "SELECT DATE '2024-01-15' AS d, TIMESTAMP '2024-01-15 10:30:00' AS t",
            &[],
        )
        .unwrap();
    assert_eq!(rows[0]["d"], "2024-01-15");
    assert_eq!(rows[0]["t"], "2024-01-15T10:30:00.000Z");
}
