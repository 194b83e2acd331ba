//! DuckDB connection wrapper with table loading and query execution.
//!
//! Listings are loaded with an auto-detected (open) schema; order records
//! (bids, asks, sales) are loaded against the fixed schemas in
//! [`config::record_columns`] so absent keys become NULL and timestamps are
//! real `TIMESTAMP` columns.

use crate::config;
use crate::error::{CatalogError, Result};
use crate::sql_builder::quote_ident;
use chrono::{DateTime, NaiveDate, SecondsFormat};
use duckdb::types::{TimeUnit, ValueRef};
use duckdb::Connection as DuckDbConnection;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

/// Wraps an in-memory DuckDB database holding the catalog tables.
///
/// The connection is `Send + Sync`. Each query runs on its own cloned
/// handle, so overlay computations on different threads do not contend for
/// a single DuckDB handle.
pub struct Connection {
    conn: Mutex<DuckDbConnection>,
}

impl Connection {
    /// Open an empty in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = DuckDbConnection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database and load every table found in `dir`.
    pub fn from_data_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let conn = Self::open_in_memory()?;
        conn.load_data_dir(dir)?;
        Ok(conn)
    }

    /// Load `listings`, `bids`, `asks` and `sales` from a data directory.
    ///
    /// For each table the first existing file among `<table>.parquet`,
    /// `<table>.ndjson` and `<table>.jsonl` is used. A missing listings file
    /// is an error; missing record files leave an empty table behind.
    pub fn load_data_dir<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(CatalogError::NotFound(format!(
                "data directory {}",
                dir.display()
            )));
        }

        for table in config::TABLES {
            let found = config::data_files(table)
                .into_iter()
                .map(|name| dir.join(name))
                .find(|path| path.is_file());

            match found {
                Some(path) => {
                    let path_str = path.to_string_lossy();
                    let is_parquet = path
                        .extension()
                        .map(|ext| ext == "parquet")
                        .unwrap_or(false);
                    let is_record = config::record_columns(table).is_some();
                    match (is_parquet, is_record) {
                        (true, true) => self.register_records_from_parquet(table, &path_str)?,
                        (true, false) => self.register_table_from_parquet(table, &path_str)?,
                        (false, true) => self.register_records_from_ndjson(table, &path_str)?,
                        (false, false) => self.register_table_from_ndjson(table, &path_str)?,
                    }
                }
                None if table == config::LISTINGS_TABLE => {
                    return Err(CatalogError::NotFound(format!(
                        "no listings file in {}",
                        dir.display()
                    )));
                }
                None => {}
            }
        }

        self.ensure_record_tables()
    }

    /// Create any record table missing from the database, empty.
    ///
    /// Tables that already exist are left untouched, however they were created.
    pub fn ensure_record_tables(&self) -> Result<()> {
        for table in [config::BIDS_TABLE, config::ASKS_TABLE, config::SALES_TABLE] {
            let columns = record_columns_ddl(table)?;
            self.handle()?.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {} ({})",
                quote_ident(table),
                columns
            ))?;
        }
        Ok(())
    }

    /// Execute SQL and return results as a `Vec` of `HashMap`s.
    ///
    /// Each row is represented as a `HashMap<String, serde_json::Value>`.
    /// Automatically converts DuckDB types to `serde_json::Value`.
    pub fn execute(
        &self,
        sql: &str,
        params: &[String],
    ) -> Result<Vec<HashMap<String, serde_json::Value>>> {
        let conn = self.handle()?;
        let mut stmt = conn.prepare(sql)?;

        let param_values: Vec<&dyn duckdb::ToSql> = params
            .iter()
            .map(|p| p as &dyn duckdb::ToSql)
            .collect();

        let mut rows = stmt.query(param_values.as_slice())?;

        // Column metadata is only available once the statement has run.
        let (column_names, column_count) = match rows.as_ref() {
            Some(stmt) => (
                stmt.column_names()
                    .into_iter()
                    .map(|s| s.to_string())
                    .collect::<Vec<String>>(),
                stmt.column_count(),
            ),
            None => return Ok(Vec::new()),
        };

        let mut out: Vec<HashMap<String, serde_json::Value>> = Vec::new();

        while let Some(row) = rows.next()? {
            let mut map = HashMap::with_capacity(column_count);
            for (i, col_name) in column_names.iter().enumerate().take(column_count) {
                let value = convert_value_ref(row.get_ref(i)?);
                map.insert(col_name.clone(), value);
            }
            out.push(map);
        }

        Ok(out)
    }

    /// Execute SQL and deserialize each row into type `T`.
    pub fn execute_into<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: &[String],
    ) -> Result<Vec<T>> {
        let rows = self.execute(sql, params)?;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let value = serde_json::Value::Object(
                row.into_iter().collect::<serde_json::Map<String, serde_json::Value>>(),
            );
            let item: T = serde_json::from_value(value)?;
            results.push(item);
        }
        Ok(results)
    }

    /// Execute SQL and return the first column of the first row.
    ///
    /// Returns `None` if the result set is empty.
    pub fn execute_scalar(
        &self,
        sql: &str,
        params: &[String],
    ) -> Result<Option<serde_json::Value>> {
        let conn = self.handle()?;
        let mut stmt = conn.prepare(sql)?;
        let param_values: Vec<&dyn duckdb::ToSql> = params
            .iter()
            .map(|p| p as &dyn duckdb::ToSql)
            .collect();

        let mut rows = stmt.query(param_values.as_slice())?;

        if let Some(row) = rows.next()? {
            Ok(Some(convert_value_ref(row.get_ref(0)?)))
        } else {
            Ok(None)
        }
    }

    /// Create a table from a newline-delimited JSON file, auto-detecting its schema.
    pub fn register_table_from_ndjson(&self, table_name: &str, ndjson_path: &str) -> Result<()> {
        let path_fwd = escape_path(ndjson_path);
        let table = quote_ident(table_name);
        self.handle()?.execute_batch(&format!(
            "CREATE OR REPLACE TABLE {} AS \
             SELECT * FROM read_json_auto('{}', format='newline_delimited')",
            table, path_fwd
        ))?;
        info!(table = table_name, path = ndjson_path, "loaded table");
        Ok(())
    }

    /// Create an order-record table from newline-delimited JSON using its fixed schema.
    ///
    /// Keys missing from a line load as NULL; keys outside the schema are ignored.
    pub fn register_records_from_ndjson(&self, table_name: &str, ndjson_path: &str) -> Result<()> {
        let columns = config::record_columns(table_name).ok_or_else(|| {
            CatalogError::InvalidArgument(format!("{} is not an order record table", table_name))
        })?;
        let spec = columns
            .iter()
            .map(|(name, ty)| format!("'{}': '{}'", name, ty))
            .collect::<Vec<_>>()
            .join(", ");
        let projection = columns
            .iter()
            .map(|(name, _)| quote_ident(name))
            .collect::<Vec<_>>()
            .join(", ");

        self.handle()?.execute_batch(&format!(
            "CREATE OR REPLACE TABLE {} AS \
             SELECT {} FROM read_json('{}', format='newline_delimited', columns={{{}}})",
            quote_ident(table_name),
            projection,
            escape_path(ndjson_path),
            spec
        ))?;
        info!(table = table_name, path = ndjson_path, "loaded order records");
        Ok(())
    }

    /// Create a table from a parquet file.
    pub fn register_table_from_parquet(&self, table_name: &str, parquet_path: &str) -> Result<()> {
        self.handle()?.execute_batch(&format!(
            "CREATE OR REPLACE TABLE {} AS SELECT * FROM read_parquet('{}')",
            quote_ident(table_name),
            escape_path(parquet_path)
        ))?;
        info!(table = table_name, path = parquet_path, "loaded parquet table");
        Ok(())
    }

    /// Create an order-record table from parquet, coerced to its fixed schema.
    ///
    /// Columns the file lacks load as NULL. Values that do not convert to the
    /// schema type (e.g. unparsable timestamp strings) load as NULL too.
    pub fn register_records_from_parquet(&self, table_name: &str, parquet_path: &str) -> Result<()> {
        let columns = config::record_columns(table_name).ok_or_else(|| {
            CatalogError::InvalidArgument(format!("{} is not an order record table", table_name))
        })?;
        let path_fwd = escape_path(parquet_path);

        let conn = self.handle()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT column_name FROM (DESCRIBE SELECT * FROM read_parquet('{}'))",
            path_fwd
        ))?;
        let mut rows = stmt.query([])?;
        let mut present: Vec<String> = Vec::new();
        while let Some(row) = rows.next()? {
            present.push(row.get(0)?);
        }

        let projection = columns
            .iter()
            .map(|(name, ty)| {
                let column = quote_ident(name);
                if present.iter().any(|p| p == name) {
                    format!("TRY_CAST({} AS {}) AS {}", column, ty, column)
                } else {
                    format!("CAST(NULL AS {}) AS {}", ty, column)
                }
            })
            .collect::<Vec<_>>()
            .join(", ");

        conn.execute_batch(&format!(
            "CREATE OR REPLACE TABLE {} AS SELECT {} FROM read_parquet('{}')",
            quote_ident(table_name),
            projection,
            path_fwd
        ))?;
        info!(table = table_name, path = parquet_path, "loaded parquet order records");
        Ok(())
    }

    /// Return `(column_name, column_type)` pairs for a table via `DESCRIBE`.
    pub fn table_schema(&self, table_name: &str) -> Result<Vec<(String, String)>> {
        let conn = self.handle()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT column_name, column_type FROM (DESCRIBE {})",
            quote_ident(table_name)
        ))?;

        let mut rows = stmt.query([])?;
        let mut schema = Vec::new();
        while let Some(row) = rows.next()? {
            let col_name: String = row.get(0)?;
            let col_type: String = row.get(1)?;
            schema.push((col_name, col_type));
        }
        Ok(schema)
    }

    /// Check whether the database holds a table with this name.
    pub fn has_table(&self, name: &str) -> bool {
        self.tables()
            .map(|tables| tables.iter().any(|t| t == name))
            .unwrap_or(false)
    }

    /// Return the sorted names of all tables in the database.
    pub fn tables(&self) -> Result<Vec<String>> {
        let conn = self.handle()?;
        let mut stmt = conn.prepare(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = 'main' ORDER BY table_name",
        )?;
        let mut rows = stmt.query([])?;
        let mut names = Vec::new();
        while let Some(row) = rows.next()? {
            names.push(row.get(0)?);
        }
        Ok(names)
    }

    /// Clone a fresh handle onto the shared database.
    pub fn handle(&self) -> Result<DuckDbConnection> {
        let guard = self.lock()?;
        Ok(guard.try_clone()?)
    }

    fn lock(&self) -> Result<MutexGuard<'_, DuckDbConnection>> {
        self.conn
            .lock()
            .map_err(|_| CatalogError::Task("connection lock poisoned".into()))
    }
}

fn record_columns_ddl(table: &str) -> Result<String> {
    let columns = config::record_columns(table).ok_or_else(|| {
        CatalogError::InvalidArgument(format!("{} is not an order record table", table))
    })?;
    Ok(columns
        .iter()
        .map(|(name, ty)| format!("{} {}", quote_ident(name), ty))
        .collect::<Vec<_>>()
        .join(", "))
}

/// Forward slashes for DuckDB, single quotes doubled for the string literal.
fn escape_path(path: &str) -> String {
    path.replace('\\', "/").replace('\'', "''")
}

/// Convert a DuckDB `ValueRef` to a `serde_json::Value`.
fn convert_value_ref(val: ValueRef<'_>) -> serde_json::Value {
    match val {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Boolean(b) => serde_json::Value::Bool(b),
        ValueRef::TinyInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::SmallInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::Int(n) => serde_json::Value::Number(n.into()),
        ValueRef::BigInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::UTinyInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::USmallInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::UInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::UBigInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::HugeInt(n) => {
            if let Ok(i) = i64::try_from(n) {
                serde_json::Value::Number(i.into())
            } else {
                serde_json::Value::String(n.to_string())
            }
        }
        ValueRef::Float(f) => serde_json::Number::from_f64(f as f64)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Double(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(bytes) => {
            serde_json::Value::String(String::from_utf8_lossy(bytes).to_string())
        }
        ValueRef::Timestamp(unit, v) => {
            let micros = match unit {
                TimeUnit::Second => v.saturating_mul(1_000_000),
                TimeUnit::Millisecond => v.saturating_mul(1_000),
                TimeUnit::Microsecond => v,
                TimeUnit::Nanosecond => v / 1_000,
            };
            DateTime::from_timestamp_micros(micros)
                .map(|ts| {
                    serde_json::Value::String(ts.to_rfc3339_opts(SecondsFormat::Millis, true))
                })
                .unwrap_or(serde_json::Value::Null)
        }
        ValueRef::Date32(days) => NaiveDate::from_ymd_opt(1970, 1, 1)
            .and_then(|epoch| epoch.checked_add_signed(chrono::Duration::days(days as i64)))
            .map(|d| serde_json::Value::String(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Blob(bytes) => serde_json::Value::String(format!(
            "blob:{}",
            bytes.iter().map(|b| format!("{:02x}", b)).collect::<String>()
        )),
        // Remaining types (Time, Interval, List, Struct, ...) are not part of
        // the catalog model.
        _ => serde_json::Value::Null,
    }
}
