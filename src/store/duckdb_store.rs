//! [`ListingStore`] and [`WinnerStore`] over the DuckDB catalog tables.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::{ListingStore, MatchCriteria, WinnerStore};
use crate::config;
use crate::connection::Connection;
use crate::error::{CatalogError, Result};
use crate::models::{Listing, OrderRecord, SortKey};
use crate::request::normalizer::{parse_number, parse_timestamp};
use crate::request::{Condition, DateRange, FilterOp, FilterValue, KeywordFilter, ListingFilter};
use crate::sql_builder::{contains_condition, quote_ident, SqlBuilder};

const NUMERIC_TYPES: [&str; 14] = [
    "TINYINT", "SMALLINT", "INTEGER", "BIGINT", "HUGEINT", "UTINYINT", "USMALLINT", "UINTEGER",
    "UBIGINT", "UHUGEINT", "FLOAT", "DOUBLE", "REAL", "DECIMAL",
];

fn is_numeric(column_type: &str) -> bool {
    let upper = column_type.to_ascii_uppercase();
    NUMERIC_TYPES.iter().any(|t| upper.starts_with(t))
}

fn is_temporal(column_type: &str) -> bool {
    let upper = column_type.to_ascii_uppercase();
    upper.starts_with("DATE") || upper.starts_with("TIMESTAMP")
}

/// JSON, LIST, ARRAY, STRUCT, MAP and UNION columns.
fn is_nested(column_type: &str) -> bool {
    let upper = column_type.to_ascii_uppercase();
    upper == "JSON"
        || upper.ends_with(']')
        || upper.starts_with("STRUCT")
        || upper.starts_with("MAP")
        || upper.starts_with("UNION")
}

/// Catalog store backed by a shared [`Connection`].
///
/// Cheap to clone; clones share the same database.
#[derive(Clone)]
pub struct DuckDbStore {
    conn: Arc<Connection>,
}

impl DuckDbStore {
    pub fn new(conn: Arc<Connection>) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn listing_schema(&self) -> Result<HashMap<String, String>> {
        Ok(self
            .conn
            .table_schema(config::LISTINGS_TABLE)?
            .into_iter()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Listing lookup
// ---------------------------------------------------------------------------

impl ListingStore for DuckDbStore {
    fn find(&self, filter: &ListingFilter) -> Result<Vec<Listing>> {
        let schema = self.listing_schema()?;

        // Nested attributes travel as JSON text and are parsed back below.
        let mut nested: Vec<&str> = schema
            .iter()
            .filter(|(name, ty)| name.as_str() != "id" && is_nested(ty))
            .map(|(name, _)| name.as_str())
            .collect();
        nested.sort_unstable();

        let mut replace = vec!["CAST(\"id\" AS VARCHAR) AS \"id\"".to_string()];
        replace.extend(
            nested
                .iter()
                .map(|name| format!("CAST(to_json({0}) AS VARCHAR) AS {0}", quote_ident(name))),
        );
        let projection = format!("* REPLACE ({})", replace.join(", "));

        let mut qb = SqlBuilder::new(&quote_ident(config::LISTINGS_TABLE));
        qb.select(&[projection.as_str()]);

        if let Some(keyword) = &filter.keyword {
            push_keyword(&mut qb, &schema, keyword);
        }

        for condition in &filter.conditions {
            push_condition(&mut qb, &schema, condition);
        }

        if let Some(range) = &filter.date_range {
            push_date_range(&mut qb, &schema, range);
        }

        if let Some(ids) = &filter.restrict_ids {
            let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
            qb.where_in("CAST(\"id\" AS VARCHAR)", "?", &ids);
        }

        qb.order_by(&["\"id\" ASC"]);

        let (sql, params) = qb.build();
        self.conn
            .execute(&sql, &params)?
            .into_iter()
            .map(|mut row| -> Result<Listing> {
                for name in &nested {
                    let parsed = match row.get(*name) {
                        Some(Value::String(text)) => serde_json::from_str::<Value>(text)?,
                        _ => continue,
                    };
                    row.insert((*name).to_string(), parsed);
                }
                Ok(serde_json::from_value(Value::Object(
                    row.into_iter().collect(),
                ))?)
            })
            .collect()
    }
}

fn push_keyword(qb: &mut SqlBuilder, schema: &HashMap<String, String>, keyword: &KeywordFilter) {
    let mut any_of: Vec<(String, Vec<String>)> = config::KEYWORD_FIELDS
        .iter()
        .filter(|field| schema.contains_key(**field))
        .map(|field| (contains_condition(&quote_ident(field)), vec![keyword.text.clone()]))
        .collect();

    if let Some((field, number)) = &keyword.numeric_match {
        match schema.get(field) {
            Some(ty) if is_numeric(ty) => any_of.push((
                format!("{} = CAST(? AS DOUBLE)", quote_ident(field)),
                vec![number.to_string()],
            )),
            Some(_) => any_of.push((
                format!("CAST({} AS VARCHAR) = ?", quote_ident(field)),
                vec![keyword.text.clone()],
            )),
            None => {}
        }
    }

    if any_of.is_empty() {
        qb.where_clause("FALSE", &[]);
    } else {
        qb.where_or(any_of);
    }
}

/// Unknown columns match nothing. Values that cannot be compared against
/// the column's type are dropped.
fn push_condition(qb: &mut SqlBuilder, schema: &HashMap<String, String>, condition: &Condition) {
    let Some(column_type) = schema.get(&condition.field) else {
        qb.where_clause("FALSE", &[]);
        return;
    };
    let column = quote_ident(&condition.field);
    let numeric = is_numeric(column_type);

    match &condition.value {
        FilterValue::List(items) => {
            if numeric {
                let numbers: Vec<String> = items
                    .iter()
                    .filter_map(|item| parse_number(item))
                    .map(|n| n.to_string())
                    .collect();
                if numbers.is_empty() {
                    debug!(field = %condition.field, "dropping non-numeric list filter");
                    return;
                }
                let refs: Vec<&str> = numbers.iter().map(String::as_str).collect();
                qb.where_in(&column, "CAST(? AS DOUBLE)", &refs);
            } else {
                let refs: Vec<&str> = items.iter().map(String::as_str).collect();
                qb.where_in(&format!("CAST({} AS VARCHAR)", column), "?", &refs);
            }
        }
        FilterValue::Scalar(value) => {
            let op = match condition.op {
                FilterOp::In => FilterOp::Eq,
                op => op,
            }
            .sql_operator();

            if numeric {
                match parse_number(value) {
                    Some(n) => {
                        qb.where_clause(
                            &format!("{} {} CAST(? AS DOUBLE)", column, op),
                            &[n.to_string().as_str()],
                        );
                    }
                    None => debug!(field = %condition.field, value = %value, "dropping non-numeric filter"),
                }
            } else if is_temporal(column_type) {
                match parse_timestamp(value) {
                    Some(ts) => {
                        qb.where_clause(
                            &format!("epoch_ms(CAST({} AS TIMESTAMP)) {} CAST(? AS BIGINT)", column, op),
                            &[ts.timestamp_millis().to_string().as_str()],
                        );
                    }
                    None => debug!(field = %condition.field, value = %value, "dropping unparsable date filter"),
                }
            } else {
                qb.where_clause(&format!("CAST({} AS VARCHAR) {} ?", column, op), &[value.as_str()]);
            }
        }
    }
}

fn push_date_range(qb: &mut SqlBuilder, schema: &HashMap<String, String>, range: &DateRange) {
    if !schema.contains_key(&range.field) {
        qb.where_clause("FALSE", &[]);
        return;
    }
    let expr = format!("epoch_ms(TRY_CAST({} AS TIMESTAMP))", quote_ident(&range.field));
    if let Some(from) = range.from {
        qb.where_clause(
            &format!("{} >= CAST(? AS BIGINT)", expr),
            &[from.timestamp_millis().to_string().as_str()],
        );
    }
    if let Some(to) = range.to {
        qb.where_clause(
            &format!("{} <= CAST(? AS BIGINT)", expr),
            &[to.timestamp_millis().to_string().as_str()],
        );
    }
}

// ---------------------------------------------------------------------------
// Winner per listing
// ---------------------------------------------------------------------------

impl<R: OrderRecord> WinnerStore<R> for DuckDbStore {
    fn grouped_winners(&self, criteria: &MatchCriteria, sort: &[SortKey]) -> Result<Vec<R>> {
        let columns = config::record_columns(R::TABLE).ok_or_else(|| {
            CatalogError::InvalidArgument(format!("{} is not an order record table", R::TABLE))
        })?;

        let mut ranked = SqlBuilder::new(&quote_ident(R::TABLE));
        ranked
            .where_clause("\"id\" IS NOT NULL", &[])
            .where_clause("\"listingId\" IS NOT NULL", &[])
            .where_clause("\"createdAt\" IS NOT NULL", &[]);

        // A record missing any ordering value can never win.
        for key in sort {
            ranked.where_clause(
                &format!("{} IS NOT NULL", quote_ident(R::sort_column(key.field))),
                &[],
            );
        }

        match criteria {
            MatchCriteria::Open { status, now } => {
                ranked.where_eq("\"status\"", status).where_clause(
                    "(\"validUntil\" IS NULL OR epoch_ms(\"validUntil\") > CAST(? AS BIGINT))",
                    &[now.timestamp_millis().to_string().as_str()],
                );
            }
            MatchCriteria::Completed {
                order_status,
                order_type,
            } => {
                ranked.where_eq("\"orderStatus\"", order_status);
                if let Some(order_type) = order_type {
                    ranked.where_eq("\"orderType\"", order_type);
                }
            }
        }

        let mut order: Vec<String> = sort
            .iter()
            .map(|key| {
                format!(
                    "{} {}",
                    quote_ident(R::sort_column(key.field)),
                    if key.descending { "DESC" } else { "ASC" }
                )
            })
            .collect();
        order.push("\"id\" ASC".to_string());
        ranked.qualify(&format!(
            "ROW_NUMBER() OVER (PARTITION BY \"listingId\" ORDER BY {}) = 1",
            order.join(", ")
        ));
        let (ranked_sql, ranked_params) = ranked.build();

        let projection: Vec<String> = columns
            .iter()
            .map(|(name, ty)| {
                if *ty == "TIMESTAMP" {
                    format!("epoch_ms({0}) AS {0}", quote_ident(name))
                } else {
                    quote_ident(name)
                }
            })
            .collect();
        let projection: Vec<&str> = projection.iter().map(String::as_str).collect();

        let (sql, params) = SqlBuilder::from_subquery(&ranked_sql, ranked_params, "winners")
            .select(&projection)
            .order_by(&["\"listingId\" ASC"])
            .build();

        let winners: Vec<R> = self.conn.execute_into(&sql, &params)?;
        debug!(table = R::TABLE, winners = winners.len(), "grouped winners");
        Ok(winners)
    }
}
