//! Turns a [`RawQuery`] into the typed [`ListingFilter`] base predicate.
//!
//! Filtering is best-effort: fragments that cannot be interpreted (invalid
//! field names, unknown sub-keys, unparsable dates) are dropped, never
//! rejected.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::debug;

use super::filter::{Condition, DateRange, FilterOp, FilterValue, KeywordFilter, ListingFilter};
use super::raw::{RawQuery, RawValue};
use crate::config::EngineConfig;
use crate::sql_builder::is_valid_ident;

/// Control keys removed before the remaining map is treated as attribute predicates.
pub const RESERVED_KEYS: [&str; 13] = [
    "keyword",
    "page",
    "limit",
    "resPerPage",
    "lowestBid",
    "highestBid",
    "lowestAsk",
    "highestAsk",
    "recentSales",
    "lowestSale",
    "highestSale",
    // Consumed by the sale overlays.
    "orderStatus",
    "orderType",
];

pub const KEYWORD_KEY: &str = "keyword";

pub struct QueryNormalizer<'a> {
    reserved: &'a [&'a str],
    numeric_keyword_field: Option<&'a str>,
    date_range_field: &'a str,
}

impl<'a> QueryNormalizer<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self {
            reserved: &RESERVED_KEYS,
            numeric_keyword_field: config.numeric_keyword_field.as_deref(),
            date_range_field: &config.date_range_field,
        }
    }

    /// Replace the reserved control-key set.
    pub fn with_reserved(mut self, reserved: &'a [&'a str]) -> Self {
        self.reserved = reserved;
        self
    }

    pub fn normalize(&self, raw: &RawQuery) -> ListingFilter {
        let mut filter = ListingFilter {
            keyword: self.keyword(raw),
            ..ListingFilter::default()
        };

        for (key, value) in raw.iter() {
            if self.reserved.contains(&key.as_str()) || key == self.date_range_field {
                continue;
            }
            if !is_valid_ident(key) {
                debug!(key = %key, "dropping filter with invalid field name");
                continue;
            }
            push_conditions(&mut filter.conditions, key, value);
        }

        // Handled after the generic rewrite so its gte/lte are not also
        // turned into plain range conditions.
        if let Some(value) = raw.get(self.date_range_field) {
            filter.date_range = self.date_range(value);
        }

        debug!(
            conditions = filter.conditions.len(),
            keyword = filter.keyword.is_some(),
            date_range = filter.date_range.is_some(),
            "normalized listing filter"
        );
        filter
    }

    fn keyword(&self, raw: &RawQuery) -> Option<KeywordFilter> {
        let text = raw.text(KEYWORD_KEY)?.trim();
        if text.is_empty() {
            return None;
        }
        let numeric_match = match (self.numeric_keyword_field, parse_number(text)) {
            (Some(field), Some(n)) => Some((field.to_string(), n)),
            _ => None,
        };
        Some(KeywordFilter {
            text: text.to_string(),
            numeric_match,
        })
    }

    fn date_range(&self, value: &RawValue) -> Option<DateRange> {
        let RawValue::Map(bounds) = value else {
            debug!(field = self.date_range_field, "dropping date range without gte/lte");
            return None;
        };
        let bound = |key: &str| {
            bounds
                .get(key)
                .and_then(RawValue::as_text)
                .and_then(parse_timestamp)
        };
        let from = bound("gte");
        let to = bound("lte");
        if from.is_none() && to.is_none() {
            debug!(field = self.date_range_field, "dropping unparsable date range");
            return None;
        }
        Some(DateRange {
            field: self.date_range_field.to_string(),
            from,
            to,
        })
    }
}

fn push_conditions(out: &mut Vec<Condition>, field: &str, value: &RawValue) {
    match value {
        RawValue::Text(s) => out.push(Condition {
            field: field.to_string(),
            op: FilterOp::Eq,
            value: FilterValue::Scalar(s.clone()),
        }),
        RawValue::List(items) if !items.is_empty() => out.push(Condition {
            field: field.to_string(),
            op: FilterOp::In,
            value: FilterValue::List(items.clone()),
        }),
        RawValue::List(_) => {}
        RawValue::Map(sub) => {
            for (sub_key, sub_value) in sub {
                match (FilterOp::from_range_key(sub_key), sub_value) {
                    (Some(op), RawValue::Text(s)) => out.push(Condition {
                        field: field.to_string(),
                        op,
                        value: FilterValue::Scalar(s.clone()),
                    }),
                    _ => debug!(field, sub_key = %sub_key, "dropping unsupported sub-key"),
                }
            }
        }
    }
}

/// Finite numbers only; `NaN` and infinities are treated as text.
pub fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Accepts RFC 3339, `YYYY-MM-DD[ T]HH:MM:SS[.fff]`, `YYYY-MM-DD` and epoch milliseconds.
/// Naive forms are read as UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    text.parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
}
