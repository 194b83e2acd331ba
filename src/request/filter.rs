//! Typed listing predicate produced by the normalizer and consumed by a
//! [`ListingStore`](crate::store::ListingStore).

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    In,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl FilterOp {
    /// Parse a range sub-key (`gt`, `gte`, `lt`, `lte`).
    pub fn from_range_key(key: &str) -> Option<Self> {
        match key {
            "gt" => Some(FilterOp::Gt),
            "gte" => Some(FilterOp::Gte),
            "lt" => Some(FilterOp::Lt),
            "lte" => Some(FilterOp::Lte),
            _ => None,
        }
    }

    pub fn sql_operator(self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::In => "IN",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Scalar(String),
    List(Vec<String>),
}

/// One attribute predicate: `field op value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: FilterOp,
    pub value: FilterValue,
}

/// Free-text search across the keyword fields, plus an optional exact
/// numeric match when the keyword parses as a number.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordFilter {
    pub text: String,
    pub numeric_match: Option<(String, f64)>,
}

/// Inclusive timestamp range over one listing attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct DateRange {
    pub field: String,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Base predicate: keyword AND conditions AND date range AND id restriction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingFilter {
    pub keyword: Option<KeywordFilter>,
    pub conditions: Vec<Condition>,
    pub date_range: Option<DateRange>,
    /// `id IN {...}` when an overlay restricts membership. An empty set
    /// matches nothing.
    pub restrict_ids: Option<BTreeSet<String>>,
}

impl ListingFilter {
    pub fn is_unrestricted(&self) -> bool {
        self.keyword.is_none()
            && self.conditions.is_empty()
            && self.date_range.is_none()
            && self.restrict_ids.is_none()
    }
}
