//! Raw request surface: a flat map of filter keys to string, list or nested values.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{CatalogError, Result};

// ---------------------------------------------------------------------------
// RawValue
// ---------------------------------------------------------------------------

/// One value of a raw request, as a query-string parser would produce it.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Text(String),
    List(Vec<String>),
    /// Sub-keys, e.g. `price[gte]=10` becomes `price -> {gte: "10"}`.
    Map(BTreeMap<String, RawValue>),
}

impl RawValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this value switches a flag on. `false`, `0` and empty text do not.
    pub fn is_truthy(&self) -> bool {
        match self {
            RawValue::Text(s) => {
                let s = s.trim();
                !(s.is_empty() || s == "0" || s.eq_ignore_ascii_case("false"))
            }
            RawValue::List(items) => !items.is_empty(),
            RawValue::Map(_) => true,
        }
    }

    fn push(self, other: RawValue) -> RawValue {
        match (self, other) {
            (RawValue::Map(mut left), RawValue::Map(right)) => {
                for (key, value) in right {
                    let merged = match left.remove(&key) {
                        Some(existing) => existing.push(value),
                        None => value,
                    };
                    left.insert(key, merged);
                }
                RawValue::Map(left)
            }
            (RawValue::Text(a), RawValue::Text(b)) => RawValue::List(vec![a, b]),
            (RawValue::List(mut items), RawValue::Text(b)) => {
                items.push(b);
                RawValue::List(items)
            }
            (RawValue::Text(a), RawValue::List(rest)) => {
                let mut items = vec![a];
                items.extend(rest);
                RawValue::List(items)
            }
            (RawValue::List(mut items), RawValue::List(rest)) => {
                items.extend(rest);
                RawValue::List(items)
            }
            // Mixing nested and scalar values under one key: the later one wins.
            (_, other) => other,
        }
    }

    fn from_json(value: &Value) -> Option<RawValue> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(RawValue::Text(b.to_string())),
            Value::Number(n) => Some(RawValue::Text(n.to_string())),
            Value::String(s) => Some(RawValue::Text(s.clone())),
            Value::Array(items) => Some(RawValue::List(
                items
                    .iter()
                    .filter_map(|item| match item {
                        Value::String(s) => Some(s.clone()),
                        Value::Number(n) => Some(n.to_string()),
                        Value::Bool(b) => Some(b.to_string()),
                        _ => None,
                    })
                    .collect(),
            )),
            Value::Object(map) => Some(RawValue::Map(
                map.iter()
                    .filter_map(|(k, v)| RawValue::from_json(v).map(|v| (k.clone(), v)))
                    .collect(),
            )),
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<Vec<&str>> for RawValue {
    fn from(values: Vec<&str>) -> Self {
        RawValue::List(values.into_iter().map(String::from).collect())
    }
}

impl<const N: usize> From<[(&str, &str); N]> for RawValue {
    fn from(pairs: [(&str, &str); N]) -> Self {
        RawValue::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), RawValue::Text(v.to_string())))
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// RawQuery
// ---------------------------------------------------------------------------

/// The raw filter map of one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawQuery {
    entries: BTreeMap<String, RawValue>,
}

impl RawQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from already-decoded query-string pairs.
    ///
    /// Supports bracket sub-keys (`price[gte]=10`), list markers
    /// (`color[]=red`) and repeated keys, which collect into a list.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut query = Self::new();
        for (key, value) in pairs {
            let (root, path) = split_brackets(key.as_ref());
            if root.is_empty() {
                continue;
            }
            let value = nest(&path, value.into());
            query.append(root, value);
        }
        query
    }

    /// Build from a JSON object. Nulls are skipped; scalars become text.
    pub fn from_json(value: &Value) -> Result<Self> {
        let map = value.as_object().ok_or_else(|| {
            CatalogError::InvalidArgument("request must be a JSON object".into())
        })?;
        let entries = map
            .iter()
            .filter_map(|(k, v)| RawValue::from_json(v).map(|v| (k.clone(), v)))
            .collect();
        Ok(Self { entries })
    }

    /// Set `key`, replacing any previous value.
    pub fn with(mut self, key: &str, value: impl Into<RawValue>) -> Self {
        self.entries.insert(key.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<RawValue>) {
        self.entries.insert(key.to_string(), value.into());
    }

    /// Add `value` under `key`, merging with an existing value.
    pub fn append(&mut self, key: &str, value: RawValue) {
        let merged = match self.entries.remove(key) {
            Some(existing) => existing.push(value),
            None => value,
        };
        self.entries.insert(key.to_string(), merged);
    }

    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.entries.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(RawValue::as_text)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RawValue)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `a[b][c]` -> (`a`, [`b`, `c`]). An unterminated bracket keeps the key whole.
fn split_brackets(key: &str) -> (&str, Vec<&str>) {
    let Some(open) = key.find('[') else {
        return (key, Vec::new());
    };
    let root = &key[..open];
    let mut path = Vec::new();
    let mut rest = &key[open..];
    while let Some(stripped) = rest.strip_prefix('[') {
        match stripped.find(']') {
            Some(close) => {
                path.push(&stripped[..close]);
                rest = &stripped[close + 1..];
            }
            None => return (key, Vec::new()),
        }
    }
    if !rest.is_empty() {
        return (key, Vec::new());
    }
    (root, path)
}

fn nest(path: &[&str], value: String) -> RawValue {
    match path.split_first() {
        None => RawValue::Text(value),
        Some((&"", _)) => RawValue::List(vec![value]),
        Some((head, tail)) => {
            let mut map = BTreeMap::new();
            map.insert(head.to_string(), nest(tail, value));
            RawValue::Map(map)
        }
    }
}
