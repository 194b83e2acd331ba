//! SQL builder with parameterized query construction.
//!
//! All user-supplied values go through DuckDB's parameter binding (`?` placeholders),
//! never through string interpolation. Column names are validated with
//! [`is_valid_ident`] and quoted with [`quote_ident`] before they reach a clause.
//!
//! # Example
//!
//! ```rust
//! use marketplace_catalog::SqlBuilder;
//! let (sql, params) = SqlBuilder::new("listings")
//!     .where_eq("\"brand\"", "acme")
//!     .where_contains("\"name\"", "boot")
//!     .order_by(&["\"id\" ASC"])
//!     .limit(10)
//!     .build();
//! ```

/// Returns `true` for plain identifiers: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_valid_ident(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Double-quote an identifier, escaping embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Builds parameterized SQL queries safely.
///
/// Methods return `&mut Self` for chaining. Parameters are emitted in clause
/// order: FROM subquery, WHERE, HAVING, QUALIFY.
pub struct SqlBuilder {
    select_cols: Vec<String>,
    is_distinct: bool,
    from_table: String,
    from_params: Vec<String>,
    joins: Vec<String>,
    where_clauses: Vec<String>,
    where_params: Vec<String>,
    group_by_cols: Vec<String>,
    having_clauses: Vec<String>,
    having_params: Vec<String>,
    qualify_clauses: Vec<String>,
    order_by_cols: Vec<String>,
    limit_val: Option<usize>,
    offset_val: Option<usize>,
}

impl SqlBuilder {
    /// Create a builder targeting the given table or view.
    pub fn new(table: &str) -> Self {
        Self {
            select_cols: vec!["*".to_string()],
            is_distinct: false,
            from_table: table.to_string(),
            from_params: Vec::new(),
            joins: Vec::new(),
            where_clauses: Vec::new(),
            where_params: Vec::new(),
            group_by_cols: Vec::new(),
            having_clauses: Vec::new(),
            having_params: Vec::new(),
            qualify_clauses: Vec::new(),
            order_by_cols: Vec::new(),
            limit_val: None,
            offset_val: None,
        }
    }

    /// Select from an already-built query, carrying its parameters along.
    ///
    /// Produces `FROM ({sql}) AS {alias}`.
    pub fn from_subquery(sql: &str, params: Vec<String>, alias: &str) -> Self {
        let mut builder = Self::new(&format!("({}) AS {}", sql, alias));
        builder.from_params = params;
        builder
    }

    /// Set the columns to select (replaces the default `*`).
    pub fn select(&mut self, cols: &[&str]) -> &mut Self {
        self.select_cols = cols.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Add DISTINCT to the SELECT clause.
    pub fn distinct(&mut self) -> &mut Self {
        self.is_distinct = true;
        self
    }

    /// Add a JOIN clause.
    pub fn join(&mut self, clause: &str) -> &mut Self {
        self.joins.push(clause.to_string());
        self
    }

    /// Add a WHERE condition with `?` placeholders for each param.
    pub fn where_clause(&mut self, condition: &str, params: &[&str]) -> &mut Self {
        self.where_clauses.push(condition.to_string());
        self.where_params.extend(params.iter().map(|p| p.to_string()));
        self
    }

    /// Add a case-insensitive substring condition.
    ///
    /// Generates: `contains(LOWER(CAST({column} AS VARCHAR)), LOWER(?))`.
    /// Unlike LIKE, `%` and `_` in the value match literally.
    pub fn where_contains(&mut self, column: &str, value: &str) -> &mut Self {
        self.where_clauses.push(contains_condition(column));
        self.where_params.push(value.to_string());
        self
    }

    /// Add an IN condition with parameterized values.
    ///
    /// `placeholder` is the per-value expression, usually `?` or
    /// `CAST(? AS DOUBLE)`. Empty values list produces `FALSE`.
    pub fn where_in(&mut self, column: &str, placeholder: &str, values: &[&str]) -> &mut Self {
        if values.is_empty() {
            self.where_clauses.push("FALSE".to_string());
            return self;
        }
        let placeholders: Vec<&str> = values.iter().map(|_| placeholder).collect();
        self.where_clauses
            .push(format!("{} IN ({})", column, placeholders.join(", ")));
        self.where_params.extend(values.iter().map(|v| v.to_string()));
        self
    }

    /// Add an equality condition: `{column} = ?`.
    pub fn where_eq(&mut self, column: &str, value: &str) -> &mut Self {
        self.where_clauses.push(format!("{} = ?", column));
        self.where_params.push(value.to_string());
        self
    }

    /// Add a greater-than-or-equal condition: `{column} >= ?`.
    pub fn where_gte(&mut self, column: &str, value: &str) -> &mut Self {
        self.where_clauses.push(format!("{} >= ?", column));
        self.where_params.push(value.to_string());
        self
    }

    /// Add a less-than-or-equal condition: `{column} <= ?`.
    pub fn where_lte(&mut self, column: &str, value: &str) -> &mut Self {
        self.where_clauses.push(format!("{} <= ?", column));
        self.where_params.push(value.to_string());
        self
    }

    /// Add OR-combined conditions.
    ///
    /// Each condition is a `(sql_fragment, params)` tuple where the fragment
    /// uses one `?` per param.
    ///
    /// # Example
    ///
    /// ```rust
    /// use marketplace_catalog::SqlBuilder;
    /// let mut builder = SqlBuilder::new("listings");
    /// builder.where_or(vec![
    ///     ("\"name\" = ?".to_string(), vec!["Boot".to_string()]),
    ///     ("\"name\" = ?".to_string(), vec!["Shoe".to_string()]),
    /// ]);
    /// // -> WHERE ("name" = ? OR "name" = ?)
    /// ```
    pub fn where_or(&mut self, conditions: Vec<(String, Vec<String>)>) -> &mut Self {
        if conditions.is_empty() {
            return self;
        }
        let mut or_parts = Vec::with_capacity(conditions.len());
        for (cond, params) in conditions {
            or_parts.push(cond);
            self.where_params.extend(params);
        }
        self.where_clauses
            .push(format!("({})", or_parts.join(" OR ")));
        self
    }

    /// Add GROUP BY columns.
    pub fn group_by(&mut self, cols: &[&str]) -> &mut Self {
        self.group_by_cols
            .extend(cols.iter().map(|c| c.to_string()));
        self
    }

    /// Add a HAVING condition with `?` placeholders.
    pub fn having(&mut self, condition: &str, params: &[&str]) -> &mut Self {
        self.having_clauses.push(condition.to_string());
        self.having_params.extend(params.iter().map(|p| p.to_string()));
        self
    }

    /// Add a QUALIFY condition (filters on window function results).
    pub fn qualify(&mut self, condition: &str) -> &mut Self {
        self.qualify_clauses.push(condition.to_string());
        self
    }

    /// Add ORDER BY clauses (e.g. `"\"price\" ASC"`).
    pub fn order_by(&mut self, clauses: &[&str]) -> &mut Self {
        self.order_by_cols
            .extend(clauses.iter().map(|c| c.to_string()));
        self
    }

    /// Set the maximum number of rows to return.
    pub fn limit(&mut self, n: usize) -> &mut Self {
        self.limit_val = Some(n);
        self
    }

    /// Set the number of rows to skip before returning results.
    pub fn offset(&mut self, n: usize) -> &mut Self {
        self.offset_val = Some(n);
        self
    }

    /// Build the final SQL string and parameter list.
    pub fn build(&self) -> (String, Vec<String>) {
        let distinct = if self.is_distinct { "DISTINCT " } else { "" };
        let cols = self.select_cols.join(", ");
        let mut parts = vec![
            format!("SELECT {}{}", distinct, cols),
            format!("FROM {}", self.from_table),
        ];

        for j in &self.joins {
            parts.push(j.clone());
        }

        if !self.where_clauses.is_empty() {
            parts.push(format!("WHERE {}", self.where_clauses.join(" AND ")));
        }

        if !self.group_by_cols.is_empty() {
            parts.push(format!("GROUP BY {}", self.group_by_cols.join(", ")));
        }

        if !self.having_clauses.is_empty() {
            parts.push(format!("HAVING {}", self.having_clauses.join(" AND ")));
        }

        if !self.qualify_clauses.is_empty() {
            parts.push(format!("QUALIFY {}", self.qualify_clauses.join(" AND ")));
        }

        if !self.order_by_cols.is_empty() {
            parts.push(format!("ORDER BY {}", self.order_by_cols.join(", ")));
        }

        if let Some(n) = self.limit_val {
            parts.push(format!("LIMIT {}", n));
        }

        if let Some(n) = self.offset_val {
            parts.push(format!("OFFSET {}", n));
        }

        let mut params = Vec::with_capacity(
            self.from_params.len() + self.where_params.len() + self.having_params.len(),
        );
        params.extend(self.from_params.iter().cloned());
        params.extend(self.where_params.iter().cloned());
        params.extend(self.having_params.iter().cloned());

        (parts.join("\n"), params)
    }
}

/// Case-insensitive substring fragment with a single `?` placeholder.
pub fn contains_condition(column: &str) -> String {
    format!("contains(LOWER(CAST({} AS VARCHAR)), LOWER(?))", column)
}
