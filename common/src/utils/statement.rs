//! Parameterized statement builder.
//!
//! [`StatementBuilder`] is the only way dynamic SQL is assembled. It accepts
//! three kinds of input, each through its own path:
//!
//! - SQL keywords and punctuation, as `&'static str` only
//! - identifiers, as [`Ident`] only (always quoted)
//! - values, as [`SqlValue`] only (always bound as a parameter)
//!
//! Caller-supplied text can therefore never become SQL syntax.

use std::collections::HashSet;

use crate::errors::{AppError, AppResult};
use crate::models::{ColumnValue, DbType};
use crate::utils::ident::Ident;

/// SQL dialect of the target database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

/// Longest identifier Postgres keeps without truncation.
pub const POSTGRES_MAX_IDENT_LEN: usize = 63;

impl Dialect {
    /// Longest identifier the database accepts without truncating it.
    pub fn max_ident_len(self) -> Option<usize> {
        match self {
            Dialect::Postgres => Some(POSTGRES_MAX_IDENT_LEN),
            Dialect::Sqlite => None,
        }
    }

    /// Renders the placeholder of the 1-based parameter `index`.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Sqlite => format!("?{index}"),
        }
    }
}

impl From<DbType> for Dialect {
    fn from(db_type: DbType) -> Self {
        match db_type {
            DbType::Postgres => Dialect::Postgres,
            DbType::SQLite => Dialect::Sqlite,
        }
    }
}

/// A value bound to a statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl SqlValue {
    /// Returns whether this is SQL `NULL`.
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Converts the value to its text form. `Null` stays `Null`.
    pub fn into_text(self) -> Self {
        match self {
            SqlValue::Null | SqlValue::Text(_) => self,
            SqlValue::Bool(b) => SqlValue::Text(b.to_string()),
            SqlValue::Int(i) => SqlValue::Text(i.to_string()),
            SqlValue::Float(f) => SqlValue::Text(f.to_string()),
        }
    }
}

impl From<serde_json::Value> for SqlValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SqlValue::Int(i)
                } else if n.is_u64() {
                    SqlValue::Text(n.to_string())
                } else {
                    n.as_f64().map(SqlValue::Float).unwrap_or(SqlValue::Text(n.to_string()))
                }
            }
            Value::String(s) => SqlValue::Text(s),
            // Structured values are stored as their JSON text (json/jsonb columns).
            other @ (Value::Array(_) | Value::Object(_)) => SqlValue::Text(other.to_string()),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

/// A column paired with the value it is set to (or compared against).
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Target column.
    pub column: Ident,
    /// Bound value.
    pub value: SqlValue,
    /// Catalog type the placeholder is cast to (Postgres only).
    pub cast: Option<Ident>,
}

impl Assignment {
    /// Creates an assignment without a type cast.
    pub fn new(column: Ident, value: impl Into<SqlValue>) -> Self {
        Self {
            column,
            value: value.into(),
            cast: None,
        }
    }

    /// Sets the type the placeholder is cast to.
    pub fn with_cast(mut self, cast: Option<Ident>) -> Self {
        self.cast = cast;
        self
    }

    /// Converts caller-supplied column values, validating every name.
    pub fn from_column_values(columns: &[ColumnValue]) -> AppResult<Vec<Self>> {
        columns
            .iter()
            .map(|c| Ok(Self::new(Ident::new(c.name.as_str())?, SqlValue::from(c.value.clone()))))
            .collect()
    }
}

/// A finished statement: SQL text plus its parameters in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    params: Vec<SqlValue>,
}

impl Statement {
    /// Returns the SQL text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Returns the bound parameters in placeholder order.
    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    /// Builds `INSERT INTO "t" ("c1", ...) VALUES ($1, ...)`.
    ///
    /// # Errors
    /// `InvalidArgument` when `assignments` is empty or names a column twice.
    pub fn insert(dialect: Dialect, table: &Ident, assignments: &[Assignment]) -> AppResult<Self> {
        check_assignments(assignments)?;

        let mut b = StatementBuilder::new(dialect);
        b.push("INSERT INTO ").ident(table).push(" (");
        for (i, a) in assignments.iter().enumerate() {
            if i > 0 {
                b.push(", ");
            }
            b.ident(&a.column);
        }
        b.push(") VALUES (");
        for (i, a) in assignments.iter().enumerate() {
            if i > 0 {
                b.push(", ");
            }
            b.bind(a.value.clone(), a.cast.as_ref());
        }
        b.push(")");
        b.finish()
    }

    /// Builds `UPDATE "t" SET "c1" = $1, ... WHERE "pk" = $n`.
    ///
    /// # Errors
    /// `InvalidArgument` for an empty or duplicated column set, or a null key.
    pub fn update(
        dialect: Dialect,
        table: &Ident,
        key: &Assignment,
        assignments: &[Assignment],
    ) -> AppResult<Self> {
        check_assignments(assignments)?;
        check_key(key)?;

        let mut b = StatementBuilder::new(dialect);
        b.push("UPDATE ").ident(table).push(" SET ");
        for (i, a) in assignments.iter().enumerate() {
            if i > 0 {
                b.push(", ");
            }
            b.ident(&a.column).push(" = ").bind(a.value.clone(), a.cast.as_ref());
        }
        b.push(" WHERE ");
        b.ident(&key.column).push(" = ").bind(key.value.clone(), key.cast.as_ref());
        b.finish()
    }

    /// Builds `DELETE FROM "t" WHERE "pk" = $1`.
    ///
    /// # Errors
    /// `InvalidArgument` for a null key.
    pub fn delete(dialect: Dialect, table: &Ident, key: &Assignment) -> AppResult<Self> {
        check_key(key)?;

        let mut b = StatementBuilder::new(dialect);
        b.push("DELETE FROM ").ident(table).push(" WHERE ");
        b.ident(&key.column).push(" = ").bind(key.value.clone(), key.cast.as_ref());
        b.finish()
    }

    /// Builds a row listing that renders every column as text, ordered by
    /// the first column descending.
    ///
    /// # Errors
    /// `InvalidArgument` when `columns` is empty.
    pub fn select_rows(
        dialect: Dialect,
        table: &Ident,
        columns: &[Ident],
        limit: u32,
    ) -> AppResult<Self> {
        let Some(first) = columns.first() else {
            return Err(AppError::InvalidArgument(format!(
                "table {} has no columns",
                table
            )));
        };

        let mut b = StatementBuilder::new(dialect);
        b.push("SELECT ");
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                b.push(", ");
            }
            b.text_column(column).push(" AS ").ident(column);
        }
        b.push(" FROM ").ident(table);
        // Qualified so the sort uses the native column, not the text alias.
        b.push(" ORDER BY ").qualified(table, first).push(" DESC LIMIT ");
        b.bind(SqlValue::Int(i64::from(limit)), None);
        b.finish()
    }
}

fn check_assignments(assignments: &[Assignment]) -> AppResult<()> {
    if assignments.is_empty() {
        return Err(AppError::InvalidArgument("at least one column is required".into()));
    }
    let mut seen = HashSet::with_capacity(assignments.len());
    for a in assignments {
        if !seen.insert(a.column.as_str()) {
            return Err(AppError::InvalidArgument(format!(
                "duplicate column: {}",
                a.column
            )));
        }
    }
    Ok(())
}

fn check_key(key: &Assignment) -> AppResult<()> {
    if key.value.is_null() {
        return Err(AppError::InvalidArgument(format!(
            "primary key {} must not be null",
            key.column
        )));
    }
    Ok(())
}

/// Incremental statement assembly.
#[derive(Debug)]
pub struct StatementBuilder {
    dialect: Dialect,
    sql: String,
    params: Vec<SqlValue>,
    error: Option<AppError>,
}

impl StatementBuilder {
    /// Creates an empty builder for `dialect`.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            sql: String::new(),
            params: Vec::new(),
            error: None,
        }
    }

    /// Appends fixed SQL text.
    pub fn push(&mut self, sql: &'static str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    /// Appends a quoted identifier.
    ///
    /// A name longer than the dialect allows fails the statement at
    /// [`finish`](Self::finish).
    pub fn ident(&mut self, ident: &Ident) -> &mut Self {
        if let Some(max) = self.dialect.max_ident_len() {
            if ident.as_str().len() > max && self.error.is_none() {
                self.error = Some(AppError::InvalidArgument(format!(
                    "identifier longer than {} bytes: {}",
                    max, ident
                )));
            }
        }
        self.sql.push_str(&ident.quoted());
        self
    }

    /// Appends `"table"."column"`.
    pub fn qualified(&mut self, table: &Ident, column: &Ident) -> &mut Self {
        self.ident(table).push(".").ident(column)
    }

    /// Appends a column expression converted to text.
    ///
    /// SQLite blobs are rendered as hex since they need not be valid UTF-8.
    pub fn text_column(&mut self, column: &Ident) -> &mut Self {
        match self.dialect {
            Dialect::Postgres => self.ident(column).push("::text"),
            Dialect::Sqlite => self
                .push("CASE WHEN typeof(")
                .ident(column)
                .push(") = 'blob' THEN hex(")
                .ident(column)
                .push(") ELSE CAST(")
                .ident(column)
                .push(" AS TEXT) END"),
        }
    }

    /// Appends a placeholder and binds `value` to it.
    ///
    /// `NULL` is written as the keyword rather than bound, so it needs no
    /// parameter type. On Postgres the placeholder is cast to `cast` when
    /// given and the value is sent as text, leaving the conversion to the
    /// column type's input function. The parameter types of a statement then
    /// depend on its SQL text alone. SQLite relies on column affinity instead.
    pub fn bind(&mut self, value: SqlValue, cast: Option<&Ident>) -> &mut Self {
        if value.is_null() {
            return self.push("NULL");
        }
        let cast = match self.dialect {
            Dialect::Postgres => cast,
            Dialect::Sqlite => None,
        };
        self.params.push(if cast.is_some() { value.into_text() } else { value });
        let placeholder = self.dialect.placeholder(self.params.len());
        self.sql.push_str(&placeholder);
        if let Some(ty) = cast {
            self.push("::").ident(ty);
        }
        self
    }

    /// Finishes the statement.
    ///
    /// # Errors
    /// `InvalidArgument` if an identifier exceeded the dialect's length limit.
    pub fn finish(self) -> AppResult<Statement> {
        if let Some(e) = self.error {
            return Err(e);
        }
        Ok(Statement {
            sql: self.sql,
            params: self.params,
        })
    }
}
