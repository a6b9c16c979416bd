//! Row mutation models.
//!
//! Contains request and result models for insert, update and delete.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// One column assignment supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ColumnValue {
    /// Column name (quoted as an identifier, never interpolated).
    pub name: String,
    /// Column value (always bound as a parameter).
    #[serde(default)]
    pub value: serde_json::Value,
}

impl ColumnValue {
    /// Creates a column assignment.
    pub fn new(name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Request body for inserting or updating a row.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RowValuesRequest {
    /// Ordered column assignments.
    #[validate(length(min = 1, message = "At least one column is required"))]
    pub columns: Vec<ColumnValue>,
}

/// Kind of row mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Insert,
    Update,
    Delete,
}

impl std::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MutationKind::Insert => write!(f, "insert"),
            MutationKind::Update => write!(f, "update"),
            MutationKind::Delete => write!(f, "delete"),
        }
    }
}

/// Outcome of a committed mutation.
///
/// Zero affected rows is a successful outcome with `row_found == false`,
/// distinct from an execution error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MutationResult {
    /// Mutation kind.
    pub operation: MutationKind,
    /// Target table.
    pub table: String,
    /// Number of rows affected.
    pub rows_affected: u64,
    /// Whether at least one row was affected.
    pub row_found: bool,
}

impl MutationResult {
    /// Creates a result from the affected row count.
    pub fn new(operation: MutationKind, table: impl Into<String>, rows_affected: u64) -> Self {
        Self {
            operation,
            table: table.into(),
            rows_affected,
            row_found: rows_affected > 0,
        }
    }
}
