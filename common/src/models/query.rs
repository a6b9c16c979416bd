//! Row listing models.
//!
//! Contains models for reading the rows of a table.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Query parameters for listing rows.
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ListRowsQuery {
    /// Maximum number of rows to return (server default and cap apply).
    pub limit: Option<u32>,
}

/// Rows of a table, newest first by the first column.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TableRows {
    /// Table name.
    pub table: String,

    /// Column information.
    pub columns: Vec<ColumnInfo>,

    /// Row data; every value is rendered as text or null.
    pub rows: Vec<Vec<serde_json::Value>>,

    /// Number of rows returned.
    #[serde(default)]
    pub row_count: usize,
}

/// Column information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,

    /// Column data type as named by the catalog.
    pub data_type: String,

    /// Whether the column is nullable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
}

impl TableRows {
    /// Creates a row listing, deriving the row count.
    pub fn new(table: impl Into<String>, columns: Vec<ColumnInfo>, rows: Vec<Vec<serde_json::Value>>) -> Self {
        Self {
            table: table.into(),
            row_count: rows.len(),
            columns,
            rows,
        }
    }
}
