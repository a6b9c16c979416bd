//! Table catalog models.
//!
//! Contains models for table listing and table description.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::DeploymentMode;
use crate::models::query::ColumnInfo;

/// Tables of one database.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TableList {
    /// Logical database key.
    pub database: String,
    /// Deployment mode used to connect.
    pub mode: DeploymentMode,
    /// Table names in catalog order.
    pub tables: Vec<String>,
}

/// Primary key as discovered from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PrimaryKeyInfo {
    /// First column of the primary key index.
    pub column: String,
    /// Catalog type name of that column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    /// Number of columns in the key. Rows are targeted by the first one only.
    pub key_columns: usize,
}

/// Column layout and primary key of one table.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TableDescription {
    /// Table name.
    pub table: String,
    /// Columns in ordinal order.
    pub columns: Vec<ColumnInfo>,
    /// Primary key, absent when the table has none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<PrimaryKeyInfo>,
}
