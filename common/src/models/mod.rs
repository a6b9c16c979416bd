//! Shared data models for the dashboard API.

pub mod connection;
pub mod database;
pub mod mutation;
pub mod query;

// Re-export commonly used types
pub use connection::{redact_url, DatabaseItem, DbType};
pub use database::{PrimaryKeyInfo, TableDescription, TableList};
pub use mutation::{ColumnValue, MutationKind, MutationResult, RowValuesRequest};
pub use query::{ColumnInfo, ListRowsQuery, TableRows};
