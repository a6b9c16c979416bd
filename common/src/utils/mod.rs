//! Utility functions and helpers.

pub mod ident;
pub mod statement;

// Re-export commonly used types
pub use ident::Ident;
pub use statement::{Assignment, Dialect, SqlValue, Statement, StatementBuilder};
