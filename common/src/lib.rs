//! Shared building blocks for the table dashboard services.
//!
//! - `config`: process-wide configuration and the database registry
//! - `errors`: the unified error type and its HTTP mapping
//! - `models`: request/response models shared by handlers
//! - `response`: the API response envelope
//! - `middleware`: request ID propagation
//! - `utils`: identifier quoting and the parameterized statement builder

pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod response;
pub mod utils;
