//! SQL identifier quoting.
//!
//! Table and column names supplied by callers reach SQL text only through
//! [`Ident`], which validates the name once and renders it as a
//! double-quoted identifier with embedded quotes doubled. Length limits
//! differ per database and are checked by the statement builder.

use std::fmt;

use crate::errors::{AppError, AppResult};

/// A validated SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident(String);

impl Ident {
    /// Validates `name` as an identifier.
    ///
    /// # Errors
    /// Returns `AppError::InvalidArgument` if the name is empty or contains
    /// a NUL character.
    pub fn new(name: impl Into<String>) -> AppResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(AppError::InvalidArgument("identifier must not be empty".into()));
        }
        if name.contains('\0') {
            return Err(AppError::InvalidArgument(
                "identifier must not contain NUL characters".into(),
            ));
        }
        Ok(Self(name))
    }

    /// Returns the raw (unquoted) name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the name rendered as a quoted SQL identifier.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0.replace('"', "\"\""))
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
