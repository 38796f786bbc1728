//! View Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A view error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for view operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Template or layout file does not exist.
    #[display("view not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Names must stay inside the views directory.
    #[display("invalid view name: {_0}")]
    InvalidName(#[error(not(source))] String),
    #[display("template syntax error in {}", _0.display())]
    Syntax(#[error(not(source))] PathBuf),
    #[display("template rendering failed for {}", _0.display())]
    Render(#[error(not(source))] PathBuf),
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io)
    }
}
