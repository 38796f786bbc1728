//! CLI Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A CLI error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("could not read HTML input")]
    Input,
    #[display("could not open views")]
    Views,
    #[display("could not render document")]
    Render,
    #[display("could not write document to {}", _0.display())]
    Output(#[error(not(source))] PathBuf),
}
