//! Render Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

/// A render error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for render operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
/// Every variant is terminal for the request that raised it; build a fresh
/// request to try again.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Neither a URL nor HTML was selected as the document source.
    #[display("no source to generate the document from")]
    NoSourceConfigured,
    /// HTML mode without explicit HTML, and no template to render it from.
    #[display("no template configured to render HTML from")]
    TemplateNotConfigured,
    /// Template mode was rendered without a view renderer to produce the HTML.
    #[display("template {_0} needs a view renderer; render it with render_with")]
    ViewsNotSupplied(#[error(not(source))] String),
    /// The view collaborator failed to render the configured template.
    #[display("template could not be rendered")]
    Template,
    /// The rendering executable is missing or lacks the executable bit.
    #[display("cannot run renderer; check executable: {}", _0.display())]
    ExecutableNotFound(#[error(not(source))] PathBuf),
    /// The operating system refused to create the subprocess.
    #[display("could not start command: {_0}")]
    ProcessSpawnFailed(#[error(not(source))] String),
    /// The renderer ran but exited unsuccessfully. Carries everything an
    /// operator needs to reproduce the failure by hand.
    #[display("problem while executing command ({command}): {status}\nstderr: \"{stderr}\"\nstdout: \"{stdout}\"")]
    RenderFailed { command: String, status: ExitStatus, stdout: String, stderr: String },
    /// The renderer did not finish in time and was killed.
    #[display("renderer killed after {}s", _0.as_secs_f32())]
    TimedOut(#[error(not(source))] Duration),
    /// The result could not be copied to its persistent location.
    #[display("file cannot be saved in location: {}", _0.display())]
    ResultPersistFailed(#[error(not(source))] PathBuf),
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TimedOut(_) | Self::Io)
    }
}
