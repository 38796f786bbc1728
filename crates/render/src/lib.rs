//! HTML to PDF through an external wkhtmltopdf process.
//!
//! A [`Renderer`] holds the process-wide [`Defaults`] and hands out
//! [`RenderRequest`]s seeded from them. Each request picks a source (a URL,
//! HTML, or a template rendered by a [`ViewRenderer`]), gets rendered once,
//! and yields a [`Rendered`] document in a temporary file that can be saved
//! to disk and/or taken as a [`Download`].

mod command;
pub mod error;
mod process;
mod render;
mod request;
mod views;
mod wrapper;

pub use crate::command::{CommandLine, STDIN_PLACEHOLDER};
pub use crate::render::{CONTENT_TYPE, Download, Rendered};
pub use crate::request::{DEFAULT_NAME, DEFAULT_SAVE_DIR, RenderRequest, Source};
pub use crate::views::ViewRenderer;
pub use crate::wrapper::DisplayWrapper;
use std::path::PathBuf;
use std::time::Duration;

pub type TempFile = tempfile::NamedTempFile;

pub const DEFAULT_EXECUTABLE: &str = "/usr/local/bin/wkhtmltopdf";
pub const DEFAULT_ENCODING: &str = "UTF-8";

/// Settings shared by every request, loaded once at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Defaults {
    pub display_wrapper: DisplayWrapper,
    pub executable: PathBuf,
    pub encoding: String,
    /// Layout applied to templates that don't pick their own.
    pub layout: Option<String>,
    /// Directory that save paths are relative to.
    pub save_root: PathBuf,
    pub timeout: Option<Duration>,
}
impl Default for Defaults {
    fn default() -> Self {
        Self {
            display_wrapper: DisplayWrapper::default(),
            executable: PathBuf::from(DEFAULT_EXECUTABLE),
            encoding: DEFAULT_ENCODING.to_string(),
            layout: None,
            save_root: PathBuf::from("."),
            timeout: None,
        }
    }
}

pub struct Renderer {
    defaults: Defaults,
}
impl Renderer {
    pub fn new(defaults: Defaults) -> Self {
        Self { defaults }
    }

    /// A fresh request carrying a copy of the defaults. Requests share no
    /// state with each other.
    pub fn request(&self) -> RenderRequest {
        RenderRequest::new(self.defaults.clone())
    }

    pub fn defaults(&self) -> &Defaults {
        &self.defaults
    }
}
impl From<Defaults> for Renderer {
    fn from(defaults: Defaults) -> Self {
        Renderer::new(defaults)
    }
}
