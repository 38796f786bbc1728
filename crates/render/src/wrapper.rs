//! Headless display wrapper.
//!
//! wkhtmltopdf builds without the patched Qt need an X server, even when they
//! never draw to a screen. A wrapper such as `xvfb-run` starts a throwaway
//! virtual framebuffer and executes the renderer inside it.

use crate::command::split_words;
use std::ffi::OsString;

pub const DEFAULT_EXECUTABLE: &str = "xvfb-run";
pub const DEFAULT_ARGS: &str = r#"-a -s "-screen 0 1024x678x16""#;

/// A program (plus its arguments) that the renderer is executed under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayWrapper {
    pub enabled: bool,
    pub executable: String,
    /// Shell-style argument string, e.g. `-a -s "-screen 0 1024x678x16"`.
    pub args: String,
}
impl Default for DisplayWrapper {
    fn default() -> Self {
        Self { enabled: true, executable: DEFAULT_EXECUTABLE.into(), args: DEFAULT_ARGS.into() }
    }
}
impl DisplayWrapper {
    pub fn disabled() -> Self {
        Self { enabled: false, ..Self::default() }
    }

    /// Toggle the wrapper. Executable and arguments are only replaced when
    /// enabling; disabling keeps them around for a later re-enable.
    pub fn configure(&mut self, enabled: bool, executable: Option<String>, args: Option<String>) {
        self.enabled = enabled;
        if enabled {
            if let Some(executable) = executable {
                self.executable = executable;
            }
            if let Some(args) = args {
                self.args = args;
            }
        }
    }

    /// The words to place in front of the renderer executable. Empty when
    /// disabled.
    pub(crate) fn prefix(&self) -> Vec<OsString> {
        if !self.enabled {
            return Vec::new();
        }
        let mut words = vec![OsString::from(&self.executable)];
        words.extend(split_words(&self.args));
        words
    }
}
