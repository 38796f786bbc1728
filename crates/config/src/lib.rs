//! Process-wide configuration for wkpdf.
//!
//! Settings are layered with [figment], later layers overriding earlier ones:
//!
//! 1. Built-in defaults (see [`Settings::default`])
//! 2. The user configuration file, `config.toml` in the platform config
//!    directory (e.g. `~/.config/wkpdf/config.toml`), if present
//! 3. An explicitly requested file (TOML, YAML or JSON, by extension)
//! 4. `WKPDF_*` environment variables (`WKPDF_RENDERER_EXE=/opt/bin/wkhtmltopdf`)
//!
//! Keys are snake_case; the camelCase spellings (`rendererExe`) are accepted
//! too, but one key spelled both ways across layers is rejected. Unknown keys
//! are ignored. Loading happens once at startup; the result is
//! turned into [`Defaults`] and handed to the renderer by value.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Toml, Yaml};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::instrument;
use wkpdf_render::{DEFAULT_ENCODING, DEFAULT_EXECUTABLE, Defaults, DisplayWrapper};

pub const ENV_PREFIX: &str = "WKPDF_";
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Run the renderer under a headless display wrapper.
    #[serde(alias = "enableDisplayWrapper")]
    pub enable_display_wrapper: bool,
    #[serde(alias = "displayWrapperExe")]
    pub display_wrapper_exe: String,
    #[serde(alias = "displayWrapperArgs")]
    pub display_wrapper_args: String,
    #[serde(alias = "rendererExe")]
    pub renderer_exe: PathBuf,
    pub encoding: String,
    #[serde(alias = "defaultLayout")]
    pub default_layout: Option<String>,
    /// Directory that save paths are relative to.
    #[serde(alias = "saveRoot")]
    pub save_root: PathBuf,
    /// Kill renderers that run longer than this. Zero or absent disables the limit.
    #[serde(alias = "timeoutSecs")]
    pub timeout_secs: Option<u64>,
}
impl Default for Settings {
    fn default() -> Self {
        let wrapper = DisplayWrapper::default();
        Self {
            enable_display_wrapper: wrapper.enabled,
            display_wrapper_exe: wrapper.executable,
            display_wrapper_args: wrapper.args,
            renderer_exe: PathBuf::from(DEFAULT_EXECUTABLE),
            encoding: DEFAULT_ENCODING.to_string(),
            default_layout: None,
            save_root: PathBuf::from("."),
            timeout_secs: None,
        }
    }
}
impl Settings {
    /// Load every layer, with `explicit` (if any) taking precedence over the
    /// user configuration file.
    #[instrument]
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();
        if let Some(user) = user_config_path().filter(|p| p.is_file()) {
            tracing::debug!(path = %user.display(), "Merging user configuration");
            figment = figment.merge(Toml::file(user));
        }
        if let Some(path) = explicit {
            figment = merge_file(figment, path)?;
        }
        Self::from_figment(&figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let settings: Self = figment.extract().or_raise(|| ErrorKind::Malformed)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.renderer_exe.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid("renderer_exe"));
        }
        if self.encoding.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid("encoding"));
        }
        if self.enable_display_wrapper && self.display_wrapper_exe.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid("display_wrapper_exe"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.filter(|secs| *secs > 0).map(Duration::from_secs)
    }

    pub fn defaults(&self) -> Defaults {
        Defaults {
            display_wrapper: DisplayWrapper {
                enabled: self.enable_display_wrapper,
                executable: self.display_wrapper_exe.clone(),
                args: self.display_wrapper_args.clone(),
            },
            executable: self.renderer_exe.clone(),
            encoding: self.encoding.clone(),
            layout: self.default_layout.clone(),
            save_root: self.save_root.clone(),
            timeout: self.timeout(),
        }
    }
}
impl From<&Settings> for Defaults {
    fn from(settings: &Settings) -> Self {
        settings.defaults()
    }
}

/// `config.toml` in the platform configuration directory, if one can be
/// determined for the current user.
pub fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "wkpdf").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    if !path.is_file() {
        exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
    }
    let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    let figment = match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
        Some("json") => figment.merge(Json::file(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
    };
    tracing::debug!(path = %path.display(), "Merging configuration file");
    Ok(figment)
}
