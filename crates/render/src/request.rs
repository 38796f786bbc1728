use crate::command::{CommandLine, STDIN_PLACEHOLDER, split_words};
use crate::error::{ErrorKind, Result};
use crate::{Defaults, DisplayWrapper};
use exn::ResultExt;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_NAME: &str = "output";
pub const DEFAULT_SAVE_DIR: &str = "pdf";

/// Where the document comes from. Only one can be active at a time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Source {
    /// The renderer fetches the page itself.
    Url(String),
    /// The document is piped to the renderer on stdin. `None` means it still
    /// has to be produced from the configured template.
    Html(Option<String>),
}

/// Everything one render needs, built up through chained calls and consumed
/// by [`render`](Self::render) or [`render_with`](Self::render_with).
///
/// ```no_run
/// use wkpdf_render::{Defaults, Renderer};
/// # fn main() -> wkpdf_render::error::Result<()> {
/// let rendered = Renderer::new(Defaults::default())
///     .request()
///     .from_url("https://example.com/invoice/42")
///     .option("--page-size A4")
///     .display_wrapper(false, None, None)
///     .name("invoice-42")
///     .render()?;
/// println!("{}", rendered.path().display());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct RenderRequest {
    pub(crate) source: Option<Source>,
    pub(crate) template: Option<String>,
    pub(crate) layout: Option<String>,
    pub(crate) encoding: String,
    pub(crate) options: Vec<String>,
    pub(crate) wrapper: DisplayWrapper,
    pub(crate) executable: PathBuf,
    pub(crate) save: bool,
    pub(crate) save_root: PathBuf,
    pub(crate) save_dir: PathBuf,
    pub(crate) name: String,
    pub(crate) download: bool,
    pub(crate) timeout: Option<Duration>,
}
impl RenderRequest {
    pub fn new(defaults: Defaults) -> Self {
        Self {
            source: None,
            template: None,
            layout: defaults.layout,
            encoding: defaults.encoding,
            options: Vec::new(),
            wrapper: defaults.display_wrapper,
            executable: defaults.executable,
            save: false,
            save_root: defaults.save_root,
            save_dir: PathBuf::from(DEFAULT_SAVE_DIR),
            name: DEFAULT_NAME.to_string(),
            download: true,
            timeout: defaults.timeout,
        }
    }

    /// Have the renderer fetch `url` itself. Replaces any HTML source.
    pub fn from_url(mut self, url: impl Into<String>) -> Self {
        self.source = Some(Source::Url(url.into()));
        self
    }

    /// Pipe `html` to the renderer. Replaces any URL source.
    pub fn from_html(mut self, html: impl Into<String>) -> Self {
        self.source = Some(Source::Html(Some(html.into())));
        self
    }

    /// Pipe HTML produced from the configured [`template`](Self::template) to
    /// the renderer. Replaces any URL or explicit HTML source.
    pub fn from_template(mut self) -> Self {
        self.source = Some(Source::Html(None));
        self
    }

    pub fn template(mut self, name: impl Into<String>) -> Self {
        self.template = Some(name.into());
        self
    }

    pub fn layout(mut self, name: impl Into<String>) -> Self {
        self.layout = Some(name.into());
        self
    }

    /// Enable or disable the headless display wrapper. `executable` and `args`
    /// replace the current values only when enabling.
    pub fn display_wrapper(
        mut self,
        enabled: bool,
        executable: impl Into<Option<String>>,
        args: impl Into<Option<String>>,
    ) -> Self {
        self.wrapper.configure(enabled, executable.into(), args.into());
        self
    }

    /// Append a raw option for the renderer, e.g. `"--page-size A4"`.
    ///
    /// Not validated: the renderer's own option grammar applies.
    pub fn option(mut self, raw: impl Into<String>) -> Self {
        self.options.push(raw.into());
        self
    }

    pub fn options<I: IntoIterator<Item = S>, S: Into<String>>(mut self, raw: I) -> Self {
        self.options.extend(raw.into_iter().map(Into::into));
        self
    }

    /// Only passed to the renderer alongside at least one [`option`](Self::option).
    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    pub fn executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = path.into();
        self
    }

    /// Keep a copy of the result as `<dir>/<name>.pdf` under the save root.
    /// `dir` defaults to `pdf`.
    pub fn save(mut self, name: impl Into<String>, dir: impl Into<Option<PathBuf>>) -> Self {
        self.save = true;
        self.name = name.into();
        if let Some(dir) = dir.into() {
            self.save_dir = dir;
        }
        self
    }

    /// File name of the result, without the `.pdf` extension.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Whether the result is exposed as a one-shot [`Download`](crate::Download).
    pub fn download(mut self, enabled: bool) -> Self {
        self.download = enabled;
        self
    }

    /// Kill the renderer if it runs longer than `timeout`.
    pub fn timeout(mut self, timeout: impl Into<Option<Duration>>) -> Self {
        self.timeout = timeout.into();
        self
    }

    pub fn source(&self) -> Option<&Source> {
        self.source.as_ref()
    }

    /// Last path component of the name, safe to use inside a single directory.
    pub(crate) fn temp_prefix(&self) -> String {
        Path::new(&self.name)
            .file_name()
            .map_or_else(|| DEFAULT_NAME.to_string(), |name| name.to_string_lossy().into_owned())
    }

    pub fn file_name(&self) -> String {
        format!("{}.pdf", self.name)
    }

    /// Where the result is copied to, if saving was requested.
    pub fn save_path(&self) -> Option<PathBuf> {
        self.save.then(|| self.save_root.join(&self.save_dir).join(self.file_name()))
    }

    pub fn downloads(&self) -> bool {
        self.download
    }

    /// Assemble the renderer invocation writing to `output`:
    ///
    /// ```text
    /// [wrapper wrapper-args...] renderer [options... --encoding E] {url | -} output
    /// ```
    pub fn command_line(&self, output: &Path) -> Result<CommandLine> {
        let source = match &self.source {
            None => exn::bail!(ErrorKind::NoSourceConfigured),
            Some(Source::Url(url)) => OsString::from(url),
            Some(Source::Html(_)) => OsString::from(STDIN_PLACEHOLDER),
        };
        let executable =
            which::which(&self.executable).or_raise(|| ErrorKind::ExecutableNotFound(self.executable.clone()))?;

        let mut words = self.wrapper.prefix();
        words.push(executable.into_os_string());
        if !self.options.is_empty() {
            words.extend(self.options.iter().flat_map(|raw| split_words(raw)));
            words.push(OsString::from("--encoding"));
            words.push(OsString::from(&self.encoding));
        }
        words.push(source);
        words.push(output.as_os_str().to_owned());
        Ok(CommandLine::new(words))
    }

    /// Human-readable summary of the effective settings.
    pub fn describe(&self) -> String {
        let mut lines = Vec::new();
        lines.push(match self.wrapper.enabled {
            true => format!("display wrapper is enabled: {} {}", self.wrapper.executable, self.wrapper.args),
            false => "display wrapper is disabled".to_string(),
        });
        lines.push(format!("renderer executable: {}", self.executable.display()));
        lines.push(match &self.source {
            None => "source: none".to_string(),
            Some(Source::Url(url)) => format!("source: url {url}"),
            Some(Source::Html(Some(html))) => format!("source: html ({} bytes)", html.len()),
            Some(Source::Html(None)) => format!(
                "source: template {} (layout {})",
                self.template.as_deref().unwrap_or("<unset>"),
                self.layout.as_deref().unwrap_or("<none>")
            ),
        });
        lines.push(format!("encoding: {}", self.encoding));
        lines.push(match self.save_path() {
            Some(path) => format!("save on disk: yes: {}", path.display()),
            None => "save on disk: no".to_string(),
        });
        lines.push(format!("force download: {}", if self.download { "yes" } else { "no" }));
        if let Some(timeout) = self.timeout {
            lines.push(format!("timeout: {}s", timeout.as_secs_f32()));
        }
        lines.push("additional renderer options:".to_string());
        lines.extend(self.options.iter().map(|option| format!("  {option}")));
        lines.join("\n")
    }
}
