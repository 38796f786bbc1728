//! File-backed views for wkpdf.
//!
//! [`TemplateDirectory`] implements [`ViewRenderer`] over a directory of
//! [upon] templates:
//!
//! ```text
//! views/
//! ├── invoice.html          template "invoice"
//! ├── reports/monthly.html  template "reports/monthly"
//! └── layouts/
//!     └── print.html        layout "print"
//! ```
//!
//! Templates see every variable registered with
//! [`with_variable`](TemplateDirectory::with_variable). Layouts see the same
//! variables plus `content`, the rendered template. Values are HTML-escaped
//! unless piped through the `raw` formatter, so a layout embeds its page as
//! `{{ content|raw }}`.

pub mod error;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::instrument;
use upon::{Engine, Value};
use wkpdf_render::ViewRenderer;

pub const LAYOUTS_DIR: &str = "layouts";
pub const EXTENSION: &str = "html";

pub struct TemplateDirectory {
    root: PathBuf,
    engine: Engine<'static>,
    variables: BTreeMap<String, Value>,
}
impl TemplateDirectory {
    /// Fails with [`ErrorKind::NotFound`] unless `root` is an existing directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            exn::bail!(ErrorKind::NotFound(root));
        }
        let mut engine = Engine::new();
        addons::configure(&mut engine);
        Ok(Self { root, engine, variables: BTreeMap::new() })
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), Value::String(value.into()));
        self
    }

    pub fn with_variables<I, K, V>(self, variables: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        variables.into_iter().fold(self, |views, (k, v)| views.with_variable(k, v))
    }

    /// Map a view name onto a file below `dir`, adding the `.html` extension
    /// when the name has none.
    fn locate(&self, dir: Option<&str>, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let escapes = relative.components().any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if name.trim().is_empty() || escapes {
            exn::bail!(ErrorKind::InvalidName(name.to_string()));
        }
        let base = dir.map_or_else(|| self.root.clone(), |d| self.root.join(d));
        let mut path = base.join(relative);
        if path.extension().is_none() {
            path.set_extension(EXTENSION);
        }
        Ok(path)
    }

    fn render_file(&self, path: &Path, context: Value) -> Result<String> {
        if !path.is_file() {
            exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
        }
        let source = fs::read_to_string(path).or_raise(|| ErrorKind::Io)?;
        let template = self.engine.compile(source).or_raise(|| ErrorKind::Syntax(path.to_path_buf()))?;
        template.render(&self.engine, context).to_string().or_raise(|| ErrorKind::Render(path.to_path_buf()))
    }
}

impl ViewRenderer for TemplateDirectory {
    type Error = ErrorKind;

    #[instrument(skip(self))]
    fn render_template(&self, template: &str, layout: Option<&str>) -> Result<String> {
        let page = self.render_file(&self.locate(None, template)?, Value::Map(self.variables.clone()))?;
        let Some(layout) = layout else {
            return Ok(page);
        };
        let mut context = self.variables.clone();
        context.insert("content".to_string(), Value::String(page));
        self.render_file(&self.locate(Some(LAYOUTS_DIR), layout)?, Value::Map(context))
    }
}

mod addons {
    use std::fmt::Write;
    use upon::{Engine, Value, fmt as upon_fmt};

    /// Strings have `& < > " '` replaced by entities; everything else is
    /// written as usual.
    pub(crate) fn escape_html(f: &mut upon_fmt::Formatter<'_>, value: &Value) -> upon_fmt::Result {
        let Value::String(s) = value else {
            return upon_fmt::default(f, value);
        };
        let mut rest = s.as_str();
        while let Some(i) = rest.find(['&', '<', '>', '"', '\'']) {
            f.write_str(&rest[..i])?;
            f.write_str(match rest.as_bytes()[i] {
                b'&' => "&amp;",
                b'<' => "&lt;",
                b'>' => "&gt;",
                b'"' => "&quot;",
                _ => "&#x27;",
            })?;
            rest = &rest[i + 1..];
        }
        f.write_str(rest)?;
        Ok(())
    }

    /// Writes the value without HTML escaping.
    fn raw_formatter(f: &mut upon_fmt::Formatter<'_>, value: &Value) -> upon_fmt::Result {
        upon_fmt::default(f, value)
    }

    /// Escape by default; templates opt out per expression with `raw`.
    pub(crate) fn configure(engine: &mut Engine<'_>) {
        engine.set_default_formatter(&escape_html);
        engine.add_formatter("raw", raw_formatter);
    }
}
