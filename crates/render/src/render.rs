use crate::command::CommandLine;
use crate::error::{ErrorKind, Result};
use crate::request::{RenderRequest, Source};
use crate::{TempFile, ViewRenderer, process};
use exn::ResultExt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use tracing::instrument;

pub const CONTENT_TYPE: &str = "application/pdf";

/// A rendered document, ready to be sent as a file-download response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Download {
    /// Suggested file name, including the `.pdf` extension.
    pub filename: String,
    pub content_type: &'static str,
    pub charset: String,
    pub body: Vec<u8>,
}

/// The outcome of a successful render.
///
/// The temporary file is owned by this value and removed when it is dropped;
/// anything that needs to outlive it should be [saved](RenderRequest::save)
/// or taken out with [`into_temp_file`](Self::into_temp_file).
#[derive(Debug)]
pub struct Rendered {
    file: TempFile,
    command: CommandLine,
    status: ExitStatus,
    stdout: String,
    stderr: String,
    saved: Option<PathBuf>,
    download: Option<Download>,
}
impl Rendered {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn command(&self) -> &CommandLine {
        &self.command
    }

    pub fn status(&self) -> ExitStatus {
        self.status
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    /// wkhtmltopdf reports progress and warnings here even on success.
    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    /// Where the persistent copy was written, if saving was requested.
    pub fn saved(&self) -> Option<&Path> {
        self.saved.as_deref()
    }

    /// The download payload. Only handed out once.
    pub fn take_download(&mut self) -> Option<Download> {
        self.download.take()
    }

    pub fn into_temp_file(self) -> TempFile {
        self.file
    }
}

impl RenderRequest {
    /// Render the configured URL or HTML.
    ///
    /// Requests that need a template rendered first fail with
    /// [`ViewsNotSupplied`](ErrorKind::ViewsNotSupplied); use
    /// [`render_with`](Self::render_with) for those.
    pub fn render(self) -> Result<Rendered> {
        if let (Some(Source::Html(None)), Some(template)) = (&self.source, &self.template) {
            exn::bail!(ErrorKind::ViewsNotSupplied(template.clone()));
        }
        self.execute()
    }

    /// Render, asking `views` for the HTML when the request is in HTML mode
    /// without HTML of its own.
    #[instrument(skip_all, fields(template = self.template.as_deref(), layout = self.layout.as_deref()))]
    pub fn render_with<V: ViewRenderer>(mut self, views: V) -> Result<Rendered> {
        if let Some(Source::Html(html @ None)) = &mut self.source {
            let Some(template) = self.template.as_deref() else {
                exn::bail!(ErrorKind::TemplateNotConfigured);
            };
            let rendered = views.render_template(template, self.layout.as_deref()).or_raise(|| ErrorKind::Template)?;
            tracing::debug!(bytes = rendered.len(), "Template rendered to HTML");
            *html = Some(rendered);
        }
        self.execute()
    }

    #[instrument(skip_all, fields(name = %self.name))]
    fn execute(self) -> Result<Rendered> {
        let input = match &self.source {
            None => exn::bail!(ErrorKind::NoSourceConfigured),
            Some(Source::Html(None)) => exn::bail!(ErrorKind::TemplateNotConfigured),
            Some(Source::Html(Some(html))) => Some(html.as_bytes()),
            Some(Source::Url(_)) => None,
        };
        let file = tempfile::Builder::new()
            .prefix(&self.temp_prefix())
            .suffix(".pdf")
            .tempfile()
            .or_raise(|| ErrorKind::Io)?;
        let command = self.command_line(file.path())?;
        tracing::info!(%command, "Rendering document");

        let captured = process::execute(&command, input, self.timeout)?;
        if !captured.status.success() {
            tracing::error!(%command, status = %captured.status, stderr = %captured.stderr, "Renderer failed");
            exn::bail!(ErrorKind::RenderFailed {
                command: command.to_string(),
                status: captured.status,
                stdout: captured.stdout,
                stderr: captured.stderr,
            });
        }
        tracing::debug!(path = %file.path().display(), "Renderer finished");

        let saved = match self.save_path() {
            Some(target) => Some(persist(file.path(), target)?),
            None => None,
        };
        let download = match self.download {
            true => Some(Download {
                filename: self.file_name(),
                content_type: CONTENT_TYPE,
                charset: self.encoding.clone(),
                body: fs::read(file.path()).or_raise(|| ErrorKind::Io)?,
            }),
            false => None,
        };
        Ok(Rendered {
            file,
            command,
            status: captured.status,
            stdout: captured.stdout,
            stderr: captured.stderr,
            saved,
            download,
        })
    }
}

/// Copy `source` to `target`, creating parent directories as needed.
///
/// The copy is staged in a temporary file next to `target` and renamed into
/// place, so a failed write never leaves a truncated file at `target`.
#[instrument(level = "debug", skip(source))]
fn persist(source: &Path, target: PathBuf) -> Result<PathBuf> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).or_raise(|| ErrorKind::ResultPersistFailed(dir.clone()))?;
    let mut staged = TempFile::new_in(&dir).or_raise(|| ErrorKind::ResultPersistFailed(dir.clone()))?;
    let mut input = File::open(source).or_raise(|| ErrorKind::Io)?;
    std::io::copy(&mut input, staged.as_file_mut()).or_raise(|| ErrorKind::ResultPersistFailed(target.clone()))?;
    staged
        .persist(&target)
        // Drop the staged file along with the error so nothing is left behind.
        .map_err(|e| e.error)
        .or_raise(|| ErrorKind::ResultPersistFailed(target.clone()))?;
    tracing::info!(path = %target.display(), "Document saved");
    Ok(target)
}
