use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use wkpdf_render::{DEFAULT_NAME, RenderRequest};

#[derive(Debug, Parser)]
#[command(name = "wkpdf", version, about = "Render URLs, HTML and templates to PDF with wkhtmltopdf")]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON), layered over the user configuration.
    #[arg(long, short = 'c', env = "WKPDF_CONFIG", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Have the renderer fetch and render a web page.
    Url {
        url: String,
        #[command(flatten)]
        render: RenderArgs,
    },
    /// Render an HTML document from a file, or from stdin when FILE is omitted or `-`.
    Html {
        file: Option<PathBuf>,
        #[command(flatten)]
        render: RenderArgs,
    },
    /// Render a template from a views directory, optionally wrapped in a layout.
    Template(TemplateArgs),
}

#[derive(Debug, Args)]
pub struct TemplateArgs {
    /// Template name relative to the views directory, e.g. `invoice` or `reports/monthly`.
    #[arg(id = "template", value_name = "TEMPLATE")]
    pub template: String,

    #[arg(long, value_name = "DIR", default_value = "views")]
    pub views: PathBuf,

    /// Layout from `<views>/layouts/`; falls back to the configured default layout.
    #[arg(long, value_name = "NAME")]
    pub layout: Option<String>,

    /// Template variable, repeatable.
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub vars: Vec<(String, String)>,

    #[command(flatten)]
    pub render: RenderArgs,
}

#[derive(Debug, Default, Args)]
pub struct RenderArgs {
    /// Raw wkhtmltopdf option, repeatable, e.g. `-O "--page-size A4"`.
    #[arg(long = "option", short = 'O', value_name = "OPTION", allow_hyphen_values = true)]
    pub options: Vec<String>,

    /// Document encoding, passed alongside options.
    #[arg(long, value_name = "ENCODING")]
    pub encoding: Option<String>,

    /// Path to the wkhtmltopdf executable.
    #[arg(long, value_name = "PATH")]
    pub executable: Option<PathBuf>,

    /// Run wkhtmltopdf directly instead of under the display wrapper.
    #[arg(long, conflicts_with_all = ["display_wrapper", "display_wrapper_args"])]
    pub no_display_wrapper: bool,

    /// Display wrapper executable (enables the wrapper).
    #[arg(long, value_name = "EXE")]
    pub display_wrapper: Option<String>,

    /// Display wrapper arguments (enables the wrapper).
    #[arg(long, value_name = "ARGS", allow_hyphen_values = true)]
    pub display_wrapper_args: Option<String>,

    /// Name of the result, without `.pdf`.
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Keep a copy under the save root.
    #[arg(long)]
    pub save: bool,

    /// Directory below the save root to keep the copy in (implies --save).
    #[arg(long, value_name = "DIR")]
    pub save_dir: Option<PathBuf>,

    /// Don't write the document to --output.
    #[arg(long, conflicts_with = "output")]
    pub no_download: bool,

    /// Where to write the document; `-` for stdout. Defaults to `<name>.pdf`.
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Kill wkhtmltopdf after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Print the effective settings instead of rendering.
    #[arg(long)]
    pub dry_run: bool,
}
impl RenderArgs {
    /// Layer the command-line flags over a request seeded from configuration.
    pub fn apply(&self, mut request: RenderRequest) -> RenderRequest {
        request = request.options(self.options.iter().cloned());
        if let Some(encoding) = &self.encoding {
            request = request.encoding(encoding);
        }
        if let Some(executable) = &self.executable {
            request = request.executable(executable);
        }
        if self.no_display_wrapper {
            request = request.display_wrapper(false, None, None);
        } else if self.display_wrapper.is_some() || self.display_wrapper_args.is_some() {
            request = request.display_wrapper(true, self.display_wrapper.clone(), self.display_wrapper_args.clone());
        }
        let name = self.name.clone().unwrap_or_else(|| DEFAULT_NAME.to_string());
        request = match self.save || self.save_dir.is_some() {
            true => request.save(name, self.save_dir.clone()),
            false => request.name(name),
        };
        if let Some(secs) = self.timeout {
            request = request.timeout(Duration::from_secs(secs));
        }
        request.download(!self.no_download)
    }
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s.split_once('=').ok_or_else(|| format!("expected KEY=VALUE, got `{s}`"))?;
    if key.trim().is_empty() {
        return Err(format!("empty key in `{s}`"));
    }
    Ok((key.trim().to_string(), value.to_string()))
}
