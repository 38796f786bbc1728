mod cli;
mod error;

use crate::cli::{Cli, Command, RenderArgs};
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use wkpdf_config::Settings;
use wkpdf_render::{RenderRequest, Rendered, Renderer};
use wkpdf_views::TemplateDirectory;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:?}");
            ExitCode::FAILURE
        },
    }
}

/// Logs go to stderr so that `--output -` can stream the document on stdout.
fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    let renderer = Renderer::new(settings.defaults());
    match cli.command {
        Command::Url { url, render } => {
            let request = render.apply(renderer.request().from_url(url));
            deliver(request, &render, RenderRequest::render)
        },
        Command::Html { file, render } => {
            let html = read_html(file.as_deref())?;
            let request = render.apply(renderer.request().from_html(html));
            deliver(request, &render, RenderRequest::render)
        },
        Command::Template(args) => {
            let views = TemplateDirectory::new(&args.views).or_raise(|| ErrorKind::Views)?.with_variables(args.vars);
            let mut request = renderer.request().template(args.template);
            if let Some(layout) = args.layout {
                request = request.layout(layout);
            }
            let request = args.render.apply(request.from_template());
            deliver(request, &args.render, |request| request.render_with(&views))
        },
    }
}

fn read_html(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) if path != Path::new("-") => fs::read_to_string(path).or_raise(|| ErrorKind::Input),
        _ => {
            let mut html = String::new();
            io::stdin().read_to_string(&mut html).or_raise(|| ErrorKind::Input)?;
            Ok(html)
        },
    }
}

fn deliver<F>(request: RenderRequest, args: &RenderArgs, render: F) -> Result<()>
where
    F: FnOnce(RenderRequest) -> wkpdf_render::error::Result<Rendered>,
{
    if args.dry_run {
        println!("{}", request.describe());
        return Ok(());
    }
    let mut rendered = render(request).or_raise(|| ErrorKind::Render)?;
    if !rendered.stderr().trim().is_empty() {
        tracing::debug!(stderr = rendered.stderr(), "Renderer diagnostics");
    }
    if let Some(saved) = rendered.saved() {
        println!("{}", saved.display());
    }
    if let Some(download) = rendered.take_download() {
        let target = args.output.clone().unwrap_or_else(|| PathBuf::from(&download.filename));
        if target == Path::new("-") {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&download.body).and_then(|()| stdout.flush()).or_raise(|| ErrorKind::Output(target))?;
        } else {
            fs::write(&target, &download.body).or_raise(|| ErrorKind::Output(target.clone()))?;
            tracing::info!(path = %target.display(), bytes = download.body.len(), "Document written");
        }
    }
    Ok(())
}
