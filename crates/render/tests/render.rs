//! End-to-end renders against stub shell scripts standing in for wkhtmltopdf.
#![cfg(unix)]

use rstest::{fixture, rstest};
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use wkpdf_render::error::ErrorKind;
use wkpdf_render::{CONTENT_TYPE, Defaults, DisplayWrapper, Renderer, ViewRenderer};

/// Copies stdin into the output file (always the last argument).
const COPY: &str = r#"#!/bin/sh
for out; do :; done
cat > "$out"
"#;

/// Floods stdout and stderr before it starts reading stdin.
const CHATTY: &str = r#"#!/bin/sh
for out; do :; done
head -c 1048576 /dev/zero | tr '\0' 'o'
head -c 1048576 /dev/zero | tr '\0' 'e' >&2
cat > "$out"
"#;

const FAIL: &str = r#"#!/bin/sh
echo "Loading pages (1/6)"
echo "Error: Failed loading page http://localhost/missing" >&2
exit 3
"#;

/// Leaves a marker next to itself when run.
const MARKER: &str = r#"#!/bin/sh
touch "$0.ran"
"#;

/// Succeeds without reading any of its input.
const IGNORE_INPUT: &str = "#!/bin/sh\necho ok\nexit 0\n";

const SLOW: &str = "#!/bin/sh\nexec sleep 5\n";

/// Drops the two wrapper arguments and runs the rest.
const WRAPPER: &str = "#!/bin/sh\nshift 2\nexec \"$@\"\n";

struct Stubs {
    dir: PathBuf,
}
impl Stubs {
    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

/// Written once per test binary, before any of them gets executed.
#[fixture]
fn stubs() -> &'static Stubs {
    static STUBS: OnceLock<Stubs> = OnceLock::new();
    STUBS.get_or_init(|| {
        let dir = Path::new(env!("CARGO_TARGET_TMPDIR")).join("wkpdf-render-stubs");
        fs::create_dir_all(&dir).unwrap();
        for (name, script) in
            [("copy", COPY), ("chatty", CHATTY), ("fail", FAIL), ("marker", MARKER), ("slow", SLOW), ("wrapper", WRAPPER), ("ignore-input", IGNORE_INPUT)]
        {
            let path = dir.join(name);
            fs::write(&path, script).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        }
        let _ = fs::remove_file(dir.join("marker.ran"));
        Stubs { dir }
    })
}

fn renderer(executable: impl Into<PathBuf>) -> Renderer {
    Renderer::new(Defaults {
        display_wrapper: DisplayWrapper::disabled(),
        executable: executable.into(),
        ..Defaults::default()
    })
}

struct FakeViews;
impl ViewRenderer for FakeViews {
    type Error = io::Error;

    fn render_template(&self, template: &str, layout: Option<&str>) -> Result<String, exn::Exn<io::Error>> {
        Ok(format!("<html><body>{template}|{}</body></html>", layout.unwrap_or("-")))
    }
}

struct BrokenViews;
impl ViewRenderer for BrokenViews {
    type Error = io::Error;

    fn render_template(&self, template: &str, _layout: Option<&str>) -> Result<String, exn::Exn<io::Error>> {
        Err(exn::Exn::from(io::Error::new(io::ErrorKind::NotFound, format!("no template named {template}"))))
    }
}

#[rstest]
fn no_source_fails_without_spawning(stubs: &Stubs) {
    let err = renderer(stubs.path("marker")).request().option("--grayscale").render().unwrap_err();
    assert!(matches!(*err, ErrorKind::NoSourceConfigured));
    assert!(!stubs.path("marker.ran").exists());
}

#[rstest]
fn html_mode_pipes_document_to_output(stubs: &Stubs) {
    let html = "<html><body>X</body></html>";
    let rendered = renderer(stubs.path("copy")).request().encoding("UTF-8").from_html(html).render().unwrap();

    let args = rendered.command().args();
    assert_eq!(args[args.len() - 2], "-");
    assert_eq!(Path::new(&args[args.len() - 1]), rendered.path());
    assert_eq!(fs::read_to_string(rendered.path()).unwrap(), html);
    assert!(rendered.status().success());
}

#[rstest]
fn url_mode_passes_url_and_writes_nothing(stubs: &Stubs) {
    let url = "https://example.com/reports/q3 final?lang=en";
    let rendered = renderer(stubs.path("copy")).request().from_url(url).render().unwrap();

    let args = rendered.command().args();
    assert!(args.iter().any(|a| a == url));
    assert!(!args.iter().any(|a| a == "-"));
    assert_eq!(fs::read(rendered.path()).unwrap().len(), 0);
}

#[rstest]
fn large_payload_is_not_truncated(stubs: &Stubs) {
    let html = "x".repeat(5 * 1024 * 1024);
    let rendered = renderer(stubs.path("chatty")).request().from_html(html.clone()).render().unwrap();

    assert_eq!(rendered.stdout().len(), 1_048_576);
    assert_eq!(rendered.stderr().len(), 1_048_576);
    let written = fs::read(rendered.path()).unwrap();
    assert_eq!(written.len(), html.len());
    assert!(written == html.as_bytes());
}

#[rstest]
#[case::small(28)]
#[case::one_mebibyte(1024 * 1024)]
fn exit_status_decides_when_input_is_left_unread(stubs: &Stubs, #[case] size: usize) {
    let html = "x".repeat(size);
    for _ in 0..20 {
        let rendered = renderer(stubs.path("ignore-input")).request().from_html(html.clone()).render().unwrap();
        assert!(rendered.status().success());
        assert_eq!(rendered.stdout(), "ok\n");
    }
}

#[rstest]
fn non_zero_exit_is_render_failed(stubs: &Stubs) {
    let err = renderer(stubs.path("fail")).request().from_html("<p>hi</p>").render().unwrap_err();
    match &*err {
        ErrorKind::RenderFailed { command, status, stdout, stderr } => {
            assert_eq!(stderr, "Error: Failed loading page http://localhost/missing\n");
            assert_eq!(stdout, "Loading pages (1/6)\n");
            assert_eq!(status.code(), Some(3));
            assert!(command.contains("fail"));
        },
        other => panic!("expected RenderFailed, got {other:?}"),
    }
}

#[rstest]
fn save_creates_missing_directories(stubs: &Stubs) {
    let root = tempfile::tempdir().unwrap();
    let renderer = Renderer::new(Defaults {
        display_wrapper: DisplayWrapper::disabled(),
        executable: stubs.path("copy"),
        save_root: root.path().to_path_buf(),
        ..Defaults::default()
    });
    let rendered =
        renderer.request().from_html("saved").save("report", Some(PathBuf::from("a/b/c"))).render().unwrap();

    let expected = root.path().join("a/b/c/report.pdf");
    assert_eq!(rendered.saved(), Some(expected.as_path()));
    assert_eq!(fs::read_to_string(&expected).unwrap(), "saved");
}

#[rstest]
fn unwritable_save_target_leaves_nothing_behind(stubs: &Stubs) {
    let root = tempfile::tempdir().unwrap();
    // A directory squatting on the target name makes the final rename fail.
    fs::create_dir_all(root.path().join("pdf/report.pdf")).unwrap();
    let renderer = Renderer::new(Defaults {
        display_wrapper: DisplayWrapper::disabled(),
        executable: stubs.path("copy"),
        save_root: root.path().to_path_buf(),
        ..Defaults::default()
    });

    let err = renderer.request().from_html("saved").save("report", None).render().unwrap_err();
    assert!(matches!(&*err, ErrorKind::ResultPersistFailed(p) if p.ends_with("pdf/report.pdf")));
    let entries: Vec<_> = fs::read_dir(root.path().join("pdf")).unwrap().map(|e| e.unwrap().file_name()).collect();
    assert_eq!(entries, ["report.pdf"]);
    assert!(root.path().join("pdf/report.pdf").is_dir());
}

#[rstest]
fn nested_name_is_saved_below_save_dir(stubs: &Stubs) {
    let root = tempfile::tempdir().unwrap();
    let renderer = Renderer::new(Defaults {
        display_wrapper: DisplayWrapper::disabled(),
        executable: stubs.path("copy"),
        save_root: root.path().to_path_buf(),
        ..Defaults::default()
    });
    let mut rendered = renderer.request().from_html("q3").save("reports/q3", None).render().unwrap();

    let expected = root.path().join("pdf/reports/q3.pdf");
    assert_eq!(rendered.saved(), Some(expected.as_path()));
    assert_eq!(fs::read_to_string(&expected).unwrap(), "q3");
    assert!(rendered.path().file_name().unwrap().to_string_lossy().starts_with("q3"));
    assert_eq!(rendered.take_download().unwrap().filename, "reports/q3.pdf");
}

#[rstest]
fn save_directory_blocked_by_file(stubs: &Stubs) {
    let root = tempfile::tempdir().unwrap();
    fs::write(root.path().join("pdf"), "not a directory").unwrap();
    let renderer = Renderer::new(Defaults {
        display_wrapper: DisplayWrapper::disabled(),
        executable: stubs.path("copy"),
        save_root: root.path().to_path_buf(),
        ..Defaults::default()
    });

    let err = renderer.request().from_html("saved").save("report", None).render().unwrap_err();
    assert!(matches!(*err, ErrorKind::ResultPersistFailed(_)));
}

#[rstest]
fn download_is_handed_out_once(stubs: &Stubs) {
    let mut rendered =
        renderer(stubs.path("copy")).request().from_html("%PDF-1.4").name("invoice-42").encoding("UTF-8").render().unwrap();

    let download = rendered.take_download().unwrap();
    assert_eq!(download.filename, "invoice-42.pdf");
    assert_eq!(download.content_type, CONTENT_TYPE);
    assert_eq!(download.charset, "UTF-8");
    assert_eq!(download.body, b"%PDF-1.4");
    assert!(rendered.take_download().is_none());
}

#[rstest]
fn download_can_be_disabled(stubs: &Stubs) {
    let mut rendered = renderer(stubs.path("copy")).request().from_html("x").download(false).render().unwrap();
    assert!(rendered.take_download().is_none());
    assert!(rendered.saved().is_none());
}

#[rstest]
fn display_wrapper_runs_renderer(stubs: &Stubs) {
    let wrapper = stubs.path("wrapper").to_string_lossy().into_owned();
    let rendered = renderer(stubs.path("copy"))
        .request()
        .display_wrapper(true, Some(wrapper.clone()), Some("-a -b".to_string()))
        .from_html("wrapped")
        .render()
        .unwrap();

    assert_eq!(rendered.command().program(), wrapper.as_str());
    assert_eq!(&rendered.command().args()[..2], ["-a", "-b"]);
    assert!(Path::new(&rendered.command().args()[2]).ends_with("copy"));
    assert_eq!(fs::read_to_string(rendered.path()).unwrap(), "wrapped");
}

#[rstest]
#[case(Some("print"), "<html><body>invoice|print</body></html>")]
#[case(None, "<html><body>invoice|-</body></html>")]
fn template_is_rendered_through_views(stubs: &Stubs, #[case] layout: Option<&str>, #[case] expected: &str) {
    let mut request = renderer(stubs.path("copy")).request().template("invoice").from_template();
    if let Some(layout) = layout {
        request = request.layout(layout);
    }
    let rendered = request.render_with(FakeViews).unwrap();
    assert_eq!(fs::read_to_string(rendered.path()).unwrap(), expected);
}

#[rstest]
fn default_layout_comes_from_defaults(stubs: &Stubs) {
    let renderer = Renderer::new(Defaults {
        display_wrapper: DisplayWrapper::disabled(),
        executable: stubs.path("copy"),
        layout: Some("default".into()),
        ..Defaults::default()
    });
    let rendered = renderer.request().template("invoice").from_template().render_with(&FakeViews).unwrap();
    assert_eq!(fs::read_to_string(rendered.path()).unwrap(), "<html><body>invoice|default</body></html>");
}

#[rstest]
fn explicit_html_skips_views(stubs: &Stubs) {
    let rendered = renderer(stubs.path("copy")).request().template("invoice").from_html("mine").render_with(BrokenViews);
    assert_eq!(fs::read_to_string(rendered.unwrap().path()).unwrap(), "mine");
}

#[rstest]
fn template_mode_needs_a_template(stubs: &Stubs) {
    let err = renderer(stubs.path("copy")).request().from_template().render_with(FakeViews).unwrap_err();
    assert!(matches!(*err, ErrorKind::TemplateNotConfigured));

    let err = renderer(stubs.path("copy")).request().from_template().render().unwrap_err();
    assert!(matches!(*err, ErrorKind::TemplateNotConfigured));
}

#[rstest]
fn template_mode_without_views_names_the_template(stubs: &Stubs) {
    let err = renderer(stubs.path("marker")).request().template("invoice").from_template().render().unwrap_err();
    assert!(matches!(&*err, ErrorKind::ViewsNotSupplied(t) if t == "invoice"));
    assert!((*err).to_string().contains("render_with"));
    assert!(!stubs.path("marker.ran").exists());
}

#[rstest]
fn failing_views_are_reported(stubs: &Stubs) {
    let err = renderer(stubs.path("copy")).request().template("nope").from_template().render_with(BrokenViews).unwrap_err();
    assert!(matches!(*err, ErrorKind::Template));
}

#[rstest]
fn missing_executable(#[values("/nonexistent/wkhtmltopdf", "wkpdf-definitely-not-on-path")] executable: &str) {
    let err = renderer(executable).request().from_html("x").render().unwrap_err();
    assert!(matches!(*err, ErrorKind::ExecutableNotFound(_)));
}

#[test]
fn non_executable_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wkhtmltopdf");
    fs::write(&path, COPY).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

    let err = renderer(&path).request().from_html("x").render().unwrap_err();
    assert!(matches!(&*err, ErrorKind::ExecutableNotFound(p) if p == &path));
}

#[rstest]
fn missing_wrapper_is_spawn_failure(stubs: &Stubs) {
    let err = renderer(stubs.path("copy"))
        .request()
        .display_wrapper(true, Some("/nonexistent/xvfb-run".to_string()), None)
        .from_html("x")
        .render()
        .unwrap_err();
    assert!(matches!(&*err, ErrorKind::ProcessSpawnFailed(command) if command.starts_with("/nonexistent/xvfb-run")));
}

#[rstest]
fn slow_renderer_is_killed(stubs: &Stubs) {
    let err = renderer(stubs.path("slow"))
        .request()
        .from_url("https://example.com")
        .timeout(Duration::from_millis(200))
        .render()
        .unwrap_err();
    assert!(matches!(*err, ErrorKind::TimedOut(t) if t == Duration::from_millis(200)));
}
