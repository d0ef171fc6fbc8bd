use std::fs;
use std::path::PathBuf;
use std::process::Output;

/// Helper to create a temp directory that is cleaned up on drop.
struct TempDir {
    path: PathBuf,
}

impl TempDir {
    fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!("argwright_cli_test_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&path);
        fs::create_dir_all(&path).expect("failed to create temp dir");
        Self { path }
    }

    fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// A small archiver with one nested command.
fn write_archive_doc(dir: &TempDir) -> PathBuf {
    let yaml = r#"name: archive
options:
  description: Pack files into an archive
args:
  - type: flag
    short: v
    long: verbose
    kind: count
  - type: option
    short: l
    long: level
    kind: uint8
    default: 6
subcommands:
  - name: create
    description: create an archive
    args:
      - type: option
        short: f
        long: format
        choices:
          - value: tar
            description: tape archive
          - value: zip
            description: zip archive
        default: tar
      - type: positional
        name: files
        list: true
      - type: positional
        name: output
"#;
    let path = dir.join("archive.yaml");
    fs::write(&path, yaml).expect("failed to write document");
    path
}

fn run(args: &[&str]) -> Output {
    std::process::Command::new(env!("CARGO_BIN_EXE_argwright"))
        .args(args)
        .output()
        .expect("failed to run argwright")
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

#[test]
fn validate_accepts_well_formed_documents() {
    let dir = TempDir::new("validate_ok");
    let doc = write_archive_doc(&dir);

    let out = run(&["validate", doc.to_str().unwrap()]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Validated 1 document(s) with 0 warning(s)."), "stdout: {stdout}");
}

#[test]
fn validate_reports_schema_errors_with_exit_code_2() {
    let dir = TempDir::new("validate_bad");
    let doc = dir.join("bad.yaml");
    fs::write(
        &doc,
        "name: bad\nargs:\n  - type: flag\n    short: x\n  - type: flag\n    short: x\n",
    )
    .unwrap();

    let out = run(&["validate", doc.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("bad.yaml"), "stderr: {stderr}");
    assert!(stderr.contains("1 of 1 document(s) failed validation"), "stderr: {stderr}");
}

#[test]
fn validate_prints_warnings() {
    let dir = TempDir::new("validate_warn");
    let doc = dir.join("lists.json");
    let json = serde_json::json!({
        "name": "pair",
        "args": [
            {"type": "positional", "name": "left", "list": true},
            {"type": "positional", "name": "right", "list": true}
        ]
    });
    fs::write(&doc, serde_json::to_string_pretty(&json).unwrap()).unwrap();

    let out = run(&["validate", doc.to_str().unwrap()]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("warning:"), "stdout: {stdout}");
    assert!(stdout.contains("with 1 warning(s)"), "stdout: {stdout}");
}

// ---------------------------------------------------------------------------
// usage
// ---------------------------------------------------------------------------

#[test]
fn usage_renders_root_and_nested_commands() {
    let dir = TempDir::new("usage");
    let doc = write_archive_doc(&dir);
    let doc = doc.to_str().unwrap();

    let out = run(&["usage", doc]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.starts_with("Usage: archive [OPTIONS] <command> ..."), "stdout: {stdout}");
    assert!(stdout.contains("create an archive"));

    let out = run(&["usage", doc, "--command", "create", "--format", "markdown"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.starts_with("# archive create"), "stdout: {stdout}");
    assert!(stdout.contains("| `<files>...` |"));
}

#[test]
fn usage_rejects_unknown_command_path() {
    let dir = TempDir::new("usage_unknown");
    let doc = write_archive_doc(&dir);

    let out = run(&["usage", doc.to_str().unwrap(), "--command", "extract"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("has no command 'extract'"));
}

// ---------------------------------------------------------------------------
// parse
// ---------------------------------------------------------------------------

#[test]
fn parse_prints_report_for_nested_command() {
    let dir = TempDir::new("parse_ok");
    let doc = write_archive_doc(&dir);

    let out = run(&[
        "parse",
        doc.to_str().unwrap(),
        "--",
        "-vv",
        "create",
        "--format=zip",
        "a.txt",
        "b.txt",
        "out.zip",
    ]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let report: serde_json::Value = serde_json::from_slice(&out.stdout).expect("report is JSON");
    assert_eq!(report["success"], true);
    assert_eq!(report["selected_command"], serde_json::json!(["archive", "create"]));
    assert_eq!(report["commands"][0]["values"]["--verbose"], 2);
    assert_eq!(report["commands"][0]["values"]["--level"], 6);
    assert_eq!(report["commands"][1]["values"]["--format"], "zip");
    assert_eq!(report["commands"][1]["values"]["files"], serde_json::json!(["a.txt", "b.txt"]));
    assert_eq!(report["commands"][1]["values"]["output"], "out.zip");
}

#[test]
fn parse_failure_exits_with_1() {
    let dir = TempDir::new("parse_fail");
    let doc = write_archive_doc(&dir);

    let out = run(&["parse", doc.to_str().unwrap(), "--format", "yaml", "--", "--level", "300"]);
    assert_eq!(out.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("success: false"), "stdout: {stdout}");
    assert!(stdout.contains("error: invalid_value"), "stdout: {stdout}");
    assert!(String::from_utf8_lossy(&out.stderr).contains("parse failed"));
}

#[test]
fn parse_missing_document_is_a_schema_error() {
    let dir = TempDir::new("parse_missing");
    let out = run(&["parse", dir.join("nope.yaml").to_str().unwrap(), "--"]);
    assert_eq!(out.status.code(), Some(2));
}
