use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;

const STYLE: &str = "body { font-size: 11pt; color: #222 }\nh1 { color: #1a4f8b }\n";

fn cmd() -> Command {
    Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap()
}

fn pdf_bytes(file: &assert_fs::fixture::ChildPath) -> Vec<u8> {
    std::fs::read(file.path()).unwrap()
}

#[test]
fn no_arguments_converts_booklet_with_defaults() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("booklet.md")
        .write_str("# Booklet\n\nA short booklet.\n")
        .unwrap();
    temp.child("css/style.css").write_str(STYLE).unwrap();
    let output = temp.child("booklet.pdf");
    output.assert(predicate::path::missing());

    cmd()
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout("Done\n");

    output.assert(predicate::path::is_file());
    assert!(pdf_bytes(&output).starts_with(b"%PDF-"));
}

#[test]
fn missing_source_fails_without_output() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("css/style.css").write_str(STYLE).unwrap();

    cmd()
        .current_dir(temp.path())
        .args(["--delay", "0"])
        .assert()
        .failure()
        .code(1)
        .stdout("")
        .stderr(predicate::str::contains("Markdown source not found"));

    temp.child("booklet.pdf").assert(predicate::path::missing());
}

#[test]
fn missing_stylesheet_fails_without_output() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("booklet.md").write_str("Hello").unwrap();

    cmd()
        .current_dir(temp.path())
        .args(["--delay", "0"])
        .assert()
        .failure()
        .stdout("")
        .stderr(predicate::str::contains("Stylesheet not found"));

    temp.child("booklet.pdf").assert(predicate::path::missing());
}

#[test]
fn rerun_overwrites_previous_output() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("booklet.md").write_str("Hello").unwrap();
    temp.child("css/style.css").write_str(STYLE).unwrap();
    let output = temp.child("booklet.pdf");
    output.write_str("stale").unwrap();

    for _ in 0..2 {
        cmd()
            .current_dir(temp.path())
            .args(["--delay", "0"])
            .assert()
            .success()
            .stdout("Done\n");
        assert!(pdf_bytes(&output).starts_with(b"%PDF-"));
    }
}

#[test]
fn input_argument_names_the_output() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("guide.md").write_str("# Guide\n\n- one\n- two\n").unwrap();

    cmd()
        .current_dir(temp.path())
        .args(["guide.md", "--no-css", "--delay", "0", "--paper", "letter", "--landscape"])
        .assert()
        .success()
        .stdout("Done\n");

    temp.child("guide.pdf").assert(predicate::path::is_file());
    temp.child("booklet.pdf").assert(predicate::path::missing());
}

#[test]
fn explicit_output_path() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("guide.md").write_str("Text").unwrap();
    temp.child("out").create_dir_all().unwrap();

    cmd()
        .current_dir(temp.path())
        .args(["guide.md", "-o", "out/final.pdf", "--no-css", "--delay", "0"])
        .assert()
        .success();

    temp.child("out/final.pdf").assert(predicate::path::is_file());
}

#[test]
fn config_file_supplies_job_and_options() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("docs/notes.md").write_str("Notes").unwrap();
    temp.child("theme.css").write_str(STYLE).unwrap();
    temp.child("booklet.toml")
        .write_str(
            r#"
[job]
source = "docs/notes.md"
destination = "notes.pdf"

[options]
stylesheet = "theme.css"
page_border = "2cm"
render_delay_ms = 0
"#,
        )
        .unwrap();

    cmd()
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout("Done\n");

    temp.child("notes.pdf").assert(predicate::path::is_file());
}

#[test]
fn malformed_config_is_reported() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("custom.toml")
        .write_str("[options]\npage_border = \"wide\"\n")
        .unwrap();

    cmd()
        .current_dir(temp.path())
        .args(["--config", "custom.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn invalid_border_is_rejected() {
    cmd()
        .args(["--border", "wide"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid length 'wide'"));
}
