//! CLI integration tests.

#![allow(clippy::panic)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn docs() -> TempDir {
    let dir = TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
    std::fs::write(
        dir.path().join("report.txt"),
        "Section 2.\nIn this work X is de-\nfined as Y for all inputs.",
    )
    .unwrap_or_else(|e| panic!("write: {e}"));
    dir
}

fn cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("pdf-dialogue").unwrap_or_else(|e| panic!("binary: {e}"));
    cmd.env_remove("OPENAI_API_KEY")
        .env_remove("PDF_DIALOGUE_API_KEY")
        .env_remove("PDF_DIALOGUE_FILES_DIR")
        .env_remove("FILES_DIR")
        .env_remove("RUST_LOG")
        .env_remove("PDF_DIALOGUE_MAX_MATCHES")
        .env_remove("PDF_DIALOGUE_CONTEXT_WINDOW")
        .arg("--files-dir")
        .arg(dir.path())
        .args(["--extension", "txt", "--extractor", "plain"]);
    cmd
}

#[test]
fn test_help() {
    Command::cargo_bin("pdf-dialogue")
        .unwrap_or_else(|e| panic!("binary: {e}"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ask"))
        .stdout(predicate::str::contains("search"));
}

#[test]
fn test_search_across_line_break() {
    let dir = docs();
    cmd(&dir)
        .args(["search", "report", "X is defined as Y"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("1 match(es) in report"));
}

#[test]
fn test_search_json_missing_document() {
    let dir = docs();
    cmd(&dir)
        .args(["--format", "json", "search", "absent", "X"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"file_exists\": false"))
        .stdout(predicate::str::contains("error").not());
}

#[test]
fn test_search_match_limit_from_env() {
    let dir = TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
    std::fs::write(dir.path().join("log.txt"), "error one. error two. error three.")
        .unwrap_or_else(|e| panic!("write: {e}"));
    cmd(&dir)
        .env("PDF_DIALOGUE_MAX_MATCHES", "2")
        .args(["search", "log", "error"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("2 match(es) in log"));
}

#[test]
fn test_search_no_match() {
    let dir = docs();
    cmd(&dir)
        .args(["search", "report", "not in the text"])
        .assert()
        .success()
        .stdout("No match in report\n");
}

#[test]
fn test_ask_without_api_key_fails() {
    let dir = docs();
    cmd(&dir)
        .args(["ask", "What is X?"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("API key missing"));
}

#[test]
fn test_bad_extractor_rejected() {
    let dir = docs();
    Command::cargo_bin("pdf-dialogue")
        .unwrap_or_else(|e| panic!("binary: {e}"))
        .arg("--files-dir")
        .arg(dir.path())
        .args(["--extractor", "ocr", "search", "report", "X"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown extractor"));
}

#[test]
fn test_init_prompt_writes_file() {
    let dir = docs();
    let path = dir.path().join("prompt").join("system.md");
    cmd(&dir)
        .arg("init-prompt")
        .arg("--path")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote system prompt"));
    let content = std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("read: {e}"));
    assert!(content.contains("search_pdf"));
}
