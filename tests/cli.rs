//! 命令行集成测试

use std::fs;

use assert_cmd::Command;
use tempfile::TempDir;

const PAGE: &str = "<!DOCTYPE html><html><head><title>测试</title></head>\
                    <body><p>我喜欢阅读和预订机票</p></body></html>";

const VOCABULARY: &str = r#"[
  { "id": "book", "text": "book", "inflections": ["booking"], "translation": "预订", "category": "wanted" }
]"#;

const MEMORY: &str = r#"{
  "translations": { "我喜欢阅读和预订机票": "I like reading and booking flights" }
}"#;

const CONFIG: &str = r#"
target_lang = "en"
cache_enabled = false

[[providers]]
id = "memory"

[domains]
deny = ["blocked.example.com"]
"#;

fn workspace() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("page.html"), PAGE).unwrap();
    fs::write(dir.path().join("vocab.json"), VOCABULARY).unwrap();
    fs::write(dir.path().join("memory.json"), MEMORY).unwrap();
    fs::write(dir.path().join("config.toml"), CONFIG).unwrap();
    dir
}

fn vocabmark(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
    cmd.current_dir(dir.path())
        .env_remove("VOCABMARK_DEEPLX_URL")
        .env_remove("VOCABMARK_ENABLED")
        .args(["--input", "page.html", "--vocabulary", "vocab.json"])
        .args(["--memory", "memory.json", "--config", "config.toml"]);
    cmd
}

#[test]
fn test_annotates_document_to_stdout() {
    let dir = workspace();
    let assert = vocabmark(&dir).assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();

    assert!(stdout.contains("data-vm-form=\"booking\""), "{}", stdout);
    assert!(stdout.contains("data-vm-original=\"预订\""), "{}", stdout);
    assert!(stdout.contains("data-vm-stylesheet"), "{}", stdout);
}

#[test]
fn test_writes_output_file() {
    let dir = workspace();
    vocabmark(&dir)
        .args(["--output", "out.html"])
        .assert()
        .success()
        .stdout("");

    let output = fs::read_to_string(dir.path().join("out.html")).unwrap();
    assert!(output.contains("我喜欢阅读和"));
    assert!(output.contains("class=\"vm-unit vm-wanted\""));
}

#[test]
fn test_denied_domain_leaves_page_unchanged() {
    let dir = workspace();
    let assert = vocabmark(&dir)
        .args(["--url", "https://blocked.example.com/news"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();

    assert!(stdout.contains("我喜欢阅读和预订机票"));
    assert!(!stdout.contains("data-vm-unit"));
}

#[test]
fn test_missing_vocabulary_fails() {
    let dir = workspace();
    fs::remove_file(dir.path().join("vocab.json")).unwrap();
    vocabmark(&dir).assert().failure();
}

#[test]
fn test_init_config_writes_defaults() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin(env!("CARGO_PKG_NAME"))
        .unwrap()
        .current_dir(dir.path())
        .args(["--init-config", "vocabmark.toml"])
        .assert()
        .success();

    let written = fs::read_to_string(dir.path().join("vocabmark.toml")).unwrap();
    assert!(written.contains("batch_size = 10"));
    assert!(written.contains("similarity_threshold = 0.65"));
}

#[test]
fn test_list_env_prints_known_variables() {
    let assert = Command::cargo_bin(env!("CARGO_PKG_NAME"))
        .unwrap()
        .arg("--list-env")
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(stdout.contains("VOCABMARK_LOG_LEVEL"));
    assert!(stdout.contains("VOCABMARK_DEEPLX_URL"));
}
