//! Runs the compiled `lexcorpus` binary against temporary folders.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn lexcorpus_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("lexcorpus");
    path
}

/// Temp workspace with a config whose store root lives inside it.
fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::create_dir_all(root.join("docs")).unwrap();

    let config_content = format!(
        r#"[chunking]
chunk_size = 200
overlap = 20

[ocr]
enabled = false

[store]
root = "{}/vector_databases"
"#,
        root.display()
    );
    let config_path = config_dir.join("lexcorpus.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(lexcorpus_binary())
        .arg("--config")
        .arg(config_path)
        .args(args)
        .output()
        .expect("failed to run lexcorpus binary");

    (
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
        output.status.success(),
    )
}

#[test]
fn build_missing_root_fails() {
    let (tmp, config) = setup_test_env();
    let missing = tmp.path().join("nope");
    let (_, stderr, ok) = run(&config, &["build", missing.to_str().unwrap(), "contracts"]);
    assert!(!ok);
    assert!(stderr.contains("root folder not found"), "stderr: {}", stderr);
    assert!(!tmp.path().join("vector_databases").exists());
}

#[test]
fn build_unsupported_only_is_empty_corpus() {
    let (tmp, config) = setup_test_env();
    let docs = tmp.path().join("docs");
    fs::write(docs.join("memo.docx"), "not ingested").unwrap();

    let (_, stderr, ok) = run(&config, &["build", docs.to_str().unwrap(), "contracts"]);
    assert!(!ok);
    assert!(stderr.contains("corpus is empty"), "stderr: {}", stderr);
}

#[test]
fn build_rejects_bad_db_name() {
    let (tmp, config) = setup_test_env();
    let docs = tmp.path().join("docs");
    fs::write(docs.join("a.txt"), "text").unwrap();

    let (_, stderr, ok) = run(&config, &["build", docs.to_str().unwrap(), "../escape"]);
    assert!(!ok);
    assert!(stderr.contains("invalid configuration"), "stderr: {}", stderr);
}

#[test]
fn build_with_disabled_embeddings_leaves_nothing() {
    let (tmp, config) = setup_test_env();
    let docs = tmp.path().join("docs");
    fs::write(docs.join("lease.txt"), "The tenant shall pay rent monthly.").unwrap();

    let (_, stderr, ok) = run(&config, &["build", docs.to_str().unwrap(), "leases"]);
    assert!(!ok);
    assert!(stderr.contains("embedding failed"), "stderr: {}", stderr);

    let store_root = tmp.path().join("vector_databases");
    let leftovers = fs::read_dir(&store_root)
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(leftovers, 0);
}

#[test]
fn scan_lists_supported_files() {
    let (tmp, config) = setup_test_env();
    let docs = tmp.path().join("docs");
    fs::create_dir_all(docs.join("nested")).unwrap();
    fs::write(docs.join("a.txt"), "alpha").unwrap();
    fs::write(docs.join("nested/b.TXT"), "beta").unwrap();
    fs::write(docs.join("c.csv"), "gamma").unwrap();

    let (stdout, _, ok) = run(&config, &["scan", docs.to_str().unwrap()]);
    assert!(ok);
    assert!(stdout.contains("a.txt"));
    assert!(stdout.contains("b.TXT"));
    assert!(!stdout.contains("c.csv"));
    assert!(stdout.contains("files found: 2"));

    let (stdout, _, ok) = run(&config, &["scan", docs.to_str().unwrap(), "--extract"]);
    assert!(ok);
    assert!(stdout.contains("estimated chunks: 1"), "stdout: {}", stdout);
    assert!(!tmp.path().join("vector_databases").exists());
}

#[test]
fn stats_on_missing_index_fails() {
    let (_tmp, config) = setup_test_env();
    let (_, stderr, ok) = run(&config, &["stats", "absent"]);
    assert!(!ok);
    assert!(stderr.contains("no index named 'absent'"), "stderr: {}", stderr);
}

#[test]
fn doctor_reports_tools() {
    let (_tmp, config) = setup_test_env();
    let (stdout, _, ok) = run(&config, &["doctor"]);
    assert!(ok);
    assert!(stdout.contains("pdftoppm"));
    assert!(stdout.contains("tesseract"));
    assert!(stdout.contains("embedding"));
}

#[test]
fn explicit_missing_config_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, ok) = run(&tmp.path().join("absent.toml"), &["doctor"]);
    assert!(!ok);
    assert!(stderr.contains("Failed to read config file"), "stderr: {}", stderr);
}
