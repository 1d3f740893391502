//! Integration tests for the filtersync binary.
//!
//! These drive the compiled CLI against a temporary config. Commands that would
//! need network access are only exercised on their failure paths.

use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Helper to get the path to the compiled binary
fn get_binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_filtersync"))
}

/// Run filtersync command and return output
fn run_filtersync(args: &[&str]) -> std::process::Output {
    Command::new(get_binary_path())
        .args(args)
        .output()
        .expect("Failed to execute filtersync")
}

fn write_config(dir: &Path, filters: &str) -> PathBuf {
    let path = dir.join("config.yaml");
    let yaml = format!(
        "filter_dir: {}\nupdate_interval_hours: 1\nfilters:\n{}",
        dir.join("filters").display(),
        filters
    );
    std::fs::write(&path, yaml).unwrap();
    path
}

#[test]
fn test_version_command() {
    let output = run_filtersync(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("filtersync"));
}

#[test]
fn test_help_command() {
    let output = run_filtersync(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for cmd in ["run", "add", "remove", "modify", "list", "refresh"] {
        assert!(stdout.contains(cmd), "help is missing {}", cmd);
    }
}

#[test]
fn test_list_json_reads_config() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        dir.path(),
        "  - id: 1700000000\n    name: Example\n    url: https://example.invalid/list.txt\n",
    );
    std::fs::create_dir_all(dir.path().join("filters")).unwrap();
    std::fs::write(
        dir.path().join("filters/1700000000.txt"),
        "# header\nrule1\nrule2\n",
    )
    .unwrap();

    let output = run_filtersync(&["list", "--json", "-c", config.to_str().unwrap()]);
    assert!(output.status.success(), "{:?}", output);

    let list: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["name"], "Example");
    assert_eq!(list[0]["rule_count"], 2);
    assert_eq!(list[0]["enabled"], true);
}

#[test]
fn test_remove_unknown_url_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "  []\n");

    let output = run_filtersync(&[
        "remove",
        "https://example.invalid/none.txt",
        "-c",
        config.to_str().unwrap(),
    ]);
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("not found"));
}

#[test]
fn test_remove_deletes_file_and_config_entry() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        dir.path(),
        "  - id: 5\n    name: Example\n    url: https://example.invalid/list.txt\n",
    );
    let file = dir.path().join("filters/5.txt");
    std::fs::create_dir_all(file.parent().unwrap()).unwrap();
    std::fs::write(&file, "rule\n").unwrap();

    let output = run_filtersync(&[
        "remove",
        "https://example.invalid/list.txt",
        "-c",
        config.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{:?}", output);
    assert!(!file.exists());

    let saved = std::fs::read_to_string(&config).unwrap();
    assert!(!saved.contains("example.invalid"));
}

#[test]
fn test_modify_disable_persists() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        dir.path(),
        "  - id: 5\n    name: Example\n    url: https://example.invalid/list.txt\n",
    );

    let output = run_filtersync(&[
        "modify",
        "https://example.invalid/list.txt",
        "--disable",
        "--name",
        "Renamed",
        "-c",
        config.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("enabled changed"));

    let saved = std::fs::read_to_string(&config).unwrap();
    assert!(saved.contains("enabled: false"));
    assert!(saved.contains("name: Renamed"));
}

#[test]
fn test_add_rejects_non_http_url() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "  []\n");

    let output = run_filtersync(&[
        "add",
        "--name",
        "Local",
        "--url",
        "file:///etc/hosts",
        "-c",
        config.to_str().unwrap(),
    ]);
    assert!(!output.status.success());
}
