//! Integration tests for roots backed by JSON and YAML files.
//!
//! Every test works in its own temporary directory.

use hotmarkup::{FileFormat, FileStore, Root, RootOptions, Store};
use serde_json::{Value, json};
use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};
use tempfile::TempDir;

fn setup_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

fn open(path: &Path) -> Root<FileStore> {
    let store = FileStore::open(path).expect("format should be inferred");
    Root::open(store, RootOptions::named("file")).expect("root should open")
}

/// Rewrite a file as another process would, with a distinct mtime.
fn external_write(path: &Path, content: &str, secs: u64) {
    std::fs::write(path, content).unwrap();
    let file = std::fs::File::options().write(true).open(path).unwrap();
    file.set_modified(UNIX_EPOCH + Duration::from_secs(secs))
        .unwrap();
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn json_writes_survive_reopen() {
    let dir = setup_dir();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"server": {"port": 8080}, "tags": ["a"]}"#).unwrap();

    let mut root = open(&path);
    root.set("server.port", 9090).unwrap();
    root.node("tags").unwrap().append("b").unwrap();
    drop(root);

    assert_eq!(
        read_json(&path),
        json!({"server": {"port": 9090}, "tags": ["a", "b"]})
    );
    let mut reopened = open(&path);
    assert_eq!(reopened.get("tags.1").unwrap(), json!("b"));
}

#[test]
fn yaml_writes_survive_reopen() {
    let dir = setup_dir();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "name: demo\nlimits:\n  max: 3\n").unwrap();

    let mut root = open(&path);
    root.set("limits.max", 5).unwrap();
    root.set("limits.min", 1).unwrap();
    drop(root);

    let content = std::fs::read_to_string(&path).unwrap();
    let value: Value = serde_yaml::from_str(&content).unwrap();
    assert_eq!(value, json!({"name": "demo", "limits": {"max": 5, "min": 1}}));
    assert!(content.starts_with("name: demo"));
}

#[test]
fn default_written_only_when_missing_or_empty() {
    let dir = setup_dir();
    let missing = dir.path().join("nested").join("missing.json");
    let store = FileStore::open(&missing)
        .unwrap()
        .with_default(json!({"fresh": true}))
        .unwrap();
    let mut root = Root::open(store, RootOptions::named("file")).unwrap();
    assert_eq!(root.get("fresh").unwrap(), json!(true));

    let empty = dir.path().join("empty.yaml");
    std::fs::write(&empty, "").unwrap();
    let store = FileStore::open(&empty)
        .unwrap()
        .with_default(json!({"from": "default"}))
        .unwrap();
    assert_eq!(store.load().unwrap(), json!({"from": "default"}));

    let existing = dir.path().join("existing.json");
    std::fs::write(&existing, r#"{"kept": 1}"#).unwrap();
    let store = FileStore::open(&existing)
        .unwrap()
        .with_default(json!({"kept": 0}))
        .unwrap();
    assert_eq!(store.load().unwrap(), json!({"kept": 1}));
}

#[test]
fn override_is_merged_over_file() {
    let dir = setup_dir();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"db": {"host": "prod", "port": 5432}}"#).unwrap();

    let store = FileStore::open(&path)
        .unwrap()
        .with_override(json!({"db": {"host": "localhost"}}));
    let mut root = Root::open(store, RootOptions::named("file")).unwrap();
    assert_eq!(
        root.get("db").unwrap(),
        json!({"host": "localhost", "port": 5432})
    );

    // The override applies again after an external edit
    external_write(&path, r#"{"db": {"host": "prod", "port": 6432}}"#, 1_000);
    assert_eq!(root.get("db.host").unwrap(), json!("localhost"));
    assert_eq!(root.get("db.port").unwrap(), json!(6432));
}

#[test]
fn external_edit_triggers_reload() {
    let dir = setup_dir();
    let path = dir.path().join("config.yaml");
    external_write(&path, "a: 1\nkeep:\n  x: 1\n", 1_000);

    let mut root = open(&path);
    root.node("keep").unwrap().set_reload(false).unwrap();
    external_write(&path, "a: 2\nkeep:\n  x: 100\n", 2_000);

    assert_eq!(root.get("a").unwrap(), json!(2));
    assert_eq!(root.get("keep.x").unwrap(), json!(1));
}

#[test]
fn broken_file_keeps_previous_tree() {
    let dir = setup_dir();
    let path = dir.path().join("config.json");
    external_write(&path, r#"{"a": 1}"#, 1_000);

    let mut root = open(&path);
    external_write(&path, r#"{"a": "#, 2_000);
    let err = root.get("a").unwrap_err();
    assert_eq!(err.code(), hotmarkup::ErrorCode::StoreError);

    root.set_reload(false);
    assert_eq!(root.get("a").unwrap(), json!(1));
}

#[test]
fn explicit_format_ignores_extension() {
    let dir = setup_dir();
    let path = dir.path().join("config.conf");
    std::fs::write(&path, "a: [1, 2]\n").unwrap();
    assert!(FileStore::open(&path).is_err());

    let store = FileStore::new(&path, FileFormat::Yaml);
    let mut root = Root::open(store, RootOptions::named("file")).unwrap();
    root.node("a").unwrap().reverse().unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "a:\n- 2\n- 1\n");
}
