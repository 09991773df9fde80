mod common;

use std::fs;

use pretty_assertions::assert_eq;
use scrollmark_engine::{
    ensure_data_dir, get_typed, AtomicFileWriter, DirectoryStore, JsonFileStore, KeyValueStore,
    MemoryStore, StorageError,
};
use serde_json::{json, Value};
use tempfile::TempDir;

async fn exercise(store: &dyn KeyValueStore) {
    assert_eq!(store.get("missing").await.unwrap(), None);

    store.set("b", json!(2)).await.unwrap();
    store.set("a", json!({"x": 1})).await.unwrap();
    assert_eq!(store.get("a").await.unwrap(), Some(json!({"x": 1})));

    store
        .update(
            "b",
            Box::new(|old: Option<Value>| Some(json!(old.and_then(|v| v.as_i64()).unwrap_or(0) + 40))),
        )
        .await
        .unwrap();
    assert_eq!(store.get("b").await.unwrap(), Some(json!(42)));

    store
        .update("fresh", Box::new(|old: Option<Value>| {
            assert!(old.is_none());
            Some(json!("created"))
        }))
        .await
        .unwrap();

    let mut keys = store.keys().await.unwrap();
    keys.sort();
    assert_eq!(keys, vec!["a", "b", "fresh"]);

    store.update("fresh", Box::new(|_: Option<Value>| None)).await.unwrap();
    store.delete("a").await.unwrap();
    store.delete("never-there").await.unwrap();
    assert_eq!(store.keys().await.unwrap(), vec!["b"]);
}

#[tokio::test]
async fn memory_store_supports_full_capability_set() {
    exercise(&MemoryStore::new()).await;
}

#[tokio::test]
async fn json_file_store_supports_full_capability_set() {
    let temp = TempDir::new().unwrap();
    let store = JsonFileStore::open(temp.path().join("settings.json")).unwrap();
    exercise(&store).await;
}

#[tokio::test]
async fn directory_store_supports_full_capability_set() {
    let temp = TempDir::new().unwrap();
    let store = DirectoryStore::open(temp.path().join("images")).unwrap();
    exercise(&store).await;
}

#[tokio::test]
async fn json_file_store_survives_reopen() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("settings.json");
    {
        let store = JsonFileStore::open(&path).unwrap();
        store.set("permanent_marks", json!(true)).await.unwrap();
    }
    let store = JsonFileStore::open(&path).unwrap();
    assert_eq!(store.get("permanent_marks").await.unwrap(), Some(json!(true)));
}

#[tokio::test]
async fn directory_store_keys_urls_with_awkward_characters() {
    let temp = TempDir::new().unwrap();
    let store = DirectoryStore::open(temp.path()).unwrap();
    let url = "https://example.com/a?b=c&d=<e>#f";
    store.set(url, json!("data:image/png;base64,AAAA")).await.unwrap();

    assert_eq!(store.keys().await.unwrap(), vec![url.to_string()]);
    assert_eq!(
        store.get(url).await.unwrap(),
        Some(json!("data:image/png;base64,AAAA"))
    );
}

#[tokio::test]
async fn corrupt_settings_file_is_set_aside() {
    common::init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("settings.json");
    fs::write(&path, "{\"permanent_marks\": tr").unwrap();

    let store = JsonFileStore::open(&path).unwrap();
    assert_eq!(store.get("permanent_marks").await.unwrap(), None);
    assert_eq!(
        fs::read_to_string(temp.path().join("settings.json.corrupt")).unwrap(),
        "{\"permanent_marks\": tr"
    );

    store.set("permanent_marks", json!(true)).await.unwrap();
    assert_eq!(store.get("permanent_marks").await.unwrap(), Some(json!(true)));
}

#[tokio::test]
async fn typed_read_flags_malformed_values() {
    let store = MemoryStore::new();
    store.set("permanent_marks", json!("yes")).await.unwrap();

    let result = get_typed::<bool>(&store, "permanent_marks").await;
    assert!(matches!(result, Err(StorageError::Malformed { ref key, .. }) if key == "permanent_marks"));
    assert_eq!(get_typed::<bool>(&store, "absent").await.unwrap(), None);
}

#[test]
fn creates_missing_data_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("data");
    assert!(!new_dir.exists());
    ensure_data_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_replaces_existing() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("settings.json", b"{}").unwrap();
    let second = writer.write("settings.json", b"{\"a\":1}").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "{\"a\":1}");
}

#[test]
fn no_partial_file_on_error() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    assert!(writer.write("settings.json", b"{}").is_err());
    assert!(!file_path.with_file_name("settings.json").exists());
}
