//! Edge case tests for gymlog-store
//!
//! These tests cover boundary conditions and unusual inputs.

use gymlog_store::{
    integrity::tag_path, ChecksumAlgorithm, DataStorage, Entry, Error, RetryPolicy,
    StorageConfig,
};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::fs;
use tempfile::TempDir;

fn entries(value: Value) -> Vec<Entry> {
    serde_json::from_value(value).unwrap()
}

fn open(dir: &TempDir) -> DataStorage {
    DataStorage::open(
        StorageConfig::new(dir.path()).with_retry(RetryPolicy::immediate(3)),
    )
    .unwrap()
}

// ============================================================================
// Content Edge Cases
// ============================================================================

#[test]
fn unicode_strings() {
    let dir = TempDir::new().unwrap();
    let mut storage = open(&dir);

    let names = vec![
        "日本語テスト",
        "Привет мир",
        "مرحبا بالعالم",
        "🎉🚀💯",
        "Hello\nWorld\tTab",
        "Null\0Test",
    ];
    let data: Vec<Entry> = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            serde_json::from_value(json!({"id": i, "notes": name})).unwrap()
        })
        .collect();

    storage.save("weights", &data).unwrap();
    assert_eq!(storage.load("weights").unwrap(), data);
}

#[test]
fn nested_values_survive() {
    let dir = TempDir::new().unwrap();
    let mut storage = open(&dir);

    let data = entries(json!([{
        "id": 1,
        "name": "Session 1",
        "date": "2026-10-19T08:30:00",
        "exercises": [{"id": 3, "sets": 3}, {"id": 5, "sets": 2}],
        "notes": null
    }]));

    storage.save("sessions", &data).unwrap();
    assert_eq!(storage.load("sessions").unwrap(), data);
}

#[test]
fn large_collection() {
    let dir = TempDir::new().unwrap();
    let mut storage = open(&dir);

    let data: Vec<Entry> = (0..5_000)
        .map(|i| serde_json::from_value(json!({"id": i, "weight": i as f64 / 2.0})).unwrap())
        .collect();

    storage.save("weights", &data).unwrap();
    assert_eq!(storage.load("weights").unwrap().len(), 5_000);
}

#[test]
fn empty_collection_is_written() {
    let dir = TempDir::new().unwrap();
    let mut storage = open(&dir);

    storage.save("reports", &[]).unwrap();
    assert!(dir.path().join("reports.json").exists());
    assert!(storage.load("reports").unwrap().is_empty());
}

// ============================================================================
// On-disk Edge Cases
// ============================================================================

#[test]
fn legacy_document_without_tag_loads() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("exercises.json"),
        r#"[{"id": 1, "name": "Plank"}]"#,
    )
    .unwrap();

    let mut storage = open(&dir);
    assert_eq!(
        storage.load("exercises").unwrap(),
        entries(json!([{"id": 1, "name": "Plank"}]))
    );

    // The next save backs it up and writes a tag.
    storage.save("exercises", &[]).unwrap();
    assert!(tag_path(&dir.path().join("exercises.json")).exists());
    assert_eq!(storage.list_backups("exercises").unwrap().len(), 1);
}

#[test]
fn unreadable_tag_is_corruption() {
    let dir = TempDir::new().unwrap();
    let mut storage = open(&dir);
    storage.save("weights", &entries(json!([{"weight": 60}]))).unwrap();
    storage.save("weights", &entries(json!([{"weight": 70}]))).unwrap();

    let doc = dir.path().join("weights.json");
    fs::write(&doc, r#"[{"weight": 90}]"#).unwrap();
    fs::write(tag_path(&doc), "sha256:zz").unwrap();

    assert!(matches!(
        storage.verify("weights"),
        Err(Error::CorruptedState { .. })
    ));
    assert_eq!(
        storage.load("weights").unwrap(),
        entries(json!([{"weight": 60}]))
    );
}

#[test]
fn backup_of_unreadable_tag_is_skipped() {
    let dir = TempDir::new().unwrap();
    let mut storage = open(&dir);
    storage.save("weights", &entries(json!([{"weight": 50}]))).unwrap();
    storage.save("weights", &entries(json!([{"weight": 60}]))).unwrap();

    let doc = dir.path().join("weights.json");
    fs::write(tag_path(&doc), "not a checksum").unwrap();

    // Saving over the damaged tag works; its backup keeps the damage.
    storage.save("weights", &entries(json!([{"weight": 70}]))).unwrap();
    let newest = &storage.list_backups("weights").unwrap()[0];
    assert_eq!(
        fs::read_to_string(newest.tag_path()).unwrap(),
        "not a checksum"
    );

    fs::write(&doc, "[{").unwrap();
    assert_eq!(
        storage.load("weights").unwrap(),
        entries(json!([{"weight": 50}]))
    );
}

#[test]
fn non_array_document_is_corruption() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("weights.json"), r#"{"id": 1}"#).unwrap();

    let storage = open(&dir);
    assert!(matches!(
        storage.verify("weights"),
        Err(Error::CorruptedState { .. })
    ));
}

#[test]
fn array_of_scalars_is_corruption() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("weights.json"), "[1, 2, 3]").unwrap();

    let mut storage = open(&dir);
    assert_eq!(
        storage.load("weights"),
        Err(Error::NoValidBackup("weights".into()))
    );
}

#[test]
fn truncated_document_is_restored() {
    let dir = TempDir::new().unwrap();
    let mut storage = open(&dir);

    let first = entries(json!([{"id": 1}]));
    storage.save("sessions", &first).unwrap();
    storage.save("sessions", &entries(json!([{"id": 1}, {"id": 2}]))).unwrap();

    let doc = dir.path().join("sessions.json");
    let bytes = fs::read(&doc).unwrap();
    fs::write(&doc, &bytes[..bytes.len() / 2]).unwrap();

    assert_eq!(storage.load("sessions").unwrap(), first);
}

#[test]
fn document_swapped_between_collections_is_detected() {
    let dir = TempDir::new().unwrap();
    let mut storage = open(&dir);

    storage.save("weights", &entries(json!([{"w": 1}]))).unwrap();
    storage.save("weights", &entries(json!([{"w": 2}]))).unwrap();
    storage.save("sessions", &entries(json!([{"s": 1}]))).unwrap();

    // Valid JSON, wrong bytes for the stored tag.
    fs::copy(dir.path().join("sessions.json"), dir.path().join("weights.json")).unwrap();

    assert_eq!(storage.load("weights").unwrap(), entries(json!([{"w": 1}])));
}

#[test]
fn sha512_tags() {
    let dir = TempDir::new().unwrap();
    let config = StorageConfig::new(dir.path()).with_checksum(ChecksumAlgorithm::Sha512);
    let mut storage = DataStorage::open(config).unwrap();

    storage.save("weights", &entries(json!([{"id": 1}]))).unwrap();
    let tag = fs::read_to_string(tag_path(&dir.path().join("weights.json"))).unwrap();
    assert!(tag.starts_with("sha512:"));
    assert_eq!(tag.len(), "sha512:".len() + 128);

    // Tags written with another algorithm still verify.
    let mut sha256 = open(&dir);
    assert_eq!(sha256.load("weights").unwrap(), entries(json!([{"id": 1}])));
}

#[test]
fn invalid_collection_names_rejected() {
    let dir = TempDir::new().unwrap();
    let mut storage = open(&dir);

    for name in ["", "../weights", "weights.json", "a/b", "space name"] {
        assert_eq!(
            storage.load(name),
            Err(Error::InvalidCollectionName(name.to_string())),
            "{:?}",
            name
        );
        assert!(storage.save(name, &[]).is_err());
    }
}

#[test]
fn zero_backup_window_keeps_none() {
    let dir = TempDir::new().unwrap();
    let config = StorageConfig::new(dir.path()).with_max_backups(0);
    let mut storage = DataStorage::open(config).unwrap();

    storage.save("weights", &[]).unwrap();
    storage.save("weights", &[]).unwrap();
    assert!(storage.list_backups("weights").unwrap().is_empty());
}

#[test]
fn metrics_capacity_is_respected() {
    let dir = TempDir::new().unwrap();
    let config = StorageConfig::new(dir.path()).with_metrics_capacity(5);
    let mut storage = DataStorage::open(config).unwrap();

    for _ in 0..10 {
        storage.load("weights").unwrap();
    }
    assert_eq!(storage.metrics().len(), 5);
}

// ============================================================================
// Property Tests
// ============================================================================

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        (-1.0e6f64..1.0e6).prop_map(Value::from),
        "[a-zA-Z0-9 _-]{0,16}".prop_map(Value::from),
    ]
}

fn arb_entry() -> impl Strategy<Value = Entry> {
    prop::collection::btree_map("[a-z_]{1,8}", arb_value(), 0..6)
        .prop_map(|fields| fields.into_iter().collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_save_load_roundtrip(data in prop::collection::vec(arb_entry(), 0..20)) {
        let dir = TempDir::new().unwrap();
        let mut storage = open(&dir);

        storage.save("weights", &data).unwrap();
        prop_assert_eq!(storage.load("weights").unwrap(), data);
    }
}
