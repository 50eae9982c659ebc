//! Durable store behaviour: round trip, atomic replace, corrupt files,
//! concurrent writers and identifier policy.

use ledger_insight::config::PipelineConfig;
use ledger_insight::schema::{catalog, RawRecord, Value};
use ledger_insight::storage::{CsvRecordStore, RecordStore};
use ledger_insight::Error;
use std::fs;
use std::sync::Arc;

fn order(id: &str, minutes: i64) -> RawRecord {
    RawRecord::new()
        .set("Order_ID", id)
        .set("Agent_Age", 31)
        .set("Agent_Rating", 4.8)
        .set("Order_Date", "2024-03-11")
        .set("Order_Time", "11:30:00")
        .set("Weather", "Sunny")
        .set("Vehicle", "motorcycle")
        .set("Area", "Metropolitian")
        .set("Delivery_Time", minutes)
        .set("Category", "Snacks, Drinks")
}

fn store_in(dir: &tempfile::TempDir) -> CsvRecordStore {
    let config = PipelineConfig::default().with_data_dir(dir.path());
    CsvRecordStore::open(config.store_path("orders"), catalog::orders())
}

#[test]
fn test_round_trip_last_record_equals_appended() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    assert!(store.path().ends_with("orders_data.csv"));

    store.append_raw(order("ORD-1", 30)).unwrap();
    let appended = store.append_raw(order("ORD-2", 45)).unwrap();

    let reopened = store_in(&dir);
    let loaded = reopened.try_load().unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded.last().unwrap(), appended);
    assert_eq!(loaded.last().unwrap().get("Traffic"), Some(&Value::Null));
    assert_eq!(
        loaded.last().unwrap().get("Category"),
        Some(&Value::from("Snacks, Drinks"))
    );
    assert_eq!(
        loaded.last().unwrap().get("Order_Time").unwrap().to_string(),
        "11:30:00"
    );
    let raw = fs::read_to_string(reopened.path()).unwrap();
    assert!(raw.contains(",11:30:00,"));
}

#[test]
fn test_failed_append_leaves_file_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.append_raw(order("ORD-1", 30)).unwrap();
    let before = fs::read(store.path()).unwrap();

    // Duplicate unique identifier
    let err = store.append_raw(order("ORD-1", 99)).unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
    // Invalid record never reaches the medium
    assert!(store.append_raw(order("ORD-2", -5)).is_err());

    assert_eq!(fs::read(store.path()).unwrap(), before);
}

#[test]
fn test_no_temp_files_left_behind() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    for i in 0..3 {
        store.append_raw(order(&format!("ORD-{i}"), 20)).unwrap();
    }
    let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn test_corrupt_file_degrades_load_but_blocks_append() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    fs::write(store.path(), "this is not,the header\n1,2\n").unwrap();

    assert!(store.load().is_empty());
    assert!(matches!(store.try_load(), Err(Error::Storage(_))));

    assert!(store.append_raw(order("ORD-1", 30)).is_err());
    assert_eq!(
        fs::read_to_string(store.path()).unwrap(),
        "this is not,the header\n1,2\n"
    );
}

#[test]
fn test_concurrent_handles_serialize_appends() {
    let dir = tempfile::tempdir().unwrap();
    let path = Arc::new(store_in(&dir).path().to_path_buf());

    std::thread::scope(|scope| {
        for worker in 0..4 {
            let path = Arc::clone(&path);
            scope.spawn(move || {
                let store = CsvRecordStore::open(path.as_path(), catalog::orders());
                for i in 0..6 {
                    store.append_raw(order(&format!("W{worker}-{i}"), 25)).unwrap();
                }
            });
        }
    });

    let loaded = store_in(&dir).try_load().unwrap();
    assert_eq!(loaded.len(), 24);
}

#[test]
fn test_concurrent_duplicate_identifier_accepted_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    let accepted: usize = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| usize::from(store.append_raw(order("SAME", 10)).is_ok())))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).sum()
    });

    assert_eq!(accepted, 1);
    assert_eq!(store.load().len(), 1);
}
