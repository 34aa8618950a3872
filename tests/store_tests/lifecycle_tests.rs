//! Tests for store lifecycle
//!
//! These tests verify:
//! - Operations after close fail with `Closed`
//! - Close is idempotent
//! - Data survives close/reopen, drop/reopen and crashes
//! - Explicit checkpoints

use std::fs;

use kvl::{KeyValueStore, KvlError, Schema, Utf8Serializer};
use tempfile::TempDir;

use super::{config_for, scan_all, setup_string_store};

fn open_string_store(dir: &TempDir) -> KeyValueStore<String, Utf8Serializer> {
    KeyValueStore::open_with(config_for(dir.path()), Utf8Serializer).unwrap()
}

// =============================================================================
// Close Tests
// =============================================================================

#[test]
fn test_operations_after_close_fail() {
    let (_temp, store) = setup_string_store();
    store.add(b"k", &"v".to_string()).unwrap();

    store.close().unwrap();
    assert!(store.is_closed());

    let value = "v".to_string();
    assert!(matches!(store.add(b"k", &value), Err(KvlError::Closed)));
    assert!(matches!(store.upsert(b"k", &value), Err(KvlError::Closed)));
    assert!(matches!(store.update(b"k", &value), Err(KvlError::Closed)));
    assert!(matches!(store.delete(b"k"), Err(KvlError::Closed)));
    assert!(matches!(store.get(b"k"), Err(KvlError::Closed)));
    assert!(matches!(store.len(), Err(KvlError::Closed)));
    assert!(matches!(store.checkpoint(), Err(KvlError::Closed)));
    assert!(matches!(
        store.add_batch(vec![("k", &value)]),
        Err(KvlError::Closed)
    ));
    assert!(matches!(store.delete_batch(["k"]), Err(KvlError::Closed)));
}

#[test]
fn test_double_close_is_ok() {
    let (_temp, store) = setup_string_store();

    store.close().unwrap();
    store.close().unwrap();

    assert!(store.is_closed());
}

#[test]
fn test_close_writes_table_file() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_string_store(&temp_dir);
    store.add(b"k", &"v".to_string()).unwrap();

    store.close().unwrap();

    let table_path = temp_dir.path().join(Schema::default().table_file_name());
    let wal_path = temp_dir.path().join(Schema::default().wal_file_name());
    assert!(table_path.exists());
    assert_eq!(fs::metadata(wal_path).unwrap().len(), 0);
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_data_survives_close_and_reopen() {
    let temp_dir = TempDir::new().unwrap();

    {
        let store = open_string_store(&temp_dir);
        store.add(b"a", &"1".to_string()).unwrap();
        store.upsert(b"b", &"2".to_string()).unwrap();
        store.update(b"a", &"3".to_string()).unwrap();
        store.close().unwrap();
    }

    let store = open_string_store(&temp_dir);
    assert_eq!(
        scan_all(&store),
        vec![("a".to_string(), "3".to_string()), ("b".to_string(), "2".to_string())]
    );
}

#[test]
fn test_data_survives_drop_without_close() {
    let temp_dir = TempDir::new().unwrap();

    {
        let store = open_string_store(&temp_dir);
        store.add(b"a", &"1".to_string()).unwrap();
    }

    let store = open_string_store(&temp_dir);
    assert_eq!(store.get(b"a").unwrap(), Some("1".to_string()));
}

#[test]
fn test_data_survives_crash() {
    let temp_dir = TempDir::new().unwrap();

    {
        let store = open_string_store(&temp_dir);
        store.add_batch(vec![("a", "1".to_string()), ("b", "2".to_string())]).unwrap();
        store.delete(b"a").unwrap();
        std::mem::forget(store);
    }

    let store = open_string_store(&temp_dir);
    assert_eq!(scan_all(&store), vec![("b".to_string(), "2".to_string())]);
}

#[test]
fn test_scan_order_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let keys = ["zeta", "alpha", "mid"];

    {
        let store = open_string_store(&temp_dir);
        for key in keys {
            store.add(key, &key.to_uppercase()).unwrap();
        }
        store.checkpoint().unwrap();
        store.add(b"last", &"LAST".to_string()).unwrap();
    }

    let store = open_string_store(&temp_dir);
    let scanned: Vec<_> = scan_all(&store).into_iter().map(|(k, _)| k).collect();
    assert_eq!(scanned, vec!["zeta", "alpha", "mid", "last"]);
}

#[test]
fn test_tables_in_one_directory_are_independent() {
    let temp_dir = TempDir::new().unwrap();
    let open = |table: &str| -> KeyValueStore<String, Utf8Serializer> {
        let config = kvl::Config::builder()
            .data_dir(temp_dir.path())
            .schema(Schema::new(table))
            .build();
        KeyValueStore::open_with(config, Utf8Serializer).unwrap()
    };

    let users = open("users");
    let sessions = open("sessions");
    users.add(b"k", &"user".to_string()).unwrap();
    sessions.add(b"k", &"session".to_string()).unwrap();

    assert_eq!(users.get(b"k").unwrap(), Some("user".to_string()));
    assert_eq!(sessions.get(b"k").unwrap(), Some("session".to_string()));
}

// =============================================================================
// Checkpoint Tests
// =============================================================================

#[test]
fn test_explicit_checkpoint() {
    let (_temp, store) = setup_string_store();
    for i in 0..10 {
        store.add(format!("k{}", i), &"v".to_string()).unwrap();
    }

    let table_file = store.checkpoint().unwrap();

    assert_eq!(table_file.row_count, 10);
    assert_eq!(store.len().unwrap(), 10);
}
