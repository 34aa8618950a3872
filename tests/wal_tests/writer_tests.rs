//! Tests for WAL Writer
//!
//! These tests verify:
//! - Writing entries to WAL
//! - LSN generation and sequencing
//! - Sync strategies (EveryWrite, EveryNEntries)
//! - Truncation
//! - Integration with reader

use std::path::PathBuf;

use kvl::config::WalSyncStrategy;
use kvl::wal::{Operation, WalReader, WalWriter};
use kvl::KvlError;
use tempfile::TempDir;

use super::{delete, insert};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.wal");
    (temp_dir, wal_path)
}

// =============================================================================
// Basic Writing Tests
// =============================================================================

#[test]
fn test_write_single_entry() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    let lsn = writer.append(vec![insert(1, b"key1", b"value1")]).unwrap();

    assert_eq!(lsn, 1);
    assert_eq!(writer.current_lsn(), 2);
    assert!(writer.size_bytes() > 0);
}

#[test]
fn test_lsn_sequential() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();

    for i in 0..100u64 {
        let lsn = writer
            .append(vec![insert(i + 1, format!("key{}", i).as_bytes(), b"v")])
            .unwrap();
        assert_eq!(lsn, i + 1);
    }
}

#[test]
fn test_reopen_continues_lsn() {
    let (_temp, wal_path) = setup_temp_wal();

    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        writer.append(vec![insert(1, b"a", b"1")]).unwrap();
        writer.append(vec![insert(2, b"b", b"2")]).unwrap();
    }

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    assert_eq!(writer.current_lsn(), 3);
    assert_eq!(writer.append(vec![delete(1)]).unwrap(), 3);
}

// =============================================================================
// Sync Strategy Tests
// =============================================================================

#[test]
fn test_sync_every_write() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();

    writer.append(vec![insert(1, b"k1", b"v1")]).unwrap();
    assert_eq!(writer.uncommitted_count(), 0);

    writer.append(vec![insert(2, b"k2", b"v2")]).unwrap();
    assert_eq!(writer.uncommitted_count(), 0);
}

#[test]
fn test_sync_every_n_entries() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer =
        WalWriter::open(&wal_path, WalSyncStrategy::EveryNEntries { count: 5 }).unwrap();

    for i in 0..4 {
        writer.append(vec![insert(i + 1, b"k", b"v")]).unwrap();
    }
    assert_eq!(writer.uncommitted_count(), 4);

    // 5th entry triggers sync
    writer.append(vec![insert(5, b"k5", b"v")]).unwrap();
    assert_eq!(writer.uncommitted_count(), 0);

    writer.append(vec![insert(6, b"k6", b"v")]).unwrap();
    assert_eq!(writer.uncommitted_count(), 1);
}

#[test]
fn test_manual_sync() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer =
        WalWriter::open(&wal_path, WalSyncStrategy::EveryNEntries { count: 100 }).unwrap();

    for i in 0..10 {
        writer.append(vec![insert(i + 1, b"k", b"v")]).unwrap();
    }
    assert_eq!(writer.uncommitted_count(), 10);

    writer.sync().unwrap();
    assert_eq!(writer.uncommitted_count(), 0);
}

// =============================================================================
// Write + Read Integration Tests
// =============================================================================

#[test]
fn test_write_then_read() {
    let (_temp, wal_path) = setup_temp_wal();

    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        writer.append(vec![insert(1, b"key1", b"value1")]).unwrap();
        writer
            .append(vec![insert(2, b"key2", b"value2"), delete(1)])
            .unwrap();
    }

    let mut reader = WalReader::open(&wal_path).unwrap();

    let entry1 = reader.next_entry().unwrap().unwrap();
    assert_eq!(entry1.lsn, 1);
    assert!(matches!(entry1.operations[..], [Operation::Insert { .. }]));

    let entry2 = reader.next_entry().unwrap().unwrap();
    assert_eq!(entry2.lsn, 2);
    assert!(matches!(
        entry2.operations[..],
        [Operation::Insert { .. }, Operation::Delete { .. }]
    ));

    // EOF
    assert!(reader.next_entry().unwrap().is_none());
}

#[test]
fn test_write_read_many_entries() {
    let (_temp, wal_path) = setup_temp_wal();
    let entry_count = 1000;

    {
        let mut writer =
            WalWriter::open(&wal_path, WalSyncStrategy::EveryNEntries { count: 100 }).unwrap();
        for i in 0..entry_count {
            writer
                .append(vec![insert(i + 1, format!("key{}", i).as_bytes(), b"v")])
                .unwrap();
        }
        writer.sync().unwrap();
    }

    let reader = WalReader::open(&wal_path).unwrap();
    let entries: Vec<_> = reader.entries().collect::<Result<Vec<_>, _>>().unwrap();

    assert_eq!(entries.len(), entry_count as usize);
    for (i, entry) in entries.iter().enumerate() {
        assert_eq!(entry.lsn, (i + 1) as u64);
    }
}

// =============================================================================
// Truncate Tests
// =============================================================================

#[test]
fn test_truncate_resets_lsn() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    writer.append(vec![insert(1, b"k1", b"v1")]).unwrap();
    writer.append(vec![insert(2, b"k2", b"v2")]).unwrap();
    assert_eq!(writer.current_lsn(), 3);

    writer.truncate().unwrap();
    assert_eq!(writer.current_lsn(), 1);
    assert_eq!(writer.size_bytes(), 0);

    let lsn = writer.append(vec![insert(3, b"k3", b"v3")]).unwrap();
    assert_eq!(lsn, 1);
}

#[test]
fn test_truncate_then_write() {
    let (_temp, wal_path) = setup_temp_wal();

    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        writer.append(vec![insert(1, b"old", b"data")]).unwrap();
        writer.truncate().unwrap();
        writer.append(vec![insert(2, b"new", b"data")]).unwrap();
    }

    let mut reader = WalReader::open(&wal_path).unwrap();
    let entry = reader.next_entry().unwrap().unwrap();

    match &entry.operations[0] {
        Operation::Insert { key, .. } => assert_eq!(key, b"new"),
        other => panic!("Expected Insert operation, got {:?}", other),
    }
    assert!(reader.next_entry().unwrap().is_none());
}

// =============================================================================
// Failure Tests
// =============================================================================

/// `/dev/full` accepts the open but fails every write with ENOSPC and cannot
/// be truncated, so the frame can be neither written nor cut back.
#[cfg(target_os = "linux")]
#[test]
fn test_failed_append_disables_writer() {
    let dev_full = std::path::Path::new("/dev/full");
    if !dev_full.exists() {
        return;
    }

    let mut writer = WalWriter::open(dev_full, WalSyncStrategy::EveryWrite).unwrap();

    let result = writer.append(vec![insert(1, b"k", b"v")]);
    assert!(matches!(result, Err(KvlError::WalWrite(_))));
    assert!(writer.is_failed());
    assert_eq!(writer.current_lsn(), 1);
    assert_eq!(writer.size_bytes(), 0);

    // Refused without touching the file again
    let result = writer.append(vec![insert(2, b"k2", b"v")]);
    assert!(matches!(result, Err(KvlError::WalWrite(_))));
}

#[test]
fn test_successful_appends_keep_writer_healthy() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    writer.append(vec![insert(1, b"k", b"v")]).unwrap();
    writer.sync().unwrap();

    assert!(!writer.is_failed());
    assert_eq!(
        std::fs::metadata(&wal_path).unwrap().len(),
        writer.size_bytes()
    );
}
