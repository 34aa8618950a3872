//! Tests for RowTable
//!
//! These tests verify:
//! - Unique key index and point lookups
//! - Row id allocation (monotonic, never reused)
//! - Keyset pages over row ids
//! - Undo records and revert
//! - Idempotent replay followed by an index rebuild

use kvl::table::{RowId, RowTable, Undo};
use kvl::wal::Operation;

// =============================================================================
// Helper Functions
// =============================================================================

fn insert(table: &mut RowTable, key: &[u8], value: &[u8]) -> RowId {
    let row_id = table.allocate_row_id();
    table.apply(&Operation::Insert {
        row_id,
        key: key.to_vec(),
        value: value.to_vec(),
    });
    row_id
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_new_table_is_empty() {
    let table = RowTable::new();

    assert!(table.is_empty());
    assert_eq!(table.len(), 0);
    assert_eq!(table.next_row_id(), RowId::FIRST);
}

#[test]
fn test_insert_and_lookup() {
    let mut table = RowTable::new();
    let row_id = insert(&mut table, b"alpha", b"1");

    assert_eq!(row_id, RowId(1));
    assert_eq!(table.lookup(b"alpha"), Some(row_id));
    assert_eq!(table.get(b"alpha"), Some(&b"1"[..]));
    assert_eq!(table.get(b"beta"), None);
}

#[test]
fn test_keys_compare_bytewise() {
    let mut table = RowTable::new();
    insert(&mut table, b"Key", b"upper");
    insert(&mut table, b"key", b"lower");

    assert_eq!(table.len(), 2);
    assert_eq!(table.get(b"Key"), Some(&b"upper"[..]));
    assert_eq!(table.get(b"key"), Some(&b"lower"[..]));
}

#[test]
fn test_update_keeps_row_id() {
    let mut table = RowTable::new();
    let row_id = insert(&mut table, b"k", b"old");

    table.apply(&Operation::Update { row_id, value: b"new".to_vec() });

    assert_eq!(table.lookup(b"k"), Some(row_id));
    assert_eq!(table.get(b"k"), Some(&b"new"[..]));
}

#[test]
fn test_delete_removes_key() {
    let mut table = RowTable::new();
    let row_id = insert(&mut table, b"k", b"v");

    let undo = table.apply(&Operation::Delete { row_id });

    assert!(matches!(undo, Some(Undo::Deleted { .. })));
    assert_eq!(table.lookup(b"k"), None);
    assert!(table.is_empty());
}

// =============================================================================
// Row Id Allocation Tests
// =============================================================================

#[test]
fn test_row_ids_not_reused_after_delete() {
    let mut table = RowTable::new();
    let first = insert(&mut table, b"a", b"1");
    table.apply(&Operation::Delete { row_id: first });

    let second = insert(&mut table, b"a", b"2");

    assert!(second > first);
}

#[test]
fn test_with_next_row_id_resumes_counter() {
    let mut table = RowTable::with_next_row_id(RowId(500));

    assert_eq!(insert(&mut table, b"k", b"v"), RowId(500));
    assert_eq!(table.next_row_id(), RowId(501));
}

#[test]
fn test_insert_at_higher_id_advances_counter() {
    let mut table = RowTable::new();
    table.apply(&Operation::Insert {
        row_id: RowId(40),
        key: b"k".to_vec(),
        value: b"v".to_vec(),
    });

    assert_eq!(table.next_row_id(), RowId(41));
}

// =============================================================================
// Page Tests
// =============================================================================

#[test]
fn test_page_after_walks_in_row_id_order() {
    let mut table = RowTable::new();
    for i in 0..10 {
        insert(&mut table, format!("key{}", i).as_bytes(), b"v");
    }

    let first = table.page_after(None, 4);
    assert_eq!(first.len(), 4);
    assert_eq!(first[0].key, b"key0");

    let second = table.page_after(Some(first[3].row_id), 4);
    assert_eq!(second.len(), 4);
    assert_eq!(second[0].key, b"key4");

    let third = table.page_after(Some(second[3].row_id), 4);
    assert_eq!(third.len(), 2);

    assert!(table.page_after(Some(third[1].row_id), 4).is_empty());
}

#[test]
fn test_page_after_skips_deleted_rows() {
    let mut table = RowTable::new();
    let a = insert(&mut table, b"a", b"1");
    let b = insert(&mut table, b"b", b"2");
    insert(&mut table, b"c", b"3");

    table.apply(&Operation::Delete { row_id: b });

    let page = table.page_after(Some(a), 10);
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].key, b"c");
}

// =============================================================================
// Undo Tests
// =============================================================================

#[test]
fn test_revert_in_reverse_order() {
    let mut table = RowTable::new();
    let existing = insert(&mut table, b"keep", b"original");

    let mut undo = Vec::new();
    let new_id = table.allocate_row_id();
    undo.extend(table.apply(&Operation::Insert {
        row_id: new_id,
        key: b"new".to_vec(),
        value: b"x".to_vec(),
    }));
    undo.extend(table.apply(&Operation::Update { row_id: existing, value: b"changed".to_vec() }));
    undo.extend(table.apply(&Operation::Delete { row_id: new_id }));

    for record in undo.into_iter().rev() {
        table.revert(record);
    }

    assert_eq!(table.len(), 1);
    assert_eq!(table.get(b"keep"), Some(&b"original"[..]));
    assert_eq!(table.get(b"new"), None);
}

// =============================================================================
// Replay Tests
// =============================================================================

#[test]
fn test_replay_is_idempotent() {
    let ops = vec![
        Operation::Insert { row_id: RowId(1), key: b"a".to_vec(), value: b"1".to_vec() },
        Operation::Insert { row_id: RowId(2), key: b"b".to_vec(), value: b"2".to_vec() },
        Operation::Update { row_id: RowId(1), value: b"3".to_vec() },
        Operation::Delete { row_id: RowId(2) },
    ];

    let mut table = RowTable::new();
    for op in &ops {
        table.apply(op);
    }
    // Same suffix replayed twice, as after a crash between checkpoint and truncate
    for op in &ops {
        table.apply(op);
    }
    table.rebuild_index();

    assert_eq!(table.len(), 1);
    assert_eq!(table.get(b"a"), Some(&b"3"[..]));
    assert_eq!(table.get(b"b"), None);
    assert_eq!(table.next_row_id(), RowId(3));
}

#[test]
fn test_rebuild_index_after_key_moves_rows() {
    let mut table = RowTable::new();
    // Key deleted at row 1 and re-added at row 2; replay applies the insert
    // before the delete has dropped the old index entry
    table.apply(&Operation::Insert { row_id: RowId(1), key: b"k".to_vec(), value: b"a".to_vec() });
    table.apply(&Operation::Insert { row_id: RowId(2), key: b"k".to_vec(), value: b"b".to_vec() });
    table.apply(&Operation::Delete { row_id: RowId(1) });
    table.rebuild_index();

    assert_eq!(table.lookup(b"k"), Some(RowId(2)));
    assert_eq!(table.get(b"k"), Some(&b"b"[..]));
}
