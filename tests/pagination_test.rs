//! Integration tests for session-scoped pagination.
//!
//! These tests exercise the pagination store through the same operation
//! sequences an agent would produce: wrap a result, page through it, jump
//! around, and clear the session.

use mysql_mcp_server::error::DbError;
use mysql_mcp_server::pagination::{PaginationStore, Row};
use serde_json::Value as JsonValue;

fn rows(n: usize) -> Vec<Row> {
    (0..n)
        .map(|i| {
            let mut row = Row::new();
            row.insert("id".to_string(), JsonValue::from(i as u64));
            row.insert("name".to_string(), JsonValue::from(format!("student_{}", i)));
            row
        })
        .collect()
}

/// 25 rows at page size 10: page 1 of 3, then next lands on 2 and 3, and a
/// further next returns empty data without moving the cursor.
#[tokio::test]
async fn test_round_trip_25_rows() {
    let store = PaginationStore::new();

    let first = store.paginate(rows(25), 10, "s1").await;
    let info = first.pagination.expect("should be paginated");
    assert_eq!(first.data.len(), 10);
    assert_eq!(info.current_page, 1);
    assert_eq!(info.total_pages, 3);
    assert_eq!(info.total_items, 25);
    assert!(info.has_next);
    assert!(!info.has_previous);

    let second = store.next_page("s1").await.unwrap();
    assert_eq!(second.pagination.unwrap().current_page, 2);

    let third = store.next_page("s1").await.unwrap();
    let info = third.pagination.unwrap();
    assert_eq!(info.current_page, 3);
    assert_eq!(third.data.len(), 5);
    assert!(!info.has_next);

    let fourth = store.next_page("s1").await.unwrap();
    assert!(fourth.data.is_empty());
    let info = fourth.pagination.unwrap();
    assert_eq!(info.current_page, 3, "cursor must not move past the end");
    assert!(!info.has_next);
    assert!(info.message.is_some());
}

/// goto outside [1, totalPages] fails with PageOutOfRange in both directions.
#[tokio::test]
async fn test_goto_bounds() {
    let store = PaginationStore::new();
    store.paginate(rows(25), 10, "s1").await;

    assert!(matches!(
        store.go_to_page(0, "s1").await,
        Err(DbError::PageOutOfRange { .. })
    ));
    assert!(matches!(
        store.go_to_page(4, "s1").await,
        Err(DbError::PageOutOfRange { .. })
    ));

    // In-range jumps still work afterwards.
    let page2 = store.go_to_page(2, "s1").await.unwrap();
    assert_eq!(page2.pagination.unwrap().current_page, 2);
}

/// A result that fits in one page creates no session state.
#[tokio::test]
async fn test_small_result_leaves_no_state() {
    let store = PaginationStore::new();
    let result = store.paginate(rows(10), 10, "s1").await;
    assert!(result.pagination.is_none());
    assert!(store.info("s1").await.is_none());
}

/// clear is idempotent and next after clear reports missing state.
#[tokio::test]
async fn test_clear_then_next() {
    let store = PaginationStore::new();
    store.paginate(rows(25), 10, "s1").await;

    store.clear("s1").await;
    store.clear("s1").await;

    assert!(matches!(
        store.next_page("s1").await,
        Err(DbError::NoPaginationState { .. })
    ));
}

/// The snapshot is stable: paging returns the captured rows in order even
/// though the store never re-queries.
#[tokio::test]
async fn test_snapshot_ordering() {
    let store = PaginationStore::new();
    store.paginate(rows(25), 10, "s1").await;

    let page2 = store.next_page("s1").await.unwrap();
    let ids: Vec<u64> = page2
        .data
        .iter()
        .map(|row| row["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, (10..20).collect::<Vec<u64>>());
}

/// Two concurrent next calls on one session serialize: one observes page 2,
/// the other page 3, never two observations of the same page.
#[tokio::test]
async fn test_concurrent_next_is_serialized() {
    let store = std::sync::Arc::new(PaginationStore::new());
    store.paginate(rows(25), 10, "s1").await;

    let a = tokio::spawn({
        let store = store.clone();
        async move { store.next_page("s1").await.unwrap() }
    });
    let b = tokio::spawn({
        let store = store.clone();
        async move { store.next_page("s1").await.unwrap() }
    });

    let mut pages = vec![
        a.await.unwrap().pagination.unwrap().current_page,
        b.await.unwrap().pagination.unwrap().current_page,
    ];
    pages.sort_unstable();
    assert_eq!(pages, vec![2, 3]);
    assert_eq!(store.info("s1").await.unwrap().current_page, 3);
}

/// Concurrent operations on different sessions never interfere.
#[tokio::test]
async fn test_concurrent_sessions_independent() {
    let store = std::sync::Arc::new(PaginationStore::new());
    store.paginate(rows(25), 10, "a").await;
    store.paginate(rows(25), 10, "b").await;

    let mut handles = Vec::new();
    for _ in 0..2 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.next_page("a").await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(store.info("a").await.unwrap().current_page, 3);
    assert_eq!(store.info("b").await.unwrap().current_page, 1);
}
