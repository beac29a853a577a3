//! Session-scoped result pagination.
//!
//! Large query results are snapshotted into per-session state and served one
//! page at a time, so repeated "next page" calls stay consistent even if the
//! underlying table changes between calls (a stable view is preferred over
//! freshness). State lives in an explicit [`PaginationStore`] owned here and
//! injected into the tool handlers; it is in-memory only and lives for the
//! process lifetime.
//!
//! Sessions are caller-chosen opaque tokens. A new paginated query for a
//! session replaces its previous snapshot; state is otherwise only removed by
//! an explicit `clear`. There is no TTL - stale sessions accumulate until
//! cleared.

use crate::error::{DbError, DbResult};
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Default page size when the caller does not specify one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Maximum allowed page size.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Session id used when the caller omits one.
pub const DEFAULT_SESSION_ID: &str = "default";

/// A result row: an ordered mapping from column name to value.
pub type Row = serde_json::Map<String, JsonValue>;

/// Pagination metadata returned alongside page data.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct PaginationInfo {
    /// Current page number (1-based)
    pub current_page: u32,
    /// Total number of pages
    pub total_pages: u32,
    /// Total number of rows in the snapshot
    pub total_items: usize,
    /// Rows per page
    pub page_size: u32,
    /// True when a later page exists
    pub has_next: bool,
    /// True when an earlier page exists
    pub has_previous: bool,
    /// Boundary notice, e.g. when already on the last page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A page of results. `pagination` is absent when the result set was small
/// enough to return in one piece.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct PageResult {
    /// Rows for this page
    pub data: Vec<Row>,
    /// Pagination metadata, absent for unpaginated results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationInfo>,
}

impl PageResult {
    /// A plain result with no pagination state behind it.
    pub fn unpaginated(data: Vec<Row>) -> Self {
        Self {
            data,
            pagination: None,
        }
    }
}

/// Snapshot of one session's paginated result set.
///
/// Invariants: `1 <= current_page <= total_pages` and
/// `total_pages = ceil(results.len() / page_size)`.
struct PaginationState {
    results: Vec<Row>,
    page_size: u32,
    current_page: u32,
    total_pages: u32,
}

impl PaginationState {
    fn new(results: Vec<Row>, page_size: u32) -> Self {
        let total_pages = (results.len() as u32).div_ceil(page_size);
        Self {
            results,
            page_size,
            current_page: 1,
            total_pages,
        }
    }

    /// Slice of the snapshot for the current page.
    fn current_slice(&self) -> Vec<Row> {
        let start = ((self.current_page - 1) * self.page_size) as usize;
        let end = (start + self.page_size as usize).min(self.results.len());
        self.results[start..end].to_vec()
    }

    fn info(&self, message: Option<String>) -> PaginationInfo {
        PaginationInfo {
            current_page: self.current_page,
            total_pages: self.total_pages,
            total_items: self.results.len(),
            page_size: self.page_size,
            has_next: self.current_page < self.total_pages,
            has_previous: self.current_page > 1,
            message,
        }
    }

    fn page_result(&self, message: Option<String>) -> PageResult {
        PageResult {
            data: self.current_slice(),
            pagination: Some(self.info(message)),
        }
    }
}

/// Store of per-session pagination snapshots.
///
/// Read-modify-write operations (`next_page`, `previous_page`, `go_to_page`)
/// hold the write lock for the whole operation, so concurrent calls on the
/// same session serialize instead of losing updates. Operations on different
/// sessions are independent.
pub struct PaginationStore {
    sessions: RwLock<HashMap<String, PaginationState>>,
}

impl PaginationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Wrap a result set for a session.
    ///
    /// When the rows fit into a single page the data is returned directly
    /// and no state is created or retained. Otherwise the rows are
    /// snapshotted (replacing any prior state for the session) and page 1 is
    /// returned.
    pub async fn paginate(&self, rows: Vec<Row>, page_size: u32, session_id: &str) -> PageResult {
        if rows.len() <= page_size as usize {
            return PageResult::unpaginated(rows);
        }

        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let state = PaginationState::new(rows, page_size);
        let result = state.page_result(None);

        debug!(
            session_id = %session_id,
            total_items = state.results.len(),
            total_pages = state.total_pages,
            page_size = page_size,
            "Stored pagination snapshot"
        );

        let mut sessions = self.sessions.write().await;
        sessions.insert(session_id.to_string(), state);
        result
    }

    /// Advance to the next page.
    ///
    /// On the last page, returns empty data with an explanatory message and
    /// leaves the current page unchanged.
    pub async fn next_page(&self, session_id: &str) -> DbResult<PageResult> {
        let mut sessions = self.sessions.write().await;
        let state = sessions
            .get_mut(session_id)
            .ok_or_else(|| DbError::no_pagination_state(session_id))?;

        if state.current_page >= state.total_pages {
            return Ok(PageResult {
                data: Vec::new(),
                pagination: Some(state.info(Some("already last page".to_string()))),
            });
        }

        state.current_page += 1;
        Ok(state.page_result(None))
    }

    /// Go back to the previous page.
    ///
    /// On page 1, returns empty data with an explanatory message and leaves
    /// the current page unchanged.
    pub async fn previous_page(&self, session_id: &str) -> DbResult<PageResult> {
        let mut sessions = self.sessions.write().await;
        let state = sessions
            .get_mut(session_id)
            .ok_or_else(|| DbError::no_pagination_state(session_id))?;

        if state.current_page <= 1 {
            return Ok(PageResult {
                data: Vec::new(),
                pagination: Some(state.info(Some("already first page".to_string()))),
            });
        }

        state.current_page -= 1;
        Ok(state.page_result(None))
    }

    /// Jump to a specific page (1-based).
    pub async fn go_to_page(&self, page: u32, session_id: &str) -> DbResult<PageResult> {
        let mut sessions = self.sessions.write().await;
        let state = sessions
            .get_mut(session_id)
            .ok_or_else(|| DbError::no_pagination_state(session_id))?;

        if page < 1 || page > state.total_pages {
            return Err(DbError::page_out_of_range(page, state.total_pages));
        }

        state.current_page = page;
        Ok(state.page_result(None))
    }

    /// Metadata for a session's snapshot, without the data.
    pub async fn info(&self, session_id: &str) -> Option<PaginationInfo> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).map(|state| state.info(None))
    }

    /// Drop a session's snapshot. Clearing an absent session is a no-op.
    pub async fn clear(&self, session_id: &str) {
        let mut sessions = self.sessions.write().await;
        if sessions.remove(session_id).is_some() {
            debug!(session_id = %session_id, "Cleared pagination state");
        }
    }

    /// Number of sessions currently holding a snapshot.
    pub async fn session_count(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.len()
    }
}

impl Default for PaginationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: usize) -> Vec<Row> {
        (0..n)
            .map(|i| {
                let mut row = Row::new();
                row.insert("id".to_string(), JsonValue::from(i as u64));
                row
            })
            .collect()
    }

    #[tokio::test]
    async fn test_small_result_not_paginated() {
        let store = PaginationStore::new();
        let result = store.paginate(rows(5), 10, "s1").await;
        assert_eq!(result.data.len(), 5);
        assert!(result.pagination.is_none());
        // No state was created for the session.
        assert!(store.info("s1").await.is_none());
        assert_eq!(store.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_first_page_of_large_result() {
        let store = PaginationStore::new();
        let result = store.paginate(rows(25), 10, "s1").await;
        assert_eq!(result.data.len(), 10);

        let info = result.pagination.unwrap();
        assert_eq!(info.current_page, 1);
        assert_eq!(info.total_pages, 3);
        assert_eq!(info.total_items, 25);
        assert!(info.has_next);
        assert!(!info.has_previous);
    }

    #[tokio::test]
    async fn test_next_page_round_trip() {
        let store = PaginationStore::new();
        store.paginate(rows(25), 10, "s1").await;

        let page2 = store.next_page("s1").await.unwrap();
        assert_eq!(page2.data.len(), 10);
        assert_eq!(page2.pagination.as_ref().unwrap().current_page, 2);
        assert_eq!(page2.data[0]["id"], JsonValue::from(10u64));

        let page3 = store.next_page("s1").await.unwrap();
        assert_eq!(page3.data.len(), 5);
        let info = page3.pagination.unwrap();
        assert_eq!(info.current_page, 3);
        assert!(!info.has_next);
        assert!(info.has_previous);

        // A fourth call returns empty data without moving past the end.
        let past_end = store.next_page("s1").await.unwrap();
        assert!(past_end.data.is_empty());
        let info = past_end.pagination.unwrap();
        assert_eq!(info.current_page, 3);
        assert!(!info.has_next);
        assert_eq!(info.message.as_deref(), Some("already last page"));
    }

    #[tokio::test]
    async fn test_previous_page_at_start() {
        let store = PaginationStore::new();
        store.paginate(rows(25), 10, "s1").await;

        let result = store.previous_page("s1").await.unwrap();
        assert!(result.data.is_empty());
        let info = result.pagination.unwrap();
        assert_eq!(info.current_page, 1);
        assert!(!info.has_previous);
        assert_eq!(info.message.as_deref(), Some("already first page"));
    }

    #[tokio::test]
    async fn test_previous_after_next() {
        let store = PaginationStore::new();
        store.paginate(rows(25), 10, "s1").await;
        store.next_page("s1").await.unwrap();

        let page1 = store.previous_page("s1").await.unwrap();
        let info = page1.pagination.unwrap();
        assert_eq!(info.current_page, 1);
        assert!(info.message.is_none());
    }

    #[tokio::test]
    async fn test_goto_page() {
        let store = PaginationStore::new();
        store.paginate(rows(25), 10, "s1").await;

        let page3 = store.go_to_page(3, "s1").await.unwrap();
        assert_eq!(page3.data.len(), 5);
        assert_eq!(page3.pagination.unwrap().current_page, 3);
    }

    #[tokio::test]
    async fn test_goto_out_of_range() {
        let store = PaginationStore::new();
        store.paginate(rows(25), 10, "s1").await;

        let low = store.go_to_page(0, "s1").await;
        assert!(matches!(low, Err(DbError::PageOutOfRange { .. })));

        let high = store.go_to_page(4, "s1").await;
        assert!(matches!(
            high,
            Err(DbError::PageOutOfRange {
                page: 4,
                total_pages: 3
            })
        ));
    }

    #[tokio::test]
    async fn test_operations_without_state() {
        let store = PaginationStore::new();
        assert!(matches!(
            store.next_page("ghost").await,
            Err(DbError::NoPaginationState { .. })
        ));
        assert!(matches!(
            store.previous_page("ghost").await,
            Err(DbError::NoPaginationState { .. })
        ));
        assert!(matches!(
            store.go_to_page(1, "ghost").await,
            Err(DbError::NoPaginationState { .. })
        ));
        assert!(store.info("ghost").await.is_none());
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let store = PaginationStore::new();
        store.paginate(rows(25), 10, "s1").await;
        assert!(store.info("s1").await.is_some());

        store.clear("s1").await;
        assert!(store.info("s1").await.is_none());

        // Clearing again is a no-op, not an error.
        store.clear("s1").await;
        assert!(store.info("s1").await.is_none());
    }

    #[tokio::test]
    async fn test_new_query_replaces_state() {
        let store = PaginationStore::new();
        store.paginate(rows(25), 10, "s1").await;
        store.go_to_page(3, "s1").await.unwrap();

        store.paginate(rows(40), 10, "s1").await;
        let info = store.info("s1").await.unwrap();
        assert_eq!(info.current_page, 1);
        assert_eq!(info.total_pages, 4);
        assert_eq!(info.total_items, 40);
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let store = PaginationStore::new();
        store.paginate(rows(25), 10, "a").await;
        store.paginate(rows(30), 10, "b").await;

        store.next_page("a").await.unwrap();
        assert_eq!(store.info("a").await.unwrap().current_page, 2);
        assert_eq!(store.info("b").await.unwrap().current_page, 1);
    }

    #[tokio::test]
    async fn test_page_size_clamped() {
        let store = PaginationStore::new();
        // 500 exceeds the cap; stored page size must be 100.
        let result = store.paginate(rows(600), 500, "s1").await;
        let info = result.pagination.unwrap();
        assert_eq!(info.page_size, 100);
        assert_eq!(info.total_pages, 6);
    }

    #[tokio::test]
    async fn test_page_size_zero_clamped_up() {
        let store = PaginationStore::new();
        let result = store.paginate(rows(5), 0, "s1").await;
        let info = result.pagination.unwrap();
        assert_eq!(info.page_size, 1);
        assert_eq!(info.total_pages, 5);
        assert_eq!(result.data.len(), 1);
    }

    #[tokio::test]
    async fn test_oversized_page_fits_small_result() {
        let store = PaginationStore::new();
        // 200 rows fit in a requested page of 500: returned directly, no state.
        let result = store.paginate(rows(200), 500, "s1").await;
        assert_eq!(result.data.len(), 200);
        assert!(result.pagination.is_none());
        assert!(store.info("s1").await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_next_serializes() {
        let store = PaginationStore::new();
        store.paginate(rows(25), 10, "s1").await;

        // Two simultaneous advances must not both observe page 1.
        let (a, b) = tokio::join!(store.next_page("s1"), store.next_page("s1"));
        let mut pages = vec![
            a.unwrap().pagination.unwrap().current_page,
            b.unwrap().pagination.unwrap().current_page,
        ];
        pages.sort_unstable();
        assert_eq!(pages, vec![2, 3]);
        assert_eq!(store.info("s1").await.unwrap().current_page, 3);
    }
}
