// src/api/pagination.rs
//! Cursor-based pagination over the service's list endpoints.

use crate::constants::NOTION_API_PAGE_SIZE;
use crate::error::ClientError;
use serde::Deserialize;

/// Generic paginated response from the service.
#[derive(Debug, Clone, Deserialize)]
pub struct Paginated<T> {
    pub object: String,
    pub results: Vec<T>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

/// Continuation state for a paginated query session.
///
/// The token is opaque; it lives only as long as the caller keeps
/// iterating and is discarded afterwards. If the underlying dataset
/// mutates between pages, records may be duplicated or skipped — the
/// service offers no snapshot isolation and neither does this client.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PaginationCursor {
    pub token: Option<String>,
    pub has_more: bool,
}

impl PaginationCursor {
    /// The cursor for a fresh query session.
    pub fn start() -> Self {
        Self {
            token: None,
            has_more: true,
        }
    }

    /// Continuation extracted from a response page.
    pub fn from_response<T>(page: &Paginated<T>) -> Self {
        Self {
            token: page.next_cursor.clone(),
            has_more: page.has_more,
        }
    }

    /// Whether another page can be requested.
    pub fn can_continue(&self) -> bool {
        self.has_more && self.token.is_some()
    }
}

/// Drains all pages of a cursor-based listing.
///
/// `fetch` receives the page size and the cursor token for each call and
/// returns one page. An optional page cap bounds runaway listings.
pub async fn fetch_all<T, F, Fut>(
    mut fetch: F,
    max_pages: Option<u32>,
) -> Result<Vec<T>, ClientError>
where
    F: FnMut(u32, Option<String>) -> Fut,
    Fut: std::future::Future<Output = Result<Paginated<T>, ClientError>>,
{
    let mut all_items = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages_fetched = 0u32;

    loop {
        if let Some(max) = max_pages {
            if pages_fetched >= max {
                log::debug!("Reached maximum page limit: {}", max);
                break;
            }
        }

        let page = fetch(NOTION_API_PAGE_SIZE, cursor).await?;

        let has_more = page.has_more;
        cursor = page.next_cursor.clone();
        all_items.extend(page.results);
        pages_fetched += 1;

        if !has_more || cursor.is_none() {
            break;
        }
    }

    Ok(all_items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_of(items: &[u32], next: Option<&str>, has_more: bool) -> Paginated<u32> {
        Paginated {
            object: "list".to_string(),
            results: items.to_vec(),
            next_cursor: next.map(str::to_string),
            has_more,
        }
    }

    #[tokio::test]
    async fn fetch_all_follows_cursors() {
        let all = fetch_all(
            |_, cursor| async move {
                Ok(match cursor.as_deref() {
                    None => page_of(&[1, 2], Some("c1"), true),
                    Some("c1") => page_of(&[3, 4], Some("c2"), true),
                    Some("c2") => page_of(&[5], None, false),
                    other => panic!("unexpected cursor {:?}", other),
                })
            },
            None,
        )
        .await
        .unwrap();

        assert_eq!(all, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn fetch_all_respects_page_cap() {
        let all = fetch_all(
            |_, _| async move { Ok(page_of(&[7], Some("again"), true)) },
            Some(3),
        )
        .await
        .unwrap();

        assert_eq!(all, vec![7, 7, 7]);
    }

    #[test]
    fn cursor_state() {
        let fresh = PaginationCursor::start();
        assert!(fresh.has_more);
        assert!(fresh.token.is_none());
        assert!(!fresh.can_continue());

        let page = page_of(&[1], Some("next"), true);
        let cursor = PaginationCursor::from_response(&page);
        assert!(cursor.can_continue());

        let last = page_of(&[2], None, false);
        let cursor = PaginationCursor::from_response(&last);
        assert!(!cursor.can_continue());
    }
}
