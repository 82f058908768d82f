//! HTTP client for the Notion API.
//!
//! Every list endpoint is paginated with `has_more` / `next_cursor`. Calls are
//! strictly sequential and each one is followed by the configured pause.

mod types;

use std::future::Future;

use reqwest::Client;
use serde::de::DeserializeOwned;

pub use types::*;

use crate::http::{handle_response, ClientError, Pacer};

/// Notion API version all requests are pinned to.
pub const NOTION_VERSION: &str = "2022-06-28";

const PAGE_SIZE: u32 = 100;

/// Object kind accepted by the `/search` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchFilter {
    Page,
    Database,
}

impl SearchFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Database => "database",
        }
    }
}

/// HTTP client for the Notion API.
#[derive(Debug, Clone)]
pub struct NotionClient {
    base_url: String,
    token: String,
    client: Client,
    pacer: Pacer,
}

impl NotionClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, pacer: Pacer) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client: Client::new(),
            pacer,
        }
    }

    /// Build a request with auth and version headers.
    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, &url)
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = builder.send().await?;
        let result = handle_response(response).await;
        self.pacer.pause().await;
        result
    }

    // ============================================================
    // Search
    // ============================================================

    /// One page of `/search` results.
    pub async fn search_page(
        &self,
        filter: Option<SearchFilter>,
        page_size: u32,
        start_cursor: Option<&str>,
    ) -> Result<PaginatedList<SearchResult>, ClientError> {
        let mut payload = serde_json::json!({ "page_size": page_size });
        if let Some(f) = filter {
            payload["filter"] = serde_json::json!({ "property": "object", "value": f.as_str() });
        }
        if let Some(cursor) = start_cursor {
            payload["start_cursor"] = cursor.into();
        }

        self.send(self.request(reqwest::Method::POST, "/search").json(&payload))
            .await
    }

    /// All `/search` results matching the filter.
    pub async fn search(
        &self,
        filter: Option<SearchFilter>,
    ) -> Result<Vec<SearchResult>, ClientError> {
        collect_all(0, |cursor| async move {
            self.search_page(filter, PAGE_SIZE, cursor.as_deref()).await
        })
        .await
    }

    /// Every database shared with the integration.
    pub async fn search_databases(&self) -> Result<Vec<Database>, ClientError> {
        tracing::info!("Searching Notion databases");
        let results = self.search(Some(SearchFilter::Database)).await?;
        let databases: Vec<Database> = results
            .into_iter()
            .filter_map(|r| match r {
                SearchResult::Database(db) => Some(db),
                SearchResult::Page(_) => None,
            })
            .collect();
        tracing::info!("Found {} databases", databases.len());
        Ok(databases)
    }

    /// Every page shared with the integration, database entries included.
    pub async fn search_pages(&self) -> Result<Vec<Page>, ClientError> {
        tracing::info!("Searching Notion pages");
        let results = self.search(Some(SearchFilter::Page)).await?;
        Ok(results
            .into_iter()
            .filter_map(|r| match r {
                SearchResult::Page(page) => Some(page),
                SearchResult::Database(_) => None,
            })
            .collect())
    }

    /// Every page and database, unfiltered.
    pub async fn search_all(&self) -> Result<Vec<SearchResult>, ClientError> {
        self.search(None).await
    }

    // ============================================================
    // Databases and pages
    // ============================================================

    pub async fn get_database(&self, id: &str) -> Result<Database, ClientError> {
        self.send(self.request(reqwest::Method::GET, &format!("/databases/{}", id)))
            .await
    }

    pub async fn get_page(&self, id: &str) -> Result<Page, ClientError> {
        self.send(self.request(reqwest::Method::GET, &format!("/pages/{}", id)))
            .await
    }

    /// Entries of a database. A `limit` above zero stops pagination once that
    /// many entries are collected.
    pub async fn query_database(&self, id: &str, limit: usize) -> Result<Vec<Page>, ClientError> {
        let path = format!("/databases/{}/query", id);
        collect_all(limit, |cursor| {
            let path = path.clone();
            async move {
                let mut payload = serde_json::json!({ "page_size": PAGE_SIZE });
                if let Some(cursor) = cursor {
                    payload["start_cursor"] = cursor.into();
                }
                self.send(self.request(reqwest::Method::POST, &path).json(&payload))
                    .await
            }
        })
        .await
    }

    // ============================================================
    // Blocks
    // ============================================================

    /// Direct children of a block or page.
    pub async fn block_children(&self, id: &str) -> Result<Vec<Block>, ClientError> {
        let path = format!("/blocks/{}/children", id);
        collect_all(0, |cursor| {
            let path = path.clone();
            async move {
                let mut req = self
                    .request(reqwest::Method::GET, &path)
                    .query(&[("page_size", PAGE_SIZE.to_string())]);
                if let Some(cursor) = cursor {
                    req = req.query(&[("start_cursor", cursor)]);
                }
                self.send(req).await
            }
        })
        .await
    }

    /// Children of a page with nested blocks expanded, up to `max_depth` levels.
    pub async fn block_tree(&self, id: &str, max_depth: usize) -> Result<Vec<Block>, ClientError> {
        let mut blocks = self.block_children(id).await?;
        if max_depth > 1 {
            for block in blocks.iter_mut().filter(|b| b.has_children) {
                if matches!(block.kind.as_str(), "child_page" | "child_database") {
                    continue;
                }
                // Boxed to allow recursion in an async fn.
                block.children = Box::pin(self.block_tree(&block.id, max_depth - 1)).await?;
            }
        }
        Ok(blocks)
    }
}

/// Follow `next_cursor` until the list is exhausted or `limit` items are
/// collected (0 means no limit).
pub async fn collect_all<T, F, Fut>(limit: usize, mut fetch: F) -> Result<Vec<T>, ClientError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<PaginatedList<T>, ClientError>>,
{
    let mut items = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = fetch(cursor.take()).await?;
        items.extend(page.results);

        if limit > 0 && items.len() >= limit {
            items.truncate(limit);
            break;
        }
        match (page.has_more, page.next_cursor) {
            (true, Some(next)) => cursor = Some(next),
            _ => break,
        }
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(results: Vec<u32>, next: Option<&str>) -> PaginatedList<u32> {
        PaginatedList {
            results,
            has_more: next.is_some(),
            next_cursor: next.map(String::from),
        }
    }

    #[tokio::test]
    async fn collect_all_follows_cursors() {
        let mut seen = Vec::new();
        let items = collect_all(0, |cursor| {
            seen.push(cursor.clone());
            let page = match cursor.as_deref() {
                None => list(vec![1, 2], Some("c1")),
                Some("c1") => list(vec![3], Some("c2")),
                _ => list(vec![4], None),
            };
            async move { Ok(page) }
        })
        .await
        .unwrap();

        assert_eq!(items, vec![1, 2, 3, 4]);
        assert_eq!(seen, vec![None, Some("c1".into()), Some("c2".into())]);
    }

    #[tokio::test]
    async fn collect_all_truncates_at_limit() {
        let mut calls = 0;
        let items = collect_all(3, |_| {
            calls += 1;
            async move { Ok(list(vec![1, 2], Some("more"))) }
        })
        .await
        .unwrap();

        assert_eq!(items, vec![1, 2, 1]);
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn collect_all_stops_when_cursor_missing() {
        let items = collect_all(0, |_| async move {
            Ok(PaginatedList {
                results: vec![7],
                has_more: true,
                next_cursor: None,
            })
        })
        .await
        .unwrap();
        assert_eq!(items, vec![7]);
    }
}
