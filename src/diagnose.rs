//! Integration checks: what the Notion integration can see and which SiYuan
//! endpoints answer.


use serde_json::{json, Value};

use crate::migrate::truncate;
use crate::notion::{NotionClient, SearchFilter, SearchResult};
use crate::siyuan::{ProbeResult, SiYuanClient};

const TITLE_WIDTH: usize = 50;
const LISTED: usize = 10;

/// Endpoints probed by [`probe_siyuan`], with the body sent to each.
pub fn siyuan_probes() -> Vec<(&'static str, Value)> {
    vec![
        ("/system/version", json!({})),
        ("/system/currentTime", json!({})),
        ("/system/getConf", json!({})),
        ("/notebook/lsNotebooks", json!({})),
        ("/av/getAttributeView", json!({})),
        ("/av/createAttributeView", json!({ "name": "test" })),
        ("/av/renderAttributeView", json!({})),
        ("/repo/createSnapshot", json!({ "memo": "test" })),
        ("/block/getBlockInfo", json!({})),
        ("/filetree/listDocTree", json!({})),
    ]
}

/// Results of the three Notion visibility searches. Each one either lists
/// what came back or carries the error text.
#[derive(Debug, Clone)]
pub struct NotionDiagnosis {
    /// `(kind, title)` of an unfiltered search.
    pub all: Result<Vec<(String, String)>, String>,
    /// `(title, url)` of every shared database.
    pub databases: Result<Vec<(String, String)>, String>,
    /// `(title, parent kind)` of shared pages.
    pub pages: Result<Vec<(String, String)>, String>,
}

pub async fn diagnose_notion(notion: &NotionClient) -> NotionDiagnosis {
    let all = notion
        .search_page(None, 10, None)
        .await
        .map(|list| {
            list.results
                .iter()
                .map(|r| (r.kind().to_string(), r.title()))
                .collect()
        })
        .map_err(|e| e.to_string());

    let databases = notion
        .search_page(Some(SearchFilter::Database), 100, None)
        .await
        .map(|list| {
            list.results
                .into_iter()
                .filter_map(|r| match r {
                    SearchResult::Database(db) => {
                        Some((db.title(), db.url.clone().unwrap_or_default()))
                    }
                    SearchResult::Page(_) => None,
                })
                .collect()
        })
        .map_err(|e| e.to_string());

    let pages = notion
        .search_page(Some(SearchFilter::Page), 20, None)
        .await
        .map(|list| {
            list.results
                .into_iter()
                .filter_map(|r| match r {
                    SearchResult::Page(page) => {
                        let parent = page
                            .parent
                            .as_ref()
                            .map(|p| p.kind())
                            .unwrap_or("???")
                            .to_string();
                        Some((page.title(), parent))
                    }
                    SearchResult::Database(_) => None,
                })
                .collect()
        })
        .map_err(|e| e.to_string());

    NotionDiagnosis {
        all,
        databases,
        pages,
    }
}

pub fn notion_report(diagnosis: &NotionDiagnosis) -> String {
    let mut out = String::new();

    out.push_str("1. Unfiltered search\n");
    match &diagnosis.all {
        Ok(items) => {
            out.push_str(&format!("   {} items found\n", items.len()));
            for (kind, title) in items.iter().take(5) {
                out.push_str(&format!("      - [{}] {}\n", kind, truncate(title, TITLE_WIDTH)));
            }
        }
        Err(e) => {
            out.push_str(&format!("   Error: {}\n", e));
        }
    }

    out.push_str("\n2. Database search\n");
    match &diagnosis.databases {
        Ok(dbs) if dbs.is_empty() => {
            out.push_str("   No database accessible. Possible causes:\n");
            out.push_str("      1. The integration was not added to the databases\n");
            out.push_str("      2. The databases live in another workspace\n");
            out.push_str("      3. Insufficient permissions\n");
        }
        Ok(dbs) => {
            out.push_str(&format!("   {} databases found\n", dbs.len()));
            for (idx, (title, url)) in dbs.iter().take(LISTED).enumerate() {
                out.push_str(&format!("      {}. {}\n", idx + 1, title));
                out.push_str(&format!("         URL: {}\n", url));
            }
        }
        Err(e) => {
            out.push_str(&format!("   Error: {}\n", e));
        }
    }

    out.push_str("\n3. Page search\n");
    match &diagnosis.pages {
        Ok(pages) => {
            out.push_str(&format!("   {} pages found\n", pages.len()));
            for (idx, (title, parent)) in pages.iter().take(LISTED).enumerate() {
                out.push_str(&format!(
                    "      {}. {} (parent: {})\n",
                    idx + 1,
                    truncate(title, TITLE_WIDTH),
                    parent
                ));
            }
        }
        Err(e) => {
            out.push_str(&format!("   Error: {}\n", e));
        }
    }

    let databases_hidden = matches!(&diagnosis.databases, Ok(dbs) if dbs.is_empty());
    let pages_visible = matches!(&diagnosis.pages, Ok(pages) if !pages.is_empty());
    if databases_hidden && pages_visible {
        out.push_str("\nPages are visible but no database is.\n");
        out.push_str("Share each database with the integration:\n");
        out.push_str("   1. Open the database in Notion\n");
        out.push_str("   2. Click '...' at the top right\n");
        out.push_str("   3. 'Add connections' and pick the integration\n");
    }
    out
}

/// Call every endpoint of [`siyuan_probes`] and collect what came back.
pub async fn probe_siyuan(siyuan: &SiYuanClient) -> Vec<ProbeResult> {
    let mut results = Vec::new();
    for (endpoint, body) in siyuan_probes() {
        tracing::debug!("Probing {}", endpoint);
        results.push(siyuan.probe(endpoint, body).await);
    }
    results
}

pub fn siyuan_report(results: &[ProbeResult]) -> String {
    let mut out = String::new();
    for result in results {
        out.push_str(&format!("{}\n", result.endpoint));
        let verdict = match result.status {
            0 => format!("unreachable: {}", result.msg.as_deref().unwrap_or("")),
            200 => format!(
                "OK - code: {}, msg: {}",
                result
                    .code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "N/A".into()),
                result.msg.as_deref().filter(|m| !m.is_empty()).unwrap_or("N/A")
            ),
            404 => "404 - not available".to_string(),
            status => format!("{} - {}", status, result.msg.as_deref().unwrap_or("")),
        };
        out.push_str(&format!("   {}\n", verdict));
    }

    let available = results.iter().filter(|r| r.is_available()).count();
    out.push_str(&format!("\n{}/{} endpoints available\n", available, results.len()));
    out
}
