//! In-process mock Notion and SiYuan servers for integration tests.
//!
//! Each server binds an ephemeral port, serves fixtures from shared state and
//! records every request it receives.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use notion_siyuan::http::Pacer;
use notion_siyuan::notion::NotionClient;
use notion_siyuan::siyuan::SiYuanClient;

pub const TOKEN: &str = "test-token";

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub body: Value,
    pub authorization: Option<String>,
    pub notion_version: Option<String>,
}

struct Mock<T> {
    fixture: T,
    requests: Vec<Recorded>,
}

type Shared<T> = Arc<Mutex<Mock<T>>>;

pub struct MockServer<T> {
    pub url: String,
    state: Shared<T>,
}

impl<T> MockServer<T> {
    pub fn requests(&self) -> Vec<Recorded> {
        self.state.lock().expect("mock state poisoned").requests.clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    pub fn with_fixture<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.state.lock().expect("mock state poisoned").fixture)
    }
}

async fn serve<T: Send + 'static>(router: Router<Shared<T>>, fixture: T) -> MockServer<T> {
    let state = Arc::new(Mutex::new(Mock {
        fixture,
        requests: Vec::new(),
    }));
    let app = router.with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock server");
    let addr = listener.local_addr().expect("Failed to read mock address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Mock server failed");
    });

    MockServer {
        url: format!("http://{}", addr),
        state,
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

fn record<T>(
    state: &Shared<T>,
    method: &str,
    path: String,
    query: HashMap<String, String>,
    headers: &HeaderMap,
    body: Value,
) {
    state
        .lock()
        .expect("mock state poisoned")
        .requests
        .push(Recorded {
            method: method.to_string(),
            path,
            query,
            body,
            authorization: header(headers, "authorization"),
            notion_version: header(headers, "notion-version"),
        });
}

type Reply = (StatusCode, Json<Value>);

// ============================================================
// Notion
// ============================================================

#[derive(Debug, Default)]
pub struct NotionFixture {
    pub databases: Vec<Value>,
    pub pages: Vec<Value>,
    /// Database id → entries returned by `/query`.
    pub entries: HashMap<String, Vec<Value>>,
    /// Block or page id → children.
    pub blocks: HashMap<String, Vec<Value>>,
    /// Results per page of any list; 0 means whatever the client asks for.
    pub page_size: usize,
}

fn paginate(items: &[Value], cursor: Option<&str>, size: usize) -> Value {
    let start = cursor
        .and_then(|c| c.parse::<usize>().ok())
        .unwrap_or(0)
        .min(items.len());
    let end = (start + size.max(1)).min(items.len());
    let has_more = end < items.len();
    json!({
        "object": "list",
        "results": items[start..end].to_vec(),
        "has_more": has_more,
        "next_cursor": if has_more { Some(end.to_string()) } else { None },
    })
}

fn page_size(fixture: &NotionFixture, requested: Option<u64>) -> usize {
    let requested = requested.unwrap_or(100) as usize;
    if fixture.page_size == 0 {
        requested
    } else {
        fixture.page_size.min(requested)
    }
}

fn notion_denied(headers: &HeaderMap) -> Option<Reply> {
    let expected = format!("Bearer {}", TOKEN);
    if header(headers, "authorization").as_deref() == Some(expected.as_str()) {
        None
    } else {
        Some((
            StatusCode::UNAUTHORIZED,
            Json(json!({"object": "error", "status": 401, "code": "unauthorized"})),
        ))
    }
}

fn not_found(id: &str) -> Reply {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"object": "error", "status": 404, "message": format!("Could not find {}", id)})),
    )
}

async fn notion_search(
    State(state): State<Shared<NotionFixture>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    record(&state, "POST", "/v1/search".into(), HashMap::new(), &headers, body.clone());
    if let Some(denied) = notion_denied(&headers) {
        return denied;
    }

    let mock = state.lock().expect("mock state poisoned");
    let fixture = &mock.fixture;
    let filter = body.pointer("/filter/value").and_then(Value::as_str);
    let mut items = Vec::new();
    if filter != Some("page") {
        items.extend(fixture.databases.iter().cloned());
    }
    if filter != Some("database") {
        items.extend(fixture.pages.iter().cloned());
    }
    let size = page_size(fixture, body["page_size"].as_u64());
    (
        StatusCode::OK,
        Json(paginate(&items, body["start_cursor"].as_str(), size)),
    )
}

async fn notion_get_database(
    State(state): State<Shared<NotionFixture>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Reply {
    record(&state, "GET", format!("/v1/databases/{}", id), HashMap::new(), &headers, Value::Null);
    if let Some(denied) = notion_denied(&headers) {
        return denied;
    }
    let mock = state.lock().expect("mock state poisoned");
    match mock.fixture.databases.iter().find(|db| db["id"] == id.as_str()) {
        Some(db) => (StatusCode::OK, Json(db.clone())),
        None => not_found(&id),
    }
}

async fn notion_query(
    State(state): State<Shared<NotionFixture>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    record(&state, "POST", format!("/v1/databases/{}/query", id), HashMap::new(), &headers, body.clone());
    if let Some(denied) = notion_denied(&headers) {
        return denied;
    }
    let mock = state.lock().expect("mock state poisoned");
    let fixture = &mock.fixture;
    match fixture.entries.get(&id) {
        Some(entries) => {
            let size = page_size(fixture, body["page_size"].as_u64());
            (
                StatusCode::OK,
                Json(paginate(entries, body["start_cursor"].as_str(), size)),
            )
        }
        None => not_found(&id),
    }
}

async fn notion_get_page(
    State(state): State<Shared<NotionFixture>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Reply {
    record(&state, "GET", format!("/v1/pages/{}", id), HashMap::new(), &headers, Value::Null);
    if let Some(denied) = notion_denied(&headers) {
        return denied;
    }
    let mock = state.lock().expect("mock state poisoned");
    let fixture = &mock.fixture;
    let found = fixture
        .pages
        .iter()
        .chain(fixture.entries.values().flatten())
        .find(|p| p["id"] == id.as_str());
    match found {
        Some(page) => (StatusCode::OK, Json(page.clone())),
        None => not_found(&id),
    }
}

async fn notion_block_children(
    State(state): State<Shared<NotionFixture>>,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Reply {
    record(&state, "GET", format!("/v1/blocks/{}/children", id), query.clone(), &headers, Value::Null);
    if let Some(denied) = notion_denied(&headers) {
        return denied;
    }
    let mock = state.lock().expect("mock state poisoned");
    let fixture = &mock.fixture;
    match fixture.blocks.get(&id) {
        Some(children) => {
            let requested = query.get("page_size").and_then(|s| s.parse().ok());
            let size = page_size(fixture, requested);
            (
                StatusCode::OK,
                Json(paginate(children, query.get("start_cursor").map(String::as_str), size)),
            )
        }
        // Pages without fixtures have no content.
        None => (StatusCode::OK, Json(paginate(&[], None, 100))),
    }
}

pub async fn notion_server(fixture: NotionFixture) -> MockServer<NotionFixture> {
    let router = Router::new()
        .route("/v1/search", post(notion_search))
        .route("/v1/databases/{id}", get(notion_get_database))
        .route("/v1/databases/{id}/query", post(notion_query))
        .route("/v1/pages/{id}", get(notion_get_page))
        .route("/v1/blocks/{id}/children", get(notion_block_children));
    serve(router, fixture).await
}

pub fn notion_client(server: &MockServer<NotionFixture>) -> NotionClient {
    NotionClient::new(format!("{}/v1", server.url), TOKEN, Pacer::default())
}

// ============================================================
// SiYuan
// ============================================================

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedDoc {
    pub id: String,
    pub notebook: String,
    pub path: String,
    pub markdown: String,
}

#[derive(Debug, Default)]
pub struct SiYuanFixture {
    pub notebooks: Vec<Value>,
    /// `createDocWithMd` fails for paths containing any of these.
    pub fail_doc_paths: Vec<String>,
    /// Whether `/av/createAttributeView` succeeds.
    pub attribute_views: bool,
    pub docs: Vec<CreatedDoc>,
    pub attrs: HashMap<String, Value>,
}

fn envelope(data: Value) -> Reply {
    (StatusCode::OK, Json(json!({"code": 0, "msg": "", "data": data})))
}

/// Kernel errors carry whatever `data` the endpoint had at hand.
fn api_error(msg: &str) -> Reply {
    (
        StatusCode::OK,
        Json(json!({"code": -1, "msg": msg, "data": {"closeTimeout": 7000}})),
    )
}

async fn siyuan_api(
    State(state): State<Shared<SiYuanFixture>>,
    Path(endpoint): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let endpoint = format!("/{}", endpoint.trim_start_matches('/'));
    record(&state, "POST", format!("/api{}", endpoint), HashMap::new(), &headers, body.clone());

    let expected = format!("token {}", TOKEN);
    if header(&headers, "authorization").as_deref() != Some(expected.as_str()) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"code": -1, "msg": "Auth failed", "data": null})),
        );
    }

    let mut mock = state.lock().expect("mock state poisoned");
    let fixture = &mut mock.fixture;
    match endpoint.as_str() {
        "/system/version" => envelope(json!("3.1.0")),
        "/notebook/lsNotebooks" => envelope(json!({ "notebooks": fixture.notebooks })),
        "/notebook/createNotebook" => {
            let notebook = json!({
                "id": format!("nb-created-{}", fixture.notebooks.len() + 1),
                "name": body["name"],
                "closed": false
            });
            fixture.notebooks.push(notebook.clone());
            envelope(json!({ "notebook": notebook }))
        }
        "/filetree/createDocWithMd" => {
            let path = body["path"].as_str().unwrap_or_default().to_string();
            if fixture.fail_doc_paths.iter().any(|p| path.contains(p.as_str())) {
                return api_error("create doc failed");
            }
            let id = format!("doc-{}", fixture.docs.len() + 1);
            fixture.docs.push(CreatedDoc {
                id: id.clone(),
                notebook: body["notebook"].as_str().unwrap_or_default().to_string(),
                path,
                markdown: body["markdown"].as_str().unwrap_or_default().to_string(),
            });
            envelope(json!(id))
        }
        "/attr/setBlockAttrs" => {
            let id = body["id"].as_str().unwrap_or_default().to_string();
            fixture.attrs.insert(id, body["attrs"].clone());
            envelope(Value::Null)
        }
        "/attr/getBlockAttrs" => {
            let id = body["id"].as_str().unwrap_or_default();
            envelope(fixture.attrs.get(id).cloned().unwrap_or_else(|| json!({})))
        }
        "/repo/createSnapshot" => envelope(Value::Null),
        "/filetree/listDocTree" => {
            let notebook = body["notebook"].as_str().unwrap_or_default();
            let tree: Vec<Value> = fixture
                .docs
                .iter()
                .filter(|d| d.notebook == notebook)
                .map(|d| json!({ "id": d.id, "children": [] }))
                .collect();
            envelope(json!({ "tree": tree }))
        }
        "/av/createAttributeView" if fixture.attribute_views => {
            envelope(json!({ "id": format!("av-{}", body["name"].as_str().unwrap_or_default()) }))
        }
        "/av/createAttributeView" => api_error("unsupported"),
        _ => (StatusCode::NOT_FOUND, Json(json!({"code": 404, "msg": "not found"}))),
    }
}

pub async fn siyuan_server(fixture: SiYuanFixture) -> MockServer<SiYuanFixture> {
    let router = Router::new().route("/api/{*endpoint}", post(siyuan_api));
    serve(router, fixture).await
}

pub fn siyuan_client(server: &MockServer<SiYuanFixture>) -> SiYuanClient {
    SiYuanClient::new(&server.url, TOKEN, Pacer::default())
}

pub fn notebook(id: &str, name: &str) -> Value {
    json!({ "id": id, "name": name, "closed": false })
}

// ============================================================
// Notion fixtures
// ============================================================

pub fn rich(text: &str) -> Value {
    json!([{ "plain_text": text, "href": null, "annotations": {} }])
}

pub fn database(id: &str, title: &str, url: &str, properties: Value) -> Value {
    json!({
        "object": "database",
        "id": id,
        "title": rich(title),
        "url": url,
        "parent": { "type": "workspace", "workspace": true },
        "properties": properties,
    })
}

pub fn page(id: &str, title: &str, parent: Value) -> Value {
    json!({
        "object": "page",
        "id": id,
        "url": format!("https://www.notion.so/{}", id.replace('-', "")),
        "parent": parent,
        "properties": {
            "title": { "id": "title", "type": "title", "title": rich(title) }
        },
    })
}

pub fn entry(id: &str, database_id: &str, properties: Value) -> Value {
    json!({
        "object": "page",
        "id": id,
        "parent": { "type": "database_id", "database_id": database_id },
        "properties": properties,
    })
}

pub fn workspace_parent() -> Value {
    json!({ "type": "workspace", "workspace": true })
}

pub fn page_parent(id: &str) -> Value {
    json!({ "type": "page_id", "page_id": id })
}

pub fn text_block(id: &str, kind: &str, text: &str) -> Value {
    json!({
        "object": "block",
        "id": id,
        "type": kind,
        "has_children": false,
        kind: { "rich_text": rich(text) },
    })
}

pub fn parent_block(id: &str, kind: &str, text: &str) -> Value {
    let mut block = text_block(id, kind, text);
    block["has_children"] = json!(true);
    block
}
