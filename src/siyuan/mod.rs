//! HTTP client for the SiYuan kernel API.
//!
//! Every endpoint is a `POST /api/...` with a JSON body, authenticated with
//! `Authorization: token <token>`, answering `{code, msg, data}`.

mod types;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

pub use types::*;

use crate::http::{handle_response, ClientError, Pacer};

/// HTTP client for the SiYuan kernel API.
#[derive(Debug, Clone)]
pub struct SiYuanClient {
    base_url: String,
    token: String,
    client: Client,
    pacer: Pacer,
}

impl SiYuanClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, pacer: Pacer) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client: Client::new(),
            pacer,
        }
    }

    fn request(&self, endpoint: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/api{}", self.base_url, endpoint);
        self.client
            .post(&url)
            .header("Authorization", format!("token {}", self.token))
    }

    /// Call an endpoint and unwrap the envelope.
    async fn call<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Value,
    ) -> Result<Option<T>, ClientError> {
        let response = self.request(endpoint).json(&body).send().await;
        self.pacer.pause().await;

        // Error replies may carry data of any shape, so the code is checked
        // before `data` is decoded.
        let envelope: ApiResponse<Value> = handle_response(response?).await?;
        if envelope.code != 0 {
            tracing::warn!("SiYuan {} failed: {} {}", endpoint, envelope.code, envelope.msg);
            return Err(ClientError::Api {
                code: envelope.code,
                msg: envelope.msg,
            });
        }
        match envelope.data {
            None | Some(Value::Null) => Ok(None),
            Some(data) => Ok(Some(serde_json::from_value(data)?)),
        }
    }

    // ============================================================
    // System
    // ============================================================

    pub async fn version(&self) -> Result<String, ClientError> {
        let data: Option<String> = self.call("/system/version", json!({})).await?;
        Ok(data.unwrap_or_default())
    }

    /// Create a data snapshot so the migration can be rolled back.
    pub async fn create_snapshot(&self, memo: &str) -> Result<(), ClientError> {
        self.call::<Value>("/repo/createSnapshot", json!({ "memo": memo }))
            .await?;
        Ok(())
    }

    /// Call an endpoint and report what came back, without failing on errors.
    pub async fn probe(&self, endpoint: &str, body: Value) -> ProbeResult {
        let mut result = ProbeResult {
            endpoint: endpoint.to_string(),
            status: 0,
            code: None,
            msg: None,
        };

        let response = match self.request(endpoint).json(&body).send().await {
            Ok(r) => r,
            Err(e) => {
                result.msg = Some(e.to_string());
                return result;
            }
        };
        self.pacer.pause().await;

        result.status = response.status().as_u16();
        match response.json::<Value>().await {
            Ok(v) => {
                result.code = v.get("code").and_then(Value::as_i64);
                result.msg = v.get("msg").and_then(Value::as_str).map(String::from);
            }
            Err(e) => result.msg = Some(e.to_string()),
        }
        result
    }

    // ============================================================
    // Notebooks
    // ============================================================

    pub async fn list_notebooks(&self) -> Result<Vec<Notebook>, ClientError> {
        let data: Option<NotebookList> = self.call("/notebook/lsNotebooks", json!({})).await?;
        Ok(data.map(|d| d.notebooks).unwrap_or_default())
    }

    pub async fn create_notebook(&self, name: &str) -> Result<Notebook, ClientError> {
        let data: Option<CreatedNotebook> = self
            .call("/notebook/createNotebook", json!({ "name": name }))
            .await?;
        data.map(|d| d.notebook)
            .ok_or_else(|| ClientError::Server("createNotebook returned no notebook".into()))
    }

    // ============================================================
    // Documents and attributes
    // ============================================================

    /// Create a document from Markdown. Returns the new document's block id.
    pub async fn create_doc_with_md(
        &self,
        notebook: &str,
        path: &str,
        markdown: &str,
    ) -> Result<String, ClientError> {
        let data: Option<String> = self
            .call(
                "/filetree/createDocWithMd",
                json!({ "notebook": notebook, "path": path, "markdown": markdown }),
            )
            .await?;
        data.filter(|id| !id.is_empty())
            .ok_or_else(|| ClientError::Server("createDocWithMd returned no document id".into()))
    }

    pub async fn set_block_attrs(&self, id: &str, attrs: &BlockAttrs) -> Result<(), ClientError> {
        self.call::<Value>("/attr/setBlockAttrs", json!({ "id": id, "attrs": attrs }))
            .await?;
        Ok(())
    }

    pub async fn get_block_attrs(&self, id: &str) -> Result<BlockAttrs, ClientError> {
        let data: Option<BlockAttrs> = self.call("/attr/getBlockAttrs", json!({ "id": id })).await?;
        Ok(data.unwrap_or_default())
    }

    /// Document tree of a notebook below `path` ("/" for the whole notebook).
    pub async fn list_doc_tree(&self, notebook: &str, path: &str) -> Result<Value, ClientError> {
        let data: Option<Value> = self
            .call(
                "/filetree/listDocTree",
                json!({ "notebook": notebook, "path": path }),
            )
            .await?;
        Ok(data.unwrap_or(Value::Null))
    }

    // ============================================================
    // Attribute Views
    // ============================================================

    /// Try to create an Attribute View. The kernel does not document this
    /// endpoint; callers treat failure as "create it by hand".
    pub async fn create_attribute_view(
        &self,
        notebook: &str,
        name: &str,
        schema: &AvSchema,
    ) -> Result<String, ClientError> {
        let data: Option<Value> = self
            .call(
                "/av/createAttributeView",
                json!({ "notebook": notebook, "name": name, "schema": schema }),
            )
            .await?;
        data.as_ref()
            .and_then(av_id)
            .ok_or_else(|| ClientError::Server("createAttributeView returned no id".into()))
    }
}
