//! SiYuan kernel API payload types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response envelope shared by every kernel endpoint. `code == 0` is success.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notebook {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub closed: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct NotebookList {
    #[serde(default)]
    pub notebooks: Vec<Notebook>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CreatedNotebook {
    pub notebook: Notebook,
}

/// Block attributes as written by `setBlockAttrs`.
pub type BlockAttrs = BTreeMap<String, String>;

/// A column of an Attribute View schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_db_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AvSchema {
    pub columns: Vec<AvColumn>,
}

/// Raw outcome of calling an endpoint, used by diagnostics.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub endpoint: String,
    pub status: u16,
    pub code: Option<i64>,
    pub msg: Option<String>,
}

impl ProbeResult {
    pub fn is_available(&self) -> bool {
        self.status == 200 && self.code == Some(0)
    }
}

pub(crate) fn av_id(data: &Value) -> Option<String> {
    data.get("id")
        .or_else(|| data.get("avID"))
        .and_then(Value::as_str)
        .map(String::from)
}
