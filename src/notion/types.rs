//! Notion API payload types.
//!
//! Only the fields the migration reads are modeled. Property maps are kept as
//! ordered JSON objects and decoded per entry so that Notion's column order
//! survives and an unknown property type never fails a whole page.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const UNTITLED: &str = "Untitled";

/// A fragment of Notion rich text.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RichText {
    #[serde(default)]
    pub plain_text: String,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub annotations: Annotations,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub underline: bool,
    pub code: bool,
}

/// Concatenate the plain text of a rich text array.
pub fn plain_text(rich_text: &[RichText]) -> String {
    rich_text.iter().map(|t| t.plain_text.as_str()).collect()
}

/// Where a page or database lives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Parent {
    DatabaseId { database_id: String },
    PageId { page_id: String },
    BlockId { block_id: String },
    Workspace { workspace: bool },
    #[serde(other)]
    Other,
}

impl Parent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DatabaseId { .. } => "database_id",
            Self::PageId { .. } => "page_id",
            Self::BlockId { .. } => "block_id",
            Self::Workspace { .. } => "workspace",
            Self::Other => "unknown",
        }
    }

    /// Id of the parent page or database, if any.
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::DatabaseId { database_id } => Some(database_id),
            Self::PageId { page_id } => Some(page_id),
            Self::BlockId { block_id } => Some(block_id),
            _ => None,
        }
    }
}

/// A Notion database with its property schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    pub id: String,
    #[serde(default)]
    pub title: Vec<RichText>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub parent: Option<Parent>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl Database {
    pub fn title(&self) -> String {
        let title = plain_text(&self.title);
        if title.is_empty() {
            UNTITLED.to_string()
        } else {
            title
        }
    }

    /// Property definitions in Notion's column order.
    pub fn property_defs(&self) -> Vec<PropertyDef> {
        self.properties
            .iter()
            .map(|(name, raw)| PropertyDef::decode(name, raw))
            .collect()
    }
}

/// A Notion page, standalone or a database entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub parent: Option<Parent>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl Page {
    /// Title from the property of type `title`, falling back to the
    /// conventional `title` and `Name` keys.
    pub fn title(&self) -> String {
        let from_type = self
            .properties
            .values()
            .find(|v| v.get("type").and_then(Value::as_str) == Some("title"));
        let raw = from_type
            .or_else(|| self.properties.get("title"))
            .or_else(|| self.properties.get("Name"));

        let title = raw
            .and_then(|v| v.get("title"))
            .and_then(|t| serde_json::from_value::<Vec<RichText>>(t.clone()).ok())
            .map(|t| plain_text(&t))
            .unwrap_or_default();

        if title.is_empty() {
            UNTITLED.to_string()
        } else {
            title
        }
    }

    /// Title read from a named property, as the import does with the plan's title column.
    pub fn title_from(&self, property: &str) -> String {
        let title = match self.property(property) {
            Some(PropertyValue::Title { title }) => plain_text(&title),
            _ => String::new(),
        };
        if title.is_empty() {
            UNTITLED.to_string()
        } else {
            title
        }
    }

    /// Decoded property value by name.
    pub fn property(&self, name: &str) -> Option<PropertyValue> {
        self.properties.get(name).map(PropertyValue::decode)
    }

    /// All property values in column order.
    pub fn property_values(&self) -> Vec<(String, PropertyValue)> {
        self.properties
            .iter()
            .map(|(name, raw)| (name.clone(), PropertyValue::decode(raw)))
            .collect()
    }

    pub fn is_database_entry(&self) -> bool {
        matches!(self.parent, Some(Parent::DatabaseId { .. }))
    }
}

/// A `/search` result: either a page or a database.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "object", rename_all = "snake_case")]
pub enum SearchResult {
    Page(Page),
    Database(Database),
}

impl SearchResult {
    pub fn id(&self) -> &str {
        match self {
            Self::Page(p) => &p.id,
            Self::Database(d) => &d.id,
        }
    }

    pub fn title(&self) -> String {
        match self {
            Self::Page(p) => p.title(),
            Self::Database(d) => d.title(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Page(_) => "page",
            Self::Database(_) => "database",
        }
    }
}

/// One page of a paginated list response.
#[derive(Debug, Clone, Deserialize)]
pub struct PaginatedList<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

// ============================================================
// Property schemas (database columns)
// ============================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SelectOptionDef {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OptionsConfig {
    #[serde(default)]
    pub options: Vec<SelectOptionDef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RelationConfig {
    #[serde(default)]
    pub database_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RollupConfig {
    #[serde(default)]
    pub relation_property_name: Option<String>,
    #[serde(default)]
    pub relation_property_id: Option<String>,
    #[serde(default)]
    pub rollup_property_name: Option<String>,
    #[serde(default)]
    pub rollup_property_id: Option<String>,
    #[serde(default)]
    pub function: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FormulaConfig {
    #[serde(default)]
    pub expression: Option<String>,
}

/// Database column definition, keyed by Notion property type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertySchema {
    Title,
    RichText,
    Number,
    Select {
        #[serde(default)]
        select: OptionsConfig,
    },
    MultiSelect {
        #[serde(default)]
        multi_select: OptionsConfig,
    },
    Status {
        #[serde(default)]
        status: OptionsConfig,
    },
    Date,
    Checkbox,
    Url,
    Email,
    PhoneNumber,
    Relation {
        #[serde(default)]
        relation: RelationConfig,
    },
    Rollup {
        #[serde(default)]
        rollup: RollupConfig,
    },
    Formula {
        #[serde(default)]
        formula: FormulaConfig,
    },
    Files,
    People,
    CreatedTime,
    CreatedBy,
    LastEditedTime,
    LastEditedBy,
    #[serde(other)]
    Other,
}

/// A named column with its raw Notion type and decoded schema.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDef {
    pub name: String,
    pub notion_type: String,
    pub schema: PropertySchema,
}

impl PropertyDef {
    pub fn decode(name: &str, raw: &Value) -> Self {
        let notion_type = raw
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let schema = serde_json::from_value(raw.clone()).unwrap_or_else(|e| {
            tracing::debug!("Undecodable schema for property '{}': {}", name, e);
            PropertySchema::Other
        });
        Self {
            name: name.to_string(),
            notion_type,
            schema,
        }
    }
}

// ============================================================
// Property values (page cells)
// ============================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SelectOption {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DateValue {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PageRef {
    pub id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FileUrl {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FileObject {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub file: Option<FileUrl>,
    #[serde(default)]
    pub external: Option<FileUrl>,
}

impl FileObject {
    pub fn url(&self) -> Option<&str> {
        self.file
            .as_ref()
            .and_then(|f| f.url.as_deref())
            .filter(|u| !u.is_empty())
            .or_else(|| {
                self.external
                    .as_ref()
                    .and_then(|f| f.url.as_deref())
                    .filter(|u| !u.is_empty())
            })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct User {
    #[serde(default)]
    pub name: Option<String>,
}

/// A page property value, keyed by Notion property type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertyValue {
    Title {
        #[serde(default)]
        title: Vec<RichText>,
    },
    RichText {
        #[serde(default)]
        rich_text: Vec<RichText>,
    },
    Number {
        #[serde(default)]
        number: Option<serde_json::Number>,
    },
    Select {
        #[serde(default)]
        select: Option<SelectOption>,
    },
    MultiSelect {
        #[serde(default)]
        multi_select: Vec<SelectOption>,
    },
    Status {
        #[serde(default)]
        status: Option<SelectOption>,
    },
    Date {
        #[serde(default)]
        date: Option<DateValue>,
    },
    Checkbox {
        #[serde(default)]
        checkbox: bool,
    },
    Url {
        #[serde(default)]
        url: Option<String>,
    },
    Email {
        #[serde(default)]
        email: Option<String>,
    },
    PhoneNumber {
        #[serde(default)]
        phone_number: Option<String>,
    },
    Relation {
        #[serde(default)]
        relation: Vec<PageRef>,
    },
    Rollup,
    Formula,
    Files {
        #[serde(default)]
        files: Vec<FileObject>,
    },
    People {
        #[serde(default)]
        people: Vec<User>,
    },
    CreatedTime {
        #[serde(default)]
        created_time: Option<String>,
    },
    LastEditedTime {
        #[serde(default)]
        last_edited_time: Option<String>,
    },
    CreatedBy {
        #[serde(default)]
        created_by: Option<User>,
    },
    LastEditedBy {
        #[serde(default)]
        last_edited_by: Option<User>,
    },
    #[serde(other)]
    Other,
}

impl PropertyValue {
    pub fn decode(raw: &Value) -> Self {
        serde_json::from_value(raw.clone()).unwrap_or_else(|e| {
            tracing::debug!("Undecodable property value: {}", e);
            Self::Other
        })
    }
}

// ============================================================
// Blocks
// ============================================================

/// A content block. The type-specific payload stays raw and is decoded on
/// demand, so block types the converter does not know are still carried.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub has_children: bool,
    /// Children fetched by `NotionClient::block_tree`; never part of the API payload.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Block>,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

/// Payload shared by text-bearing blocks (paragraphs, headings, list items, ...).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TextBlock {
    pub rich_text: Vec<RichText>,
    pub checked: Option<bool>,
    pub language: Option<String>,
    pub icon: Option<Icon>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Icon {
    pub emoji: Option<String>,
}

/// Payload of media and link blocks (image, bookmark, embed, ...).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LinkBlock {
    pub url: Option<String>,
    pub file: Option<FileUrl>,
    pub external: Option<FileUrl>,
    pub caption: Vec<RichText>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChildTitle {
    pub title: String,
}

impl Block {
    fn payload<T: serde::de::DeserializeOwned + Default>(&self) -> T {
        self.data
            .get(&self.kind)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    pub fn text(&self) -> TextBlock {
        self.payload()
    }

    pub fn link(&self) -> LinkBlock {
        self.payload()
    }

    pub fn child_title(&self) -> String {
        self.payload::<ChildTitle>().title
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_search_results_by_object_kind() {
        let results: Vec<SearchResult> = serde_json::from_value(json!([
            {
                "object": "database",
                "id": "db-1",
                "title": [{"plain_text": "Tasks"}],
                "url": "https://www.notion.so/acme/Tasks-abc",
                "properties": {}
            },
            {
                "object": "page",
                "id": "page-1",
                "parent": {"type": "workspace", "workspace": true},
                "properties": {
                    "title": {"id": "title", "type": "title", "title": [{"plain_text": "Home"}]}
                }
            }
        ]))
        .unwrap();

        assert_eq!(results[0].kind(), "database");
        assert_eq!(results[0].title(), "Tasks");
        assert_eq!(results[1].title(), "Home");
        match &results[1] {
            SearchResult::Page(p) => {
                assert_eq!(p.parent, Some(Parent::Workspace { workspace: true }))
            }
            _ => panic!("expected page"),
        }
    }

    #[test]
    fn property_defs_keep_column_order_and_tolerate_unknown_types() {
        let db: Database = serde_json::from_value(json!({
            "id": "db",
            "properties": {
                "Zeta": {"type": "rich_text"},
                "Alpha": {"type": "select", "select": {"options": [{"name": "A", "color": "red"}]}},
                "Button": {"type": "button", "button": {}}
            }
        }))
        .unwrap();

        let defs = db.property_defs();
        let names: Vec<_> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Button"]);
        assert_eq!(defs[2].notion_type, "button");
        assert_eq!(defs[2].schema, PropertySchema::Other);
        assert_eq!(db.title(), UNTITLED);
    }

    #[test]
    fn page_title_falls_back_to_name_key() {
        let page: Page = serde_json::from_value(json!({
            "id": "p",
            "properties": {"Name": {"title": [{"plain_text": "Via name"}]}}
        }))
        .unwrap();
        assert_eq!(page.title(), "Via name");
    }

    #[test]
    fn block_payload_is_decoded_on_demand() {
        let block: Block = serde_json::from_value(json!({
            "id": "b",
            "type": "to_do",
            "has_children": false,
            "to_do": {"rich_text": [{"plain_text": "ship"}], "checked": true}
        }))
        .unwrap();
        let text = block.text();
        assert_eq!(plain_text(&text.rich_text), "ship");
        assert_eq!(text.checked, Some(true));
    }

    #[test]
    fn property_values_compare_by_content() {
        let raw = json!({"type": "title", "title": [{"plain_text": "Same", "annotations": {"bold": true}}]});
        let bold = PropertyValue::decode(&raw);
        assert_eq!(bold, PropertyValue::decode(&raw));

        let plain = PropertyValue::decode(&json!({"type": "title", "title": [{"plain_text": "Same"}]}));
        assert_ne!(bold, plain);
    }
}
