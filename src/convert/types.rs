//! Notion property type → SiYuan Attribute View column type.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::notion::{PropertyDef, PropertySchema, RollupConfig};

/// Column types SiYuan Attribute Views offer, plus the two computed kinds
/// that have to be rebuilt by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColumnType {
    Text,
    Number,
    Date,
    Select,
    MultiSelect,
    Checkbox,
    Url,
    Email,
    Phone,
    Relation,
    Asset,
    Rollup,
    Formula,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Date => "date",
            Self::Select => "select",
            Self::MultiSelect => "multi-select",
            Self::Checkbox => "checkbox",
            Self::Url => "url",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Relation => "relation",
            Self::Asset => "asset",
            Self::Rollup => "rollup",
            Self::Formula => "formula",
        }
    }

    pub fn is_computed(&self) -> bool {
        matches!(self, Self::Rollup | Self::Formula)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rollup settings carried into the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollupSpec {
    pub relation_property: Option<String>,
    pub rollup_property: Option<String>,
    pub function: String,
}

impl From<&RollupConfig> for RollupSpec {
    fn from(config: &RollupConfig) -> Self {
        Self {
            relation_property: config
                .relation_property_name
                .clone()
                .or_else(|| config.relation_property_id.clone()),
            rollup_property: config
                .rollup_property_name
                .clone()
                .or_else(|| config.rollup_property_id.clone()),
            function: config
                .function
                .clone()
                .unwrap_or_else(|| "count".to_string()),
        }
    }
}

/// The detected column for a Notion property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectedColumn {
    Plain(ColumnType),
    Rollup(RollupSpec),
    Formula { expression: String },
}

impl DetectedColumn {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Self::Plain(t) => *t,
            Self::Rollup(_) => ColumnType::Rollup,
            Self::Formula { .. } => ColumnType::Formula,
        }
    }
}

/// Base mapping by raw Notion type name.
pub fn map_notion_type(notion_type: &str) -> ColumnType {
    match notion_type {
        "title" | "rich_text" => ColumnType::Text,
        "number" => ColumnType::Number,
        "select" | "status" => ColumnType::Select,
        "multi_select" => ColumnType::MultiSelect,
        "date" | "created_time" | "last_edited_time" => ColumnType::Date,
        "checkbox" => ColumnType::Checkbox,
        "url" => ColumnType::Url,
        "email" => ColumnType::Email,
        "phone_number" => ColumnType::Phone,
        "relation" => ColumnType::Relation,
        "rollup" => ColumnType::Rollup,
        "formula" => ColumnType::Formula,
        _ => ColumnType::Text,
    }
}

/// Detect the SiYuan column for a property, looking at its name where the
/// type alone is ambiguous.
pub fn detect_column(def: &PropertyDef) -> DetectedColumn {
    match &def.schema {
        PropertySchema::Rollup { rollup } => DetectedColumn::Rollup(RollupSpec::from(rollup)),
        PropertySchema::Formula { formula } => DetectedColumn::Formula {
            expression: formula.expression.clone().unwrap_or_default(),
        },
        PropertySchema::Files => {
            let name = def.name.to_lowercase();
            if name.contains("cover") || name.contains("image") {
                DetectedColumn::Plain(ColumnType::Asset)
            } else {
                DetectedColumn::Plain(ColumnType::Text)
            }
        }
        _ => DetectedColumn::Plain(map_notion_type(&def.notion_type)),
    }
}
