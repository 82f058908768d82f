use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::convert::{detect_column, ColumnType, DetectedColumn};
use crate::notion::{Database, PropertyDef, PropertySchema};

const PLAN_SUFFIX: &str = "_plan.json";
const GUIDE_SUFFIX: &str = "_guide.txt";

/// Snapshot of the Notion databases to migrate and how each column maps.
///
/// Written by `analyze`, read back by `views` and `import`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationPlan {
    pub timestamp: String,
    pub workspace_filter: Option<String>,
    pub databases_count: usize,
    pub databases: Vec<DatabasePlan>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabasePlan {
    pub id: String,
    pub title: String,
    pub url: Option<String>,
    pub properties_count: usize,
    pub properties: Vec<PropertyPlan>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropertyPlan {
    pub name: String,
    pub notion_type: String,
    pub siyuan_type: ColumnType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_property: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollup_property: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    /// Target database of a relation column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<OptionPlan>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptionPlan {
    pub name: String,
    pub color: Option<String>,
}

impl PropertyPlan {
    pub fn from_def(def: &PropertyDef) -> Self {
        let detected = detect_column(def);
        let mut plan = Self {
            name: def.name.clone(),
            notion_type: def.notion_type.clone(),
            siyuan_type: detected.column_type(),
            relation_property: None,
            rollup_property: None,
            function: None,
            expression: None,
            relation_to: None,
            options: None,
        };

        match detected {
            DetectedColumn::Rollup(spec) => {
                plan.relation_property = spec.relation_property;
                plan.rollup_property = spec.rollup_property;
                plan.function = Some(spec.function);
            }
            DetectedColumn::Formula { expression } => plan.expression = Some(expression),
            DetectedColumn::Plain(_) => {}
        }

        match &def.schema {
            PropertySchema::Relation { relation } => {
                plan.relation_to = relation.database_id.clone();
            }
            PropertySchema::Select { select: config }
            | PropertySchema::MultiSelect {
                multi_select: config,
            }
            | PropertySchema::Status { status: config } => {
                plan.options = Some(
                    config
                        .options
                        .iter()
                        .map(|o| OptionPlan {
                            name: o.name.clone(),
                            color: o.color.clone(),
                        })
                        .collect(),
                );
            }
            _ => {}
        }

        plan
    }

    pub fn option_names(&self) -> Vec<&str> {
        self.options
            .iter()
            .flatten()
            .map(|o| o.name.as_str())
            .collect()
    }
}

impl DatabasePlan {
    pub fn from_database(db: &Database) -> Self {
        let properties: Vec<PropertyPlan> =
            db.property_defs().iter().map(PropertyPlan::from_def).collect();
        Self {
            id: db.id.clone(),
            title: db.title(),
            url: db.url.clone(),
            properties_count: properties.len(),
            properties,
        }
    }

    /// The column holding the entry title.
    pub fn title_property(&self) -> Option<&PropertyPlan> {
        self.properties.iter().find(|p| p.notion_type == "title")
    }

    pub fn count_type(&self, notion_type: &str) -> usize {
        self.properties
            .iter()
            .filter(|p| p.notion_type == notion_type)
            .count()
    }
}

impl MigrationPlan {
    pub fn from_databases(databases: &[Database], workspace_filter: Option<&str>) -> Self {
        let databases: Vec<DatabasePlan> = databases.iter().map(DatabasePlan::from_database).collect();
        Self {
            timestamp: chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            workspace_filter: workspace_filter.map(String::from),
            databases_count: databases.len(),
            databases,
        }
    }

    /// `migration_plan.json`, or `<workspace>_migration_plan.json` when filtered.
    pub fn file_name(workspace_filter: Option<&str>) -> String {
        match workspace_filter {
            Some(ws) => format!("{}_migration{}", ws.to_lowercase(), PLAN_SUFFIX),
            None => format!("migration{}", PLAN_SUFFIX),
        }
    }

    /// Guide file name paired with a plan file name.
    pub fn guide_file_name(plan_file_name: &str) -> String {
        match plan_file_name.strip_suffix(PLAN_SUFFIX) {
            Some(stem) => format!("{}{}", stem, GUIDE_SUFFIX),
            None => format!("{}{}", plan_file_name, GUIDE_SUFFIX),
        }
    }

    pub fn path_in(output_dir: &Path, workspace_filter: Option<&str>) -> PathBuf {
        output_dir.join(Self::file_name(workspace_filter))
    }

    pub fn find_database(&self, id: &str) -> Option<&DatabasePlan> {
        self.databases.iter().find(|d| d.id == id)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        super::write_json(path, self)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read plan {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse plan {}", path.display()))
    }
}
