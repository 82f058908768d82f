use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const IMPORT_MAPPING_FILE: &str = "import_mapping.json";
pub const ID_MAPPING_FILE: &str = "id_mapping.json";
pub const MIGRATION_REPORT_FILE: &str = "migration_report.json";
pub const VIEW_MAPPING_FILE: &str = "view_mapping.json";

/// Notion id → SiYuan id.
pub type IdMapping = BTreeMap<String, String>;

/// Counters kept while importing database entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ImportStats {
    pub databases_processed: usize,
    pub entries_imported: usize,
    pub rollups_skipped: usize,
    pub formulas_skipped: usize,
    pub errors: Vec<String>,
}

/// Contents of `import_mapping.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportMapping {
    #[serde(default)]
    pub notion_to_siyuan: IdMapping,
    #[serde(default)]
    pub stats: ImportStats,
}

/// Contents of `migration_report.json`, written by the page migration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationReport {
    pub start_time: String,
    pub end_time: Option<String>,
    pub total_pages: usize,
    pub pages_migrated: usize,
    pub databases_found: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    #[serde(default)]
    pub mapping: IdMapping,
}

impl Default for MigrationReport {
    fn default() -> Self {
        Self {
            start_time: now(),
            end_time: None,
            total_pages: 0,
            pages_migrated: 0,
            databases_found: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
            mapping: IdMapping::new(),
        }
    }
}

impl MigrationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(&mut self) {
        self.end_time = Some(now());
    }

    /// Warning recorded for every database met while migrating pages.
    pub fn database_warning(title: &str) -> String {
        format!("Database '{}' requires manual processing", title)
    }
}

/// Contents of `view_mapping.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewMapping {
    pub notebook_id: Option<String>,
    #[serde(default)]
    pub database_mapping: IdMapping,
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Local timestamp in ISO-8601 form.
pub fn now() -> String {
    chrono::Local::now()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

/// Read and deserialize a JSON artifact.
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn import_mapping_json_shape() {
        let mut mapping = ImportMapping::default();
        mapping
            .notion_to_siyuan
            .insert("notion-1".into(), "20240101-abc".into());
        mapping.stats.entries_imported = 1;
        mapping.stats.errors.push("Tasks: entry 2".into());

        let value = serde_json::to_value(&mapping).unwrap();
        assert_eq!(value["notion_to_siyuan"]["notion-1"], "20240101-abc");
        assert_eq!(value["stats"]["entries_imported"], 1);
        assert_eq!(value["stats"]["rollups_skipped"], 0);
        assert_eq!(value["stats"]["errors"], json!(["Tasks: entry 2"]));
    }

    #[test]
    fn report_records_database_warning() {
        let mut report = MigrationReport::new();
        report
            .warnings
            .push(MigrationReport::database_warning("Reading List"));
        report.finish();

        assert!(report.end_time.is_some());
        assert_eq!(
            report.warnings,
            vec!["Database 'Reading List' requires manual processing".to_string()]
        );
    }

    #[test]
    fn mapping_files_tolerate_missing_fields() {
        let mapping: ImportMapping = serde_json::from_value(json!({})).unwrap();
        assert!(mapping.notion_to_siyuan.is_empty());

        let views: ViewMapping = serde_json::from_value(json!({"notebook_id": "nb"})).unwrap();
        assert_eq!(views.notebook_id.as_deref(), Some("nb"));
        assert!(views.errors.is_empty());
    }
}
