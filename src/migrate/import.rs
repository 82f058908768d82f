//! Import of database entries as SiYuan documents with custom attributes.
//!
//! Rollups and formulas are never imported: they are counted per database
//! and have to be rebuilt by hand in SiYuan.

use std::path::PathBuf;

use anyhow::Result;

use super::{truncate, RULE};
use crate::convert::{blocks_to_markdown, convert_value, document_markdown, document_path, entry_attrs};
use crate::http::ClientError;
use crate::models::{write_json, DatabasePlan, IdMapping, ImportMapping, MigrationPlan, IMPORT_MAPPING_FILE};
use crate::notion::{NotionClient, Page, UNTITLED};
use crate::siyuan::SiYuanClient;

/// Nesting levels of blocks fetched per entry.
pub const MAX_BLOCK_DEPTH: usize = 3;

const PREVIEW_ENTRIES: usize = 3;
const PREVIEW_PROPERTIES: usize = 5;
const PREVIEW_WIDTH: usize = 50;
const PROGRESS_EVERY: usize = 10;
const REPORT_ERRORS: usize = 10;

/// An entry as shown in a dry run.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryPreview {
    pub database: String,
    pub title: String,
    pub notion_id: String,
    pub properties: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub dry_run: bool,
    pub mapping: ImportMapping,
    pub previews: Vec<EntryPreview>,
    pub mapping_path: PathBuf,
}

pub struct DataImporter {
    notion: NotionClient,
    siyuan: SiYuanClient,
    notebook_id: String,
    dry_run: bool,
    test_limit: usize,
    output_dir: PathBuf,
    notion_to_siyuan: IdMapping,
}

impl DataImporter {
    pub fn new(
        notion: NotionClient,
        siyuan: SiYuanClient,
        notebook_id: impl Into<String>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            notion,
            siyuan,
            notebook_id: notebook_id.into(),
            dry_run: false,
            test_limit: 0,
            output_dir: output_dir.into(),
            notion_to_siyuan: IdMapping::new(),
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Max entries per database, 0 for all.
    pub fn test_limit(mut self, limit: usize) -> Self {
        self.test_limit = limit;
        self
    }

    /// Import every planned database and save `import_mapping.json`.
    pub async fn run(mut self, plan: &MigrationPlan) -> Result<ImportOutcome> {
        tracing::info!(
            "Importing {} databases ({})",
            plan.databases.len(),
            if self.dry_run { "dry run" } else { "live" }
        );
        if self.test_limit > 0 {
            tracing::info!("Limited to {} entries per database", self.test_limit);
        }

        let mut mapping = ImportMapping::default();
        let mut previews = Vec::new();
        let total = plan.databases.len();

        for (idx, db) in plan.databases.iter().enumerate() {
            tracing::info!("Database {}/{}: {}", idx + 1, total, db.title);
            self.process_database(db, &mut mapping, &mut previews).await;
            mapping.stats.databases_processed += 1;
        }

        mapping.notion_to_siyuan = std::mem::take(&mut self.notion_to_siyuan);
        let mapping_path = self.output_dir.join(IMPORT_MAPPING_FILE);
        write_json(&mapping_path, &mapping)?;
        tracing::info!("Mapping saved to {}", mapping_path.display());

        Ok(ImportOutcome {
            dry_run: self.dry_run,
            mapping,
            previews,
            mapping_path,
        })
    }

    async fn process_database(
        &mut self,
        db: &DatabasePlan,
        mapping: &mut ImportMapping,
        previews: &mut Vec<EntryPreview>,
    ) {
        let rollups = db.count_type("rollup");
        let formulas = db.count_type("formula");
        if rollups > 0 || formulas > 0 {
            tracing::warn!(
                "{}: {} rollups and {} formulas will be skipped",
                db.title,
                rollups,
                formulas
            );
            mapping.stats.rollups_skipped += rollups;
            mapping.stats.formulas_skipped += formulas;
        }

        let entries = match self.notion.query_database(&db.id, self.test_limit).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!("Failed to query {}: {}", db.title, e);
                mapping.stats.errors.push(format!("{}: query failed", db.title));
                return;
            }
        };
        if entries.is_empty() {
            tracing::warn!("{}: no entries found", db.title);
            return;
        }
        tracing::info!("{}: {} entries found", db.title, entries.len());

        if self.dry_run {
            previews.extend(
                entries
                    .iter()
                    .take(PREVIEW_ENTRIES)
                    .map(|entry| preview_entry(entry, db)),
            );
            return;
        }

        let total = entries.len();
        for (idx, entry) in entries.iter().enumerate() {
            let n = idx + 1;
            if n % PROGRESS_EVERY == 0 {
                tracing::info!("Progress: {}/{}", n, total);
            }

            match self.import_entry(entry, db).await {
                Ok(block_id) => {
                    self.notion_to_siyuan.insert(entry.id.clone(), block_id);
                    mapping.stats.entries_imported += 1;
                }
                Err(e) => {
                    tracing::error!("{}: entry {} failed: {}", db.title, n, e);
                    mapping.stats.errors.push(format!("{}: entry {}", db.title, n));
                }
            }
        }
        tracing::info!("{}: import done", db.title);
    }

    async fn import_entry(&self, entry: &Page, db: &DatabasePlan) -> Result<String, ClientError> {
        let title = entry_title(entry, db);
        let blocks = self.notion.block_tree(&entry.id, MAX_BLOCK_DEPTH).await?;
        let markdown = document_markdown(&title, &blocks_to_markdown(&blocks));
        let path = document_path(&[&db.title, &title]);

        let block_id = self
            .siyuan
            .create_doc_with_md(&self.notebook_id, &path, &markdown)
            .await?;

        let (attrs, _) = entry_attrs(entry, &db.title);
        // The document exists at this point; a failed attribute write does not undo it.
        if let Err(e) = self.siyuan.set_block_attrs(&block_id, &attrs).await {
            tracing::warn!("Attributes not set on {}: {}", block_id, e);
        }
        Ok(block_id)
    }
}

/// Entry title, read from the plan's title column.
pub fn entry_title(entry: &Page, db: &DatabasePlan) -> String {
    match db.title_property() {
        Some(prop) => entry.title_from(&prop.name),
        None => UNTITLED.to_string(),
    }
}

fn preview_entry(entry: &Page, db: &DatabasePlan) -> EntryPreview {
    let properties = entry
        .property_values()
        .into_iter()
        .take(PREVIEW_PROPERTIES)
        .filter_map(|(name, value)| {
            let converted = convert_value(&value)?;
            let shown = if converted.chars().count() > PREVIEW_WIDTH {
                format!("{}...", truncate(&converted, PREVIEW_WIDTH))
            } else {
                converted
            };
            Some((name, shown))
        })
        .collect();

    EntryPreview {
        database: db.title.clone(),
        title: entry_title(entry, db),
        notion_id: entry.id.clone(),
        properties,
    }
}

impl ImportOutcome {
    /// Final report: counters, skipped computed columns, first errors.
    pub fn report(&self) -> String {
        let stats = &self.mapping.stats;
        let mut out = String::new();

        if self.dry_run && !self.previews.is_empty() {
            out.push_str("Dry run, first entries per database:\n");
            for preview in &self.previews {
                out.push_str(&format!("\n[{}] {}\n", preview.database, preview.title));
                out.push_str(&format!("   Notion id: {}\n", preview.notion_id));
                for (name, value) in &preview.properties {
                    out.push_str(&format!("   - {}: {}\n", name, value));
                }
            }
            out.push('\n');
        }

        out.push_str(&format!("{}\n", RULE));
        out.push_str("IMPORT REPORT\n");
        out.push_str(&format!("{}\n\n", RULE));
        out.push_str(&format!("Databases processed: {}\n", stats.databases_processed));
        out.push_str(&format!("Entries imported: {}\n", stats.entries_imported));

        if stats.rollups_skipped > 0 || stats.formulas_skipped > 0 {
            out.push_str("\nSkipped properties (recreate them in SiYuan):\n");
            if stats.rollups_skipped > 0 {
                out.push_str(&format!("   - {} rollups\n", stats.rollups_skipped));
            }
            if stats.formulas_skipped > 0 {
                out.push_str(&format!("   - {} formulas\n", stats.formulas_skipped));
            }
        }

        if !stats.errors.is_empty() {
            out.push_str(&format!("\nErrors ({}):\n", stats.errors.len()));
            for error in stats.errors.iter().take(REPORT_ERRORS) {
                out.push_str(&format!("   - {}\n", error));
            }
        }

        out.push_str(&format!("\nMapping saved: {}\n", self.mapping_path.display()));
        out
    }
}
