//! Migration of standalone Notion pages into a SiYuan notebook.
//!
//! Databases met along the way are only counted and reported; their entries
//! are handled by the import stage.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use super::import::MAX_BLOCK_DEPTH;
use super::{find_notebook, try_snapshot, RULE};
use crate::convert::values::NOTION_ID_ATTR;
use crate::convert::{attr_name, blocks_to_markdown, convert_value, document_markdown, document_path, page_tags};
use crate::http::ClientError;
use crate::models::{write_json, MigrationReport, ID_MAPPING_FILE, MIGRATION_REPORT_FILE};
use crate::notion::{NotionClient, Page, PropertyValue, SearchResult};
use crate::siyuan::{BlockAttrs, SiYuanClient};

/// Folder receiving migrated pages.
pub const PAGES_ROOT: &str = "migration-notion";

/// A page converted and ready to be written to SiYuan.
#[derive(Debug, Clone)]
pub struct PreparedPage {
    pub notion_id: String,
    pub title: String,
    pub path: String,
    pub markdown: String,
    pub attrs: BlockAttrs,
}

pub struct PageMigrator {
    notion: NotionClient,
    siyuan: SiYuanClient,
    target_notebook: Option<String>,
    dry_run: bool,
    create_snapshots: bool,
    output_dir: PathBuf,
}

impl PageMigrator {
    pub fn new(
        notion: NotionClient,
        siyuan: SiYuanClient,
        target_notebook: Option<String>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            notion,
            siyuan,
            target_notebook,
            dry_run: false,
            create_snapshots: true,
            output_dir: output_dir.into(),
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn create_snapshots(mut self, create_snapshots: bool) -> Self {
        self.create_snapshots = create_snapshots;
        self
    }

    /// Migrate every standalone page. The report is written even when the
    /// run aborts; the id mapping only when it completes.
    pub async fn run(&self) -> Result<MigrationReport> {
        let mut report = MigrationReport::new();
        let result = self.migrate(&mut report).await;
        if let Err(e) = &result {
            tracing::error!("Page migration aborted: {:#}", e);
            report.errors.push(format!("Fatal: {:#}", e));
        }
        report.finish();

        let report_path = self.output_dir.join(MIGRATION_REPORT_FILE);
        write_json(&report_path, &report)?;
        tracing::info!("Report saved to {}", report_path.display());
        result?;

        let mapping_path = self.output_dir.join(ID_MAPPING_FILE);
        write_json(&mapping_path, &report.mapping)?;
        tracing::info!("Mapping saved to {}", mapping_path.display());
        Ok(report)
    }

    async fn migrate(&self, report: &mut MigrationReport) -> Result<()> {
        let results = self
            .notion
            .search_all()
            .await
            .context("Failed to search Notion")?;

        let mut pages = Vec::new();
        for result in results {
            match result {
                SearchResult::Database(db) => {
                    report.databases_found += 1;
                    report.warnings.push(MigrationReport::database_warning(&db.title()));
                }
                SearchResult::Page(page) if page.is_database_entry() => {
                    tracing::debug!("Skipping database entry {}", page.id);
                }
                SearchResult::Page(page) => pages.push(page),
            }
        }
        report.total_pages = pages.len();
        tracing::info!(
            "{} pages and {} databases found",
            pages.len(),
            report.databases_found
        );

        let mut prepared = Vec::new();
        for (idx, page) in pages.iter().enumerate() {
            tracing::info!("[{}/{}] Extracting {}", idx + 1, pages.len(), page.title());
            match self.prepare(&page.id).await {
                Ok(p) => prepared.push(p),
                Err(e) => {
                    tracing::warn!("Failed to extract page {}: {}", page.id, e);
                    report
                        .errors
                        .push(format!("Failed to extract page {}: {}", short_id(&page.id), e));
                }
            }
        }

        if self.dry_run {
            tracing::info!("Dry run: {} pages converted, nothing written", prepared.len());
            return Ok(());
        }

        let notebook_id = self.target_notebook().await?;
        if self.create_snapshots {
            try_snapshot(&self.siyuan).await;
        }

        for (idx, page) in prepared.iter().enumerate() {
            tracing::info!("[{}/{}] Importing {}", idx + 1, prepared.len(), page.path);
            match self.import(&notebook_id, page).await {
                Ok(doc_id) => {
                    report.mapping.insert(page.notion_id.clone(), doc_id);
                    report.pages_migrated += 1;
                }
                Err(e) => {
                    tracing::warn!("Failed to import {}: {}", page.path, e);
                    report
                        .errors
                        .push(format!("Failed to import {}: {}", page.path, e));
                }
            }
        }
        tracing::info!("{} documents imported", report.pages_migrated);
        Ok(())
    }

    async fn prepare(&self, page_id: &str) -> Result<PreparedPage, ClientError> {
        let page = self.notion.get_page(page_id).await?;
        let blocks = self.notion.block_tree(page_id, MAX_BLOCK_DEPTH).await?;
        Ok(prepare_page(&page, &blocks_to_markdown(&blocks)))
    }

    async fn import(&self, notebook_id: &str, page: &PreparedPage) -> Result<String, ClientError> {
        let doc_id = self
            .siyuan
            .create_doc_with_md(notebook_id, &page.path, &page.markdown)
            .await?;
        if let Err(e) = self.siyuan.set_block_attrs(&doc_id, &page.attrs).await {
            tracing::warn!("Attributes not set on {}: {}", doc_id, e);
        }
        Ok(doc_id)
    }

    /// The configured notebook, else the first one SiYuan lists.
    async fn target_notebook(&self) -> Result<String> {
        let notebooks = self
            .siyuan
            .list_notebooks()
            .await
            .context("Failed to list SiYuan notebooks")?;

        let notebook = match &self.target_notebook {
            Some(id) => match find_notebook(&notebooks, id) {
                Some(nb) => nb,
                None => bail!("Notebook {} not found in SiYuan", id),
            },
            None => match notebooks.first() {
                Some(nb) => nb,
                None => bail!("No SiYuan notebook available"),
            },
        };
        tracing::info!("Target notebook: {} ({})", notebook.name, notebook.id);
        Ok(notebook.id.clone())
    }
}

/// Convert a page and its rendered content into a document to create.
pub fn prepare_page(page: &Page, content: &str) -> PreparedPage {
    let title = page.title();
    let tags = page_tags(page);
    PreparedPage {
        notion_id: page.id.clone(),
        path: document_path(&[PAGES_ROOT, &title]),
        markdown: document_markdown(&title, content),
        attrs: document_attrs(page, &tags),
        title,
    }
}

/// Page properties as attributes, without the title, plus `tags`.
pub fn document_attrs(page: &Page, tags: &[String]) -> BlockAttrs {
    let mut attrs = BlockAttrs::new();
    for (name, value) in page.property_values() {
        if matches!(value, PropertyValue::Title { .. }) {
            continue;
        }
        if let Some(converted) = convert_value(&value) {
            attrs.insert(attr_name(&name), converted);
        }
    }
    attrs.insert(NOTION_ID_ATTR.to_string(), page.id.clone());
    if !tags.is_empty() {
        attrs.insert("tags".to_string(), tags.join(","));
    }
    attrs
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Human-readable summary of a page migration.
pub fn report_summary(report: &MigrationReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", RULE));
    out.push_str("PAGE MIGRATION REPORT\n");
    out.push_str(&format!("{}\n\n", RULE));
    out.push_str(&format!("Pages found: {}\n", report.total_pages));
    out.push_str(&format!("Pages migrated: {}\n", report.pages_migrated));
    out.push_str(&format!("Databases found: {}\n", report.databases_found));

    if !report.warnings.is_empty() {
        out.push_str(&format!("\nWarnings ({}):\n", report.warnings.len()));
        for warning in &report.warnings {
            out.push_str(&format!("   - {}\n", warning));
        }
    }
    if !report.errors.is_empty() {
        out.push_str(&format!("\nErrors ({}):\n", report.errors.len()));
        for error in &report.errors {
            out.push_str(&format!("   - {}\n", error));
        }
    }
    out
}
