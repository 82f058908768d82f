//! Database extraction and migration planning.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::RULE;
use crate::convert::ColumnType;
use crate::models::{MigrationPlan, PropertyPlan};
use crate::notion::{Database, NotionClient, Parent, UNTITLED};

const GUIDE_OPTION_PREVIEW: usize = 3;

/// Top-level pages of a Notion workspace.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceSummary {
    pub name: String,
    /// `(page id, title)` pairs.
    pub pages: Vec<(String, String)>,
}

/// What an analysis run found and wrote.
#[derive(Debug, Clone)]
pub struct AnalyzeOutcome {
    /// Workspace slugs seen in database URLs. Only filled without a filter.
    pub detected_workspaces: Vec<String>,
    pub plan: Option<MigrationPlan>,
    pub plan_path: Option<PathBuf>,
    pub guide_path: Option<PathBuf>,
}

pub struct Analyzer {
    notion: NotionClient,
    output_dir: PathBuf,
    workspace_filter: Option<String>,
}

impl Analyzer {
    pub fn new(
        notion: NotionClient,
        output_dir: impl Into<PathBuf>,
        workspace_filter: Option<String>,
    ) -> Self {
        Self {
            notion,
            output_dir: output_dir.into(),
            workspace_filter,
        }
    }

    /// Extract databases, build the plan and write it with its creation guide.
    pub async fn run(&self) -> Result<AnalyzeOutcome> {
        let filter = self.workspace_filter.as_deref();
        let all = self
            .notion
            .search_databases()
            .await
            .context("Failed to search Notion databases")?;

        let mut outcome = AnalyzeOutcome {
            detected_workspaces: Vec::new(),
            plan: None,
            plan_path: None,
            guide_path: None,
        };

        let databases: Vec<Database> = match filter {
            Some(name) => {
                tracing::info!("Filtering databases by workspace '{}'", name);
                all.into_iter()
                    .filter(|db| matches_workspace(db, name))
                    .collect()
            }
            None => {
                outcome.detected_workspaces = detect_workspaces(&all);
                all
            }
        };

        if databases.is_empty() {
            match filter {
                Some(name) => tracing::warn!(
                    "No database matches workspace '{}'; try again without a filter",
                    name
                ),
                None => tracing::warn!("No database found"),
            }
            return Ok(outcome);
        }

        for db in &databases {
            tracing::info!("Analyzing {}", db.title());
        }
        let plan = MigrationPlan::from_databases(&databases, filter);

        let plan_name = MigrationPlan::file_name(filter);
        let plan_path = self.output_dir.join(&plan_name);
        plan.save(&plan_path)?;
        tracing::info!("Plan saved to {}", plan_path.display());

        let guide_path = self
            .output_dir
            .join(MigrationPlan::guide_file_name(&plan_name));
        write_guide(&guide_path, &plan)?;
        tracing::info!("Creation guide saved to {}", guide_path.display());

        outcome.plan = Some(plan);
        outcome.plan_path = Some(plan_path);
        outcome.guide_path = Some(guide_path);
        Ok(outcome)
    }

    /// Group the top-level pages shared with the integration by workspace.
    pub async fn list_workspaces(&self) -> Result<Vec<WorkspaceSummary>> {
        let pages = self
            .notion
            .search_pages()
            .await
            .context("Failed to search Notion pages")?;
        Ok(group_workspaces(&pages))
    }
}

/// Pages whose parent is the workspace itself. Notion reports every such
/// parent as `workspace: true`, so they collapse into a single group named
/// after its first page.
pub fn group_workspaces(pages: &[crate::notion::Page]) -> Vec<WorkspaceSummary> {
    let top_level: Vec<(String, String)> = pages
        .iter()
        .filter(|p| matches!(p.parent, Some(Parent::Workspace { .. })))
        .map(|p| (p.id.clone(), p.title()))
        .collect();

    match top_level.first() {
        None => Vec::new(),
        Some((_, first_title)) => {
            let name = if first_title == UNTITLED {
                "Workspace".to_string()
            } else {
                first_title.clone()
            };
            vec![WorkspaceSummary {
                name,
                pages: top_level,
            }]
        }
    }
}

/// `My Space` → `my-space`, the form workspace names take in Notion URLs.
pub fn workspace_slug(name: &str) -> String {
    name.to_lowercase().replace(' ', "-")
}

pub fn matches_workspace(db: &Database, workspace: &str) -> bool {
    let url = db.url.as_deref().unwrap_or_default().to_lowercase();
    url.contains(&workspace_slug(workspace))
}

/// Workspace segment of `https://www.notion.so/<workspace>/<db>-<id>`.
pub fn workspace_from_url(url: &str) -> Option<&str> {
    let segment = url.split('/').nth(3)?;
    if segment.is_empty() || segment.starts_with("db") {
        None
    } else {
        Some(segment)
    }
}

/// Distinct workspace segments across database URLs, sorted.
pub fn detect_workspaces(databases: &[Database]) -> Vec<String> {
    databases
        .iter()
        .filter_map(|db| db.url.as_deref().and_then(workspace_from_url))
        .map(String::from)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn write_guide(path: &Path, plan: &MigrationPlan) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, creation_guide(plan))
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Checklist for creating the Attribute Views by hand.
pub fn creation_guide(plan: &MigrationPlan) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", RULE));
    out.push_str("ATTRIBUTE VIEW CREATION GUIDE\n");
    out.push_str(&format!("{}\n\n", RULE));

    if let Some(ws) = &plan.workspace_filter {
        out.push_str(&format!("Workspace: {}\n", ws));
    }
    out.push_str(&format!("Databases: {}\n\n", plan.databases_count));

    for (idx, db) in plan.databases.iter().enumerate() {
        out.push_str(&format!("\n{}\n", RULE));
        out.push_str(&format!(
            "DATABASE {}/{}: {}\n",
            idx + 1,
            plan.databases_count,
            db.title
        ));
        out.push_str(&format!("URL: {}\n", db.url.as_deref().unwrap_or("N/A")));
        out.push_str(&format!("{}\n\n", RULE));

        for prop in &db.properties {
            out.push_str(&format!("{}\n", guide_line(plan, prop)));
        }
        out.push('\n');
    }
    out
}

fn guide_line(plan: &MigrationPlan, prop: &PropertyPlan) -> String {
    let mut line = format!("[ ] {} ({})", prop.name, prop.siyuan_type);
    match prop.siyuan_type {
        ColumnType::Select | ColumnType::MultiSelect => {
            let names = prop.option_names();
            if !names.is_empty() {
                let shown: Vec<&str> = names.iter().take(GUIDE_OPTION_PREVIEW).copied().collect();
                line.push_str(&format!(" - Options: {}", shown.join(", ")));
                if names.len() > GUIDE_OPTION_PREVIEW {
                    line.push_str(&format!(" +{} more", names.len() - GUIDE_OPTION_PREVIEW));
                }
            }
        }
        ColumnType::Relation => {
            let target = match prop.relation_to.as_deref() {
                Some(id) => plan
                    .find_database(id)
                    .map(|db| db.title.clone())
                    .unwrap_or_else(|| id.to_string()),
                None => "???".to_string(),
            };
            line.push_str(&format!(" → DB: {}", target));
        }
        ColumnType::Rollup => {
            line.push_str(&format!(
                " - Rollup: {}",
                prop.function.as_deref().unwrap_or("count")
            ));
        }
        _ => {}
    }
    line
}

impl AnalyzeOutcome {
    pub fn summary(&self) -> String {
        let mut out = String::new();
        if !self.detected_workspaces.is_empty() {
            out.push_str(&format!(
                "Workspaces detected in URLs: {}\n",
                self.detected_workspaces.len()
            ));
            for ws in &self.detected_workspaces {
                out.push_str(&format!("  - {}\n", ws));
            }
            out.push_str("Filter one with FILTER_WORKSPACE=<name>\n\n");
        }

        match (&self.plan, &self.plan_path, &self.guide_path) {
            (Some(plan), Some(plan_path), Some(guide_path)) => {
                out.push_str(&format!("Databases analyzed: {}\n", plan.databases_count));
                out.push_str(&format!("Plan:  {}\n", plan_path.display()));
                out.push_str(&format!("Guide: {}\n", guide_path.display()));
            }
            _ => {
                out.push_str("No database found, nothing written\n");
            }
        }
        out
    }
}
