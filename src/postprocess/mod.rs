//! Post-migration processing: database instructions and link rewriting.

pub mod instructions;
pub mod links;

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::models::MIGRATION_REPORT_FILE;

pub use instructions::{databases_from_warnings, instructions, INSTRUCTIONS_FILE};
pub use links::{normalize_id, LinkConversion, LinkConverter, WorkspaceStats, LINKS_REPORT_FILE};

/// Default location of SiYuan's data directory.
pub const DEFAULT_WORKSPACE_DIR: &str = "./workspace/data";

/// Files written by a post-processing run.
#[derive(Debug, Clone, Default)]
pub struct PostProcessOutcome {
    pub instructions: Option<PathBuf>,
    pub databases: usize,
    pub links_report: Option<PathBuf>,
    pub links: Option<LinkSummary>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LinkSummary {
    pub stats: WorkspaceStats,
    pub converted: usize,
    pub total: usize,
}

/// Write `databases_instructions.md` when a migration report exists.
pub fn write_database_instructions(output_dir: &Path, outcome: &mut PostProcessOutcome) -> Result<()> {
    let report = output_dir.join(MIGRATION_REPORT_FILE);
    if !report.exists() {
        tracing::warn!("Migration report not found: {}", report.display());
        return Ok(());
    }

    let databases = instructions::databases_from_report(&report)?;
    let path = output_dir.join(INSTRUCTIONS_FILE);
    instructions::write_instructions(&path, &databases)?;
    tracing::info!("Instructions saved to {}", path.display());

    outcome.databases = databases.len();
    outcome.instructions = Some(path);
    Ok(())
}

/// Rewrite links under `workspace_dir` and write the conversion report.
pub fn convert_links(
    output_dir: &Path,
    workspace_dir: &Path,
    outcome: &mut PostProcessOutcome,
) -> Result<()> {
    let mut converter = LinkConverter::from_output_dir(output_dir)?;
    let stats = converter.convert_workspace(workspace_dir)?;

    let path = output_dir.join(LINKS_REPORT_FILE);
    converter.save_report(&path)?;
    tracing::info!("Link report saved to {}", path.display());

    outcome.links = Some(LinkSummary {
        stats,
        converted: converter.converted_count(),
        total: converter.conversions().len(),
    });
    outcome.links_report = Some(path);
    Ok(())
}

impl PostProcessOutcome {
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        match &self.instructions {
            Some(path) => lines.push(format!(
                "{} databases to recreate, instructions: {}",
                self.databases,
                path.display()
            )),
            None => lines.push("No migration report, no database instructions".to_string()),
        }
        match (&self.links, &self.links_report) {
            (Some(links), Some(path)) => lines.push(format!(
                "{}/{} links converted in {} files ({} changed), report: {}",
                links.converted,
                links.total,
                links.stats.files_scanned,
                links.stats.files_changed,
                path.display()
            )),
            _ => lines.push("Link conversion skipped".to_string()),
        }
        lines.join("\n")
    }
}
