//! Migration stages, one per CLI subcommand.
//!
//! Each stage talks to the APIs strictly in sequence, logs progress through
//! `tracing`, writes its artifact under the output directory and returns a
//! summary the CLI prints.

pub mod analyze;
pub mod import;
pub mod pages;
pub mod views;

use crate::siyuan::{Notebook, SiYuanClient};

pub use analyze::{AnalyzeOutcome, Analyzer, WorkspaceSummary};
pub use import::{DataImporter, ImportOutcome};
pub use pages::PageMigrator;
pub use views::ViewBuilder;

pub(crate) const RULE: &str =
    "================================================================================";

/// Memo attached to snapshots taken before writing to SiYuan.
pub(crate) const SNAPSHOT_MEMO: &str = "Notion migration snapshot";

/// Cut `text` to at most `max` characters.
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Take a snapshot, logging rather than failing when SiYuan refuses.
pub(crate) async fn try_snapshot(siyuan: &SiYuanClient) -> bool {
    tracing::info!("Creating SiYuan snapshot");
    match siyuan.create_snapshot(SNAPSHOT_MEMO).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Snapshot failed, continuing without one: {}", e);
            false
        }
    }
}

pub(crate) fn find_notebook<'a>(notebooks: &'a [Notebook], id: &str) -> Option<&'a Notebook> {
    notebooks.iter().find(|nb| nb.id == id)
}
