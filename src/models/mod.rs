//! JSON artifacts exchanged between migration stages.
//!
//! Each stage writes its results under the output directory and the next
//! stage reads them back:
//!
//! - [`MigrationPlan`]: databases and column mappings, written by `analyze`.
//! - [`ViewMapping`]: Attribute Views created by `views`.
//! - [`ImportMapping`]: entries imported by `import`, with [`ImportStats`].
//! - [`MigrationReport`] and [`IdMapping`]: pages migrated by `pages`.

mod plan;
mod report;

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

pub use plan::*;
pub use report::*;

/// Pretty-print `value` to `path`, creating parent directories as needed.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}
