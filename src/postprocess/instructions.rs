//! Manual recreation steps for databases the page migration skipped.

use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{read_json, MigrationReport};

pub const INSTRUCTIONS_FILE: &str = "databases_instructions.md";

static DATABASE_WARNING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Database '([^']+)'").expect("valid regex"));

/// Database names mentioned in the report's manual-processing warnings.
pub fn databases_from_warnings(warnings: &[String]) -> Vec<String> {
    warnings
        .iter()
        .filter(|w| w.contains("requires manual processing"))
        .filter_map(|w| DATABASE_WARNING.captures(w))
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Read `migration_report.json` and list the databases to recreate.
pub fn databases_from_report(path: &Path) -> Result<Vec<String>> {
    let report: MigrationReport = read_json(path)?;
    let databases = databases_from_warnings(&report.warnings);
    tracing::info!("{} databases need manual processing", databases.len());
    Ok(databases)
}

fn csv_name(database: &str) -> String {
    format!("{}.csv", database.to_lowercase().replace(' ', "_"))
}

pub fn instructions(databases: &[String]) -> String {
    let mut out = String::new();
    out.push_str("# Recreating Notion databases in SiYuan\n\n");
    out.push_str("## Databases found\n\n");

    for (idx, name) in databases.iter().enumerate() {
        out.push_str(&format!("### {}. {}\n\n", idx + 1, name));
        out.push_str("**Required steps:**\n\n");
        out.push_str("1. Export the database from Notion as CSV:\n");
        out.push_str(&format!("   - Open the database '{}'\n", name));
        out.push_str("   - Menu ⋯ → Export → CSV\n");
        out.push_str(&format!("   - Save it as `{}`\n\n", csv_name(name)));
        out.push_str("2. Create an Attribute View in SiYuan:\n");
        out.push_str("   - Create a dedicated document\n");
        out.push_str("   - Insert an Attribute View block\n");
        out.push_str("   - Recreate the columns from the CSV\n");
        out.push_str("   - Import the rows\n\n");
        out.push_str("3. Reconnect relations:\n");
        out.push_str("   - Use `id_mapping.json` and `import_mapping.json`\n");
        out.push_str("   - Replace Notion ids with SiYuan ids\n\n");
        out.push_str("---\n\n");
    }

    out.push_str("\n## Notes\n\n");
    out.push_str("- SiYuan Attribute Views do not support every Notion property type\n");
    out.push_str("- Formulas and rollups must be recreated by hand\n");
    out.push_str("- Relations may need adjustments\n");
    out.push_str("- See https://docs.siyuan-note.club/en/ for details\n");
    out
}

pub fn write_instructions(path: &Path, databases: &[String]) -> Result<()> {
    std::fs::write(path, instructions(databases))
        .with_context(|| format!("Failed to write {}", path.display()))
}
