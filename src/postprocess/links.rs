//! Rewrite Notion links in SiYuan `.sy` files as block references.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use walkdir::WalkDir;

use crate::models::{read_json, IdMapping, ImportMapping, ID_MAPPING_FILE, IMPORT_MAPPING_FILE};

pub const LINKS_REPORT_FILE: &str = "links_conversion_report.md";

/// `[text](<id>)`, where `<id>` is a bare 32-hex id, a dashed uuid, or a
/// notion.so URL ending in a 32-hex id.
static NOTION_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\[([^\]]+)\]\((?:https://(?:www\.)?notion\.so/[^)\s]*?)?([0-9a-fA-F]{32}|[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12})\)",
    )
    .expect("valid regex")
});

/// Dashes removed, lowercased.
pub fn normalize_id(id: &str) -> String {
    id.chars()
        .filter(|c| *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkConversion {
    pub file: PathBuf,
    pub line: usize,
    pub old_link: String,
    pub new_link: String,
    pub converted: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkspaceStats {
    pub files_scanned: usize,
    pub files_changed: usize,
}

#[derive(Debug, Default)]
pub struct LinkConverter {
    mapping: HashMap<String, String>,
    conversions: Vec<LinkConversion>,
}

impl LinkConverter {
    pub fn new(mapping: &IdMapping) -> Self {
        let mut converter = Self::default();
        converter.extend_mapping(mapping);
        converter
    }

    /// Load `id_mapping.json` and `import_mapping.json` from the output
    /// directory, whichever exist.
    pub fn from_output_dir(output_dir: &Path) -> Result<Self> {
        let mut converter = Self::default();

        let pages = output_dir.join(ID_MAPPING_FILE);
        if pages.exists() {
            let mapping: IdMapping = read_json(&pages)?;
            converter.extend_mapping(&mapping);
        } else {
            tracing::warn!("Mapping file not found: {}", pages.display());
        }

        let entries = output_dir.join(IMPORT_MAPPING_FILE);
        if entries.exists() {
            let mapping: ImportMapping = read_json(&entries)?;
            converter.extend_mapping(&mapping.notion_to_siyuan);
        }

        tracing::info!("{} id mappings loaded", converter.mapping.len());
        Ok(converter)
    }

    pub fn extend_mapping(&mut self, mapping: &IdMapping) {
        self.mapping.extend(
            mapping
                .iter()
                .map(|(notion, siyuan)| (normalize_id(notion), siyuan.clone())),
        );
    }

    pub fn mapping_len(&self) -> usize {
        self.mapping.len()
    }

    pub fn conversions(&self) -> &[LinkConversion] {
        &self.conversions
    }

    pub fn converted_count(&self) -> usize {
        self.conversions.iter().filter(|c| c.converted).count()
    }

    /// Rewrite mapped links in `content`, recording every link found.
    /// Unmapped links are left as they are.
    pub fn convert_text(&mut self, file: &Path, content: &str) -> String {
        let (converted, found) = self.rewrite(file, content);
        self.conversions.extend(found);
        converted
    }

    /// Convert a file in place. Returns whether it changed. Links are only
    /// recorded once the file is on disk.
    pub fn convert_file(&mut self, path: &Path) -> Result<bool> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let (converted, found) = self.rewrite(path, &content);
        let changed = converted != content;
        if changed {
            std::fs::write(path, converted)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        self.conversions.extend(found);
        Ok(changed)
    }

    fn rewrite(&self, file: &Path, content: &str) -> (String, Vec<LinkConversion>) {
        let mut found = Vec::new();
        let converted = NOTION_LINK.replace_all(content, |caps: &Captures| {
            let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
            let start = caps.get(0).map(|m| m.start()).unwrap_or_default();
            let text = &caps[1];
            let line = content[..start].matches('\n').count() + 1;

            let new_link = match self.mapping.get(&normalize_id(&caps[2])) {
                Some(siyuan_id) => format!("(({} '{}'))", siyuan_id, text),
                None => whole.to_string(),
            };
            found.push(LinkConversion {
                file: file.to_path_buf(),
                line,
                old_link: whole.to_string(),
                converted: new_link != whole,
                new_link: new_link.clone(),
            });
            new_link
        });
        (converted.into_owned(), found)
    }

    /// Convert every `.sy` file below `workspace_dir`. Unreadable files are
    /// logged and skipped.
    pub fn convert_workspace(&mut self, workspace_dir: &Path) -> Result<WorkspaceStats> {
        if !workspace_dir.is_dir() {
            anyhow::bail!("Workspace not found: {}", workspace_dir.display());
        }

        let mut stats = WorkspaceStats::default();
        for entry in WalkDir::new(workspace_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "sy"))
        {
            stats.files_scanned += 1;
            match self.convert_file(entry.path()) {
                Ok(true) => stats.files_changed += 1,
                Ok(false) => {}
                Err(e) => tracing::warn!("Skipping {}: {:#}", entry.path().display(), e),
            }
        }

        tracing::info!(
            "{} .sy files scanned, {} links converted",
            stats.files_scanned,
            self.converted_count()
        );
        Ok(stats)
    }

    /// Markdown report of every link found.
    pub fn report(&self) -> String {
        let unconverted: Vec<&LinkConversion> =
            self.conversions.iter().filter(|c| !c.converted).collect();

        let mut out = String::new();
        out.push_str("# Link conversion report\n\n");
        out.push_str(&format!("**Total:** {} links found\n", self.conversions.len()));
        out.push_str(&format!("**Converted:** {}\n", self.converted_count()));
        out.push_str(&format!("**Not converted:** {}\n\n", unconverted.len()));

        if !unconverted.is_empty() {
            out.push_str("## Links not converted (manual action required)\n\n");
            for conv in &unconverted {
                out.push_str(&format!("- `{}` line {}\n", conv.file.display(), conv.line));
                out.push_str(&format!("  - Link: `{}`\n", conv.old_link));
                out.push_str("  - Reason: Notion id not found in the mapping\n\n");
            }
        }

        out.push_str("\n## Per file\n\n");
        let mut per_file: BTreeMap<&Path, (usize, usize)> = BTreeMap::new();
        for conv in &self.conversions {
            let counts = per_file.entry(conv.file.as_path()).or_default();
            counts.0 += usize::from(conv.converted);
            counts.1 += 1;
        }
        for (file, (converted, total)) in per_file {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.display().to_string());
            out.push_str(&format!(
                "- `{}`: {}/{} ({:.0}%)\n",
                name,
                converted,
                total,
                converted as f64 / total as f64 * 100.0
            ));
        }
        out
    }

    pub fn save_report(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.report())
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}
