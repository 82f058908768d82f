//! Attribute View creation from a migration plan.
//!
//! SiYuan does not document `/av/createAttributeView`, so every view is a
//! best-effort attempt; the creation guide is the fallback.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use super::{find_notebook, try_snapshot};
use crate::convert::ColumnType;
use crate::models::{write_json, DatabasePlan, MigrationPlan, ViewMapping, VIEW_MAPPING_FILE};
use crate::siyuan::{AvColumn, AvSchema, SiYuanClient};

const SUMMARY_TOP: usize = 10;

pub struct ViewBuilder {
    siyuan: SiYuanClient,
    target_notebook: Option<String>,
    create_snapshots: bool,
    output_dir: PathBuf,
}

impl ViewBuilder {
    pub fn new(
        siyuan: SiYuanClient,
        target_notebook: Option<String>,
        create_snapshots: bool,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            siyuan,
            target_notebook,
            create_snapshots,
            output_dir: output_dir.into(),
        }
    }

    /// Create one Attribute View per planned database and save the mapping.
    pub async fn run(&self, plan: &MigrationPlan) -> Result<ViewMapping> {
        if self.create_snapshots {
            try_snapshot(&self.siyuan).await;
        }

        let notebook_id = self.setup_notebook().await?;
        let mut mapping = ViewMapping {
            notebook_id: Some(notebook_id.clone()),
            ..Default::default()
        };

        for db in &plan.databases {
            let schema = av_schema(db);
            tracing::info!("Creating view {} ({} columns)", db.title, schema.columns.len());

            match self
                .siyuan
                .create_attribute_view(&notebook_id, &db.title, &schema)
                .await
            {
                Ok(av_id) => {
                    tracing::info!("Created view {} ({})", db.title, av_id);
                    mapping.database_mapping.insert(db.id.clone(), av_id);
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to create view {}: {}. Create it by hand from the guide",
                        db.title,
                        e
                    );
                    mapping.errors.push(format!("Failed to create: {}", db.title));
                }
            }
        }

        let path = self.output_dir.join(VIEW_MAPPING_FILE);
        write_json(&path, &mapping)?;
        tracing::info!("View mapping saved to {}", path.display());
        Ok(mapping)
    }

    /// The configured notebook if it exists, else a fresh timestamped one.
    async fn setup_notebook(&self) -> Result<String> {
        let notebooks = self
            .siyuan
            .list_notebooks()
            .await
            .context("Failed to list SiYuan notebooks")?;

        if let Some(id) = &self.target_notebook {
            return match find_notebook(&notebooks, id) {
                Some(nb) => {
                    tracing::info!("Target notebook: {} ({})", nb.name, nb.id);
                    Ok(nb.id.clone())
                }
                None => bail!("Notebook {} not found in SiYuan", id),
            };
        }

        let name = format!(
            "Notion Migration {}",
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        );
        tracing::info!("Creating notebook {}", name);
        let notebook = self
            .siyuan
            .create_notebook(&name)
            .await
            .context("Failed to create the target notebook")?;
        Ok(notebook.id)
    }
}

/// Attribute View schema for a planned database.
pub fn av_schema(db: &DatabasePlan) -> AvSchema {
    let columns = db
        .properties
        .iter()
        .map(|prop| {
            let options = match prop.siyuan_type {
                ColumnType::Select | ColumnType::MultiSelect => {
                    prop.option_names().into_iter().map(String::from).collect()
                }
                _ => Vec::new(),
            };
            AvColumn {
                name: prop.name.clone(),
                column_type: prop.siyuan_type.as_str().to_string(),
                options,
                relation_db_id: match prop.siyuan_type {
                    ColumnType::Relation => prop.relation_to.clone(),
                    _ => None,
                },
            }
        })
        .collect();
    AvSchema { columns }
}

/// Overview shown instead of creating anything in a dry run.
pub fn plan_summary(plan: &MigrationPlan) -> String {
    let with_relations = plan
        .databases
        .iter()
        .filter(|db| db.count_type("relation") > 0)
        .count();

    let mut out = String::new();
    out.push_str(&format!("{} databases to migrate\n", plan.databases.len()));
    out.push_str(&format!("{} databases with relations\n\n", with_relations));
    out.push_str(&format!("Top {} databases:\n", SUMMARY_TOP));
    for (idx, db) in plan.databases.iter().take(SUMMARY_TOP).enumerate() {
        out.push_str(&format!(
            "  {}. {} ({} properties)\n",
            idx + 1,
            db.title,
            db.properties_count
        ));
    }
    if plan.databases.len() > SUMMARY_TOP {
        out.push_str(&format!("  ... and {} more\n", plan.databases.len() - SUMMARY_TOP));
    }
    out
}
