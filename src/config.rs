//! Migration configuration.
//!
//! Values are layered: built-in defaults, then an optional JSON config file,
//! then environment variables. The CLI applies its own flags last.
//!
//! Environment variables:
//! - `NOTION_TOKEN` - Notion integration token
//! - `NOTION_API_URL` - Notion base URL (default: `https://api.notion.com/v1`)
//! - `SIYUAN_URL` - SiYuan kernel URL (default: `http://127.0.0.1:6806`)
//! - `SIYUAN_TOKEN` - SiYuan API token
//! - `TARGET_NOTEBOOK_ID` - Notebook receiving imported documents
//! - `FILTER_WORKSPACE` - Only extract databases from this workspace
//! - `DELAY_BETWEEN_CALLS` - Pause after each API call, in seconds
//! - `TEST_LIMIT` - Max entries per database (0 = all)
//! - `DRY_RUN` - `true` to analyze without writing to SiYuan
//! - `CREATE_SNAPSHOTS` - `true` to snapshot SiYuan before importing
//! - `OUTPUT_DIR` - Directory for JSON artifacts

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const APP_NAME: &str = "notion-siyuan";
const CONFIG_FILE: &str = "config.json";

pub const DEFAULT_NOTION_URL: &str = "https://api.notion.com/v1";
pub const DEFAULT_SIYUAN_URL: &str = "http://127.0.0.1:6806";
pub const DEFAULT_OUTPUT_DIR: &str = "migration_output";
const DEFAULT_DELAY_SECS: f64 = 0.5;

/// Configuration errors surfaced before any API call is made.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("NOTION_TOKEN is not set")]
    MissingNotionToken,

    #[error("SIYUAN_TOKEN is not set")]
    MissingSiyuanToken,

    #[error("TARGET_NOTEBOOK_ID is not set (export TARGET_NOTEBOOK_ID=<notebook id>)")]
    MissingNotebook,

    #[error("Invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// Optional settings read from the JSON config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub notion_token: Option<String>,
    pub notion_url: Option<String>,
    pub siyuan_url: Option<String>,
    pub siyuan_token: Option<String>,
    pub target_notebook_id: Option<String>,
    pub filter_workspace: Option<String>,
    /// Seconds to wait after each API call.
    pub delay_between_calls: Option<f64>,
    pub test_limit: Option<usize>,
    pub dry_run: Option<bool>,
    pub create_snapshots: Option<bool>,
    pub output_dir: Option<PathBuf>,
}

impl ConfigFile {
    /// Read a config file the user named. The file must exist.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Read the per-user config file if there is one.
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Location of the per-user config file.
    pub fn default_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push(APP_NAME);
        path.push(CONFIG_FILE);
        Some(path)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub notion_token: Option<String>,
    pub notion_url: String,
    pub siyuan_url: String,
    pub siyuan_token: Option<String>,
    pub target_notebook_id: Option<String>,
    pub filter_workspace: Option<String>,
    pub delay: Duration,
    /// Max entries imported per database. 0 means no limit.
    pub test_limit: usize,
    pub dry_run: bool,
    pub create_snapshots: bool,
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            notion_token: None,
            notion_url: DEFAULT_NOTION_URL.to_string(),
            siyuan_url: DEFAULT_SIYUAN_URL.to_string(),
            siyuan_token: None,
            target_notebook_id: None,
            filter_workspace: None,
            delay: Duration::from_secs_f64(DEFAULT_DELAY_SECS),
            test_limit: 0,
            dry_run: false,
            create_snapshots: true,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl Config {
    /// Load from the given file (or the per-user default) and the process environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file = match file {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::load_default()?,
        };
        let config = Self::resolve(file, |key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Merge defaults, file settings and variables from `lookup`.
    pub fn resolve<F>(file: ConfigFile, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_file(file)?;
        config.apply_env(lookup)?;
        Ok(config)
    }

    fn apply_file(&mut self, file: ConfigFile) -> Result<(), ConfigError> {
        if file.notion_token.is_some() {
            self.notion_token = file.notion_token;
        }
        if let Some(url) = file.notion_url {
            self.notion_url = url;
        }
        if let Some(url) = file.siyuan_url {
            self.siyuan_url = url;
        }
        if file.siyuan_token.is_some() {
            self.siyuan_token = file.siyuan_token;
        }
        if file.target_notebook_id.is_some() {
            self.target_notebook_id = file.target_notebook_id;
        }
        if file.filter_workspace.is_some() {
            self.filter_workspace = file.filter_workspace;
        }
        if let Some(secs) = file.delay_between_calls {
            self.delay = parse_delay(&secs.to_string())?;
        }
        if let Some(limit) = file.test_limit {
            self.test_limit = limit;
        }
        if let Some(dry_run) = file.dry_run {
            self.dry_run = dry_run;
        }
        if let Some(snapshots) = file.create_snapshots {
            self.create_snapshots = snapshots;
        }
        if let Some(dir) = file.output_dir {
            self.output_dir = dir;
        }
        Ok(())
    }

    fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get("NOTION_TOKEN") {
            self.notion_token = Some(token);
        }
        if let Some(url) = get("NOTION_API_URL") {
            self.notion_url = url;
        }
        if let Some(url) = get("SIYUAN_URL") {
            self.siyuan_url = url;
        }
        if let Some(token) = get("SIYUAN_TOKEN") {
            self.siyuan_token = Some(token);
        }
        if let Some(notebook) = get("TARGET_NOTEBOOK_ID") {
            self.target_notebook_id = Some(notebook);
        }
        if let Some(workspace) = get("FILTER_WORKSPACE") {
            self.filter_workspace = Some(workspace);
        }
        if let Some(delay) = get("DELAY_BETWEEN_CALLS") {
            self.delay = parse_delay(&delay)?;
        }
        if let Some(limit) = get("TEST_LIMIT") {
            self.test_limit = limit.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "TEST_LIMIT",
                value: limit.clone(),
            })?;
        }
        if let Some(dry_run) = get("DRY_RUN") {
            self.dry_run = parse_bool("DRY_RUN", &dry_run)?;
        }
        if let Some(snapshots) = get("CREATE_SNAPSHOTS") {
            self.create_snapshots = parse_bool("CREATE_SNAPSHOTS", &snapshots)?;
        }
        if let Some(dir) = get("OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    pub fn notion_token(&self) -> Result<&str, ConfigError> {
        self.notion_token
            .as_deref()
            .ok_or(ConfigError::MissingNotionToken)
    }

    pub fn siyuan_token(&self) -> Result<&str, ConfigError> {
        self.siyuan_token
            .as_deref()
            .ok_or(ConfigError::MissingSiyuanToken)
    }

    pub fn target_notebook(&self) -> Result<&str, ConfigError> {
        self.target_notebook_id
            .as_deref()
            .ok_or(ConfigError::MissingNotebook)
    }
}

fn parse_delay(value: &str) -> Result<Duration, ConfigError> {
    let secs: f64 = value.trim().parse().map_err(|_| ConfigError::Invalid {
        key: "DELAY_BETWEEN_CALLS",
        value: value.to_string(),
    })?;
    Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::Invalid {
        key: "DELAY_BETWEEN_CALLS",
        value: value.to_string(),
    })
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        }),
    }
}
