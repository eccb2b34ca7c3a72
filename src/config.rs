//! Configuration loading and management.

use crate::tree::filters::DEFAULT_FOCUS_WINDOW_DAYS;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Project-local configuration file.
pub const PROJECT_CONFIG_PATH: &str = ".gtd-board/config.yaml";

pub const ENV_DB_PATH: &str = "GTD_BOARD_DB_PATH";
pub const ENV_FOCUS_DAYS: &str = "GTD_BOARD_FOCUS_DAYS";

/// Board configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub board: BoardConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from(".gtd-board/tasks.db")
}

/// View configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Days ahead (today inclusive) a due date pulls a task into Focus.
    #[serde(default = "default_focus_window_days")]
    pub focus_window_days: i64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            focus_window_days: default_focus_window_days(),
        }
    }
}

fn default_focus_window_days() -> i64 {
    DEFAULT_FOCUS_WINDOW_DAYS
}

impl Config {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Load from the first config file found, then apply environment
    /// overrides.
    ///
    /// An explicit path must exist. Otherwise `.gtd-board/config.yaml` and the
    /// user config directory are tried before falling back to defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => Self::candidate_paths()
                .into_iter()
                .find(|p| p.is_file())
                .map(|p| {
                    debug!(path = %p.display(), "Using config file");
                    Self::load(p)
                })
                .transpose()?
                .unwrap_or_default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(PROJECT_CONFIG_PATH)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("gtd-board").join("config.yaml"));
        }
        paths
    }

    /// Override fields from environment variables. Unparseable values are
    /// ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db_path) = lookup(ENV_DB_PATH) {
            self.server.db_path = PathBuf::from(db_path);
        }

        if let Some(days) = lookup(ENV_FOCUS_DAYS).and_then(|d| d.parse().ok()) {
            self.board.focus_window_days = days;
        }
    }

    /// Ensure the database directory exists.
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.server.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}
