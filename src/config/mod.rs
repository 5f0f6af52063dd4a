use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::highlight::DEFAULT_THEME;
use crate::store::{JsonLedgerStore, LedgerStore, SqliteLedgerStore};

/// Directory name of the default storage root, under the home directory.
pub const DEFAULT_DIR_NAME: &str = ".diffty";

/// Config file name inside the storage root.
pub const CONFIG_FILE_NAME: &str = "config.yml";

/// Database file used by the SQLite backend.
pub const SQLITE_FILE_NAME: &str = "ledgers.db";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage_root: PathBuf,
    pub backend: StoreBackend,
    pub review: ReviewConfig,
    pub ui: UiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_root: default_storage_root(),
            backend: StoreBackend::default(),
            review: ReviewConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

/// Persistence backend for ledgers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Json,
    Sqlite,
}

/// Which changed files show up in review lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    pub exclude_patterns: Vec<String>,
}

/// Terminal UI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub theme: String,
    pub tab_width: usize,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            theme: DEFAULT_THEME.to_string(),
            tab_width: 4,
        }
    }
}

/// `~/.diffty`, or `./.diffty` when no home directory is known.
pub fn default_storage_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}

impl Config {
    /// Load `config.yml` from a storage root, falling back to defaults.
    ///
    /// The root the file was found under always wins over any
    /// `storage_root` written inside it.
    pub fn load(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let path = root.join(CONFIG_FILE_NAME);

        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self {
                storage_root: root.to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.storage_root = root.to_path_buf();

        info!(path = %path.display(), "Loaded configuration");

        Ok(config)
    }

    /// Open the configured ledger store.
    pub fn open_store(&self) -> Result<Box<dyn LedgerStore>> {
        match self.backend {
            StoreBackend::Json => {
                let store = JsonLedgerStore::open(&self.storage_root)
                    .context("Failed to open JSON ledger store")?;
                Ok(Box::new(store))
            }
            StoreBackend::Sqlite => {
                let store = SqliteLedgerStore::open(&self.storage_root.join(SQLITE_FILE_NAME))
                    .context("Failed to open SQLite ledger store")?;
                Ok(Box::new(store))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.backend, StoreBackend::Json);
        assert!(config.review.exclude_patterns.is_empty());
        assert_eq!(config.ui.theme, "base16-ocean.dark");
        assert!(config.storage_root.ends_with(DEFAULT_DIR_NAME));
    }

    #[test]
    fn test_missing_file_uses_root() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.storage_root, dir.path());
        assert_eq!(config.backend, StoreBackend::Json);
    }

    #[test]
    fn test_parse_yaml() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"
backend: sqlite
storage_root: /ignored
review:
  exclude_patterns:
    - "**/*.lock"
    - "vendor/**"
ui:
  theme: InspiredGitHub
"#,
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.backend, StoreBackend::Sqlite);
        assert_eq!(config.storage_root, dir.path());
        assert_eq!(config.review.exclude_patterns.len(), 2);
        assert_eq!(config.ui.theme, "InspiredGitHub");
        assert_eq!(config.ui.tab_width, 4);
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "backend: [nope").unwrap();
        assert!(Config::load(dir.path()).is_err());
    }

    #[test]
    fn test_open_store_backends() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        let store = config.open_store().unwrap();
        assert!(store.load_repositories().unwrap().is_empty());

        let config = Config {
            backend: StoreBackend::Sqlite,
            ..config
        };
        let _store = config.open_store().unwrap();
        assert!(dir.path().join(SQLITE_FILE_NAME).exists());
    }
}
