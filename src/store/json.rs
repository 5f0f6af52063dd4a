use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::{LedgerKey, LedgerStore, REPOSITORIES_FILE_NAME, Result, StoreError};
use crate::ledger::{Comparison, ReviewLedger};

/// Ledger store backed by one JSON document per commit pair.
///
/// Layout under the root:
/// `<repo-token>/<source-commit>/<target-commit>/review-state.json` for ledgers
/// and `repositories.json` for the registry.
#[derive(Debug, Clone)]
pub struct JsonLedgerStore {
    root: PathBuf,
}

impl JsonLedgerStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|source| StoreError::Storage {
            path: root.clone(),
            source,
        })?;

        info!(path = %root.display(), "Opened JSON ledger store");

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of the ledger for `key`.
    pub fn ledger_path(&self, key: &LedgerKey) -> PathBuf {
        self.root.join(key.relative_path())
    }

    fn repositories_path(&self) -> PathBuf {
        self.root.join(REPOSITORIES_FILE_NAME)
    }

    fn write_document(&self, path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Storage {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, content).map_err(|source| StoreError::Storage {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Read and decode a JSON document, treating a missing file as `None`.
fn read_document<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Storage {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| StoreError::Integrity {
            path: path.to_path_buf(),
            source,
        })
}

impl LedgerStore for JsonLedgerStore {
    fn load(&self, comparison: &Comparison) -> Result<ReviewLedger> {
        if !comparison.is_pinned() {
            debug!(repo = %comparison.repository, "Comparison not pinned to commits, using empty ledger");
            return Ok(ReviewLedger::empty(comparison));
        }

        let path = self.ledger_path(&LedgerKey::for_comparison(comparison));
        match read_document::<ReviewLedger>(&path)? {
            Some(mut ledger) => {
                ledger.repository = comparison.repository.clone();
                debug!(
                    path = %path.display(),
                    files = ledger.file_reviews.len(),
                    "Loaded ledger"
                );
                Ok(ledger)
            }
            None => {
                debug!(path = %path.display(), "No ledger on disk, starting empty");
                Ok(ReviewLedger::empty(comparison))
            }
        }
    }

    fn save(&self, ledger: &ReviewLedger) -> Result<()> {
        if !ledger.is_pinned() {
            return Err(StoreError::Validation);
        }

        let key = LedgerKey::new(
            &ledger.repository,
            &ledger.source_commit,
            &ledger.target_commit,
        );
        let path = self.ledger_path(&key);
        let content = serde_json::to_string_pretty(ledger).map_err(StoreError::Encode)?;
        self.write_document(&path, &content)?;

        debug!(path = %path.display(), "Saved ledger");

        Ok(())
    }

    fn load_repositories(&self) -> Result<Vec<String>> {
        let repositories: Option<Option<Vec<String>>> = read_document(&self.repositories_path())?;
        Ok(repositories.flatten().unwrap_or_default())
    }

    fn save_repositories(&self, repositories: &[String]) -> Result<()> {
        let content = serde_json::to_string_pretty(repositories).map_err(StoreError::Encode)?;
        self.write_document(&self.repositories_path(), &content)
    }
}
