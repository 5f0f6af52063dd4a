pub mod json;
pub mod memory;
pub mod sqlite;

pub use json::JsonLedgerStore;
pub use memory::MemoryLedgerStore;
pub use sqlite::SqliteLedgerStore;

use crate::ledger::{Comparison, ReviewLedger};
use std::collections::HashMap;
use std::path::{MAIN_SEPARATOR, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// File name of a persisted ledger inside its commit-pair directory.
pub const LEDGER_FILE_NAME: &str = "review-state.json";

/// File name of the known-repositories registry under the storage root.
pub const REPOSITORIES_FILE_NAME: &str = "repositories.json";

/// Errors that can occur while loading or saving review state.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("source and target commit hashes are required")]
    Validation,
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt review state at {path}: {source}")]
    Integrity {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode review state: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("ledger lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Storage identity of a ledger: repository token plus commit pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LedgerKey {
    pub repository_token: String,
    pub source_commit: String,
    pub target_commit: String,
}

impl LedgerKey {
    pub fn new(repository: &str, source_commit: &str, target_commit: &str) -> Self {
        Self {
            repository_token: repository_token(repository),
            source_commit: source_commit.to_string(),
            target_commit: target_commit.to_string(),
        }
    }

    pub fn for_comparison(comparison: &Comparison) -> Self {
        Self::new(
            &comparison.repository,
            &comparison.source_commit,
            &comparison.target_commit,
        )
    }

    /// Location of the ledger relative to the storage root:
    /// `<repo-token>/<source-commit>/<target-commit>/review-state.json`.
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(&self.repository_token)
            .join(&self.source_commit)
            .join(&self.target_commit)
            .join(LEDGER_FILE_NAME)
    }
}

/// Path-safe form of a repository identifier: path separators and colons
/// become underscores.
pub fn repository_token(repository: &str) -> String {
    repository
        .chars()
        .map(|c| if c == MAIN_SEPARATOR || c == ':' { '_' } else { c })
        .collect()
}

/// Durable persistence for review ledgers and the known-repositories registry.
pub trait LedgerStore: Send + Sync {
    /// Load the ledger for a comparison.
    ///
    /// Never fails on absence: an unknown key, or a comparison without both
    /// commits, yields an empty ledger carrying the comparison's metadata.
    fn load(&self, comparison: &Comparison) -> Result<ReviewLedger>;

    /// Persist the full ledger under its commit-pair key.
    ///
    /// Fails with [`StoreError::Validation`] when either commit is empty.
    fn save(&self, ledger: &ReviewLedger) -> Result<()>;

    fn load_repositories(&self) -> Result<Vec<String>>;

    fn save_repositories(&self, repositories: &[String]) -> Result<()>;
}

/// Per-key mutual exclusion for load-modify-save cycles.
///
/// Each ledger key gets its own mutex; unrelated ledgers never contend.
#[derive(Debug, Default)]
pub struct LedgerLocks {
    locks: Mutex<HashMap<LedgerKey, Arc<Mutex<()>>>>,
}

impl LedgerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the lock guarding `key`, creating it on first use.
    pub fn lock_for(&self, key: &LedgerKey) -> Result<Arc<Mutex<()>>> {
        let mut locks = self.locks.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(Arc::clone(locks.entry(key.clone()).or_default()))
    }

    /// Run `f` while holding the lock for `key`.
    pub fn with_lock<T, E>(
        &self,
        key: &LedgerKey,
        f: impl FnOnce() -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        E: From<StoreError>,
    {
        let lock = self.lock_for(key)?;
        let result = {
            let _guard = lock.lock().map_err(|_| StoreError::LockPoisoned)?;
            f()
        };
        self.release(key, &lock);
        result
    }

    /// Drop the table entry for `key` once `lock` is its only outside holder.
    fn release(&self, key: &LedgerKey, lock: &Arc<Mutex<()>>) {
        let Ok(mut locks) = self.locks.lock() else {
            return;
        };
        // One reference in the table, one held by the caller.
        if Arc::strong_count(lock) == 2 {
            locks.remove(key);
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or(0)
    }
}
