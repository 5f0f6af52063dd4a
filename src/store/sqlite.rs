use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};

use super::{LedgerKey, LedgerStore, Result, StoreError};
use crate::ledger::{Comparison, ReviewLedger};

/// SQLite-backed ledger store.
///
/// Keeps the same JSON ledger document as the file store, one row per
/// (repository token, source commit, target commit).
pub struct SqliteLedgerStore {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl SqliteLedgerStore {
    /// Open or create the database at the given path.
    ///
    /// Creates the necessary tables if they don't exist.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Storage {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS ledgers (
                repo_token TEXT NOT NULL,
                source_commit TEXT NOT NULL,
                target_commit TEXT NOT NULL,
                document TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (repo_token, source_commit, target_commit)
            );
            CREATE TABLE IF NOT EXISTS repositories (
                position INTEGER NOT NULL,
                path TEXT NOT NULL PRIMARY KEY
            );",
        )?;

        info!(path = %path.display(), "Opened SQLite ledger store");

        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

impl LedgerStore for SqliteLedgerStore {
    fn load(&self, comparison: &Comparison) -> Result<ReviewLedger> {
        if !comparison.is_pinned() {
            return Ok(ReviewLedger::empty(comparison));
        }

        let key = LedgerKey::for_comparison(comparison);
        let document: Option<String> = self
            .conn()?
            .query_row(
                "SELECT document FROM ledgers
                 WHERE repo_token = ?1 AND source_commit = ?2 AND target_commit = ?3",
                params![key.repository_token, key.source_commit, key.target_commit],
                |row| row.get(0),
            )
            .optional()?;

        let Some(document) = document else {
            debug!(repo = %comparison.repository, "No ledger row, starting empty");
            return Ok(ReviewLedger::empty(comparison));
        };

        let mut ledger: ReviewLedger =
            serde_json::from_str(&document).map_err(|source| StoreError::Integrity {
                path: self.path.clone(),
                source,
            })?;
        ledger.repository = comparison.repository.clone();
        Ok(ledger)
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
        let document = serde_json::to_string_pretty(ledger).map_err(StoreError::Encode)?;

        self.conn()?.execute(
            "INSERT INTO ledgers (repo_token, source_commit, target_commit, document, updated_at)
             VALUES (?1, ?2, ?3, ?4, datetime('now'))
             ON CONFLICT(repo_token, source_commit, target_commit)
             DO UPDATE SET document = ?4, updated_at = datetime('now')",
            params![
                key.repository_token,
                key.source_commit,
                key.target_commit,
                document
            ],
        )?;

        debug!(repo = %ledger.repository, "Saved ledger row");
        Ok(())
    }

    fn load_repositories(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT path FROM repositories ORDER BY position")?;
        let repos = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(repos)
    }

    fn save_repositories(&self, repositories: &[String]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM repositories", [])?;
        for (position, path) in repositories.iter().enumerate() {
            tx.execute(
                "INSERT OR IGNORE INTO repositories (position, path) VALUES (?1, ?2)",
                params![position as i64, path],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}
