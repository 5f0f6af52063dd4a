use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{LedgerKey, LedgerStore, Result, StoreError};
use crate::ledger::{Comparison, ReviewLedger};

/// In-process ledger store with the same contract as the on-disk stores.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    ledgers: Mutex<HashMap<LedgerKey, ReviewLedger>>,
    repositories: Mutex<Vec<String>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of persisted ledgers.
    pub fn len(&self) -> usize {
        self.ledgers.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ledgers(&self) -> Result<MutexGuard<'_, HashMap<LedgerKey, ReviewLedger>>> {
        self.ledgers.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn load(&self, comparison: &Comparison) -> Result<ReviewLedger> {
        if !comparison.is_pinned() {
            return Ok(ReviewLedger::empty(comparison));
        }

        let key = LedgerKey::for_comparison(comparison);
        let ledger = self
            .ledgers()?
            .get(&key)
            .cloned()
            .map(|mut ledger| {
                ledger.repository = comparison.repository.clone();
                ledger
            })
            .unwrap_or_else(|| ReviewLedger::empty(comparison));
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
        self.ledgers()?.insert(key, ledger.clone());
        Ok(())
    }

    fn load_repositories(&self) -> Result<Vec<String>> {
        self.repositories
            .lock()
            .map(|repos| repos.clone())
            .map_err(|_| StoreError::LockPoisoned)
    }

    fn save_repositories(&self, repositories: &[String]) -> Result<()> {
        let mut repos = self
            .repositories
            .lock()
            .map_err(|_| StoreError::LockPoisoned)?;
        *repos = repositories.to_vec();
        Ok(())
    }
}
