use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::aggregate::{aggregate, file_status};
use crate::ledger::{Comparison, RangeToken, ReviewLedger};
use crate::navigation::{NavigationIndex, Neighbors};
use crate::parser::{LineCounts, count_changed_lines, parse_changed_files};
use crate::store::{LedgerKey, LedgerLocks, LedgerStore, StoreError};
use crate::vcs::{VcsError, VcsProvider, is_valid_repo};
use crate::{ChangedFile, Decision, FileStatus, ReviewProgress};

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error(transparent)]
    Vcs(#[from] VcsError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("repository not registered: {0}")]
    UnknownRepository(String),
    #[error("not a git repository: {}", .0.display())]
    NotARepository(PathBuf),
    #[error("repository has no branches: {0}")]
    NoBranches(String),
    #[error("invalid exclude pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

pub type Result<T> = std::result::Result<T, ReviewError>;

/// Branches picked when the caller does not name them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchChoice {
    pub branches: Vec<String>,
    pub source: String,
    pub target: String,
}

/// Everything needed to render the file list of one comparison.
#[derive(Debug, Clone)]
pub struct ComparisonView {
    pub comparison: Comparison,
    pub files: Vec<ChangedFile>,
    pub navigation: NavigationIndex,
    pub progress: ReviewProgress,
    /// The two commits have no differences at all.
    pub no_diff: bool,
}

impl ComparisonView {
    /// Status of a listed file; unlisted files are unreviewed.
    pub fn status_of(&self, path: &str) -> FileStatus {
        self.files
            .iter()
            .find(|f| f.path == path)
            .map(|f| f.status)
            .unwrap_or(FileStatus::Unreviewed)
    }
}

/// A single file of a comparison, ready for display.
#[derive(Debug, Clone)]
pub struct FileView {
    pub path: String,
    pub diff: String,
    pub status: FileStatus,
    pub neighbors: Neighbors,
    pub counts: LineCounts,
}

/// Request-scoped review operations over a VCS and a ledger store.
///
/// Nothing is cached between calls: each view re-reads the diff and reloads
/// the ledger.
pub struct ReviewService<V: VcsProvider> {
    store: Box<dyn LedgerStore>,
    vcs: V,
    locks: LedgerLocks,
    exclude: Vec<glob::Pattern>,
}

impl<V: VcsProvider> ReviewService<V> {
    pub fn new(store: Box<dyn LedgerStore>, vcs: V) -> Self {
        Self {
            store,
            vcs,
            locks: LedgerLocks::new(),
            exclude: Vec::new(),
        }
    }

    /// Hide changed files matching any of the glob patterns from views.
    pub fn with_exclude_patterns(mut self, patterns: &[String]) -> Result<Self> {
        self.exclude = patterns
            .iter()
            .map(|p| glob::Pattern::new(p))
            .collect::<std::result::Result<_, _>>()?;
        Ok(self)
    }

    fn is_excluded(&self, path: &str) -> bool {
        self.exclude.iter().any(|p| p.matches(path))
    }

    /// Register a repository by its absolute path.
    ///
    /// Adding an already registered repository is a no-op.
    pub fn add_repository(&self, path: &Path) -> Result<String> {
        let absolute = clean_absolute(path).map_err(|source| StoreError::Storage {
            path: path.to_path_buf(),
            source,
        })?;

        if !is_valid_repo(&absolute) {
            return Err(ReviewError::NotARepository(absolute));
        }

        let identifier = absolute.to_string_lossy().into_owned();
        let mut repositories = self.store.load_repositories()?;
        if repositories.contains(&identifier) {
            debug!(repo = %identifier, "Repository already registered");
            return Ok(identifier);
        }

        repositories.push(identifier.clone());
        self.store.save_repositories(&repositories)?;
        info!(repo = %identifier, "Registered repository");
        Ok(identifier)
    }

    pub fn repositories(&self) -> Result<Vec<String>> {
        Ok(self.store.load_repositories()?)
    }

    /// Resolve a user-supplied path to a registered repository identifier.
    pub fn repository(&self, path: &str) -> Result<String> {
        let repositories = self.store.load_repositories()?;
        if repositories.iter().any(|r| r == path) {
            return Ok(path.to_string());
        }

        if let Ok(absolute) = clean_absolute(Path::new(path)) {
            let absolute = absolute.to_string_lossy();
            if let Some(found) = repositories.iter().find(|r| **r == absolute) {
                return Ok(found.clone());
            }
        }

        Err(ReviewError::UnknownRepository(path.to_string()))
    }

    /// List branches and pick the default source and target.
    ///
    /// The first listed branch is the target; the second, or the first when
    /// it is the only one, is the source.
    pub fn branches(&self, repository: &str) -> Result<BranchChoice> {
        let branches = self.vcs.list_branches(repository)?;
        let target = branches
            .first()
            .cloned()
            .ok_or_else(|| ReviewError::NoBranches(repository.to_string()))?;
        let source = branches.get(1).cloned().unwrap_or_else(|| target.clone());

        Ok(BranchChoice {
            branches,
            source,
            target,
        })
    }

    /// Pin a comparison to the commits its branches currently point at.
    pub fn comparison(
        &self,
        repository: &str,
        source: Option<&str>,
        target: Option<&str>,
    ) -> Result<Comparison> {
        let (source, target) = match (source, target) {
            (Some(s), Some(t)) => (s.to_string(), t.to_string()),
            (source, target) => {
                let choice = self.branches(repository)?;
                (
                    source.map(str::to_string).unwrap_or(choice.source),
                    target.map(str::to_string).unwrap_or(choice.target),
                )
            }
        };

        let source_commit = self.vcs.resolve_commit(repository, &source)?;
        let target_commit = self.vcs.resolve_commit(repository, &target)?;

        Ok(Comparison {
            repository: repository.to_string(),
            source_branch: source,
            target_branch: target,
            source_commit,
            target_commit,
        })
    }

    /// Build the ordered, status-annotated file list for a comparison.
    pub fn open_comparison(&self, comparison: &Comparison) -> Result<ComparisonView> {
        let ledger = self.store.load(comparison)?;
        let diff = self.vcs.diff(
            &comparison.repository,
            &comparison.source_commit,
            &comparison.target_commit,
        )?;

        let paths: Vec<String> = parse_changed_files(&diff)
            .into_iter()
            .filter(|path| !self.is_excluded(path))
            .collect();
        let files = aggregate(&paths, &ledger);
        let navigation = NavigationIndex::new(&files);
        let progress = ReviewProgress::from_files(&files);

        debug!(
            repo = %comparison.repository,
            source = %comparison.source_branch,
            target = %comparison.target_branch,
            files = files.len(),
            "Opened comparison"
        );

        Ok(ComparisonView {
            comparison: comparison.clone(),
            files,
            navigation,
            progress,
            no_diff: diff.is_empty(),
        })
    }

    /// Diff and status of one file within an opened comparison.
    pub fn open_file(&self, view: &ComparisonView, path: &str) -> Result<FileView> {
        let comparison = &view.comparison;
        let diff = self.vcs.file_diff(
            &comparison.repository,
            &comparison.source_commit,
            &comparison.target_commit,
            path,
        )?;

        let status = if view.navigation.position(path).is_some() {
            view.status_of(path)
        } else {
            let ledger = self.store.load(comparison)?;
            file_status(ledger.file_review(&comparison.repository, path))
        };

        Ok(FileView {
            path: path.to_string(),
            counts: count_changed_lines(&diff),
            diff,
            status,
            neighbors: view.navigation.neighbors(path),
        })
    }

    /// Record a whole-file decision and return the path to show next.
    pub fn record_decision(
        &self,
        view: &ComparisonView,
        path: &str,
        decision: Decision,
    ) -> Result<String> {
        self.record_range(view, path, RangeToken::All, decision)
    }

    /// Record a decision for a range of lines and return the path to show next.
    ///
    /// The next path is the file after `path` in the view's ordering, or
    /// `path` itself when it is the last one.
    pub fn record_range(
        &self,
        view: &ComparisonView,
        path: &str,
        token: RangeToken,
        decision: Decision,
    ) -> Result<String> {
        let comparison = &view.comparison;
        let key = LedgerKey::for_comparison(comparison);

        self.locks.with_lock(&key, || {
            let mut ledger = self.load_for_update(comparison)?;
            ledger.record_range(&comparison.repository, path, token, decision);
            self.store.save(&ledger)?;
            Ok::<_, ReviewError>(())
        })?;

        info!(
            repo = %comparison.repository,
            path,
            %token,
            %decision,
            "Recorded decision"
        );

        Ok(view.navigation.next(path).unwrap_or(path).to_string())
    }

    fn load_for_update(&self, comparison: &Comparison) -> Result<ReviewLedger> {
        let ledger = self.store.load(comparison)?;
        if ledger.source_branch != comparison.source_branch
            || ledger.target_branch != comparison.target_branch
        {
            warn!(
                repo = %comparison.repository,
                stored_source = %ledger.source_branch,
                stored_target = %ledger.target_branch,
                "Stored ledger was recorded under different branch names"
            );
        }
        Ok(ledger)
    }
}

/// Absolute path with `.` dropped, `..` folded and trailing separators removed.
///
/// Purely lexical; symlinks are not resolved.
fn clean_absolute(path: &Path) -> std::io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut clean = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                clean.pop();
            }
            other => clean.push(other),
        }
    }
    Ok(clean)
}
