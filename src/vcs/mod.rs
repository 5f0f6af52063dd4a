use std::path::Path;
use std::process::{Command, Output};
use thiserror::Error;
use tracing::debug;

#[cfg(test)]
pub(crate) mod fake;

#[derive(Debug, Error)]
pub enum VcsError {
    #[error("not a git repository: {0}")]
    NotARepo(String),
    #[error("branch not found: {branch}")]
    BranchNotFound { branch: String },
    #[error("git command failed: {0}")]
    CommandFailed(String),
    #[error("invalid git ref: {0}")]
    InvalidRef(String),
    #[error("utf-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VcsError>;

/// Source of branch, commit and diff information for a repository.
///
/// `source` is the branch being merged from, `target` the branch merged into.
pub trait VcsProvider: Send + Sync {
    /// Branch names in the order the VCS lists them.
    fn list_branches(&self, repository: &str) -> Result<Vec<String>>;

    /// Commit a branch currently points at.
    fn resolve_commit(&self, repository: &str, branch: &str) -> Result<String>;

    /// Unified diff of `source` against `target`; empty when they match.
    fn diff(&self, repository: &str, source: &str, target: &str) -> Result<String>;

    /// Unified diff restricted to one path; empty when the path is unchanged.
    fn file_diff(
        &self,
        repository: &str,
        source: &str,
        target: &str,
        path: &str,
    ) -> Result<String>;
}

/// `VcsProvider` that shells out to the `git` binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitCli;

impl GitCli {
    fn run(&self, repository: &str, args: &[&str]) -> Result<Output> {
        debug!(repo = repository, ?args, "Running git");
        let output = Command::new("git")
            .arg("-C")
            .arg(repository)
            .args(args)
            .output()?;
        Ok(output)
    }

    fn run_checked(&self, repository: &str, what: &str, args: &[&str]) -> Result<String> {
        let output = self.run(repository, args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("not a git repository") {
                return Err(VcsError::NotARepo(repository.to_string()));
            }
            return Err(VcsError::CommandFailed(format!(
                "{} failed: {}",
                what,
                stderr.trim()
            )));
        }
        Ok(String::from_utf8(output.stdout)?)
    }
}

impl VcsProvider for GitCli {
    fn list_branches(&self, repository: &str) -> Result<Vec<String>> {
        let stdout = self.run_checked(
            repository,
            "git branch",
            &["branch", "--format=%(refname:short)"],
        )?;

        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn resolve_commit(&self, repository: &str, branch: &str) -> Result<String> {
        validate_git_ref(branch)?;

        let spec = format!("{}^{{commit}}", branch);
        let output = self.run(repository, &["rev-parse", "--verify", "--quiet", &spec])?;
        if !output.status.success() {
            return Err(VcsError::BranchNotFound {
                branch: branch.to_string(),
            });
        }

        Ok(String::from_utf8(output.stdout)?.trim().to_string())
    }

    fn diff(&self, repository: &str, source: &str, target: &str) -> Result<String> {
        validate_git_ref(source)?;
        validate_git_ref(target)?;

        let diff = self.run_checked(
            repository,
            "git diff",
            &["diff", "--no-color", target, source],
        )?;
        debug!(bytes = diff.len(), "Fetched diff");
        Ok(diff)
    }

    fn file_diff(
        &self,
        repository: &str,
        source: &str,
        target: &str,
        path: &str,
    ) -> Result<String> {
        validate_git_ref(source)?;
        validate_git_ref(target)?;

        self.run_checked(
            repository,
            "git diff",
            &["diff", "--no-color", target, source, "--", path],
        )
    }
}

/// A directory is treated as a repository when it has a `.git` entry.
pub fn is_valid_repo(path: &Path) -> bool {
    path.join(".git").exists()
}

/// Reject refs git would read as an option.
///
/// Anything else is left to `git rev-parse --verify`, so every branch name
/// git accepts resolves.
pub fn validate_git_ref(ref_str: &str) -> Result<()> {
    if ref_str.is_empty() {
        return Err(VcsError::InvalidRef("Empty git ref".to_string()));
    }

    if ref_str.starts_with('-') {
        return Err(VcsError::InvalidRef(format!(
            "git ref may not start with '-': {}",
            ref_str
        )));
    }

    if ref_str.chars().any(char::is_control) {
        return Err(VcsError::InvalidRef(format!(
            "git ref may not contain control characters: {:?}",
            ref_str
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Create a repository with `main` and a `feature` branch that changes two files.
    fn init_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let git = |args: &[&str]| {
            let status = Command::new("git")
                .arg("-C")
                .arg(dir.path())
                .args([
                    "-c",
                    "user.name=Test",
                    "-c",
                    "user.email=test@example.com",
                    "-c",
                    "commit.gpgsign=false",
                ])
                .args(args)
                .output()
                .unwrap();
            assert!(status.status.success(), "git {:?} failed", args);
        };

        git(&["init", "-q"]);
        git(&["symbolic-ref", "HEAD", "refs/heads/main"]);
        std::fs::write(dir.path().join("file1.txt"), "one\n").unwrap();
        git(&["add", "."]);
        git(&["commit", "-q", "-m", "initial"]);
        git(&["checkout", "-q", "-b", "feature"]);
        std::fs::write(dir.path().join("file1.txt"), "one changed\n").unwrap();
        std::fs::write(dir.path().join("file2.txt"), "two\n").unwrap();
        git(&["add", "."]);
        git(&["commit", "-q", "-m", "feature work"]);
        dir
    }

    #[test]
    fn test_validate_git_ref_valid() {
        assert!(validate_git_ref("main").is_ok());
        assert!(validate_git_ref("feature/foo").is_ok());
        assert!(validate_git_ref("HEAD~1").is_ok());
        assert!(validate_git_ref("v1.2.3").is_ok());
        assert!(validate_git_ref("origin/main").is_ok());
        assert!(validate_git_ref("@{-1}").is_ok());
        assert!(validate_git_ref("fix+1").is_ok());
        assert!(validate_git_ref("issue#42").is_ok());
        assert!(validate_git_ref("a,b=c%d!").is_ok());
    }

    #[test]
    fn test_validate_git_ref_invalid() {
        assert!(validate_git_ref("--output=/tmp/x").is_err());
        assert!(validate_git_ref("-b").is_err());
        assert!(validate_git_ref("foo\nbar").is_err());
        assert!(validate_git_ref("").is_err());
    }

    #[test]
    fn test_is_valid_repo() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_valid_repo(dir.path()));
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        assert!(is_valid_repo(dir.path()));
    }

    #[test]
    fn test_list_branches() {
        let repo = init_repo();
        let branches = GitCli
            .list_branches(repo.path().to_str().unwrap())
            .unwrap();
        assert!(branches.contains(&"main".to_string()));
        assert!(branches.contains(&"feature".to_string()));
    }

    #[test]
    fn test_resolve_commit() {
        let repo = init_repo();
        let path = repo.path().to_str().unwrap();
        let sha = GitCli.resolve_commit(path, "feature").unwrap();
        assert_eq!(sha.len(), 40);
        assert!(sha.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(sha, GitCli.resolve_commit(path, "main").unwrap());
    }

    #[test]
    fn test_resolve_unknown_branch() {
        let repo = init_repo();
        let err = GitCli
            .resolve_commit(repo.path().to_str().unwrap(), "nope")
            .unwrap_err();
        assert!(matches!(err, VcsError::BranchNotFound { branch } if branch == "nope"));
    }

    #[test]
    fn test_resolve_branch_with_punctuation() {
        let repo = init_repo();
        let path = repo.path().to_str().unwrap();
        let status = Command::new("git")
            .args(["-C", path, "branch", "fix+1", "feature"])
            .status()
            .unwrap();
        assert!(status.success());

        let branches = GitCli.list_branches(path).unwrap();
        assert!(branches.contains(&"fix+1".to_string()));
        assert_eq!(
            GitCli.resolve_commit(path, "fix+1").unwrap(),
            GitCli.resolve_commit(path, "feature").unwrap()
        );
        assert!(!GitCli.diff(path, "fix+1", "main").unwrap().is_empty());
    }

    #[test]
    fn test_diff_and_file_diff() {
        let repo = init_repo();
        let path = repo.path().to_str().unwrap();

        let diff = GitCli.diff(path, "feature", "main").unwrap();
        assert!(diff.contains("diff --git a/file1.txt b/file1.txt"));
        assert!(diff.contains("diff --git a/file2.txt b/file2.txt"));

        let file = GitCli.file_diff(path, "feature", "main", "file2.txt").unwrap();
        assert!(file.contains("+two"));
        assert!(!file.contains("file1.txt"));

        assert!(GitCli.diff(path, "main", "main").unwrap().is_empty());
    }

    #[test]
    fn test_diff_outside_repo_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = GitCli
            .diff(dir.path().to_str().unwrap(), "feature", "main")
            .unwrap_err();
        assert!(matches!(err, VcsError::NotARepo(_)));
    }
}
