use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::Decision;
use crate::ledger::RangeToken;

#[derive(Parser, Debug)]
#[command(
    name = "diffty",
    version,
    about = "File-level review tracking for branch comparisons"
)]
pub struct Cli {
    /// Storage root for ledgers, the repository registry and config.yml.
    /// Defaults to ~/.diffty.
    #[arg(long, global = true, env = "DIFFTY_HOME")]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage the known repositories.
    Repo {
        #[command(subcommand)]
        action: RepoAction,
    },
    /// List branches and the default comparison.
    Branches {
        /// Registered repository path.
        repo: String,
    },
    /// Print the ordered file list with review status.
    Status(CompareArgs),
    /// Print the diff of one file.
    Diff(FileArgs),
    /// Record a decision for a file and print the next file to review.
    Decide(DecideArgs),
    /// Open the interactive review TUI.
    Review(CompareArgs),
}

#[derive(Subcommand, Debug)]
pub enum RepoAction {
    /// Register a git repository.
    Add {
        /// Path to the repository (must contain .git).
        path: PathBuf,
    },
    /// List registered repositories.
    List,
}

#[derive(Args, Debug)]
pub struct BranchArgs {
    /// Branch being merged. Defaults to the second listed branch.
    #[arg(long)]
    pub source: Option<String>,

    /// Branch merged into. Defaults to the first listed branch.
    #[arg(long)]
    pub target: Option<String>,
}

#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Registered repository path.
    pub repo: String,

    #[command(flatten)]
    pub branches: BranchArgs,
}

#[derive(Args, Debug)]
pub struct FileArgs {
    /// Registered repository path.
    pub repo: String,

    /// File path as it appears in the diff.
    pub file: String,

    #[command(flatten)]
    pub branches: BranchArgs,
}

#[derive(Args, Debug)]
pub struct DecideArgs {
    /// Registered repository path.
    pub repo: String,

    /// File path as it appears in the diff.
    pub file: String,

    /// approved, rejected or skipped.
    pub decision: Decision,

    /// Apply the decision to a line or range ("12", "3-7") instead of the whole file.
    #[arg(long)]
    pub lines: Option<RangeToken>,

    #[command(flatten)]
    pub branches: BranchArgs,
}

/// Parse CLI arguments.
pub fn parse_args() -> Cli {
    Cli::parse()
}
