pub mod aggregate;
pub mod cli;
pub mod config;
pub mod highlight;
pub mod ledger;
pub mod navigation;
pub mod parser;
pub mod review;
pub mod store;
pub mod tui;
pub mod vcs;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A reviewer's verdict on a file or a range of lines within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Rejected,
    Skipped,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Approved => "approved",
            Decision::Rejected => "rejected",
            Decision::Skipped => "skipped",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(Decision::Approved),
            "rejected" => Ok(Decision::Rejected),
            "skipped" => Ok(Decision::Skipped),
            other => Err(format!("invalid decision: {other}")),
        }
    }
}

/// Display status of a changed file, derived on every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileStatus {
    Unreviewed,
    Approved,
    Rejected,
    Skipped,
    /// More than one distinct decision across the file's ranges.
    Mixed,
}

impl FileStatus {
    /// Sort rank for display and navigation. Lower ranks are surfaced first.
    ///
    /// `Mixed` sits between `Rejected` and `Approved`.
    pub fn priority(self) -> u8 {
        match self {
            FileStatus::Unreviewed => 0,
            FileStatus::Skipped => 1,
            FileStatus::Rejected => 2,
            FileStatus::Mixed => 3,
            FileStatus::Approved => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileStatus::Unreviewed => "unreviewed",
            FileStatus::Approved => "approved",
            FileStatus::Rejected => "rejected",
            FileStatus::Skipped => "skipped",
            FileStatus::Mixed => "mixed",
        }
    }
}

impl From<Decision> for FileStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Approved => FileStatus::Approved,
            Decision::Rejected => FileStatus::Rejected,
            Decision::Skipped => FileStatus::Skipped,
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file from the current diff annotated with its review status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFile {
    pub path: String,
    pub status: FileStatus,
}

/// Review progress summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewProgress {
    pub total_files: usize,
    pub unreviewed: usize,
    pub approved: usize,
    pub rejected: usize,
    pub skipped: usize,
    pub mixed: usize,
}

impl ReviewProgress {
    /// Tally the statuses of an aggregated file list.
    pub fn from_files(files: &[ChangedFile]) -> Self {
        let mut progress = ReviewProgress {
            total_files: files.len(),
            ..Default::default()
        };
        for file in files {
            match file.status {
                FileStatus::Unreviewed => progress.unreviewed += 1,
                FileStatus::Approved => progress.approved += 1,
                FileStatus::Rejected => progress.rejected += 1,
                FileStatus::Skipped => progress.skipped += 1,
                FileStatus::Mixed => progress.mixed += 1,
            }
        }
        progress
    }

    /// Files carrying any decision at all.
    pub fn reviewed(&self) -> usize {
        self.total_files - self.unreviewed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_parses_only_known_literals() {
        assert_eq!("approved".parse::<Decision>(), Ok(Decision::Approved));
        assert_eq!("rejected".parse::<Decision>(), Ok(Decision::Rejected));
        assert_eq!("skipped".parse::<Decision>(), Ok(Decision::Skipped));
        assert!("Approved".parse::<Decision>().is_err());
        assert!("mixed".parse::<Decision>().is_err());
        assert!("".parse::<Decision>().is_err());
    }

    #[test]
    fn decision_serializes_lowercase() {
        let json = serde_json::to_string(&Decision::Skipped).unwrap();
        assert_eq!(json, "\"skipped\"");
        assert!(serde_json::from_str::<Decision>("\"unreviewed\"").is_err());
    }

    #[test]
    fn priority_surfaces_unreviewed_first() {
        let mut statuses = vec![
            FileStatus::Approved,
            FileStatus::Mixed,
            FileStatus::Rejected,
            FileStatus::Skipped,
            FileStatus::Unreviewed,
        ];
        statuses.sort_by_key(|s| s.priority());
        assert_eq!(
            statuses,
            vec![
                FileStatus::Unreviewed,
                FileStatus::Skipped,
                FileStatus::Rejected,
                FileStatus::Mixed,
                FileStatus::Approved,
            ]
        );
    }

    #[test]
    fn progress_counts_each_status() {
        let files = vec![
            ChangedFile {
                path: "a".into(),
                status: FileStatus::Unreviewed,
            },
            ChangedFile {
                path: "b".into(),
                status: FileStatus::Approved,
            },
            ChangedFile {
                path: "c".into(),
                status: FileStatus::Approved,
            },
            ChangedFile {
                path: "d".into(),
                status: FileStatus::Mixed,
            },
        ];
        let progress = ReviewProgress::from_files(&files);
        assert_eq!(progress.total_files, 4);
        assert_eq!(progress.unreviewed, 1);
        assert_eq!(progress.approved, 2);
        assert_eq!(progress.mixed, 1);
        assert_eq!(progress.reviewed(), 3);
    }
}
