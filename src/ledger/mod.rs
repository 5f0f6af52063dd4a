use crate::Decision;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Range token meaning "the whole file".
pub const ALL_LINES: &str = "all";

/// The portion of a file a decision applies to.
///
/// Stored as a string key: `"12"`, `"3-7"` (inclusive) or `"all"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RangeToken {
    Line(u32),
    Span { start: u32, end: u32 },
    All,
}

impl fmt::Display for RangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeToken::Line(line) => write!(f, "{line}"),
            RangeToken::Span { start, end } => write!(f, "{start}-{end}"),
            RangeToken::All => f.write_str(ALL_LINES),
        }
    }
}

impl FromStr for RangeToken {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == ALL_LINES {
            return Ok(RangeToken::All);
        }
        if let Some((start, end)) = s.split_once('-') {
            let start: u32 = start
                .parse()
                .map_err(|_| format!("invalid range start in {s:?}"))?;
            let end: u32 = end
                .parse()
                .map_err(|_| format!("invalid range end in {s:?}"))?;
            if start > end {
                return Err(format!("range {s:?} ends before it starts"));
            }
            return Ok(RangeToken::Span { start, end });
        }
        s.parse()
            .map(RangeToken::Line)
            .map_err(|_| format!("invalid range token: {s:?}"))
    }
}

impl Serialize for RangeToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RangeToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

/// Decisions recorded against one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReview {
    #[serde(rename = "repo")]
    pub repository: String,
    pub path: String,
    #[serde(rename = "lines", default, deserialize_with = "null_as_default")]
    pub ranges: BTreeMap<RangeToken, Decision>,
}

/// Identity and display metadata of a two-branch comparison.
///
/// Only `repository` and the commit pair identify a ledger; branch names are
/// carried for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comparison {
    pub repository: String,
    pub source_branch: String,
    pub target_branch: String,
    pub source_commit: String,
    pub target_commit: String,
}

impl Comparison {
    /// Both commits are known, so the comparison can be persisted.
    pub fn is_pinned(&self) -> bool {
        commits_pinned(&self.source_commit, &self.target_commit)
    }
}

fn commits_pinned(source_commit: &str, target_commit: &str) -> bool {
    !source_commit.is_empty() && !target_commit.is_empty()
}

/// Persisted record of review decisions for one repository and commit pair.
///
/// Field names and order match the on-disk `review-state.json` document. The
/// repository identifier is part of the storage key rather than the document,
/// so it is skipped by serde and restored by the store on load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewLedger {
    #[serde(skip)]
    pub repository: String,
    #[serde(rename = "reviewed_files", default, deserialize_with = "null_as_default")]
    pub file_reviews: Vec<FileReview>,
    #[serde(default)]
    pub source_branch: String,
    #[serde(default)]
    pub target_branch: String,
    #[serde(default)]
    pub source_commit: String,
    #[serde(default)]
    pub target_commit: String,
}

impl ReviewLedger {
    /// A fresh ledger with no decisions.
    pub fn empty(comparison: &Comparison) -> Self {
        Self {
            repository: comparison.repository.clone(),
            file_reviews: Vec::new(),
            source_branch: comparison.source_branch.clone(),
            target_branch: comparison.target_branch.clone(),
            source_commit: comparison.source_commit.clone(),
            target_commit: comparison.target_commit.clone(),
        }
    }

    pub fn comparison(&self) -> Comparison {
        Comparison {
            repository: self.repository.clone(),
            source_branch: self.source_branch.clone(),
            target_branch: self.target_branch.clone(),
            source_commit: self.source_commit.clone(),
            target_commit: self.target_commit.clone(),
        }
    }

    /// Both commits are set, so the ledger has a storage key.
    pub fn is_pinned(&self) -> bool {
        commits_pinned(&self.source_commit, &self.target_commit)
    }

    /// Look up the review for a file in the given repository.
    pub fn file_review(&self, repository: &str, path: &str) -> Option<&FileReview> {
        self.file_reviews
            .iter()
            .find(|review| review.repository == repository && review.path == path)
    }

    /// Record a whole-file decision, replacing any earlier whole-file decision.
    pub fn record(&mut self, repository: &str, path: &str, decision: Decision) {
        self.record_range(repository, path, RangeToken::All, decision);
    }

    /// Record a decision for one range of a file.
    ///
    /// Creates the file's review if it has none yet; otherwise overwrites the
    /// entry for `token` and leaves other ranges untouched.
    pub fn record_range(
        &mut self,
        repository: &str,
        path: &str,
        token: RangeToken,
        decision: Decision,
    ) {
        let existing = self
            .file_reviews
            .iter_mut()
            .find(|review| review.repository == repository && review.path == path);

        match existing {
            Some(review) => {
                review.ranges.insert(token, decision);
            }
            None => self.file_reviews.push(FileReview {
                repository: repository.to_string(),
                path: path.to_string(),
                ranges: BTreeMap::from([(token, decision)]),
            }),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
