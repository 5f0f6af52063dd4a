use std::collections::BTreeSet;

use crate::ledger::{FileReview, ReviewLedger};
use crate::{ChangedFile, Decision, FileStatus};

/// Derive the display status of a single file from its review entry.
///
/// No entry, or an entry without any ranges, is `Unreviewed`. A single
/// distinct decision across all ranges is reported as-is; more than one is
/// `Mixed`.
pub fn file_status(review: Option<&FileReview>) -> FileStatus {
    let Some(review) = review else {
        return FileStatus::Unreviewed;
    };

    let distinct: BTreeSet<Decision> = review.ranges.values().copied().collect();
    let mut decisions = distinct.into_iter();
    match (decisions.next(), decisions.next()) {
        (None, _) => FileStatus::Unreviewed,
        (Some(only), None) => only.into(),
        (Some(_), Some(_)) => FileStatus::Mixed,
    }
}

/// Annotate the changed files with their review status and order them for review.
///
/// Every input path appears exactly once in the output. Files are ordered by
/// status priority (unreviewed first, approved last), then by path.
pub fn aggregate(files: &[String], ledger: &ReviewLedger) -> Vec<ChangedFile> {
    let mut changed: Vec<ChangedFile> = files
        .iter()
        .map(|path| ChangedFile {
            path: path.clone(),
            status: file_status(ledger.file_review(&ledger.repository, path)),
        })
        .collect();

    sort_for_review(&mut changed);
    changed
}

/// Stable sort by status priority, then path.
pub fn sort_for_review(files: &mut [ChangedFile]) {
    files.sort_by(|a, b| {
        a.status
            .priority()
            .cmp(&b.status.priority())
            .then_with(|| a.path.cmp(&b.path))
    });
}
