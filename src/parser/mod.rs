/// Prefix of the per-file header line in `git diff` output.
const FILE_HEADER_PREFIX: &str = "diff --git ";

/// Marker on the destination side of a file header.
const DESTINATION_MARKER: &str = "b/";

/// Extract the changed file paths from raw `git diff` output.
///
/// Each `diff --git a/<path> b/<path>` header contributes the destination path,
/// in the order the headers appear. Headers with fewer than four space-separated
/// tokens, or whose fourth token lacks the `b/` marker, are skipped. Never fails:
/// an empty or header-free input yields an empty list.
pub fn parse_changed_files(input: &str) -> Vec<String> {
    input
        .lines()
        .filter(|line| line.starts_with(FILE_HEADER_PREFIX))
        .filter_map(destination_path)
        .collect()
}

/// Destination path of a single header line, if the header is well-formed.
fn destination_path(header: &str) -> Option<String> {
    let parts: Vec<&str> = header.split(' ').collect();
    if parts.len() < 4 {
        return None;
    }
    parts[3]
        .strip_prefix(DESTINATION_MARKER)
        .map(str::to_string)
}

/// Added and removed line counts for a diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineCounts {
    pub additions: usize,
    pub deletions: usize,
}

/// Count added and removed content lines, ignoring the `+++`/`---` file markers.
pub fn count_changed_lines(input: &str) -> LineCounts {
    let mut counts = LineCounts::default();
    for line in input.lines() {
        if line.starts_with("+++ ") || line.starts_with("--- ") {
            continue;
        }
        if line.starts_with('+') {
            counts.additions += 1;
        } else if line.starts_with('-') {
            counts.deletions += 1;
        }
    }
    counts
}
