use crate::ChangedFile;

/// Neighbours of a file in review order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Neighbors {
    pub previous: Option<String>,
    pub next: Option<String>,
}

/// Sequential previous/next lookup over an ordered file list.
#[derive(Debug, Clone, Default)]
pub struct NavigationIndex {
    paths: Vec<String>,
}

impl NavigationIndex {
    /// Build the index from an already ordered file list.
    pub fn new(files: &[ChangedFile]) -> Self {
        Self {
            paths: files.iter().map(|f| f.path.clone()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// The file review should start with.
    pub fn first(&self) -> Option<&str> {
        self.paths.first().map(String::as_str)
    }

    pub fn position(&self, path: &str) -> Option<usize> {
        self.paths.iter().position(|p| p == path)
    }

    /// File after `current`; `None` at the end or when `current` is not listed.
    pub fn next(&self, current: &str) -> Option<&str> {
        let idx = self.position(current)?;
        self.paths.get(idx + 1).map(String::as_str)
    }

    /// File before `current`; `None` at the start or when `current` is not listed.
    pub fn previous(&self, current: &str) -> Option<&str> {
        let idx = self.position(current)?;
        idx.checked_sub(1)
            .and_then(|i| self.paths.get(i))
            .map(String::as_str)
    }

    pub fn neighbors(&self, current: &str) -> Neighbors {
        Neighbors {
            previous: self.previous(current).map(str::to_string),
            next: self.next(current).map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FileStatus;

    fn index(paths: &[&str]) -> NavigationIndex {
        let files: Vec<ChangedFile> = paths
            .iter()
            .map(|p| ChangedFile {
                path: p.to_string(),
                status: FileStatus::Unreviewed,
            })
            .collect();
        NavigationIndex::new(&files)
    }

    #[test]
    fn empty_index_has_no_neighbors() {
        let nav = index(&[]);
        assert!(nav.is_empty());
        assert_eq!(nav.first(), None);
        assert_eq!(nav.neighbors("a"), Neighbors::default());
    }

    #[test]
    fn middle_file_has_both_neighbors() {
        let nav = index(&["a", "b", "c"]);
        assert_eq!(nav.next("b"), Some("c"));
        assert_eq!(nav.previous("b"), Some("a"));
    }

    #[test]
    fn ends_clamp_to_none() {
        let nav = index(&["a", "b", "c"]);
        assert_eq!(nav.previous("a"), None);
        assert_eq!(nav.next("c"), None);
        assert_eq!(nav.first(), Some("a"));
    }

    #[test]
    fn unknown_file_has_no_neighbors() {
        let nav = index(&["a", "b"]);
        assert_eq!(nav.position("zzz"), None);
        assert_eq!(nav.next("zzz"), None);
        assert_eq!(nav.previous("zzz"), None);
    }

    #[test]
    fn single_file() {
        let nav = index(&["only"]);
        assert_eq!(
            nav.neighbors("only"),
            Neighbors {
                previous: None,
                next: None
            }
        );
        assert_eq!(nav.len(), 1);
    }

    #[test]
    fn neighbors_are_owned_copies() {
        let nav = index(&["a", "b", "c"]);
        assert_eq!(
            nav.neighbors("b"),
            Neighbors {
                previous: Some("a".to_string()),
                next: Some("c".to_string())
            }
        );
    }
}
