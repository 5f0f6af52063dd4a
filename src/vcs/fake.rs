use std::collections::HashMap;

use super::{Result, VcsError, VcsProvider};

/// In-memory VCS: branch -> commit, and (source, target) -> diff text.
#[derive(Default)]
pub struct FakeVcs {
    branches: Vec<(String, String)>,
    diffs: HashMap<(String, String), String>,
}

impl FakeVcs {
    pub fn with_branches(branches: &[(&str, &str)]) -> Self {
        Self {
            branches: branches
                .iter()
                .map(|(b, c)| (b.to_string(), c.to_string()))
                .collect(),
            diffs: HashMap::new(),
        }
    }

    pub fn diff_between(mut self, source: &str, target: &str, diff: &str) -> Self {
        self.diffs
            .insert((source.to_string(), target.to_string()), diff.to_string());
        self
    }
}

impl VcsProvider for FakeVcs {
    fn list_branches(&self, _repository: &str) -> Result<Vec<String>> {
        Ok(self.branches.iter().map(|(b, _)| b.clone()).collect())
    }

    fn resolve_commit(&self, _repository: &str, branch: &str) -> Result<String> {
        self.branches
            .iter()
            .find(|(b, _)| b == branch)
            .map(|(_, c)| c.clone())
            .ok_or_else(|| VcsError::BranchNotFound {
                branch: branch.to_string(),
            })
    }

    fn diff(&self, _repository: &str, source: &str, target: &str) -> Result<String> {
        Ok(self
            .diffs
            .get(&(source.to_string(), target.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn file_diff(
        &self,
        repository: &str,
        source: &str,
        target: &str,
        path: &str,
    ) -> Result<String> {
        let full = self.diff(repository, source, target)?;
        let header = format!("diff --git a/{path} b/{path}");
        let mut out = String::new();
        let mut inside = false;
        for line in full.lines() {
            if line.starts_with("diff --git ") {
                inside = line == header;
            }
            if inside {
                out.push_str(line);
                out.push('\n');
            }
        }
        Ok(out)
    }
}
