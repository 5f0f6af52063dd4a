#![allow(dead_code)]

use std::path::Path;
use std::process::Command;

fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
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
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

/// A repository where `feature` changes `file1.txt` and adds `file2.txt` on top of `main`.
pub fn init_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path();

    git(path, &["init", "-q"]);
    git(path, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    std::fs::write(path.join("file1.txt"), "one\n").unwrap();
    git(path, &["add", "."]);
    git(path, &["commit", "-q", "-m", "initial"]);
    git(path, &["checkout", "-q", "-b", "feature"]);
    std::fs::write(path.join("file1.txt"), "one changed\n").unwrap();
    std::fs::write(path.join("file2.txt"), "two\n").unwrap();
    git(path, &["add", "."]);
    git(path, &["commit", "-q", "-m", "feature work"]);
    dir
}

/// Add a commit to `feature` so it points somewhere new.
pub fn advance_feature(dir: &Path) {
    std::fs::write(dir.join("file3.txt"), "three\n").unwrap();
    git(dir, &["add", "."]);
    git(dir, &["commit", "-q", "-m", "more work"]);
}
