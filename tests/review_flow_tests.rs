mod common;

use diffty::config::Config;
use diffty::ledger::Comparison;
use diffty::review::ReviewService;
use diffty::store::{JsonLedgerStore, LEDGER_FILE_NAME, LedgerKey, repository_token};
use diffty::vcs::GitCli;
use diffty::{Decision, FileStatus};

fn service(root: &std::path::Path) -> ReviewService<GitCli> {
    let store = JsonLedgerStore::open(root).unwrap();
    ReviewService::new(Box::new(store), GitCli)
}

fn statuses(service: &ReviewService<GitCli>, comparison: &Comparison) -> Vec<(String, FileStatus)> {
    service
        .open_comparison(comparison)
        .unwrap()
        .files
        .into_iter()
        .map(|f| (f.path, f.status))
        .collect()
}

#[test]
fn approving_a_file_reorders_the_comparison() {
    let repo = common::init_repo();
    let root = tempfile::tempdir().unwrap();
    let service = service(root.path());

    let id = service.add_repository(repo.path()).unwrap();
    let comparison = service
        .comparison(&id, Some("feature"), Some("main"))
        .unwrap();

    let view = service.open_comparison(&comparison).unwrap();
    assert!(!view.no_diff);
    assert_eq!(
        view.navigation.paths(),
        &["file1.txt".to_string(), "file2.txt".to_string()]
    );

    let next = service
        .record_decision(&view, "file1.txt", Decision::Approved)
        .unwrap();
    assert_eq!(next, "file2.txt");

    assert_eq!(
        statuses(&service, &comparison),
        vec![
            ("file2.txt".to_string(), FileStatus::Unreviewed),
            ("file1.txt".to_string(), FileStatus::Approved),
        ]
    );
}

#[test]
fn ledger_is_written_in_the_documented_layout() {
    let repo = common::init_repo();
    let root = tempfile::tempdir().unwrap();
    let service = service(root.path());

    let id = service.add_repository(repo.path()).unwrap();
    let comparison = service
        .comparison(&id, Some("feature"), Some("main"))
        .unwrap();
    let view = service.open_comparison(&comparison).unwrap();
    service
        .record_decision(&view, "file2.txt", Decision::Rejected)
        .unwrap();

    let path = root
        .path()
        .join(repository_token(&id))
        .join(&comparison.source_commit)
        .join(&comparison.target_commit)
        .join(LEDGER_FILE_NAME);
    let document: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

    assert_eq!(document["source_branch"], "feature");
    assert_eq!(document["target_branch"], "main");
    assert_eq!(document["source_commit"], comparison.source_commit.as_str());
    let reviewed = document["reviewed_files"].as_array().unwrap();
    assert_eq!(reviewed.len(), 1);
    assert_eq!(reviewed[0]["repo"], id.as_str());
    assert_eq!(reviewed[0]["path"], "file2.txt");
    assert_eq!(reviewed[0]["lines"]["all"], "rejected");

    let registry: Vec<String> = serde_json::from_str(
        &std::fs::read_to_string(root.path().join("repositories.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(registry, vec![id.clone()]);

    let store = JsonLedgerStore::open(root.path()).unwrap();
    assert_eq!(
        store.ledger_path(&LedgerKey::for_comparison(&comparison)),
        path
    );
}

#[test]
fn new_commits_start_a_fresh_ledger() {
    let repo = common::init_repo();
    let root = tempfile::tempdir().unwrap();
    let service = service(root.path());

    let id = service.add_repository(repo.path()).unwrap();
    let before = service
        .comparison(&id, Some("feature"), Some("main"))
        .unwrap();
    let view = service.open_comparison(&before).unwrap();
    service
        .record_decision(&view, "file1.txt", Decision::Approved)
        .unwrap();

    common::advance_feature(repo.path());

    let after = service
        .comparison(&id, Some("feature"), Some("main"))
        .unwrap();
    assert_ne!(before.source_commit, after.source_commit);
    assert!(
        statuses(&service, &after)
            .iter()
            .all(|(_, status)| *status == FileStatus::Unreviewed)
    );
    assert_eq!(statuses(&service, &after).len(), 3);

    // The old pair keeps its decisions.
    assert!(
        statuses(&service, &before)
            .contains(&("file1.txt".to_string(), FileStatus::Approved))
    );
}

#[test]
fn identical_branches_have_no_diff() {
    let repo = common::init_repo();
    let root = tempfile::tempdir().unwrap();
    let service = service(root.path());

    let id = service.add_repository(repo.path()).unwrap();
    let comparison = service.comparison(&id, Some("main"), Some("main")).unwrap();
    let view = service.open_comparison(&comparison).unwrap();
    assert!(view.no_diff);
    assert!(view.files.is_empty());
    assert_eq!(view.progress.total_files, 0);
}

#[test]
fn sqlite_backend_behaves_like_json() {
    let repo = common::init_repo();
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("config.yml"), "backend: sqlite\n").unwrap();

    let config = Config::load(root.path()).unwrap();
    let service = ReviewService::new(config.open_store().unwrap(), GitCli);

    let id = service.add_repository(repo.path()).unwrap();
    let comparison = service
        .comparison(&id, Some("feature"), Some("main"))
        .unwrap();
    let view = service.open_comparison(&comparison).unwrap();
    service
        .record_decision(&view, "file1.txt", Decision::Skipped)
        .unwrap();

    assert_eq!(
        statuses(&service, &comparison),
        vec![
            ("file2.txt".to_string(), FileStatus::Unreviewed),
            ("file1.txt".to_string(), FileStatus::Skipped),
        ]
    );
    assert!(!root.path().join(repository_token(&id)).exists());
}
