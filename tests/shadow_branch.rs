//! Shadow-branch persistence against a real git repository.

use std::fs;
use std::path::Path;

use git2::{Commit, Repository, Signature};
use tempfile::TempDir;

use marginalia::stale::SourceDiff;
use marginalia::store::{ConflictError, ShadowBranch, StoreError};
use marginalia::{
    CommentId, CommentStatus, CommitSha, Config, GitShadowBranch, Pathname, ProjectId, Store,
    Timestamp,
};

mod common;
use common::{comment, empty_file};

fn init_repo() -> (TempDir, Repository) {
    let dir = TempDir::new().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    (dir, repo)
}

fn commit_source_file(repo: &Repository, path: &str, contents: &str, message: &str) -> String {
    let workdir = repo.workdir().unwrap();
    let full = workdir.join(path);
    fs::create_dir_all(full.parent().unwrap()).unwrap();
    fs::write(&full, contents).unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new(path)).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();

    let sig = Signature::now("Test", "test@example.com").unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap()
        .to_string()
}

fn keys() -> (ProjectId, Pathname) {
    (
        ProjectId::parse("app").unwrap(),
        Pathname::parse("/dashboard").unwrap(),
    )
}

#[test]
fn save_creates_the_shadow_ref_without_touching_head() {
    let (dir, repo) = init_repo();
    let config = Config::default();
    let branch = GitShadowBranch::open(dir.path(), &config).unwrap();
    let mut store = Store::new(branch, config.clone());

    let base = empty_file();
    let local = base.append(comment("aaaaaaaaaaaa", 1_000)).unwrap();
    let outcome = store.save_with_retry(&base, &local).unwrap();

    let shadow = repo.find_reference(&config.shadow_ref).unwrap();
    assert_eq!(
        shadow.peel_to_commit().unwrap().id().to_string(),
        outcome.commit
    );
    // The working branch stays unborn; comments never land on it.
    assert!(repo.head().is_err());

    let (project, pathname) = keys();
    let loaded = store.load(&project, &pathname).unwrap();
    assert_eq!(loaded.file, local);
}

#[test]
fn files_for_different_pages_share_the_branch() {
    let (dir, _repo) = init_repo();
    let config = Config::default();
    let mut store = Store::new(
        GitShadowBranch::open(dir.path(), &config).unwrap(),
        config,
    );

    let dash_base = empty_file();
    let dash = dash_base.append(comment("aaaaaaaaaaaa", 1_000)).unwrap();
    store.save_with_retry(&dash_base, &dash).unwrap();

    let settings_base = marginalia::CommentFile::empty(
        ProjectId::parse("app").unwrap(),
        Pathname::parse("/settings/profile").unwrap(),
    );
    let settings = settings_base
        .append(comment("bbbbbbbbbbbb", 2_000))
        .unwrap();
    store.save_with_retry(&settings_base, &settings).unwrap();

    let (project, pathname) = keys();
    assert_eq!(store.load(&project, &pathname).unwrap().file, dash);
    let other = store
        .load(&project, &Pathname::parse("/settings/profile").unwrap())
        .unwrap();
    assert_eq!(other.file, settings);
}

#[test]
fn similarly_named_pages_get_distinct_storage_files() {
    let (dir, _repo) = init_repo();
    let config = Config::default();
    let mut store = Store::new(
        GitShadowBranch::open(dir.path(), &config).unwrap(),
        config,
    );
    let project = ProjectId::parse("app").unwrap();

    // Pathnames whose characters collapse to the same bytes under a
    // lossy escape: each must land in its own file on the branch.
    let nested = Pathname::parse("/a/b").unwrap();
    let underscored = Pathname::parse("/a__b").unwrap();
    let dotted = Pathname::parse("/a.b").unwrap();

    let nested_base = marginalia::CommentFile::empty(project.clone(), nested.clone());
    let nested_file = nested_base.append(comment("aaaaaaaaaaaa", 1_000)).unwrap();
    store.save_with_retry(&nested_base, &nested_file).unwrap();

    // The sibling pages are untouched: loading them yields empty
    // skeletons, not /a/b's comment.
    for pathname in [&underscored, &dotted] {
        let loaded = store.load(&project, pathname).unwrap();
        assert!(loaded.file.comments.is_empty(), "{pathname} leaked comments");
        assert_eq!(loaded.commit, None);
    }

    // And each page can hold its own comment without clobbering the
    // others.
    let under_base = marginalia::CommentFile::empty(project.clone(), underscored.clone());
    let under_file = under_base.append(comment("bbbbbbbbbbbb", 2_000)).unwrap();
    store.save_with_retry(&under_base, &under_file).unwrap();

    assert_eq!(store.load(&project, &nested).unwrap().file, nested_file);
    assert_eq!(store.load(&project, &underscored).unwrap().file, under_file);
}

#[test]
fn stale_parent_write_is_rejected_as_non_fast_forward() {
    let (dir, _repo) = init_repo();
    let config = Config::default();
    let mut branch = GitShadowBranch::open(dir.path(), &config).unwrap();
    let (project, pathname) = keys();

    let bytes = marginalia::store::serialize_comment_file(
        &empty_file().append(comment("aaaaaaaaaaaa", 1_000)).unwrap(),
    )
    .unwrap();
    let first = branch
        .write_file(&project, &pathname, &bytes, None, "first")
        .unwrap();

    // Parent None means "creating"; the file now exists.
    let err = branch
        .write_file(&project, &pathname, &bytes, None, "stale create")
        .unwrap_err();
    assert!(matches!(err, StoreError::NonFastForward));

    // A parent that is no longer the tip is rejected the same way.
    branch
        .write_file(&project, &pathname, &bytes, Some(first.as_str()), "second")
        .unwrap();
    let err = branch
        .write_file(&project, &pathname, &bytes, Some(first.as_str()), "stale parent")
        .unwrap_err();
    assert!(matches!(err, StoreError::NonFastForward));
}

#[test]
fn concurrent_stores_converge_by_merging() {
    let (dir, _repo) = init_repo();
    let config = Config::default();
    let mut store_a = Store::new(
        GitShadowBranch::open(dir.path(), &config).unwrap(),
        config.clone(),
    );
    let mut store_b = Store::new(
        GitShadowBranch::open(dir.path(), &config).unwrap(),
        config,
    );

    let base = empty_file();
    let from_a = base.append(comment("aaaaaaaaaaaa", 1_000)).unwrap();
    let from_b = base.append(comment("bbbbbbbbbbbb", 2_000)).unwrap();

    store_a.save_with_retry(&base, &from_a).unwrap();
    let outcome = store_b.save_with_retry(&base, &from_b).unwrap();

    assert_eq!(outcome.file.comments.len(), 2);
    let (project, pathname) = keys();
    let seen_by_a = store_a.load(&project, &pathname).unwrap();
    assert_eq!(seen_by_a.file, outcome.file);
}

#[test]
fn concurrent_resolve_keeps_later_write() {
    let (dir, _repo) = init_repo();
    let config = Config::default();
    let id = CommentId::parse("aaaaaaaaaaaa").unwrap();
    let mut store_a = Store::new(
        GitShadowBranch::open(dir.path(), &config).unwrap(),
        config.clone(),
    );
    let mut store_b = Store::new(
        GitShadowBranch::open(dir.path(), &config).unwrap(),
        config,
    );

    let empty = empty_file();
    let base = empty.append(comment("aaaaaaaaaaaa", 1_000)).unwrap();
    store_a.save_with_retry(&empty, &base).unwrap();

    let resolved = base
        .set_status(&id, CommentStatus::Resolved, Timestamp::from_unix_ms(9_000))
        .unwrap();
    store_a.save_with_retry(&base, &resolved).unwrap();

    let reopened = base
        .set_status(&id, CommentStatus::Active, Timestamp::from_unix_ms(5_000))
        .unwrap();
    let outcome = store_b.save_with_retry(&base, &reopened).unwrap();

    assert_eq!(
        outcome.file.get(&id).unwrap().status,
        CommentStatus::Resolved
    );
}

#[test]
fn exhausted_retries_surface_as_conflict() {
    // A branch wrapper that always reports contention.
    struct Contended(GitShadowBranch);
    impl ShadowBranch for Contended {
        fn read_file(
            &self,
            project: &ProjectId,
            pathname: &Pathname,
        ) -> Result<Option<marginalia::store::StoredFile>, StoreError> {
            self.0.read_file(project, pathname)
        }
        fn write_file(
            &mut self,
            _: &ProjectId,
            _: &Pathname,
            _: &[u8],
            _: Option<&str>,
            _: &str,
        ) -> Result<String, StoreError> {
            Err(StoreError::NonFastForward)
        }
        fn diff_file(
            &self,
            file_path: &str,
            from: &CommitSha,
            to: Option<&CommitSha>,
        ) -> Result<SourceDiff, StoreError> {
            self.0.diff_file(file_path, from, to)
        }
    }

    let (dir, _repo) = init_repo();
    let config = Config::default();
    let branch = Contended(GitShadowBranch::open(dir.path(), &config).unwrap());
    let mut store = Store::new(branch, config);

    let base = empty_file();
    let local = base.append(comment("aaaaaaaaaaaa", 1_000)).unwrap();
    let err = store.save_with_retry(&base, &local).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Conflict(ConflictError::RetriesExhausted { .. })
    ));
}

#[test]
fn diff_file_reports_changed_ranges_in_old_coordinates() {
    let (dir, repo) = init_repo();
    let config = Config::default();

    let original: String = (1..=20).map(|n| format!("line {n}\n")).collect();
    let first = commit_source_file(&repo, "src/Dashboard.tsx", &original, "initial");

    let mut edited = original.clone();
    edited = edited.replace("line 10\n", "line ten, edited\n");
    commit_source_file(&repo, "src/Dashboard.tsx", &edited, "edit line 10");

    let branch = GitShadowBranch::open(dir.path(), &config).unwrap();
    let from = CommitSha::parse(first).unwrap();
    let diff = branch.diff_file("src/Dashboard.tsx", &from, None).unwrap();

    assert!(diff.changed);
    assert!(
        diff.changed_line_ranges
            .iter()
            .any(|&(lo, hi)| lo <= 10 && 10 <= hi),
        "line 10 should fall in a changed range: {:?}",
        diff.changed_line_ranges
    );

    // The diff drives the classification: the DOM anchor still resolves
    // exactly, but the comment goes stale-source.
    let mut b = marginalia::DocumentBuilder::new();
    b.open("html");
    let button = b.open("button");
    b.attr("id", "save").text("Save changes");
    b.close();
    b.close();
    let doc = b.build();

    let mut tracked = comment("cccccccccccc", 3_000);
    tracked.dom_anchor = marginalia::build_anchor(&doc, button, &config).unwrap();
    tracked.source_anchor = Some(marginalia::SourceAnchor {
        file_path: "src/Dashboard.tsx".to_string(),
        component_name: None,
        line_number: Some(10),
        commit_sha: from.clone(),
    });

    let resolution = marginalia::resolve(&tracked.dom_anchor, &doc, &config);
    assert_eq!(resolution.confidence(), Some(marginalia::Confidence::Exact));
    assert_eq!(
        marginalia::stale::classify(&tracked, &resolution, Some(&diff), &config),
        marginalia::stale::Staleness::StaleSource
    );
}

#[test]
fn diff_file_is_unchanged_for_untouched_files() {
    let (dir, repo) = init_repo();
    let config = Config::default();

    let first = commit_source_file(&repo, "src/App.tsx", "export {}\n", "initial");
    commit_source_file(&repo, "src/Other.tsx", "export {}\n", "unrelated change");

    let branch = GitShadowBranch::open(dir.path(), &config).unwrap();
    let from = CommitSha::parse(first).unwrap();
    let diff = branch.diff_file("src/App.tsx", &from, None).unwrap();
    assert!(!diff.changed);
    assert!(diff.changed_line_ranges.is_empty());

    // A file added after the recorded commit counts as a whole-file
    // change for anchors recorded against it.
    let diff = branch.diff_file("src/Other.tsx", &from, None).unwrap();
    assert!(diff.changed);
    assert!(diff.changed_line_ranges.is_empty());
}
