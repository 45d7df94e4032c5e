//! Shadow-branch persistence.
//!
//! One comment file per (project, pathname), stored as
//! `<project-slug>/<pathname-slug>.json` in a tree on a dedicated ref.
//! Writes are optimistic: commit with the previously read commit as sole
//! parent, update the ref only if it still points there, and surface the
//! race as `NonFastForward`. The store retries by re-reading and
//! re-merging, a bounded number of times, then escalates to a conflict.
//!
//! `diff_file` serves the staleness engine: a diff of one source file
//! between the comment's recorded commit and the current ref, with
//! changed line ranges in the coordinates of the recorded revision
//! (where the anchor's line number was captured).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use git2::{Blob, Commit, ErrorCode, Repository, Signature, Tree};
use tracing::{debug, info};

use crate::config::Config;
use crate::core::{CommentFile, CommitSha, Pathname, ProjectId};
use crate::stale::SourceDiff;

use super::error::{ConflictError, StoreError};
use super::merge::merge;
use super::wire::{parse_comment_file, serialize_comment_file};

/// Bytes and commit of one stored comment file.
#[derive(Clone, Debug)]
pub struct StoredFile {
    pub bytes: Vec<u8>,
    /// Commit the bytes were read from; the expected parent of the next
    /// write.
    pub commit: String,
}

/// Client for the shadow branch and the source-diff query.
///
/// Implementations never merge; the store owns merge semantics.
pub trait ShadowBranch {
    /// Read the current file, or `None` when it does not exist yet.
    fn read_file(
        &self,
        project: &ProjectId,
        pathname: &Pathname,
    ) -> Result<Option<StoredFile>, StoreError>;

    /// Write bytes on top of `parent` (`None` = creating the first
    /// commit). Fails with [`StoreError::NonFastForward`] when another
    /// writer committed since `parent` was read.
    fn write_file(
        &mut self,
        project: &ProjectId,
        pathname: &Pathname,
        bytes: &[u8],
        parent: Option<&str>,
        message: &str,
    ) -> Result<String, StoreError>;

    /// Diff one source file between `from` and `to` (`None` = current
    /// HEAD).
    fn diff_file(
        &self,
        file_path: &str,
        from: &CommitSha,
        to: Option<&CommitSha>,
    ) -> Result<SourceDiff, StoreError>;
}

// =============================================================================
// Store: load / save with bounded optimistic retry
// =============================================================================

/// A loaded comment file plus the commit it came from.
#[derive(Clone, Debug)]
pub struct LoadedFile {
    pub file: CommentFile,
    /// `None` when the file did not exist (empty skeleton returned).
    pub commit: Option<String>,
}

/// Result of a successful save.
#[derive(Clone, Debug)]
pub struct SaveOutcome {
    /// The merged file as committed.
    pub file: CommentFile,
    pub commit: String,
}

/// Comment store over a shadow-branch client.
pub struct Store<B: ShadowBranch> {
    branch: B,
    config: Config,
}

impl<B: ShadowBranch> Store<B> {
    pub fn new(branch: B, config: Config) -> Self {
        Self { branch, config }
    }

    pub fn branch(&self) -> &B {
        &self.branch
    }

    /// Load the file for (project, pathname). A missing file is not an
    /// error: an empty skeleton is returned.
    ///
    /// The returned file's embedded key must match the requested one;
    /// a mismatch means the storage layout handed us another page's
    /// comments and is rejected rather than silently returned.
    pub fn load(&self, project: &ProjectId, pathname: &Pathname) -> Result<LoadedFile, StoreError> {
        match self.branch.read_file(project, pathname)? {
            Some(stored) => {
                let file = parse_comment_file(&stored.bytes)?;
                if file.project_id != *project || file.pathname != *pathname {
                    return Err(StoreError::KeyMismatch {
                        ours: format!("{project}:{pathname}"),
                        theirs: format!("{}:{}", file.project_id, file.pathname),
                    });
                }
                Ok(LoadedFile {
                    file,
                    commit: Some(stored.commit),
                })
            }
            None => Ok(LoadedFile {
                file: CommentFile::empty(project.clone(), pathname.clone()),
                commit: None,
            }),
        }
    }

    /// Persist `local`, reconciling against whatever is on the branch.
    ///
    /// `base` is the snapshot `local` was edited from. Each attempt
    /// re-reads the branch, three-way merges, and writes with the read
    /// commit as expected parent; a non-fast-forward rejection re-runs
    /// the loop up to `max_push_retries` times before escalating to
    /// [`ConflictError::RetriesExhausted`].
    pub fn save_with_retry(
        &mut self,
        base: &CommentFile,
        local: &CommentFile,
    ) -> Result<SaveOutcome, StoreError> {
        let project = local.project_id.clone();
        let pathname = local.pathname.clone();
        let mut attempts = 0usize;
        loop {
            let current = self.load(&project, &pathname)?;
            let merged = merge(base, local, &current.file)?;
            let bytes = serialize_comment_file(&merged)?;
            let message = commit_message(&current.file, &merged);
            match self.branch.write_file(
                &project,
                &pathname,
                &bytes,
                current.commit.as_deref(),
                &message,
            ) {
                Ok(commit) => {
                    info!(project = %project, pathname = %pathname, commit, "comment file saved");
                    return Ok(SaveOutcome { file: merged, commit });
                }
                Err(StoreError::NonFastForward) => {
                    attempts += 1;
                    if attempts >= self.config.max_push_retries {
                        return Err(ConflictError::RetriesExhausted { attempts }.into());
                    }
                    debug!(project = %project, pathname = %pathname, attempts, "non-fast-forward, re-merging");
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Commit message summarizing the change:
/// `marginalia(app): +1 added, ~1 updated on /dashboard`.
fn commit_message(old: &CommentFile, new: &CommentFile) -> String {
    let mut added = 0usize;
    let mut updated = 0usize;
    let mut removed = 0usize;
    for comment in &new.comments {
        match old.get(&comment.id) {
            None => added += 1,
            Some(previous) if previous != comment => updated += 1,
            Some(_) => {}
        }
    }
    for comment in &old.comments {
        if new.get(&comment.id).is_none() {
            removed += 1;
        }
    }
    let mut parts = Vec::new();
    if added > 0 {
        parts.push(format!("+{added} added"));
    }
    if updated > 0 {
        parts.push(format!("~{updated} updated"));
    }
    if removed > 0 {
        parts.push(format!("-{removed} removed"));
    }
    let summary = if parts.is_empty() {
        "no changes".to_string()
    } else {
        parts.join(", ")
    };
    format!(
        "marginalia({}): {} on {}",
        new.project_id, summary, new.pathname
    )
}

// =============================================================================
// Git implementation
// =============================================================================

/// Shadow-branch client over a local git repository.
///
/// Only local refs are touched; transporting the ref to a hosting
/// provider is the CLI's business. Concurrent local/CI writers surface
/// through the compare-and-swap ref update.
pub struct GitShadowBranch {
    repo: Repository,
    repo_path: PathBuf,
    shadow_ref: String,
}

impl GitShadowBranch {
    pub fn open(repo_path: impl Into<PathBuf>, config: &Config) -> Result<Self, StoreError> {
        let repo_path = repo_path.into();
        let repo = Repository::open(&repo_path).map_err(StoreError::OpenRepo)?;
        Ok(Self {
            repo,
            repo_path,
            shadow_ref: config.shadow_ref.clone(),
        })
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    fn file_path(project: &ProjectId, pathname: &Pathname) -> (String, String) {
        (project.slug(), format!("{}.json", pathname.slug()))
    }

    fn shadow_head(&self) -> Result<Option<Commit<'_>>, StoreError> {
        match self.repo.find_reference(&self.shadow_ref) {
            Ok(reference) => Ok(Some(reference.peel_to_commit().map_err(StoreError::ReadRef)?)),
            Err(err) if err.code() == ErrorCode::NotFound => Ok(None),
            Err(err) => Err(StoreError::ReadRef(err)),
        }
    }

    fn blob_in_tree<'r>(
        &'r self,
        tree: &Tree<'r>,
        dir: &str,
        name: &str,
    ) -> Result<Option<Blob<'r>>, StoreError> {
        let path = Path::new(dir).join(name);
        match tree.get_path(&path) {
            Ok(entry) => {
                let object = entry.to_object(&self.repo)?;
                Ok(object.into_blob().ok())
            }
            Err(err) if err.code() == ErrorCode::NotFound => Ok(None),
            Err(err) => Err(StoreError::ReadRef(err)),
        }
    }

    fn signature(&self) -> Result<Signature<'static>, StoreError> {
        self.repo
            .signature()
            .or_else(|_| Signature::now("marginalia", "marginalia@localhost"))
            .map_err(StoreError::Commit)
    }

    fn blob_at_commit<'r>(
        &'r self,
        commit: &Commit<'r>,
        file_path: &str,
    ) -> Result<Option<Blob<'r>>, StoreError> {
        let tree = commit.tree()?;
        match tree.get_path(Path::new(file_path)) {
            Ok(entry) => {
                let object = entry.to_object(&self.repo)?;
                Ok(object.into_blob().ok())
            }
            Err(err) if err.code() == ErrorCode::NotFound => Ok(None),
            Err(err) => Err(StoreError::Diff {
                path: file_path.to_string(),
                source: err,
            }),
        }
    }

    fn resolve_commit(&self, sha: &str) -> Result<Commit<'_>, StoreError> {
        let object = self
            .repo
            .revparse_single(sha)
            .map_err(|_| StoreError::UnknownCommit(sha.to_string()))?;
        object
            .into_commit()
            .map_err(|_| StoreError::UnknownCommit(sha.to_string()))
    }
}

impl ShadowBranch for GitShadowBranch {
    fn read_file(
        &self,
        project: &ProjectId,
        pathname: &Pathname,
    ) -> Result<Option<StoredFile>, StoreError> {
        let Some(head) = self.shadow_head()? else {
            return Ok(None);
        };
        let tree = head.tree().map_err(StoreError::ReadRef)?;
        let (dir, name) = Self::file_path(project, pathname);
        match self.blob_in_tree(&tree, &dir, &name)? {
            Some(blob) => Ok(Some(StoredFile {
                bytes: blob.content().to_vec(),
                commit: head.id().to_string(),
            })),
            None => Ok(None),
        }
    }

    fn write_file(
        &mut self,
        project: &ProjectId,
        pathname: &Pathname,
        bytes: &[u8],
        parent: Option<&str>,
        message: &str,
    ) -> Result<String, StoreError> {
        let head = self.shadow_head()?;
        // Parent check up front; the ref update below closes the race.
        let head_id = head.as_ref().map(|c| c.id().to_string());
        if head_id.as_deref() != parent {
            return Err(StoreError::NonFastForward);
        }

        let blob_oid = self.repo.blob(bytes).map_err(StoreError::WriteBlob)?;
        let (dir, name) = Self::file_path(project, pathname);

        let parent_tree = match &head {
            Some(commit) => Some(commit.tree().map_err(StoreError::ReadRef)?),
            None => None,
        };
        let existing_dir = parent_tree
            .as_ref()
            .and_then(|tree| tree.get_name(&dir))
            .and_then(|entry| entry.to_object(&self.repo).ok())
            .and_then(|object| object.into_tree().ok());

        let mut dir_builder = self
            .repo
            .treebuilder(existing_dir.as_ref())
            .map_err(StoreError::BuildTree)?;
        dir_builder
            .insert(&name, blob_oid, 0o100644)
            .map_err(StoreError::BuildTree)?;
        let dir_oid = dir_builder.write().map_err(StoreError::BuildTree)?;

        let mut root_builder = self
            .repo
            .treebuilder(parent_tree.as_ref())
            .map_err(StoreError::BuildTree)?;
        root_builder
            .insert(&dir, dir_oid, 0o040000)
            .map_err(StoreError::BuildTree)?;
        let root_oid = root_builder.write().map_err(StoreError::BuildTree)?;
        let root_tree = self.repo.find_tree(root_oid).map_err(StoreError::BuildTree)?;

        let signature = self.signature()?;
        let parents: Vec<&Commit<'_>> = head.iter().collect();
        let commit_oid = self
            .repo
            .commit(None, &signature, &signature, message, &root_tree, &parents)
            .map_err(StoreError::Commit)?;

        // Compare-and-swap the ref; a concurrent writer loses the race
        // here even if it slipped past the head check.
        let update = match head.as_ref() {
            Some(commit) => self
                .repo
                .reference_matching(&self.shadow_ref, commit_oid, true, commit.id(), message)
                .map(|_| ()),
            None => self
                .repo
                .reference(&self.shadow_ref, commit_oid, false, message)
                .map(|_| ()),
        };
        update.map_err(|_| StoreError::NonFastForward)?;
        Ok(commit_oid.to_string())
    }

    fn diff_file(
        &self,
        file_path: &str,
        from: &CommitSha,
        to: Option<&CommitSha>,
    ) -> Result<SourceDiff, StoreError> {
        let from_commit = self.resolve_commit(from.as_str())?;
        let to_commit = match to {
            Some(sha) => self.resolve_commit(sha.as_str())?,
            None => self
                .repo
                .head()
                .and_then(|head| head.peel_to_commit())
                .map_err(StoreError::ReadRef)?,
        };
        let old = self.blob_at_commit(&from_commit, file_path)?;
        let new = self.blob_at_commit(&to_commit, file_path)?;

        let (old, new) = match (&old, &new) {
            (None, None) => return Ok(SourceDiff::unchanged()),
            (Some(a), Some(b)) if a.id() == b.id() => return Ok(SourceDiff::unchanged()),
            (Some(a), Some(b)) => (a, b),
            // Added or removed entirely: whole-file change.
            _ => {
                return Ok(SourceDiff {
                    changed: true,
                    changed_line_ranges: Vec::new(),
                });
            }
        };

        let path = Path::new(file_path);
        let patch = git2::Patch::from_buffers(
            old.content(),
            Some(path),
            new.content(),
            Some(path),
            None,
        )
        .map_err(|source| StoreError::Diff {
            path: file_path.to_string(),
            source,
        })?;
        let mut ranges = Vec::new();
        for idx in 0..patch.num_hunks() {
            let (hunk, _) = patch.hunk(idx).map_err(|source| StoreError::Diff {
                path: file_path.to_string(),
                source,
            })?;
            // Ranges in old-revision coordinates: that is where the
            // anchor's line number was captured.
            let lo = hunk.old_start();
            let hi = if hunk.old_lines() > 0 {
                hunk.old_start() + hunk.old_lines() - 1
            } else {
                hunk.old_start()
            };
            ranges.push((lo, hi));
        }
        Ok(SourceDiff {
            changed: true,
            changed_line_ranges: ranges,
        })
    }
}

// =============================================================================
// In-memory implementation (tests, embedding)
// =============================================================================

/// In-memory shadow branch: same optimistic-write contract, no git.
#[derive(Default)]
pub struct MemoryShadowBranch {
    files: HashMap<(ProjectId, Pathname), StoredFile>,
    commits: u64,
    /// Scripted `diff_file` answers, keyed by file path.
    diffs: HashMap<String, SourceDiff>,
}

impl MemoryShadowBranch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the diff returned for `file_path`.
    pub fn set_diff(&mut self, file_path: impl Into<String>, diff: SourceDiff) {
        self.diffs.insert(file_path.into(), diff);
    }
}

impl ShadowBranch for MemoryShadowBranch {
    fn read_file(
        &self,
        project: &ProjectId,
        pathname: &Pathname,
    ) -> Result<Option<StoredFile>, StoreError> {
        Ok(self
            .files
            .get(&(project.clone(), pathname.clone()))
            .cloned())
    }

    fn write_file(
        &mut self,
        project: &ProjectId,
        pathname: &Pathname,
        bytes: &[u8],
        parent: Option<&str>,
        _message: &str,
    ) -> Result<String, StoreError> {
        let key = (project.clone(), pathname.clone());
        let current = self.files.get(&key).map(|f| f.commit.clone());
        if current.as_deref() != parent {
            return Err(StoreError::NonFastForward);
        }
        self.commits += 1;
        let commit = format!("mem-{}", self.commits);
        self.files.insert(
            key,
            StoredFile {
                bytes: bytes.to_vec(),
                commit: commit.clone(),
            },
        );
        Ok(commit)
    }

    fn diff_file(
        &self,
        file_path: &str,
        _from: &CommitSha,
        _to: Option<&CommitSha>,
    ) -> Result<SourceDiff, StoreError> {
        Ok(self.diffs.get(file_path).cloned().unwrap_or_default())
    }
}
