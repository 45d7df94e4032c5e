//! Store errors.
//!
//! `ConflictError` is surfaced to the human operator and never
//! auto-resolved; `NonFastForward` is the one transient error (the store
//! retries it a bounded number of times before escalating).

use thiserror::Error;

use crate::core::{CoreError, FORMAT_VERSION};
use crate::error::Transience;

/// Merge divergence requiring manual resolution. Never auto-resolved.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConflictError {
    #[error("comment {id}: immutable fields diverge between branches")]
    ImmutableDivergence { id: String },

    #[error("duplicate comment id {id} in {side}")]
    DuplicateId { id: String, side: &'static str },

    #[error("shadow branch still contended after {attempts} write attempts")]
    RetriesExhausted { attempts: usize },
}

/// Errors from comment-file persistence and merge.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error("unsupported comment file version {found} (supported: {FORMAT_VERSION})")]
    UnsupportedVersion { found: i64 },

    #[error("comment file is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("failed to serialize comment file: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Write rejected because another writer committed first.
    #[error("shadow branch write rejected (non-fast-forward)")]
    NonFastForward,

    #[error("comment files disagree on project/pathname: {ours} vs {theirs}")]
    KeyMismatch { ours: String, theirs: String },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("failed to open repository: {0}")]
    OpenRepo(#[source] git2::Error),

    #[error("failed to read shadow ref: {0}")]
    ReadRef(#[source] git2::Error),

    #[error("failed to write blob: {0}")]
    WriteBlob(#[source] git2::Error),

    #[error("failed to build tree: {0}")]
    BuildTree(#[source] git2::Error),

    #[error("failed to create commit: {0}")]
    Commit(#[source] git2::Error),

    #[error("unknown commit {0}")]
    UnknownCommit(String),

    #[error("failed to diff {path}: {source}")]
    Diff {
        path: String,
        #[source]
        source: git2::Error,
    },

    #[error("git operation failed: {0}")]
    Git(#[from] git2::Error),
}

impl StoreError {
    /// Whether retrying may succeed.
    pub fn transience(&self) -> Transience {
        match self {
            StoreError::NonFastForward => Transience::Transient,
            _ => Transience::Permanent,
        }
    }
}
