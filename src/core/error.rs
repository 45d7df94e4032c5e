//! Core model errors (id parsing, invariant violations).
//!
//! These are bounded and stable: they represent domain/refusal states,
//! not library implementation details.

use thiserror::Error;

/// Invalid identifier string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidId {
    #[error("comment id `{raw}` is invalid: {reason}")]
    Comment { raw: String, reason: String },
    #[error("project id `{raw}` is invalid: {reason}")]
    Project { raw: String, reason: String },
    #[error("pathname `{raw}` is invalid: {reason}")]
    Pathname { raw: String, reason: String },
    #[error("branch name `{raw}` is invalid: {reason}")]
    Branch { raw: String, reason: String },
    #[error("commit sha `{raw}` is invalid: {reason}")]
    CommitSha { raw: String, reason: String },
}

/// Fingerprinting was asked for an element that is not attached to the
/// document. Caller bug; never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("target element is not attached to the document")]
pub struct InvalidTarget;

/// A write would leave `updated_at` earlier than `created_at`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("comment {id}: updated_at {updated_at} earlier than created_at {created_at}")]
pub struct TimeInversion {
    pub id: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Canonical error enum for the core model.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CoreError {
    #[error(transparent)]
    InvalidId(#[from] InvalidId),
    #[error(transparent)]
    InvalidTarget(#[from] InvalidTarget),
    #[error(transparent)]
    TimeInversion(#[from] TimeInversion),
    #[error("comment id {0} already present in file")]
    DuplicateComment(String),
    #[error("comment id {0} not present in file")]
    UnknownComment(String),
}
