#![forbid(unsafe_code)]
#![allow(clippy::result_large_err)]

//! Anchored comments for live web pages.
//!
//! Comments attach to DOM elements through a [`DomAnchor`] (selector,
//! content fingerprint, geometry) and to source code through a
//! [`SourceAnchor`] (file, line, recorded commit). When the page or the
//! source moves, the resolver relocates the element and the staleness
//! engine derives one of four states (`active`, `stale-dom`,
//! `stale-source`, `orphaned`) without ever mutating the stored comment.
//!
//! Comment files persist as JSON on a git shadow branch; concurrent
//! writers converge through a deterministic three-way merge behind an
//! optimistic compare-and-swap write loop.

pub mod config;
pub mod core;
pub mod dom;
pub mod error;
pub mod resolve;
pub mod stale;
pub mod store;
pub mod telemetry;

pub use config::Config;
pub use self::core::{
    Author, AuthorSource, BoundingRect, BranchName, Comment, CommentFile, CommentId, CommentStatus,
    CommitSha, DomAnchor, Pathname, ProjectId, SourceAnchor, Timestamp,
};
pub use dom::{Document, DocumentBuilder, NodeId, Selector};
pub use error::{Error, Transience};
pub use resolve::{build_anchor, resolve, Confidence, Resolution};
pub use stale::{annotate_all, classify, Annotated, DisplayStatus, SourceDiff, Staleness};
pub use store::{merge, GitShadowBranch, MemoryShadowBranch, ShadowBranch, Store};

pub type Result<T> = std::result::Result<T, Error>;
