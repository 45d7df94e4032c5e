//! Data model layer.
//!
//! identity: validated id newtypes
//! time: RFC 3339 timestamps
//! anchor: DomAnchor / SourceAnchor fingerprints
//! comment: the comment itself (immutable core + mutable status)
//! file: the per-page JSON document

mod anchor;
mod comment;
mod error;
mod file;
mod identity;
mod time;

pub use anchor::{BoundingRect, DomAnchor, SourceAnchor};
pub use comment::{Author, AuthorSource, Comment, CommentStatus};
pub use error::{CoreError, InvalidId, InvalidTarget, TimeInversion};
pub use file::{CommentFile, FORMAT_VERSION};
pub use identity::{BranchName, COMMENT_ID_LEN, CommentId, CommitSha, Pathname, ProjectId};
pub use time::Timestamp;

#[cfg(test)]
pub use comment::fixtures;
