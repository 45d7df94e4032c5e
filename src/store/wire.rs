//! Comment file wire format: JSON, UTF-8, schema version 1.
//!
//! The version field is inspected before the full parse so an
//! unsupported file fails with `UnsupportedVersion`, not a pile of
//! schema errors. Parsing also enforces the file-level invariants
//! (unique ids, `updatedAt >= createdAt`); a corrupt file is rejected
//! here rather than poisoning a later merge.

use std::collections::HashSet;

use serde::Deserialize;

use crate::core::{CommentFile, FORMAT_VERSION, TimeInversion};

use super::error::{ConflictError, StoreError};

/// Minimal probe decoded ahead of the full schema.
#[derive(Deserialize)]
struct VersionProbe {
    #[serde(default)]
    version: i64,
}

/// Parse and validate one comment file.
pub fn parse_comment_file(bytes: &[u8]) -> Result<CommentFile, StoreError> {
    let probe: VersionProbe = serde_json::from_slice(bytes).map_err(StoreError::Parse)?;
    if probe.version != i64::from(FORMAT_VERSION) {
        return Err(StoreError::UnsupportedVersion {
            found: probe.version,
        });
    }
    let file: CommentFile = serde_json::from_slice(bytes).map_err(StoreError::Parse)?;
    validate(&file)?;
    Ok(file)
}

/// Serialize a comment file to its canonical bytes (pretty JSON with a
/// trailing newline, stable field order). serialize -> parse ->
/// serialize is byte-identical.
pub fn serialize_comment_file(file: &CommentFile) -> Result<Vec<u8>, StoreError> {
    validate(file)?;
    let mut bytes = serde_json::to_vec_pretty(file).map_err(StoreError::Serialize)?;
    bytes.push(b'\n');
    Ok(bytes)
}

pub(super) fn validate(file: &CommentFile) -> Result<(), StoreError> {
    if file.version != FORMAT_VERSION {
        return Err(StoreError::UnsupportedVersion {
            found: i64::from(file.version),
        });
    }
    let mut seen = HashSet::new();
    for comment in &file.comments {
        if !seen.insert(&comment.id) {
            return Err(ConflictError::DuplicateId {
                id: comment.id.to_string(),
                side: "file",
            }
            .into());
        }
        if !comment.times_consistent() {
            return Err(StoreError::Core(
                TimeInversion {
                    id: comment.id.to_string(),
                    created_at: comment.created_at.to_string(),
                    updated_at: comment.updated_at.to_string(),
                }
                .into(),
            ));
        }
    }
    Ok(())
}
