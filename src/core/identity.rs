//! Identity atoms.
//!
//! CommentId: 12-char opaque token, unique within a project
//! ProjectId / Pathname: the key of one comment file
//! BranchName / CommitSha: git coordinates carried for provenance

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::error::{CoreError, InvalidId};

/// Escape a raw identifier into a filesystem-safe storage name.
///
/// ASCII alphanumerics and `-` pass through; every other byte becomes
/// `_xx` (lowercase hex), including `_` itself and `/`. Distinct inputs
/// always produce distinct names, so two pages can never share a
/// storage file.
pub(crate) fn slug_encode(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' {
            out.push(b as char);
        } else {
            out.push('_');
            out.push_str(&format!("{b:02x}"));
        }
    }
    out
}

/// Alphabet used for generated comment ids (nanoid default alphabet).
const ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

/// Length of a comment id.
pub const COMMENT_ID_LEN: usize = 12;

/// Comment identifier - 12 characters from the nanoid alphabet.
///
/// Globally unique within a project in practice; the merge still detects
/// collisions rather than trusting the token space.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommentId(String);

impl CommentId {
    pub fn parse(s: impl Into<String>) -> Result<Self, CoreError> {
        let s = s.into();
        if s.len() != COMMENT_ID_LEN {
            return Err(InvalidId::Comment {
                raw: s,
                reason: format!("must be exactly {COMMENT_ID_LEN} characters"),
            }
            .into());
        }
        if let Some(bad) = s.bytes().find(|b| !ID_ALPHABET.contains(b)) {
            return Err(InvalidId::Comment {
                raw: s,
                reason: format!("invalid character `{}`", bad as char),
            }
            .into());
        }
        Ok(Self(s))
    }

    /// Generate a fresh random id.
    pub fn generate(rng: &mut impl Rng) -> Self {
        let token: String = (0..COMMENT_ID_LEN)
            .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
            .collect();
        Self(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[cfg(test)]
    pub fn new_unchecked(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl fmt::Debug for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommentId({:?})", self.0)
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for CommentId {
    type Error = CoreError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        CommentId::parse(s)
    }
}

impl From<CommentId> for String {
    fn from(id: CommentId) -> String {
        id.0
    }
}

/// Project identifier - non-empty string after trimming.
///
/// Comes from the host page (script tag data attribute) or CLI config;
/// validation only rejects empty/whitespace-only values.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectId(String);

impl ProjectId {
    pub fn parse(s: impl Into<String>) -> Result<Self, CoreError> {
        let s = s.into();
        if s.trim().is_empty() {
            return Err(InvalidId::Project {
                raw: s,
                reason: "empty".into(),
            }
            .into());
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filesystem-safe slug for the project's storage directory.
    pub fn slug(&self) -> String {
        slug_encode(&self.0)
    }
}

impl fmt::Debug for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProjectId({:?})", self.0)
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ProjectId {
    type Error = CoreError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        ProjectId::parse(s)
    }
}

impl From<ProjectId> for String {
    fn from(id: ProjectId) -> String {
        id.0
    }
}

/// Page pathname - must start with `/` and contain no whitespace.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pathname(String);

impl Pathname {
    pub fn parse(s: impl Into<String>) -> Result<Self, CoreError> {
        let s = s.into();
        if !s.starts_with('/') {
            return Err(InvalidId::Pathname {
                raw: s,
                reason: "must start with `/`".into(),
            }
            .into());
        }
        if s.chars().any(char::is_whitespace) {
            return Err(InvalidId::Pathname {
                raw: s,
                reason: "must not contain whitespace".into(),
            }
            .into());
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filesystem-safe slug for storage keys ("/" -> "_root",
    /// "/a/b" -> "a_2fb").
    ///
    /// The root pathname maps to `_root`, which the escape scheme can
    /// never emit (`_` is always followed by two hex digits), so every
    /// pathname gets its own storage file.
    pub fn slug(&self) -> String {
        let rest = &self.0[1..];
        if rest.is_empty() {
            return "_root".to_string();
        }
        slug_encode(rest)
    }
}

impl fmt::Debug for Pathname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pathname({:?})", self.0)
    }
}

impl fmt::Display for Pathname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Pathname {
    type Error = CoreError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Pathname::parse(s)
    }
}

impl From<Pathname> for String {
    fn from(p: Pathname) -> String {
        p.0
    }
}

/// Git branch name the comment was created on.
///
/// Not interpreted by the engine; validation rejects only empty values.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    pub fn parse(s: impl Into<String>) -> Result<Self, CoreError> {
        let s = s.into();
        if s.trim().is_empty() {
            return Err(InvalidId::Branch {
                raw: s,
                reason: "empty".into(),
            }
            .into());
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BranchName({:?})", self.0)
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for BranchName {
    type Error = CoreError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        BranchName::parse(s)
    }
}

impl From<BranchName> for String {
    fn from(b: BranchName) -> String {
        b.0
    }
}

/// Git commit sha - 7 to 40 lowercase hex characters.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommitSha(String);

impl CommitSha {
    pub fn parse(s: impl Into<String>) -> Result<Self, CoreError> {
        let s = s.into();
        if s.len() < 7 || s.len() > 40 {
            return Err(InvalidId::CommitSha {
                raw: s,
                reason: "must be 7 to 40 characters".into(),
            }
            .into());
        }
        if !s.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()) {
            return Err(InvalidId::CommitSha {
                raw: s,
                reason: "must be lowercase hex".into(),
            }
            .into());
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CommitSha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommitSha({})", self.0)
    }
}

impl fmt::Display for CommitSha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for CommitSha {
    type Error = CoreError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        CommitSha::parse(s)
    }
}

impl From<CommitSha> for String {
    fn from(sha: CommitSha) -> String {
        sha.0
    }
}
