//! Crate-level error type.
//!
//! Layer errors stay in their modules; this aggregates them for callers
//! that do not care which layer failed. `Transience` tells such callers
//! whether a retry can help.

use thiserror::Error;

use crate::config::ConfigError;
use crate::core::CoreError;
use crate::dom::SelectorParseError;
use crate::store::StoreError;

/// Retry classification for an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transience {
    /// Retrying may succeed (contention, races).
    Transient,
    /// Retrying will fail the same way.
    Permanent,
}

/// Any error this crate produces.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Selector(#[from] SelectorParseError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {
    pub fn transience(&self) -> Transience {
        match self {
            Error::Store(err) => err.transience(),
            _ => Transience::Permanent,
        }
    }
}
