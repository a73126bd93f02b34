use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TypeError;

/// Opaque revision token assigned by the document store on every write.
///
/// Callers must hand the current token back to update or delete a document;
/// a stale token is rejected by the store. The format is
/// `{generation}-{uuid}`, where the generation counts successful writes.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    /// Wrap a token produced elsewhere (e.g. read back from a store).
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The token for a freshly created document.
    pub fn first() -> Self {
        Self::with_generation(1)
    }

    /// The token that supersedes `self`.
    pub fn next(&self) -> Result<Self, TypeError> {
        Ok(Self::with_generation(self.generation()? + 1))
    }

    fn with_generation(generation: u64) -> Self {
        Self(format!("{generation}-{}", Uuid::now_v7().simple()))
    }

    /// Number of successful writes this token represents.
    pub fn generation(&self) -> Result<u64, TypeError> {
        self.0
            .split_once('-')
            .and_then(|(generation, _)| generation.parse().ok())
            .ok_or_else(|| TypeError::InvalidRevision(self.0.clone()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Revision({})", self.0)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
