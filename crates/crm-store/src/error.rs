/// Errors from document and audit store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The target document does not exist.
    #[error("document not found: {id}")]
    NotFound { id: String },

    /// A compare-and-swap precondition failed: stale revision, duplicate id,
    /// or an audit entry that does not extend the current chain head.
    #[error("conflict on {id}: {reason}")]
    Conflict { id: String, reason: String },

    /// The document is not shaped the way the store requires.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Transport or backend failure.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
