use crm_audit::AuditError;
use crm_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Missing, or stored under a different entity type.
    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: &'static str, id: String },

    /// The store rejected a write carrying a stale revision, or the id is taken.
    #[error("concurrent modification of {id}: re-read and retry")]
    ConcurrencyConflict { id: String },

    /// The audit entry could not be written; the document store was not touched.
    #[error("audit write failed, mutation aborted: {0}")]
    AuditWriteFailure(#[from] AuditError),

    #[error("document store error: {0}")]
    Store(StoreError),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl RepositoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }

    pub fn is_audit_failure(&self) -> bool {
        matches!(self, Self::AuditWriteFailure(_))
    }

    /// Classify a store error raised while operating on `id`.
    pub(crate) fn from_store(entity_type: &'static str, id: &str, err: StoreError) -> Self {
        match err {
            StoreError::Conflict { .. } => Self::ConcurrencyConflict { id: id.to_string() },
            StoreError::NotFound { .. } => Self::NotFound {
                entity_type,
                id: id.to_string(),
            },
            other => Self::Store(other),
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
