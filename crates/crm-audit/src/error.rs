use crm_crypto::ChainError;
use crm_store::StoreError;

/// Errors produced by the audit service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuditError {
    /// The audit entry could not be persisted.
    #[error("audit append failed: {0}")]
    Append(#[source] StoreError),

    /// The chain head could not be read (strict lookup mode).
    #[error("chain head lookup failed for {document_id}: {source}")]
    ChainLookup {
        document_id: String,
        #[source]
        source: StoreError,
    },

    /// Another writer kept extending the chain while this entry was built.
    #[error("chain for {document_id} moved concurrently after {attempts} attempts")]
    ChainConflict { document_id: String, attempts: u32 },

    /// Stored history does not form a valid chain.
    #[error("audit chain for {document_id} is broken: {source}")]
    Integrity {
        document_id: String,
        #[source]
        source: ChainError,
    },

    #[error("audit store query failed: {0}")]
    Query(#[source] StoreError),

    #[error("chain head cache error: {0}")]
    Cache(String),
}

/// Result alias for audit operations.
pub type AuditResult<T> = Result<T, AuditError>;
