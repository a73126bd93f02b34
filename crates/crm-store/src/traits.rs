use async_trait::async_trait;
use crm_types::{AuditLogEntry, Document, Revision};

use crate::error::StoreResult;
use crate::query::{AuditQuery, FindQuery};

/// Document backend with compare-and-swap writes.
///
/// All implementations must satisfy these invariants:
/// - Every successful `insert` returns a fresh revision token and stores it
///   in the document's `_rev` field.
/// - An `insert` without `_rev` creates the document and fails with
///   `Conflict` if the id is taken.
/// - An `insert` or `destroy` carrying a revision other than the current one
///   fails with `Conflict`; exactly one of two racing writers wins.
/// - `get` returns `Ok(None)` for a missing document.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Point lookup by `_id`.
    async fn get(&self, id: &str) -> StoreResult<Option<Document>>;

    /// Create or update a document. The document must carry a string `_id`.
    async fn insert(&self, document: Document) -> StoreResult<Revision>;

    /// Delete a document at the given revision.
    async fn destroy(&self, id: &str, rev: &Revision) -> StoreResult<()>;

    /// Structured query with sort, skip, limit and projection.
    async fn find(&self, query: &FindQuery) -> StoreResult<Vec<Document>>;
}

/// Append-mostly store dedicated to immutable audit entries.
///
/// `append` must reject with `Conflict` an entry whose `previous_hash` is not
/// the `hash` of the newest stored entry for the same document (or the
/// genesis hash when the document has no entries yet).
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Durably persist one entry.
    async fn append(&self, entry: &AuditLogEntry) -> StoreResult<()>;

    /// Entries matching `query`, ordered by timestamp.
    async fn find(&self, query: &AuditQuery) -> StoreResult<Vec<AuditLogEntry>>;

    /// The newest entry for a document, if any.
    async fn latest(&self, document_id: &str) -> StoreResult<Option<AuditLogEntry>> {
        let query = AuditQuery::for_document(document_id).newest_first().limit(1);
        Ok(self.find(&query).await?.into_iter().next())
    }
}
