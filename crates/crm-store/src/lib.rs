//! Storage boundaries for the CRM persistence core.
//!
//! The core talks to two independent stores:
//!
//! - a [`DocumentStore`] holding the current state of every record, with
//!   compare-and-swap writes keyed on [`Revision`](crm_types::Revision) tokens;
//! - an [`AuditStore`] holding immutable [`AuditLogEntry`](crm_types::AuditLogEntry)
//!   records, queryable by document id and timestamp.
//!
//! # Storage Backends
//!
//! - [`InMemoryDocumentStore`] -- `BTreeMap`-based document store for tests and embedding
//! - [`InMemoryAuditStore`] -- append-only audit log for tests and embedding
//!
//! # Design Rules
//!
//! 1. A write carrying a stale revision is rejected with [`StoreError::Conflict`].
//! 2. Point lookups return `Ok(None)` for a missing document, never an error.
//! 3. An audit append whose `previous_hash` is not the current chain head is
//!    rejected with [`StoreError::Conflict`].
//! 4. All backend errors are propagated, never silently ignored.

pub mod audit_log;
pub mod error;
pub mod memory;
pub mod query;
pub mod traits;

pub use audit_log::InMemoryAuditStore;
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryDocumentStore;
pub use query::{AuditQuery, Condition, FindQuery, Selector, SortOrder, SortSpec};
pub use traits::{AuditStore, DocumentStore};
