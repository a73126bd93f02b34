//! Foundation types for the CRM persistence core.
//!
//! Every other `crm-*` crate depends on `crm-types`.
//!
//! # Key Types
//!
//! - [`EntityMeta`] -- Metadata shared by every stored business record
//! - [`Revision`] -- Opaque store-assigned token used for compare-and-swap writes
//! - [`ContentHash`] -- SHA-256 digest of a canonicalized document
//! - [`AuditLogEntry`] -- One immutable link in a document's audit chain
//! - [`FieldChange`] -- A single top-level field difference in an update
//! - [`Actor`] -- The user on whose behalf a mutation is made

pub mod actor;
pub mod audit;
pub mod entity;
pub mod error;
pub mod hash;
pub mod revision;

pub use actor::Actor;
pub use audit::{AuditLogEntry, FieldChange, Operation};
pub use entity::{fields, EntityMeta};
pub use error::TypeError;
pub use hash::{ContentHash, GENESIS_HASH};
pub use revision::Revision;

/// A stored document: always a JSON object at the top level.
pub type Document = serde_json::Value;
