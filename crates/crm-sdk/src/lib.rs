//! High-level SDK for the CRM persistence core.
//!
//! Wires a document store, an audit store and the audit service together
//! and hands out typed [`Repository`] instances. This is the main entry
//! point for business modules embedding the core.

pub mod builder;
pub mod config;
pub mod error;
pub mod telemetry;

pub use crate::builder::{Core, CoreBuilder};
pub use crate::config::CoreConfig;
pub use crate::error::{SdkError, SdkResult};
pub use crate::telemetry::init_tracing;

// Re-export key types
pub use crm_audit::{AuditConfig, AuditService, CacheMode, ChainReport, LookupMode};
pub use crm_repository::{Entity, FindOptions, Page, Repository, RepositoryConfig, RepositoryError};
pub use crm_store::{Condition, Selector, SortOrder};
pub use crm_types::{Actor, AuditLogEntry, EntityMeta, FieldChange, Operation};
