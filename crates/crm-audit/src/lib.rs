//! Tamper-evident audit log for the CRM persistence core.
//!
//! This crate provides:
//! - [`AuditService`] -- hashes new document states, links each entry to the
//!   previous one for the same document, and persists it to an
//!   [`AuditStore`](crm_store::AuditStore)
//! - [`diff_fields`] -- flat field-level diff recorded on updates
//! - [`ChainHeadCache`] strategies for the last-hash lookup
//! - [`AuditConfig`] -- strict/lenient lookup and cache selection

pub mod cache;
pub mod config;
pub mod diff;
pub mod error;
pub mod service;

pub use cache::{cache_for, ChainHead, ChainHeadCache, LocalChainHeadCache, NoChainHeadCache};
pub use config::{AuditConfig, CacheMode, LookupMode};
pub use diff::diff_fields;
pub use error::{AuditError, AuditResult};
pub use service::{AuditService, ChainReport, ChangeRequest};
