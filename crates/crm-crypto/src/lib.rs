//! Cryptographic primitives for the CRM persistence core.
//!
//! Provides order-independent canonicalization of JSON documents, SHA-256
//! content hashing over the canonical form, and verification of per-document
//! audit hash chains.
//!
//! All digests come from the `sha2` crate; nothing here is custom cryptography.

pub mod canonical;
pub mod chain;
pub mod hasher;

pub use canonical::{canonical_bytes, canonicalize};
pub use chain::{ChainError, ChainLink, ChainVerifier};
pub use hasher::ContentHasher;
