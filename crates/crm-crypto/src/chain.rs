use chrono::{DateTime, Utc};
use crm_types::{AuditLogEntry, ContentHash};
use serde_json::Value;

use crate::hasher::ContentHasher;

/// Trait for records that participate in a per-document hash chain.
pub trait ChainLink {
    /// The document whose history this link belongs to.
    fn document_id(&self) -> &str;
    /// Digest of the document state recorded by this link.
    fn hash(&self) -> ContentHash;
    /// Digest recorded by the previous link (genesis for the first).
    fn previous_hash(&self) -> ContentHash;
    fn timestamp(&self) -> DateTime<Utc>;
}

impl ChainLink for AuditLogEntry {
    fn document_id(&self) -> &str {
        &self.document_id
    }
    fn hash(&self) -> ContentHash {
        self.hash
    }
    fn previous_hash(&self) -> ContentHash {
        self.previous_hash
    }
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Hash chain integrity verifier.
///
/// Verifies that a sequence of entries forms a valid chain for one document:
/// the first entry links to genesis, each later entry links to its
/// predecessor's hash, and timestamps never go backwards.
pub struct ChainVerifier;

impl ChainVerifier {
    /// Verify a chain of links in timestamp order.
    pub fn verify(links: &[impl ChainLink]) -> Result<(), ChainError> {
        let Some(first) = links.first() else {
            return Ok(());
        };

        if !first.previous_hash().is_genesis() {
            return Err(ChainError::GenesisMismatch);
        }

        for i in 1..links.len() {
            let (prev, current) = (&links[i - 1], &links[i]);
            if current.document_id() != first.document_id() {
                return Err(ChainError::MixedDocuments { index: i });
            }
            if current.previous_hash() != prev.hash() {
                return Err(ChainError::BrokenLink { index: i });
            }
            if current.timestamp() < prev.timestamp() {
                return Err(ChainError::OutOfOrder { index: i });
            }
        }

        Ok(())
    }

    /// Verify the chain and, additionally, that each link's hash matches the
    /// document state it claims to record.
    ///
    /// `states[i]` is the document as written by the operation of `links[i]`.
    pub fn verify_with_states(links: &[impl ChainLink], states: &[Value]) -> Result<(), ChainError> {
        if links.len() != states.len() {
            return Err(ChainError::LengthMismatch {
                links: links.len(),
                states: states.len(),
            });
        }
        Self::verify(links)?;
        for (index, (link, state)) in links.iter().zip(states).enumerate() {
            if !ContentHasher::verify(state, &link.hash()) {
                return Err(ChainError::HashMismatch { index });
            }
        }
        Ok(())
    }
}

/// Errors from chain verification.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("first entry does not link to the genesis hash")]
    GenesisMismatch,

    #[error("broken link at index {index}: previous hash does not match")]
    BrokenLink { index: usize },

    #[error("entry at index {index} belongs to a different document")]
    MixedDocuments { index: usize },

    #[error("entry at index {index} is older than its predecessor")]
    OutOfOrder { index: usize },

    #[error("hash mismatch at index {index}: recorded hash differs from state")]
    HashMismatch { index: usize },

    #[error("{links} links but {states} states supplied")]
    LengthMismatch { links: usize, states: usize },
}
