use crm_types::ContentHash;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::canonical::canonical_bytes;

/// SHA-256 content hasher over canonicalized documents.
///
/// The digest covers the canonical form only, so logically equal documents
/// hash identically regardless of key order or store-assigned `_id`/`_rev`.
pub struct ContentHasher;

impl ContentHasher {
    /// Hash a JSON document in canonical form.
    pub fn hash_document(document: &Value) -> ContentHash {
        Self::hash_bytes(&canonical_bytes(document))
    }

    /// Raw SHA-256 over arbitrary bytes.
    pub fn hash_bytes(data: &[u8]) -> ContentHash {
        ContentHash::from_digest(Sha256::digest(data).into())
    }

    /// Verify that a document produces the expected hash.
    pub fn verify(document: &Value, expected: &ContentHash) -> bool {
        Self::hash_document(document) == *expected
    }
}
