use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::TypeError;
use crate::hash::ContentHash;

/// Kind of mutation recorded by an audit entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(Self::Create),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            other => Err(TypeError::UnknownOperation(other.to_string())),
        }
    }
}

/// A single top-level field difference between two document states.
///
/// `None` means the field was absent on that side, which is distinct from an
/// explicit JSON `null`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub field: String,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
}

// A present key, even `null`, is `Some`; only a missing key is `None`.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl FieldChange {
    pub fn new(field: impl Into<String>, old_value: Option<Value>, new_value: Option<Value>) -> Self {
        Self {
            field: field.into(),
            old_value,
            new_value,
        }
    }
}

/// One immutable link in a document's audit chain.
///
/// `hash` is the digest of the new document state; `previous_hash` is the
/// `hash` of the prior entry for the same `document_id`, or the genesis hash
/// for the first entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: String,
    pub document_id: String,
    pub document_type: String,
    pub operation: Operation,
    pub hash: ContentHash,
    pub previous_hash: ContentHash,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<Vec<FieldChange>>,
}

impl AuditLogEntry {
    /// Build an entry id from the document id, timestamp and a random suffix.
    pub fn derive_id(document_id: &str, timestamp: DateTime<Utc>) -> String {
        let mut suffix = [0u8; 4];
        rand::thread_rng().fill_bytes(&mut suffix);
        format!(
            "audit_{document_id}_{}_{}",
            timestamp.timestamp_millis(),
            hex::encode(suffix)
        )
    }

    /// Returns `true` if this entry opens a chain.
    pub fn is_genesis(&self) -> bool {
        self.previous_hash.is_genesis()
    }
}
