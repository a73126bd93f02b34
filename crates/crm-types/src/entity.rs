use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::revision::Revision;

/// Top-level document keys with special meaning to the persistence core.
pub mod fields {
    pub const ID: &str = "_id";
    pub const REV: &str = "_rev";
    pub const TYPE: &str = "type";
    pub const CREATED_BY: &str = "createdBy";
    pub const CREATED_AT: &str = "createdAt";
    pub const MODIFIED_BY: &str = "modifiedBy";
    pub const MODIFIED_AT: &str = "modifiedAt";
    pub const VERSION: &str = "version";

    /// Keys owned by the document store; stripped before hashing.
    pub const STORE_METADATA: &[&str] = &[ID, REV];

    /// Keys that never appear in an update's field changes.
    pub const DIFF_IGNORED: &[&str] = &[ID, REV, MODIFIED_AT, MODIFIED_BY, VERSION];

    /// Keys a caller-supplied update patch can never overwrite.
    pub const PROTECTED: &[&str] = &[
        ID,
        REV,
        TYPE,
        CREATED_BY,
        CREATED_AT,
        MODIFIED_BY,
        MODIFIED_AT,
        VERSION,
    ];
}

/// Metadata every stored business record carries.
///
/// Domain structs embed this with `#[serde(flatten)]` so the keys sit at the
/// top level of the stored document next to the business fields.
///
/// Invariant: `version` starts at 1 on create and grows by exactly one on
/// each successful update.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMeta {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<Revision>,
    #[serde(rename = "type", default)]
    pub entity_type: String,
    #[serde(rename = "createdBy", default)]
    pub created_by: String,
    #[serde(rename = "createdAt", default, with = "fixed_width_time")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "modifiedBy", default)]
    pub modified_by: String,
    #[serde(rename = "modifiedAt", default, with = "fixed_width_time")]
    pub modified_at: DateTime<Utc>,
    #[serde(default)]
    pub version: u64,
}

impl EntityMeta {
    /// Blank metadata for a record that has not been persisted yet.
    pub fn draft() -> Self {
        Self {
            id: String::new(),
            rev: None,
            entity_type: String::new(),
            created_by: String::new(),
            created_at: DateTime::<Utc>::default(),
            modified_by: String::new(),
            modified_at: DateTime::<Utc>::default(),
            version: 0,
        }
    }

    /// Draft metadata with a caller-chosen id.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::draft()
        }
    }

    /// Stamp creation metadata: version 1, created == modified.
    pub fn stamp_created(&mut self, entity_type: &str, user_id: &str, now: DateTime<Utc>) {
        self.rev = None;
        self.entity_type = entity_type.to_string();
        self.created_by = user_id.to_string();
        self.created_at = now;
        self.modified_by = user_id.to_string();
        self.modified_at = now;
        self.version = 1;
    }

    /// Stamp modification metadata and bump the version.
    pub fn stamp_modified(&mut self, user_id: &str, now: DateTime<Utc>) {
        self.modified_by = user_id.to_string();
        self.modified_at = now;
        self.version += 1;
    }
}

impl Default for EntityMeta {
    fn default() -> Self {
        Self::draft()
    }
}

/// RFC 3339 with exactly nine fractional digits, so the stored strings sort
/// in chronological order.
mod fixed_width_time {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Nanos, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        DateTime::<Utc>::deserialize(deserializer)
    }
}
