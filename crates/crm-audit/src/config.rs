use serde::{Deserialize, Serialize};

/// What `get_last_audit_hash` does when the audit store cannot be read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupMode {
    /// Fail the lookup; the mutation it was for is aborted.
    #[default]
    Strict,
    /// Log a warning and continue from the genesis hash.
    Lenient,
}

/// Which chain-head cache the service builds for itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    /// Always read the head from the audit store.
    #[default]
    Disabled,
    /// Process-local map. Only sound with a single writer process.
    Local,
}

/// Configuration for [`AuditService`](crate::AuditService).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub lookup_mode: LookupMode,
    pub cache: CacheMode,
    /// How many times an append rejected for a stale chain head is rebuilt
    /// against the fresh head before giving up.
    pub max_chain_retries: u32,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            lookup_mode: LookupMode::Strict,
            cache: CacheMode::Disabled,
            max_chain_retries: 2,
        }
    }
}

impl AuditConfig {
    /// Local cache with a genesis fallback when the head cannot be read.
    pub fn lenient_cached() -> Self {
        Self {
            lookup_mode: LookupMode::Lenient,
            cache: CacheMode::Local,
            ..Default::default()
        }
    }
}
