use std::path::Path;

use crm_audit::AuditConfig;
use crm_repository::RepositoryConfig;
use serde::{Deserialize, Serialize};

use crate::error::SdkResult;

/// Top-level configuration, usually loaded from a TOML file:
///
/// ```toml
/// [audit]
/// lookup_mode = "strict"
/// cache = "disabled"
/// max_chain_retries = 2
///
/// [repository]
/// default_page_size = 25
/// max_page_size = 100
/// count_ceiling = 10000
/// ```
///
/// Missing sections and keys take their defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub audit: AuditConfig,
    pub repository: RepositoryConfig,
}

impl CoreConfig {
    pub fn from_toml_str(source: &str) -> SdkResult<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&source)
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
