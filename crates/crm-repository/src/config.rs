use serde::{Deserialize, Serialize};

/// Pagination limits applied by every repository.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Page size when the caller does not ask for one.
    pub default_page_size: u32,
    /// Larger requested page sizes are clamped to this.
    pub max_page_size: u32,
    /// Upper bound on the documents counted for a page's `total`.
    pub count_ceiling: usize,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            default_page_size: 25,
            max_page_size: 100,
            count_ceiling: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RepositoryConfig::default();
        assert_eq!(config.default_page_size, 25);
        assert_eq!(config.max_page_size, 100);
        assert_eq!(config.count_ceiling, 10_000);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: RepositoryConfig = serde_json::from_str(r#"{"max_page_size": 50}"#).unwrap();
        assert_eq!(config.max_page_size, 50);
        assert_eq!(config.default_page_size, 25);
    }
}
