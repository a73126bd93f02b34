use crm_store::SortOrder;
use crm_types::fields;
use serde::{Deserialize, Serialize};

use crate::config::RepositoryConfig;
use crate::error::{RepositoryError, RepositoryResult};

/// Paging and ordering for list queries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FindOptions {
    /// 1-based page number.
    pub page: u32,
    /// `None` uses the configured default page size.
    pub limit: Option<u32>,
    pub sort: String,
    pub order: SortOrder,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            page: 1,
            limit: None,
            sort: fields::CREATED_AT.to_string(),
            order: SortOrder::Desc,
        }
    }
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort = field.into();
        self.order = order;
        self
    }

    /// Validated `(page, limit)` with the limit clamped to the configured maximum.
    pub(crate) fn resolve(&self, config: &RepositoryConfig) -> RepositoryResult<(u32, u32)> {
        if self.page == 0 {
            return Err(RepositoryError::InvalidArgument("page is 1-based".into()));
        }
        let limit = self.limit.unwrap_or(config.default_page_size);
        if limit == 0 {
            return Err(RepositoryError::InvalidArgument(
                "limit must be at least 1".into(),
            ));
        }
        Ok((self.page, limit.min(config.max_page_size.max(1))))
    }
}

/// One page of query results.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    /// Matching documents, counted up to the configured ceiling.
    pub total: usize,
    pub page: u32,
    pub limit: u32,
    /// `ceil(total / limit)`.
    pub total_pages: usize,
    /// More documents match than the count ceiling; `total` is the ceiling.
    pub total_capped: bool,
}

impl<T> Page<T> {
    pub(crate) fn new(data: Vec<T>, total: usize, page: u32, limit: u32, total_capped: bool) -> Self {
        Self {
            data,
            total,
            page,
            limit,
            total_pages: total.div_ceil(limit as usize),
            total_capped,
        }
    }

    pub fn has_next(&self) -> bool {
        (self.page as usize) < self.total_pages
    }
}
