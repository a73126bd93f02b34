//! Chain-head caches for the last-hash lookup.
//!
//! The audit store is the source of truth for every chain head. A cache only
//! saves the store round trip; it is written after a successful append and
//! invalidated whenever an append fails. [`LocalChainHeadCache`] lives in one
//! process and is only sound when that process is the single writer; a cache
//! shared between replicas can be plugged in by implementing
//! [`ChainHeadCache`] over an externally consistent backend.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crm_types::ContentHash;

use crate::config::CacheMode;
use crate::error::{AuditError, AuditResult};

/// Hash and timestamp of the newest entry in a document's chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainHead {
    pub hash: ContentHash,
    /// `None` while the chain is still empty.
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChainHead {
    pub fn genesis() -> Self {
        Self {
            hash: ContentHash::genesis(),
            timestamp: None,
        }
    }
}

#[async_trait]
pub trait ChainHeadCache: Send + Sync {
    async fn get(&self, document_id: &str) -> AuditResult<Option<ChainHead>>;
    async fn put(&self, document_id: &str, head: ChainHead) -> AuditResult<()>;
    async fn invalidate(&self, document_id: &str) -> AuditResult<()>;
}

/// Never caches; every lookup goes to the audit store.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoChainHeadCache;

#[async_trait]
impl ChainHeadCache for NoChainHeadCache {
    async fn get(&self, _document_id: &str) -> AuditResult<Option<ChainHead>> {
        Ok(None)
    }

    async fn put(&self, _document_id: &str, _head: ChainHead) -> AuditResult<()> {
        Ok(())
    }

    async fn invalidate(&self, _document_id: &str) -> AuditResult<()> {
        Ok(())
    }
}

/// Process-local, unbounded map of chain heads.
#[derive(Debug, Default)]
pub struct LocalChainHeadCache {
    heads: RwLock<HashMap<String, ChainHead>>,
}

impl LocalChainHeadCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.heads.read().map(|h| h.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ChainHeadCache for LocalChainHeadCache {
    async fn get(&self, document_id: &str) -> AuditResult<Option<ChainHead>> {
        let heads = self
            .heads
            .read()
            .map_err(|_| AuditError::Cache("chain head cache lock poisoned".into()))?;
        Ok(heads.get(document_id).copied())
    }

    async fn put(&self, document_id: &str, head: ChainHead) -> AuditResult<()> {
        let mut heads = self
            .heads
            .write()
            .map_err(|_| AuditError::Cache("chain head cache lock poisoned".into()))?;
        heads.insert(document_id.to_string(), head);
        Ok(())
    }

    async fn invalidate(&self, document_id: &str) -> AuditResult<()> {
        let mut heads = self
            .heads
            .write()
            .map_err(|_| AuditError::Cache("chain head cache lock poisoned".into()))?;
        heads.remove(document_id);
        Ok(())
    }
}

/// Build the cache selected by `mode`.
pub fn cache_for(mode: CacheMode) -> Arc<dyn ChainHeadCache> {
    match mode {
        CacheMode::Disabled => Arc::new(NoChainHeadCache),
        CacheMode::Local => Arc::new(LocalChainHeadCache::new()),
    }
}
