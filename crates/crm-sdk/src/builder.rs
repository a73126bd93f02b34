use std::sync::Arc;

use crm_audit::{AuditService, ChainHeadCache, ChainReport};
use crm_repository::{Entity, Repository};
use crm_store::{AuditStore, DocumentStore, InMemoryAuditStore, InMemoryDocumentStore};
use crm_types::AuditLogEntry;
use tracing::info;

use crate::config::CoreConfig;
use crate::error::SdkResult;

/// The wired persistence core: one document store, one audit store and the
/// audit service shared by every repository handed out.
#[derive(Clone)]
pub struct Core {
    config: CoreConfig,
    documents: Arc<dyn DocumentStore>,
    audit: Arc<AuditService>,
}

impl Core {
    pub fn builder() -> CoreBuilder {
        CoreBuilder::default()
    }

    /// A core over fresh in-memory stores.
    pub fn in_memory(config: CoreConfig) -> Self {
        Self::builder().config(config).build()
    }

    /// A typed repository for `T`.
    pub fn repository<T: Entity>(&self) -> Repository<T> {
        Repository::new(
            Arc::clone(&self.documents),
            Arc::clone(&self.audit),
            self.config.repository.clone(),
        )
    }

    pub fn audit(&self) -> &Arc<AuditService> {
        &self.audit
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Audit history of any document id, oldest first.
    pub async fn history(&self, document_id: &str) -> SdkResult<Vec<AuditLogEntry>> {
        Ok(self.audit.history(document_id).await?)
    }

    /// Re-read and check the audit chain of one document id.
    pub async fn verify_chain(&self, document_id: &str) -> SdkResult<ChainReport> {
        Ok(self.audit.verify_chain(document_id).await?)
    }
}

impl std::fmt::Debug for Core {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Core").field("config", &self.config).finish()
    }
}

/// Builder for [`Core`]. Stores left unset default to in-memory backends.
#[derive(Default)]
pub struct CoreBuilder {
    config: CoreConfig,
    documents: Option<Arc<dyn DocumentStore>>,
    audit_store: Option<Arc<dyn AuditStore>>,
    cache: Option<Arc<dyn ChainHeadCache>>,
}

impl CoreBuilder {
    pub fn config(mut self, config: CoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn document_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.documents = Some(store);
        self
    }

    pub fn audit_store(mut self, store: Arc<dyn AuditStore>) -> Self {
        self.audit_store = Some(store);
        self
    }

    /// Use this chain-head cache instead of the one `config.audit.cache` selects.
    pub fn chain_head_cache(mut self, cache: Arc<dyn ChainHeadCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn build(self) -> Core {
        let documents = self
            .documents
            .unwrap_or_else(|| Arc::new(InMemoryDocumentStore::new()));
        let audit_store = self
            .audit_store
            .unwrap_or_else(|| Arc::new(InMemoryAuditStore::new()));
        let audit = match self.cache {
            Some(cache) => AuditService::with_cache(audit_store, cache, self.config.audit.clone()),
            None => AuditService::new(audit_store, self.config.audit.clone()),
        };
        info!(
            lookup_mode = ?self.config.audit.lookup_mode,
            cache = ?self.config.audit.cache,
            "persistence core initialized"
        );
        Core {
            config: self.config,
            documents,
            audit: Arc::new(audit),
        }
    }
}
