use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use crm_crypto::{ChainVerifier, ContentHasher};
use crm_store::{AuditQuery, AuditStore};
use crm_types::{Actor, AuditLogEntry, ContentHash, Operation};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{cache_for, ChainHead, ChainHeadCache};
use crate::config::{AuditConfig, LookupMode};
use crate::diff::diff_fields;
use crate::error::{AuditError, AuditResult};

/// One mutation to be recorded in the audit log.
#[derive(Clone, Copy, Debug)]
pub struct ChangeRequest<'a> {
    pub document_id: &'a str,
    pub document_type: &'a str,
    pub operation: Operation,
    /// State after the mutation (`{"deleted": true}` for deletes).
    pub new_document: &'a Value,
    /// State before the mutation; `None` on create.
    pub old_document: Option<&'a Value>,
    pub actor: &'a Actor,
}

/// Summary of a successfully verified chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainReport {
    pub document_id: String,
    pub length: usize,
    pub head: ContentHash,
}

/// Maintains the per-document audit hash chain.
pub struct AuditService {
    store: Arc<dyn AuditStore>,
    cache: Arc<dyn ChainHeadCache>,
    config: AuditConfig,
}

impl AuditService {
    /// Service with the cache selected by `config.cache`.
    pub fn new(store: Arc<dyn AuditStore>, config: AuditConfig) -> Self {
        let cache = cache_for(config.cache);
        Self::with_cache(store, cache, config)
    }

    /// Service with a caller-supplied (e.g. shared) chain-head cache.
    pub fn with_cache(
        store: Arc<dyn AuditStore>,
        cache: Arc<dyn ChainHeadCache>,
        config: AuditConfig,
    ) -> Self {
        Self {
            store,
            cache,
            config,
        }
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Hash the new state, link it to the document's chain head, and
    /// persist the entry.
    ///
    /// Returns only once the entry is durably stored. An append rejected
    /// because the chain moved underneath is rebuilt against the fresh head
    /// up to `max_chain_retries` times.
    pub async fn log_change(&self, change: ChangeRequest<'_>) -> AuditResult<AuditLogEntry> {
        let hash = ContentHasher::hash_document(change.new_document);
        let changes = match (change.operation, change.old_document) {
            (Operation::Update, Some(old)) => Some(diff_fields(old, change.new_document)),
            _ => None,
        };

        let mut attempts = 0;
        loop {
            attempts += 1;
            let head = self.chain_head(change.document_id).await?;
            let timestamp = next_timestamp(head.timestamp);
            let entry = AuditLogEntry {
                id: AuditLogEntry::derive_id(change.document_id, timestamp),
                document_id: change.document_id.to_string(),
                document_type: change.document_type.to_string(),
                operation: change.operation,
                hash,
                previous_hash: head.hash,
                user_id: change.actor.user_id.clone(),
                user_email: change.actor.user_email.clone(),
                timestamp,
                changes: changes.clone(),
            };

            match self.store.append(&entry).await {
                Ok(()) => {
                    let new_head = ChainHead {
                        hash,
                        timestamp: Some(timestamp),
                    };
                    self.cache_put(change.document_id, new_head).await;
                    info!(
                        document_id = %entry.document_id,
                        operation = %entry.operation,
                        hash = %hash.short_hex(),
                        "audit entry recorded"
                    );
                    return Ok(entry);
                }
                Err(e) => {
                    self.cache_invalidate(change.document_id).await;
                    if !e.is_conflict() {
                        return Err(AuditError::Append(e));
                    }
                    if attempts > self.config.max_chain_retries {
                        return Err(AuditError::ChainConflict {
                            document_id: change.document_id.to_string(),
                            attempts,
                        });
                    }
                    warn!(
                        document_id = %change.document_id,
                        attempt = attempts,
                        error = %e,
                        "audit chain moved concurrently, rebuilding entry"
                    );
                }
            }
        }
    }

    /// Hash of the newest entry for `document_id`, or genesis if it has none.
    pub async fn get_last_audit_hash(&self, document_id: &str) -> AuditResult<ContentHash> {
        Ok(self.chain_head(document_id).await?.hash)
    }

    /// Full audit history of a document, oldest first.
    pub async fn history(&self, document_id: &str) -> AuditResult<Vec<AuditLogEntry>> {
        self.store
            .find(&AuditQuery::for_document(document_id))
            .await
            .map_err(AuditError::Query)
    }

    /// Re-read a document's history and check every link.
    pub async fn verify_chain(&self, document_id: &str) -> AuditResult<ChainReport> {
        let entries = self.history(document_id).await?;
        ChainVerifier::verify(&entries).map_err(|source| AuditError::Integrity {
            document_id: document_id.to_string(),
            source,
        })?;
        Ok(ChainReport {
            document_id: document_id.to_string(),
            length: entries.len(),
            head: entries
                .last()
                .map(|e| e.hash)
                .unwrap_or_else(ContentHash::genesis),
        })
    }

    async fn chain_head(&self, document_id: &str) -> AuditResult<ChainHead> {
        match self.cache.get(document_id).await {
            Ok(Some(head)) => {
                debug!(document_id, "chain head served from cache");
                return Ok(head);
            }
            Ok(None) => {}
            Err(e) => warn!(document_id, error = %e, "chain head cache read failed"),
        }

        let head = match self.store.latest(document_id).await {
            Ok(Some(entry)) => ChainHead {
                hash: entry.hash,
                timestamp: Some(entry.timestamp),
            },
            Ok(None) => ChainHead::genesis(),
            Err(source) => {
                return match self.config.lookup_mode {
                    LookupMode::Strict => Err(AuditError::ChainLookup {
                        document_id: document_id.to_string(),
                        source,
                    }),
                    LookupMode::Lenient => {
                        warn!(
                            document_id,
                            error = %source,
                            "chain head lookup failed, continuing from genesis"
                        );
                        Ok(ChainHead::genesis())
                    }
                };
            }
        };

        self.cache_put(document_id, head).await;
        Ok(head)
    }

    async fn cache_put(&self, document_id: &str, head: ChainHead) {
        if let Err(e) = self.cache.put(document_id, head).await {
            warn!(document_id, error = %e, "chain head cache write failed");
            self.cache_invalidate(document_id).await;
        }
    }

    async fn cache_invalidate(&self, document_id: &str) {
        if let Err(e) = self.cache.invalidate(document_id).await {
            warn!(document_id, error = %e, "chain head cache invalidation failed");
        }
    }
}

/// Entry timestamps strictly increase along a chain, even within one clock tick.
fn next_timestamp(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match previous {
        Some(prev) if now <= prev => prev + Duration::microseconds(1),
        _ => now,
    }
}
