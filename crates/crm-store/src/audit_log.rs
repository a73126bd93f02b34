use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use crm_types::{AuditLogEntry, ContentHash};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::query::{AuditQuery, SortOrder};
use crate::traits::AuditStore;

/// In-memory, append-only audit store.
///
/// Entries are kept in append order per document. Because `append` only
/// accepts an entry that extends the current chain head, append order and
/// chain order coincide.
///
/// Reads and appends can be switched to fail, to exercise callers' handling
/// of an unavailable audit backend.
pub struct InMemoryAuditStore {
    inner: RwLock<AuditState>,
    fail_appends: AtomicBool,
    fail_reads: AtomicBool,
}

#[derive(Default)]
struct AuditState {
    chains: HashMap<String, Vec<AuditLogEntry>>,
    entry_ids: HashSet<String>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(AuditState::default()),
            fail_appends: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
        }
    }

    /// Make every subsequent `append` fail with `Unavailable`.
    pub fn set_fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `find`/`latest` fail with `Unavailable`.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Total number of stored entries across all documents.
    pub fn len(&self) -> usize {
        self.inner.read().map(|s| s.entry_ids.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overwrite a stored entry in place, bypassing chain checks.
    ///
    /// Only for tamper-detection tests; real audit backends never allow this.
    pub fn tamper(&self, document_id: &str, index: usize, edit: impl FnOnce(&mut AuditLogEntry)) {
        if let Ok(mut state) = self.inner.write() {
            if let Some(entry) = state
                .chains
                .get_mut(document_id)
                .and_then(|chain| chain.get_mut(index))
            {
                edit(entry);
            }
        }
    }
}

impl Default for InMemoryAuditStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn append(&self, entry: &AuditLogEntry) -> StoreResult<()> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("audit store rejected append".into()));
        }

        let mut state = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        if state.entry_ids.contains(&entry.id) {
            return Err(StoreError::Conflict {
                id: entry.id.clone(),
                reason: "audit entry id already exists".into(),
            });
        }

        let head = state
            .chains
            .get(&entry.document_id)
            .and_then(|chain| chain.last())
            .map(|last| last.hash)
            .unwrap_or_else(ContentHash::genesis);
        if entry.previous_hash != head {
            return Err(StoreError::Conflict {
                id: entry.document_id.clone(),
                reason: format!(
                    "previous hash {} does not extend chain head {}",
                    entry.previous_hash.short_hex(),
                    head.short_hex()
                ),
            });
        }

        state.entry_ids.insert(entry.id.clone());
        state
            .chains
            .entry(entry.document_id.clone())
            .or_default()
            .push(entry.clone());
        debug!(
            document_id = %entry.document_id,
            operation = %entry.operation,
            hash = %entry.hash.short_hex(),
            "audit entry appended"
        );
        Ok(())
    }

    async fn find(&self, query: &AuditQuery) -> StoreResult<Vec<AuditLogEntry>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("audit store rejected read".into()));
        }

        let state = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut entries: Vec<&AuditLogEntry> = match &query.document_id {
            Some(id) => state.chains.get(id).map(|c| c.iter().collect()).unwrap_or_default(),
            None => state.chains.values().flatten().collect(),
        };
        entries.retain(|e| {
            query.since.map_or(true, |since| e.timestamp >= since)
                && query.until.map_or(true, |until| e.timestamp <= until)
        });
        // Stable: entries sharing a timestamp keep append order.
        entries.sort_by_key(|e| e.timestamp);
        if query.order == SortOrder::Desc {
            entries.reverse();
        }

        Ok(entries
            .into_iter()
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }
}

impl std::fmt::Debug for InMemoryAuditStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryAuditStore")
            .field("entry_count", &self.len())
            .finish()
    }
}
