use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use crm_types::{fields, Document, Revision};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::query::{collate, lookup, FindQuery, SortOrder};
use crate::traits::DocumentStore;

/// In-memory document store with revision-checked writes.
///
/// Intended for tests and embedding. Documents live in a `BTreeMap` keyed by
/// `_id` behind a `RwLock`, so unsorted queries come back in id order.
pub struct InMemoryDocumentStore {
    documents: RwLock<BTreeMap<String, Document>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of documents currently stored.
    pub fn len(&self) -> usize {
        self.documents.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if a document with this id is stored.
    pub fn contains(&self, id: &str) -> bool {
        self.documents
            .read()
            .map(|d| d.contains_key(id))
            .unwrap_or(false)
    }

    /// Remove all documents.
    pub fn clear(&self) {
        if let Ok(mut docs) = self.documents.write() {
            docs.clear();
        }
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, id: &str) -> StoreResult<Option<Document>> {
        let docs = self.documents.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(docs.get(id).cloned())
    }

    async fn insert(&self, mut document: Document) -> StoreResult<Revision> {
        let object = document
            .as_object_mut()
            .ok_or_else(|| StoreError::InvalidDocument("document must be a JSON object".into()))?;
        let id = object
            .get(fields::ID)
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| StoreError::InvalidDocument("document has no _id".into()))?
            .to_string();
        let supplied = match object.get(fields::REV) {
            None | Some(Value::Null) => None,
            Some(Value::String(rev)) => Some(Revision::new(rev.clone())),
            Some(_) => {
                return Err(StoreError::InvalidDocument("_rev must be a string".into()));
            }
        };

        let mut docs = self.documents.write().map_err(|_| StoreError::LockPoisoned)?;
        let current = docs.get(&id).and_then(current_revision);

        let next = match (supplied, current) {
            (None, None) => Revision::first(),
            (None, Some(_)) => {
                return Err(StoreError::Conflict {
                    id,
                    reason: "document already exists".into(),
                });
            }
            (Some(_), None) => return Err(StoreError::NotFound { id }),
            (Some(supplied), Some(current)) if supplied == current => current
                .next()
                .map_err(|e| StoreError::InvalidDocument(e.to_string()))?,
            (Some(_), Some(_)) => {
                return Err(StoreError::Conflict {
                    id,
                    reason: "revision mismatch".into(),
                });
            }
        };

        object.insert(fields::REV.into(), Value::String(next.as_str().to_string()));
        docs.insert(id.clone(), document);
        debug!(document_id = %id, revision = %next, "document written");
        Ok(next)
    }

    async fn destroy(&self, id: &str, rev: &Revision) -> StoreResult<()> {
        let mut docs = self.documents.write().map_err(|_| StoreError::LockPoisoned)?;
        let current = docs
            .get(id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        if current_revision(current).as_ref() != Some(rev) {
            return Err(StoreError::Conflict {
                id: id.to_string(),
                reason: "revision mismatch".into(),
            });
        }
        docs.remove(id);
        debug!(document_id = %id, "document destroyed");
        Ok(())
    }

    async fn find(&self, query: &FindQuery) -> StoreResult<Vec<Document>> {
        let docs = self.documents.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut matched: Vec<&Document> = docs
            .values()
            .filter(|doc| query.selector.matches(doc))
            .collect();
        sort_matches(&mut matched, query);

        let window = matched
            .into_iter()
            .skip(query.skip)
            .take(query.limit.unwrap_or(usize::MAX));
        Ok(match &query.fields {
            None => window.cloned().collect(),
            Some(fields) => window.map(|doc| project(doc, fields)).collect(),
        })
    }
}

fn current_revision(document: &Document) -> Option<Revision> {
    document
        .get(fields::REV)
        .and_then(Value::as_str)
        .map(Revision::new)
}

// Stable sort, so equal keys keep id order.
fn sort_matches(matched: &mut [&Document], query: &FindQuery) {
    if query.sort.is_empty() {
        return;
    }
    matched.sort_by(|a, b| {
        query
            .sort
            .iter()
            .map(|key| {
                let ordering = collate(lookup(a, &key.field), lookup(b, &key.field));
                match key.order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            })
            .find(|o| o.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

fn project(document: &Document, fields: &[String]) -> Document {
    let picked: Map<String, Value> = fields
        .iter()
        .filter_map(|f| document.get(f).map(|v| (f.clone(), v.clone())))
        .collect();
    Value::Object(picked)
}

impl std::fmt::Debug for InMemoryDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDocumentStore")
            .field("document_count", &self.len())
            .finish()
    }
}
