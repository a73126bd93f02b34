use std::marker::PhantomData;
use std::sync::Arc;

use chrono::Utc;
use crm_audit::{AuditService, ChangeRequest};
use crm_store::{DocumentStore, FindQuery, Selector, StoreError};
use crm_types::{fields, Actor, AuditLogEntry, Document, Operation};
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::RepositoryConfig;
use crate::entity::Entity;
use crate::error::{RepositoryError, RepositoryResult};
use crate::page::{FindOptions, Page};

/// Typed CRUD over one entity type with audit-then-write mutations.
///
/// Reads are confined to documents whose `type` tag equals
/// `T::ENTITY_TYPE`. Create, update and delete record an audit entry first
/// and only then write to the document store; if the audit write fails
/// the store is left untouched. Concurrency is optimistic: a stale revision
/// surfaces as [`RepositoryError::ConcurrencyConflict`] and retrying is up
/// to the caller.
pub struct Repository<T: Entity> {
    store: Arc<dyn DocumentStore>,
    audit: Arc<AuditService>,
    config: RepositoryConfig,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            audit: Arc::clone(&self.audit),
            config: self.config.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> Repository<T> {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        audit: Arc<AuditService>,
        config: RepositoryConfig,
    ) -> Self {
        Self {
            store,
            audit,
            config,
            _entity: PhantomData,
        }
    }

    pub fn entity_type(&self) -> &'static str {
        T::ENTITY_TYPE
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    // ---- Reads ----

    /// One page of all entities of this type.
    pub async fn find_all(&self, options: &FindOptions) -> RepositoryResult<Page<T>> {
        self.find_by_selector(Selector::all(), options).await
    }

    /// The entity with `id`, or `None` if it is absent or of another type.
    pub async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<T>> {
        match self.load(id).await? {
            Some(document) => decode(document).map(Some),
            None => Ok(None),
        }
    }

    /// One page of entities matching `selector`, always restricted to this
    /// repository's entity type.
    pub async fn find_by_selector(
        &self,
        selector: Selector,
        options: &FindOptions,
    ) -> RepositoryResult<Page<T>> {
        let (page, limit) = options.resolve(&self.config)?;
        let selector = selector.and(Selector::all().eq(fields::TYPE, T::ENTITY_TYPE));

        let counted = self
            .store
            .find(
                &FindQuery::new(selector.clone())
                    .fields(&[fields::ID])
                    .limit(self.config.count_ceiling.saturating_add(1)),
            )
            .await
            .map_err(RepositoryError::Store)?;
        // One id past the ceiling tells an exact count from a truncated one.
        let total_capped = counted.len() > self.config.count_ceiling;
        let total = counted.len().min(self.config.count_ceiling);

        let skip = (page as usize - 1).saturating_mul(limit as usize);
        let documents = self
            .store
            .find(
                &FindQuery::new(selector)
                    .sort_by(options.sort.clone(), options.order)
                    .skip(skip)
                    .limit(limit as usize),
            )
            .await
            .map_err(RepositoryError::Store)?;
        let data = documents
            .into_iter()
            .map(decode)
            .collect::<RepositoryResult<Vec<T>>>()?;

        debug!(
            entity_type = T::ENTITY_TYPE,
            page,
            limit,
            total,
            returned = data.len(),
            "page loaded"
        );
        Ok(Page::new(data, total, page, limit, total_capped))
    }

    /// Audit history of one entity id, oldest first.
    pub async fn audit_trail(&self, id: &str) -> RepositoryResult<Vec<AuditLogEntry>> {
        Ok(self.audit.history(id).await?)
    }

    // ---- Mutations ----

    /// Persist a new entity.
    ///
    /// Uses `meta.id` when set, otherwise generates `{type}_{uuid}`. Stamps
    /// version 1 and creation metadata, records the CREATE audit entry, then
    /// inserts. Returns the entity with its store-assigned revision.
    pub async fn create(&self, mut entity: T, actor: &Actor) -> RepositoryResult<T> {
        let id = match entity.meta().id.as_str() {
            "" => format!("{}_{}", T::ENTITY_TYPE, Uuid::now_v7().simple()),
            supplied => {
                // An existing id would otherwise get a CREATE entry appended
                // to its chain before the store rejects the insert.
                if self.fetch(supplied).await?.is_some() {
                    return Err(RepositoryError::ConcurrencyConflict {
                        id: supplied.to_string(),
                    });
                }
                supplied.to_string()
            }
        };
        entity.meta_mut().id = id.clone();
        entity
            .meta_mut()
            .stamp_created(T::ENTITY_TYPE, &actor.user_id, Utc::now());

        let document = encode(&entity)?;
        self.audit
            .log_change(ChangeRequest {
                document_id: &id,
                document_type: T::ENTITY_TYPE,
                operation: Operation::Create,
                new_document: &document,
                old_document: None,
                actor,
            })
            .await?;

        let rev = self
            .store
            .insert(document)
            .await
            .map_err(|e| RepositoryError::from_store(T::ENTITY_TYPE, &id, e))?;
        info!(entity_type = T::ENTITY_TYPE, document_id = %id, revision = %rev, "entity created");
        entity.meta_mut().rev = Some(rev);
        Ok(entity)
    }

    /// Shallow-merge `patch` over the stored entity and persist it.
    ///
    /// Metadata keys in the patch are ignored. The write carries the
    /// revision that was read, so a concurrent writer in between turns it
    /// into a [`RepositoryError::ConcurrencyConflict`].
    pub async fn update(&self, id: &str, patch: Value, actor: &Actor) -> RepositoryResult<T> {
        let Value::Object(patch) = patch else {
            return Err(RepositoryError::InvalidArgument(
                "update patch must be a JSON object".into(),
            ));
        };
        let existing = self.require(id).await?;
        let old_document = encode(&existing)?;

        let mut merged = old_document.clone();
        if let Some(target) = merged.as_object_mut() {
            for (key, value) in patch {
                if !fields::PROTECTED.contains(&key.as_str()) {
                    target.insert(key, value);
                }
            }
        }
        let mut entity: T = decode(merged)?;
        entity.meta_mut().stamp_modified(&actor.user_id, Utc::now());
        let document = encode(&entity)?;

        self.audit
            .log_change(ChangeRequest {
                document_id: id,
                document_type: T::ENTITY_TYPE,
                operation: Operation::Update,
                new_document: &document,
                old_document: Some(&old_document),
                actor,
            })
            .await?;

        let rev = self
            .store
            .insert(document)
            .await
            .map_err(|e| RepositoryError::from_store(T::ENTITY_TYPE, id, e))?;
        info!(
            entity_type = T::ENTITY_TYPE,
            document_id = %id,
            revision = %rev,
            version = entity.version(),
            "entity updated"
        );
        entity.meta_mut().rev = Some(rev);
        Ok(entity)
    }

    /// Record a DELETE audit entry, then remove the entity at the revision read.
    pub async fn delete(&self, id: &str, actor: &Actor) -> RepositoryResult<()> {
        let existing = self.require(id).await?;
        let rev = existing.meta().rev.clone().ok_or_else(|| {
            RepositoryError::InvalidDocument(format!("stored document {id} has no _rev"))
        })?;
        let old_document = encode(&existing)?;
        let tombstone = json!({ "deleted": true });

        self.audit
            .log_change(ChangeRequest {
                document_id: id,
                document_type: T::ENTITY_TYPE,
                operation: Operation::Delete,
                new_document: &tombstone,
                old_document: Some(&old_document),
                actor,
            })
            .await?;

        self.store
            .destroy(id, &rev)
            .await
            .map_err(|e| RepositoryError::from_store(T::ENTITY_TYPE, id, e))?;
        info!(entity_type = T::ENTITY_TYPE, document_id = %id, "entity deleted");
        Ok(())
    }

    // ---- Helpers ----

    /// Raw point lookup; a store-level not-found is an absence, not an error.
    async fn fetch(&self, id: &str) -> RepositoryResult<Option<Document>> {
        match self.store.get(id).await {
            Ok(found) => Ok(found),
            Err(StoreError::NotFound { .. }) => Ok(None),
            Err(e) => Err(RepositoryError::Store(e)),
        }
    }

    /// Point lookup restricted to this entity type.
    async fn load(&self, id: &str) -> RepositoryResult<Option<Document>> {
        let Some(document) = self.fetch(id).await? else {
            return Ok(None);
        };
        let tag = document.get(fields::TYPE).and_then(Value::as_str);
        if tag != Some(T::ENTITY_TYPE) {
            debug!(
                entity_type = T::ENTITY_TYPE,
                document_id = %id,
                stored_type = tag.unwrap_or(""),
                "type tag mismatch, treating as absent"
            );
            return Ok(None);
        }
        Ok(Some(document))
    }

    async fn require(&self, id: &str) -> RepositoryResult<T> {
        match self.load(id).await? {
            Some(document) => decode(document),
            None => Err(RepositoryError::NotFound {
                entity_type: T::ENTITY_TYPE,
                id: id.to_string(),
            }),
        }
    }
}

fn encode<T: Entity>(entity: &T) -> RepositoryResult<Document> {
    let document =
        serde_json::to_value(entity).map_err(|e| RepositoryError::InvalidDocument(e.to_string()))?;
    if !document.is_object() {
        return Err(RepositoryError::InvalidDocument(format!(
            "{} does not serialize to a JSON object",
            T::ENTITY_TYPE
        )));
    }
    Ok(document)
}

fn decode<T: Entity>(document: Document) -> RepositoryResult<T> {
    serde_json::from_value(document).map_err(|e| RepositoryError::InvalidDocument(e.to_string()))
}

impl<T: Entity> std::fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("entity_type", &T::ENTITY_TYPE)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::RwLock;

    use async_trait::async_trait;
    use crm_audit::AuditConfig;
    use crm_crypto::ChainVerifier;
    use crm_store::{InMemoryAuditStore, InMemoryDocumentStore, SortOrder, StoreResult};
    use chrono::DateTime;
    use crm_types::{EntityMeta, FieldChange, Revision};
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Invoice {
        #[serde(flatten)]
        meta: EntityMeta,
        number: String,
        status: String,
        total: u32,
    }

    impl Invoice {
        fn draft(number: &str, total: u32) -> Self {
            Self {
                meta: EntityMeta::draft(),
                number: number.into(),
                status: "draft".into(),
                total,
            }
        }
    }

    impl Entity for Invoice {
        const ENTITY_TYPE: &'static str = "invoice";
        fn meta(&self) -> &EntityMeta {
            &self.meta
        }
        fn meta_mut(&mut self) -> &mut EntityMeta {
            &mut self.meta
        }
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Customer {
        #[serde(flatten)]
        meta: EntityMeta,
        name: String,
    }

    impl Entity for Customer {
        const ENTITY_TYPE: &'static str = "customer";
        fn meta(&self) -> &EntityMeta {
            &self.meta
        }
        fn meta_mut(&mut self) -> &mut EntityMeta {
            &mut self.meta
        }
    }

    /// Document store whose `get` can be pinned to an earlier snapshot,
    /// standing in for a reader that lost a race with another writer.
    struct StaleReadStore {
        inner: InMemoryDocumentStore,
        pinned: RwLock<HashMap<String, Document>>,
    }

    impl StaleReadStore {
        fn new() -> Self {
            Self {
                inner: InMemoryDocumentStore::new(),
                pinned: RwLock::new(HashMap::new()),
            }
        }

        async fn pin(&self, id: &str) {
            let snapshot = self.inner.get(id).await.unwrap().unwrap();
            self.pinned.write().unwrap().insert(id.to_string(), snapshot);
        }
    }

    #[async_trait]
    impl DocumentStore for StaleReadStore {
        async fn get(&self, id: &str) -> StoreResult<Option<Document>> {
            let pinned = self.pinned.read().unwrap().get(id).cloned();
            match pinned {
                Some(doc) => Ok(Some(doc)),
                None => self.inner.get(id).await,
            }
        }
        async fn insert(&self, document: Document) -> StoreResult<Revision> {
            self.inner.insert(document).await
        }
        async fn destroy(&self, id: &str, rev: &Revision) -> StoreResult<()> {
            self.inner.destroy(id, rev).await
        }
        async fn find(&self, query: &FindQuery) -> StoreResult<Vec<Document>> {
            self.inner.find(query).await
        }
    }

    struct Fixture {
        docs: Arc<InMemoryDocumentStore>,
        audit_store: Arc<InMemoryAuditStore>,
        invoices: Repository<Invoice>,
        customers: Repository<Customer>,
    }

    fn fixture_with(config: RepositoryConfig) -> Fixture {
        let docs = Arc::new(InMemoryDocumentStore::new());
        let audit_store = Arc::new(InMemoryAuditStore::new());
        let audit = Arc::new(AuditService::new(audit_store.clone(), AuditConfig::default()));
        Fixture {
            invoices: Repository::new(docs.clone(), audit.clone(), config.clone()),
            customers: Repository::new(docs.clone(), audit, config),
            docs,
            audit_store,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(RepositoryConfig::default())
    }

    fn alice() -> Actor {
        Actor::new("alice").with_email("alice@example.com")
    }

    // -----------------------------------------------------------------------
    // Create
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn create_stamps_metadata_and_revision() {
        let fx = fixture();
        let created = fx.invoices.create(Invoice::draft("F-1", 100), &alice()).await.unwrap();

        assert!(created.meta.id.starts_with("invoice_"));
        assert_eq!(created.meta.entity_type, "invoice");
        assert_eq!(created.meta.version, 1);
        assert_eq!(created.meta.created_by, "alice");
        assert_eq!(created.meta.modified_by, "alice");
        assert_eq!(created.meta.rev.as_ref().unwrap().generation().unwrap(), 1);

        let loaded = fx.invoices.find_by_id(&created.meta.id).await.unwrap().unwrap();
        assert_eq!(loaded, created);
    }

    #[tokio::test]
    async fn create_records_create_entry_first() {
        let fx = fixture();
        let created = fx.invoices.create(Invoice::draft("F-1", 100), &alice()).await.unwrap();

        let trail = fx.invoices.audit_trail(&created.meta.id).await.unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].operation, Operation::Create);
        assert!(trail[0].previous_hash.is_genesis());
        assert_eq!(trail[0].user_email.as_deref(), Some("alice@example.com"));
        assert!(trail[0].changes.is_none());
    }

    #[tokio::test]
    async fn create_honours_supplied_id_and_rejects_duplicates() {
        let fx = fixture();
        let mut invoice = Invoice::draft("F-1", 100);
        invoice.meta.id = "inv-001".into();
        fx.invoices.create(invoice.clone(), &alice()).await.unwrap();

        let err = fx.invoices.create(invoice, &alice()).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(fx.audit_store.len(), 1);
    }

    #[tokio::test]
    async fn failed_audit_write_leaves_store_untouched_on_create() {
        let fx = fixture();
        fx.audit_store.set_fail_appends(true);

        let err = fx
            .invoices
            .create(Invoice::draft("F-1", 100), &alice())
            .await
            .unwrap_err();
        assert!(err.is_audit_failure());
        assert!(fx.docs.is_empty());
    }

    #[tokio::test]
    async fn strict_chain_lookup_failure_aborts_create() {
        let fx = fixture();
        fx.audit_store.set_fail_reads(true);

        let err = fx
            .invoices
            .create(Invoice::draft("F-1", 100), &alice())
            .await
            .unwrap_err();
        assert!(err.is_audit_failure());
        assert!(fx.docs.is_empty());
    }

    // -----------------------------------------------------------------------
    // Update
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn update_merges_and_bumps_version() {
        let fx = fixture();
        let created = fx.invoices.create(Invoice::draft("F-1", 100), &alice()).await.unwrap();
        let id = created.meta.id.clone();

        let bob = Actor::new("bob");
        let updated = fx
            .invoices
            .update(&id, json!({"status": "sent"}), &bob)
            .await
            .unwrap();

        assert_eq!(updated.status, "sent");
        assert_eq!(updated.total, 100);
        assert_eq!(updated.meta.version, 2);
        assert_eq!(updated.meta.modified_by, "bob");
        assert_eq!(updated.meta.created_by, "alice");
        assert_ne!(updated.meta.rev, created.meta.rev);

        let again = fx
            .invoices
            .update(&id, json!({"total": 120}), &bob)
            .await
            .unwrap();
        assert_eq!(again.meta.version, 3);
    }

    #[tokio::test]
    async fn update_records_only_changed_business_fields() {
        let fx = fixture();
        let created = fx.invoices.create(Invoice::draft("F-1", 100), &alice()).await.unwrap();
        let id = created.meta.id.clone();

        fx.invoices
            .update(&id, json!({"status": "sent"}), &alice())
            .await
            .unwrap();

        let trail = fx.invoices.audit_trail(&id).await.unwrap();
        assert_eq!(trail[1].operation, Operation::Update);
        assert_eq!(
            trail[1].changes,
            Some(vec![FieldChange::new(
                "status",
                Some(json!("draft")),
                Some(json!("sent"))
            )])
        );
        assert_eq!(trail[1].previous_hash, trail[0].hash);
    }

    #[tokio::test]
    async fn update_ignores_protected_keys() {
        let fx = fixture();
        let created = fx.invoices.create(Invoice::draft("F-1", 100), &alice()).await.unwrap();
        let id = created.meta.id.clone();

        let updated = fx
            .invoices
            .update(
                &id,
                json!({"_id": "hijack", "type": "customer", "version": 40, "createdBy": "mallory", "total": 5}),
                &alice(),
            )
            .await
            .unwrap();

        assert_eq!(updated.meta.id, id);
        assert_eq!(updated.meta.entity_type, "invoice");
        assert_eq!(updated.meta.version, 2);
        assert_eq!(updated.meta.created_by, "alice");
        assert_eq!(updated.total, 5);
    }

    #[tokio::test]
    async fn update_rejects_bad_patches() {
        let fx = fixture();
        let created = fx.invoices.create(Invoice::draft("F-1", 100), &alice()).await.unwrap();
        let id = created.meta.id.clone();

        assert!(matches!(
            fx.invoices.update(&id, json!([1]), &alice()).await,
            Err(RepositoryError::InvalidArgument(_))
        ));
        assert!(matches!(
            fx.invoices.update(&id, json!({"total": "lots"}), &alice()).await,
            Err(RepositoryError::InvalidDocument(_))
        ));
        // Neither rejected patch reached the audit log.
        assert_eq!(fx.invoices.audit_trail(&id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_of_missing_entity_is_not_found() {
        let fx = fixture();
        let err = fx
            .invoices
            .update("ghost", json!({"status": "sent"}), &alice())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(fx.audit_store.is_empty());
    }

    #[tokio::test]
    async fn failed_audit_write_leaves_entity_unchanged_on_update() {
        let fx = fixture();
        let created = fx.invoices.create(Invoice::draft("F-1", 100), &alice()).await.unwrap();
        fx.audit_store.set_fail_appends(true);

        let err = fx
            .invoices
            .update(&created.meta.id, json!({"status": "sent"}), &alice())
            .await
            .unwrap_err();
        assert!(err.is_audit_failure());

        let stored = fx.invoices.find_by_id(&created.meta.id).await.unwrap().unwrap();
        assert_eq!(stored, created);
    }

    #[tokio::test]
    async fn stale_revision_is_a_concurrency_conflict() {
        let store = Arc::new(StaleReadStore::new());
        let audit = Arc::new(AuditService::new(
            Arc::new(InMemoryAuditStore::new()),
            AuditConfig::default(),
        ));
        let repo: Repository<Invoice> =
            Repository::new(store.clone(), audit, RepositoryConfig::default());

        let created = repo.create(Invoice::draft("F-1", 100), &alice()).await.unwrap();
        let id = created.meta.id.clone();
        store.pin(&id).await;

        // First writer wins against the revision it read.
        repo.update(&id, json!({"status": "sent"}), &alice()).await.unwrap();

        // Second writer still sees the pinned, now stale, revision.
        let err = repo
            .update(&id, json!({"status": "void"}), &alice())
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        let stored = store.inner.get(&id).await.unwrap().unwrap();
        assert_eq!(stored["status"], json!("sent"));
        assert_eq!(stored["version"], json!(2));
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn delete_removes_after_audit() {
        let fx = fixture();
        let created = fx.invoices.create(Invoice::draft("F-1", 100), &alice()).await.unwrap();
        let id = created.meta.id.clone();

        fx.invoices.delete(&id, &alice()).await.unwrap();
        assert!(fx.invoices.find_by_id(&id).await.unwrap().is_none());

        let trail = fx.invoices.audit_trail(&id).await.unwrap();
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[1].operation, Operation::Delete);
        assert!(trail[1].changes.is_none());
        assert!(ChainVerifier::verify(&trail).is_ok());

        assert!(fx.invoices.delete(&id, &alice()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn failed_audit_write_keeps_entity_on_delete() {
        let fx = fixture();
        let created = fx.invoices.create(Invoice::draft("F-1", 100), &alice()).await.unwrap();
        fx.audit_store.set_fail_appends(true);

        let err = fx.invoices.delete(&created.meta.id, &alice()).await.unwrap_err();
        assert!(err.is_audit_failure());
        assert!(fx.docs.contains(&created.meta.id));
    }

    #[tokio::test]
    async fn stale_revision_delete_is_a_concurrency_conflict() {
        let store = Arc::new(StaleReadStore::new());
        let audit = Arc::new(AuditService::new(
            Arc::new(InMemoryAuditStore::new()),
            AuditConfig::default(),
        ));
        let repo: Repository<Invoice> =
            Repository::new(store.clone(), audit, RepositoryConfig::default());

        let created = repo.create(Invoice::draft("F-1", 100), &alice()).await.unwrap();
        let id = created.meta.id.clone();
        store.pin(&id).await;
        repo.update(&id, json!({"status": "sent"}), &alice()).await.unwrap();

        // The delete carries the pinned revision, which the update replaced.
        let err = repo.delete(&id, &alice()).await.unwrap_err();
        assert!(err.is_conflict());

        let stored = store.inner.get(&id).await.unwrap().unwrap();
        assert_eq!(stored["status"], json!("sent"));
        assert_eq!(stored["version"], json!(2));
    }

    // -----------------------------------------------------------------------
    // Reads and type isolation
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn other_entity_types_are_invisible() {
        let fx = fixture();
        let customer = fx
            .customers
            .create(
                Customer {
                    meta: EntityMeta::draft(),
                    name: "Acme".into(),
                },
                &alice(),
            )
            .await
            .unwrap();
        fx.invoices.create(Invoice::draft("F-1", 100), &alice()).await.unwrap();

        assert!(fx.invoices.find_by_id(&customer.meta.id).await.unwrap().is_none());
        assert!(fx
            .invoices
            .update(&customer.meta.id, json!({"status": "x"}), &alice())
            .await
            .unwrap_err()
            .is_not_found());

        let page = fx
            .invoices
            .find_by_selector(Selector::all().eq("type", "customer"), &FindOptions::new())
            .await
            .unwrap();
        assert_eq!(page.total, 0);
        assert!(page.data.is_empty());

        assert_eq!(fx.invoices.find_all(&FindOptions::new()).await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn find_by_id_of_unknown_id_is_none() {
        let fx = fixture();
        assert!(fx.invoices.find_by_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn pages_cover_all_matches() {
        let fx = fixture();
        for total in 1..=7 {
            fx.invoices
                .create(Invoice::draft(&format!("F-{total}"), total * 10), &alice())
                .await
                .unwrap();
        }

        let options = FindOptions::new().limit(3).sort_by("total", SortOrder::Asc);
        let first = fx.invoices.find_all(&options).await.unwrap();
        assert_eq!(first.total, 7);
        assert_eq!(first.total_pages, 3);
        assert!(!first.total_capped);
        let totals: Vec<u32> = first.data.iter().map(|i| i.total).collect();
        assert_eq!(totals, vec![10, 20, 30]);

        let last = fx.invoices.find_all(&options.clone().page(3)).await.unwrap();
        assert_eq!(last.data.len(), 1);
        assert_eq!(last.data[0].total, 70);

        let beyond = fx.invoices.find_all(&options.page(4)).await.unwrap();
        assert!(beyond.data.is_empty());
    }

    #[tokio::test]
    async fn selector_narrows_within_type() {
        let fx = fixture();
        for total in [50, 150, 250] {
            fx.invoices
                .create(Invoice::draft("F", total), &alice())
                .await
                .unwrap();
        }

        let page = fx
            .invoices
            .find_by_selector(Selector::all().gte("total", 100), &FindOptions::new())
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert!(page.data.iter().all(|i| i.total >= 100));
    }

    #[tokio::test]
    async fn total_is_capped_at_ceiling() {
        let fx = fixture_with(RepositoryConfig {
            count_ceiling: 4,
            ..Default::default()
        });
        for n in 0..6 {
            fx.invoices
                .create(Invoice::draft("F", n), &alice())
                .await
                .unwrap();
        }

        let page = fx.invoices.find_all(&FindOptions::new().limit(2)).await.unwrap();
        assert_eq!(page.total, 4);
        assert!(page.total_capped);
        assert_eq!(page.total_pages, 2);
    }

    #[tokio::test]
    async fn total_at_ceiling_is_exact() {
        let fx = fixture_with(RepositoryConfig {
            count_ceiling: 4,
            ..Default::default()
        });
        for n in 0..4 {
            fx.invoices
                .create(Invoice::draft("F", n), &alice())
                .await
                .unwrap();
        }

        let page = fx.invoices.find_all(&FindOptions::new().limit(2)).await.unwrap();
        assert_eq!(page.total, 4);
        assert!(!page.total_capped);
        assert_eq!(page.total_pages, 2);
    }

    #[tokio::test]
    async fn default_order_is_newest_first_at_sub_millisecond_spacing() {
        let fx = fixture();
        let older_at = DateTime::parse_from_rfc3339("2026-01-01T00:00:00.100Z")
            .unwrap()
            .with_timezone(&Utc);
        let newer_at = older_at + chrono::Duration::nanoseconds(500);

        for (id, at) in [("inv-old", older_at), ("inv-new", newer_at)] {
            let mut invoice = Invoice::draft(id, 100);
            invoice.meta.id = id.into();
            invoice.meta.stamp_created(Invoice::ENTITY_TYPE, "alice", at);
            fx.docs
                .insert(serde_json::to_value(&invoice).unwrap())
                .await
                .unwrap();
        }

        let page = fx.invoices.find_all(&FindOptions::new()).await.unwrap();
        let ids: Vec<&str> = page.data.iter().map(|i| i.meta.id.as_str()).collect();
        assert_eq!(ids, vec!["inv-new", "inv-old"]);
        assert_eq!(page.data[0].meta.created_at, newer_at);
    }

    #[tokio::test]
    async fn invalid_paging_is_rejected() {
        let fx = fixture();
        assert!(matches!(
            fx.invoices.find_all(&FindOptions::new().page(0)).await,
            Err(RepositoryError::InvalidArgument(_))
        ));
    }
}
