use crm_types::EntityMeta;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A business record stored through a [`Repository`](crate::Repository).
///
/// Implementors embed an [`EntityMeta`] with `#[serde(flatten)]`:
///
/// ```ignore
/// #[derive(Clone, Serialize, Deserialize)]
/// struct Invoice {
///     #[serde(flatten)]
///     meta: EntityMeta,
///     number: String,
///     status: String,
/// }
///
/// impl Entity for Invoice {
///     const ENTITY_TYPE: &'static str = "invoice";
///     fn meta(&self) -> &EntityMeta { &self.meta }
///     fn meta_mut(&mut self) -> &mut EntityMeta { &mut self.meta }
/// }
/// ```
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Value of the `type` tag on every stored document of this entity.
    const ENTITY_TYPE: &'static str;

    fn meta(&self) -> &EntityMeta;
    fn meta_mut(&mut self) -> &mut EntityMeta;

    fn id(&self) -> &str {
        &self.meta().id
    }

    fn version(&self) -> u64 {
        self.meta().version
    }
}
