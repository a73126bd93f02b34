//! Flat field diff between two document states.
//!
//! Only top-level keys are compared. A nested object or array that changed
//! anywhere inside is reported as one whole-value replacement.

use std::collections::BTreeSet;

use crm_types::{fields, FieldChange};
use serde_json::{Map, Value};

/// Compute the field changes from `old` to `new`.
///
/// Walks the union of both key sets in lexicographic order, skipping
/// metadata keys (`_id`, `_rev`, `modifiedAt`, `modifiedBy`, `version`), and
/// records a [`FieldChange`] wherever the values differ. A key present on
/// only one side is recorded with `None` on the other.
pub fn diff_fields(old: &Value, new: &Value) -> Vec<FieldChange> {
    let empty = Map::new();
    let old = old.as_object().unwrap_or(&empty);
    let new = new.as_object().unwrap_or(&empty);

    let keys: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
    keys.into_iter()
        .filter(|key| !fields::DIFF_IGNORED.contains(&key.as_str()))
        .filter_map(|key| {
            let (before, after) = (old.get(key), new.get(key));
            (before != after).then(|| FieldChange::new(key.clone(), before.cloned(), after.cloned()))
        })
        .collect()
}
