//! Canonical JSON serialization.
//!
//! Two documents holding the same fields and values produce the same bytes,
//! whatever order their keys were inserted in. Store-owned metadata (`_id`,
//! `_rev`) is stripped at the top level so that a document hashes the same
//! before and after the store assigns it an id or revision.
//!
//! The writer sorts keys itself rather than relying on `serde_json::Map`
//! ordering, which changes when the `preserve_order` feature is enabled
//! anywhere in the dependency graph.

use std::fmt::Write;

use crm_types::fields;
use serde_json::Value;

/// Canonical string form of a document.
pub fn canonicalize(document: &Value) -> String {
    let mut out = String::new();
    match document {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map
                .keys()
                .filter(|k| !fields::STORE_METADATA.contains(&k.as_str()))
                .collect();
            keys.sort();
            write_object(&mut out, keys.into_iter().map(|k| (k, &map[k])));
        }
        other => write_value(&mut out, other),
    }
    out
}

/// Canonical form as UTF-8 bytes, ready for hashing.
pub fn canonical_bytes(document: &Value) -> Vec<u8> {
    canonicalize(document).into_bytes()
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            write_object(out, keys.into_iter().map(|k| (k, &map[k])));
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        // Display on a leaf is compact JSON with proper string escaping.
        leaf => {
            let _ = write!(out, "{leaf}");
        }
    }
}

fn write_object<'a>(out: &mut String, entries: impl Iterator<Item = (&'a String, &'a Value)>) {
    out.push('{');
    for (i, (key, value)) in entries.enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, "{}", Value::String(key.clone()));
        out.push(':');
        write_value(out, value);
    }
    out.push('}');
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_are_sorted_at_every_depth() {
        let doc = json!({"b": 1, "a": {"z": true, "m": [ {"y": 1, "x": 2} ]}});
        assert_eq!(
            canonicalize(&doc),
            r#"{"a":{"m":[{"x":2,"y":1}],"z":true},"b":1}"#
        );
    }

    #[test]
    fn store_metadata_is_stripped_only_at_top_level() {
        let doc = json!({"_id": "inv-1", "_rev": "1-a", "total": 10, "line": {"_id": "nested"}});
        assert_eq!(canonicalize(&doc), r#"{"line":{"_id":"nested"},"total":10}"#);
    }

    #[test]
    fn strings_are_escaped() {
        let doc = json!({"note": "say \"hi\"\n"});
        assert_eq!(canonicalize(&doc), r#"{"note":"say \"hi\"\n"}"#);
    }

    #[test]
    fn array_order_is_significant() {
        assert_ne!(
            canonicalize(&json!({"tags": [1, 2]})),
            canonicalize(&json!({"tags": [2, 1]}))
        );
    }

    #[test]
    fn non_object_documents_serialize_verbatim() {
        assert_eq!(canonicalize(&json!(null)), "null");
        assert_eq!(canonicalize(&json!([1, "a"])), r#"[1,"a"]"#);
    }

    #[test]
    fn canonical_form_is_valid_json() {
        let doc = json!({"b": [1.5, null, false], "a": "x"});
        let reparsed: Value = serde_json::from_str(&canonicalize(&doc)).unwrap();
        assert_eq!(reparsed, doc);
    }
}
