//! Structured query model shared by the store traits.
//!
//! A [`Selector`] is a conjunction of field constraints. Field names may be
//! dotted paths into nested objects (`"billing.country"`).

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A constraint on a single field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Exists(bool),
}

impl Condition {
    /// Evaluate against the field's value (`None` when the field is absent).
    ///
    /// Absent fields only ever match `Exists(false)`. Ordered operators only
    /// match when both sides are numbers or both are strings.
    pub fn matches(&self, actual: Option<&Value>) -> bool {
        match (self, actual) {
            (Self::Exists(expected), actual) => actual.is_some() == *expected,
            (_, None) => false,
            (Self::Eq(expected), Some(v)) => v == expected,
            (Self::Ne(expected), Some(v)) => v != expected,
            (Self::In(options), Some(v)) => options.contains(v),
            (Self::Gt(bound), Some(v)) => compare_scalar(v, bound) == Some(Ordering::Greater),
            (Self::Gte(bound), Some(v)) => matches!(
                compare_scalar(v, bound),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            (Self::Lt(bound), Some(v)) => compare_scalar(v, bound) == Some(Ordering::Less),
            (Self::Lte(bound), Some(v)) => matches!(
                compare_scalar(v, bound),
                Some(Ordering::Less | Ordering::Equal)
            ),
        }
    }
}

/// One `field <condition>` pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    pub field: String,
    pub condition: Condition,
}

/// A conjunction of field constraints. The empty selector matches everything.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Selector {
    clauses: Vec<Clause>,
}

impl Selector {
    /// The match-all selector.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, condition: Condition) -> Self {
        self.clauses.push(Clause {
            field: field.into(),
            condition,
        });
        self
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Eq(value.into()))
    }

    pub fn ne(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Ne(value.into()))
    }

    pub fn gt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Gt(value.into()))
    }

    pub fn gte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Gte(value.into()))
    }

    pub fn lt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Lt(value.into()))
    }

    pub fn lte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Lte(value.into()))
    }

    pub fn one_of(self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.with(field, Condition::In(values))
    }

    pub fn exists(self, field: impl Into<String>, present: bool) -> Self {
        self.with(field, Condition::Exists(present))
    }

    /// Conjunction of `self` and `other`.
    pub fn and(mut self, other: Selector) -> Self {
        self.clauses.extend(other.clauses);
        self
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Returns `true` if every clause holds for `document`.
    pub fn matches(&self, document: &Value) -> bool {
        self.clauses
            .iter()
            .all(|c| c.condition.matches(lookup(document, &c.field)))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            field: field.into(),
            order,
        }
    }
}

/// A document-store query: `selector`, ordering, window and projection.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FindQuery {
    pub selector: Selector,
    pub sort: Vec<SortSpec>,
    pub skip: usize,
    pub limit: Option<usize>,
    /// Top-level fields to return; `None` returns whole documents.
    pub fields: Option<Vec<String>>,
}

impl FindQuery {
    pub fn new(selector: Selector) -> Self {
        Self {
            selector,
            ..Self::default()
        }
    }

    pub fn sort_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort.push(SortSpec::new(field, order));
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }
}

/// An audit-store query. Results are ordered by timestamp.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuditQuery {
    pub document_id: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub order: SortOrder,
    pub limit: Option<usize>,
}

impl AuditQuery {
    /// All entries of one document, oldest first.
    pub fn for_document(document_id: impl Into<String>) -> Self {
        Self {
            document_id: Some(document_id.into()),
            order: SortOrder::Asc,
            ..Self::default()
        }
    }

    pub fn newest_first(mut self) -> Self {
        self.order = SortOrder::Desc;
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Resolve a dotted path inside a document.
pub fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(document, |current, segment| current.as_object()?.get(segment))
}

fn compare_scalar(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

/// Total ordering used for sorting: missing/null < bool < number < string
/// < array < object, then by value within the same kind.
pub fn collate(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let by_rank = type_rank(a).cmp(&type_rank(b));
    if by_rank != Ordering::Equal {
        return by_rank;
    }
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x @ Value::Number(_)), Some(y @ Value::Number(_)))
        | (Some(x @ Value::String(_)), Some(y @ Value::String(_))) => {
            compare_scalar(x, y).unwrap_or(Ordering::Equal)
        }
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
        _ => Ordering::Equal,
    }
}
