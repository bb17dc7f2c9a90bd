//! Core data types for per-user memory snapshots
//!
//! Defines the schema-less snapshot model (field name -> scalar or list),
//! the decoded update operations the consolidation engine consumes, and
//! the change-log entries it produces.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single scalar fact value.
///
/// Variant order matters: serde's untagged resolution tries variants
/// top to bottom, so booleans and numbers must come before text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Boolean value
    Bool(bool),
    /// Numeric value (integer or float)
    Number(serde_json::Number),
    /// String value
    Text(String),
}

impl Scalar {
    /// Normalized form used for every equality comparison: the string
    /// form, trimmed and lowercased. Original casing is never altered
    /// in storage, only compared through this.
    pub fn normalized(&self) -> String {
        self.to_string().trim().to_lowercase()
    }

    /// Convert a JSON value into a scalar, if it is one.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            Value::Number(n) => Some(Scalar::Number(n.clone())),
            Value::String(s) => Some(Scalar::Text(s.clone())),
            _ => None,
        }
    }

    /// The raw JSON representation of this scalar.
    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Number(n) => Value::Number(n.clone()),
            Scalar::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Number(n) => write!(f, "{n}"),
            Scalar::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

/// The value a snapshot field holds: a single scalar or a list of scalars.
///
/// Lists carry the invariant that no two items are equal after
/// normalization; the consolidation engine maintains it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// An ordered list of scalars, unique under normalization
    List(Vec<Scalar>),
    /// A single scalar
    Scalar(Scalar),
}

impl FieldValue {
    /// Tolerant decode from raw JSON. Nulls, objects, and nested arrays
    /// have no field-value representation and yield `None`; list entries
    /// that are not scalars are dropped.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) => {
                let scalars: Vec<Scalar> = items.iter().filter_map(Scalar::from_json).collect();
                Some(FieldValue::List(scalars))
            }
            other => Scalar::from_json(other).map(FieldValue::Scalar),
        }
    }

    /// The raw JSON representation of this value.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::List(items) => Value::Array(items.iter().map(Scalar::to_json).collect()),
            FieldValue::Scalar(s) => s.to_json(),
        }
    }

    /// True for a list value with no items.
    pub fn is_empty_list(&self) -> bool {
        matches!(self, FieldValue::List(items) if items.is_empty())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Scalar(s) => write!(f, "{s}"),
            FieldValue::List(items) => {
                let joined = items
                    .iter()
                    .map(Scalar::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{joined}")
            }
        }
    }
}

/// The complete set of persisted facts for one user.
///
/// A flat map from field name to value, serialized as a plain JSON
/// object. Backed by a BTreeMap so iteration order is deterministic
/// across runs, which keeps context formatting and serialized output
/// byte-identical for identical content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    fields: BTreeMap<String, FieldValue>,
}

impl Snapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Insert or overwrite a field. Empty lists are never stored; an
    /// empty-list value removes the field instead.
    pub fn insert(&mut self, field: impl Into<String>, value: FieldValue) {
        let field = field.into();
        if value.is_empty_list() {
            self.fields.remove(&field);
        } else {
            self.fields.insert(field, value);
        }
    }

    /// Remove a field, returning its previous value if present.
    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        self.fields.remove(field)
    }

    /// Iterate fields in deterministic (lexicographic) order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    /// Tolerant decode from a raw JSON document. Non-object input yields
    /// an empty snapshot; entries with no field-value representation or
    /// empty list values are dropped.
    pub fn from_json(value: &Value) -> Self {
        let mut snapshot = Snapshot::new();
        if let Value::Object(map) = value {
            for (field, raw) in map {
                if field.is_empty() {
                    continue;
                }
                if let Some(decoded) = FieldValue::from_json(raw) {
                    snapshot.insert(field.clone(), decoded);
                }
            }
        }
        snapshot
    }
}

/// What a removal operation targets.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoveTarget {
    /// Delete the field entirely (sentinel `true`, `""`, or `null`)
    WholeField,
    /// Delete list entries (or a matching scalar) by normalized equality
    Items(Vec<Scalar>),
}

/// A single decoded update operation.
///
/// The oracle's wire format encodes intent in key prefixes (`remove_`,
/// `replace_`); that is parsed exactly once, here, so the engine only
/// ever sees these explicit variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Merge a value into the snapshot
    Add { field: String, value: FieldValue },
    /// Delete matching items, or the whole field
    Remove { field: String, target: RemoveTarget },
    /// Unconditionally overwrite the field
    Replace { field: String, value: FieldValue },
}

impl Operation {
    /// The field this operation targets.
    pub fn field(&self) -> &str {
        match self {
            Operation::Add { field, .. }
            | Operation::Remove { field, .. }
            | Operation::Replace { field, .. } => field,
        }
    }

    /// The proposed value as raw JSON, used for change-log entries.
    pub fn value_json(&self) -> Value {
        match self {
            Operation::Add { value, .. } | Operation::Replace { value, .. } => value.to_json(),
            Operation::Remove { target, .. } => match target {
                RemoveTarget::WholeField => Value::Bool(true),
                RemoveTarget::Items(items) => {
                    Value::Array(items.iter().map(Scalar::to_json).collect())
                }
            },
        }
    }
}

/// A set of update operations proposed by the extraction oracle for one
/// message, decoded from its raw JSON output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationSet {
    ops: Vec<Operation>,
}

/// Key prefix marking a removal operation in the oracle wire format.
const REMOVE_PREFIX: &str = "remove_";
/// Key prefix marking a replacement operation in the oracle wire format.
const REPLACE_PREFIX: &str = "replace_";

impl OperationSet {
    pub fn new(ops: Vec<Operation>) -> Self {
        Self { ops }
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.ops.iter()
    }

    /// Decode the oracle's raw JSON object into explicit operations.
    ///
    /// Total: malformed input degrades to fewer (or zero) operations,
    /// never an error. Coercions mirror what the upstream extractor is
    /// known to emit:
    /// - `remove_x: true`, `""`, or `null` deletes the whole field
    /// - a bare scalar removal value is treated as a one-item list
    /// - non-scalar list entries are dropped
    /// - values with no field-value representation drop the operation
    /// - an add with an empty list value is meaningless and dropped
    pub fn from_json(value: &Value) -> Self {
        let Value::Object(map) = value else {
            return Self::default();
        };

        let mut ops = Vec::with_capacity(map.len());
        for (key, raw) in map {
            if let Some(field) = key.strip_prefix(REMOVE_PREFIX) {
                if field.is_empty() {
                    continue;
                }
                let target = match raw {
                    Value::Bool(true) | Value::Null => RemoveTarget::WholeField,
                    Value::String(s) if s.is_empty() => RemoveTarget::WholeField,
                    Value::Array(items) => {
                        RemoveTarget::Items(items.iter().filter_map(Scalar::from_json).collect())
                    }
                    other => match Scalar::from_json(other) {
                        Some(s) => RemoveTarget::Items(vec![s]),
                        None => continue,
                    },
                };
                ops.push(Operation::Remove {
                    field: field.to_string(),
                    target,
                });
            } else if let Some(field) = key.strip_prefix(REPLACE_PREFIX) {
                if field.is_empty() {
                    continue;
                }
                let Some(value) = FieldValue::from_json(raw) else {
                    continue;
                };
                ops.push(Operation::Replace {
                    field: field.to_string(),
                    value,
                });
            } else {
                if key.is_empty() {
                    continue;
                }
                let Some(value) = FieldValue::from_json(raw) else {
                    continue;
                };
                if value.is_empty_list() {
                    continue;
                }
                ops.push(Operation::Add {
                    field: key.clone(),
                    value,
                });
            }
        }

        Self { ops }
    }
}

/// Kind of effect one operation had on the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeEvent {
    /// A previously absent field was created
    Add,
    /// An existing field was updated
    Update,
    /// Items or a whole field were removed
    Remove,
    /// A field was unconditionally overwritten
    Replace,
}

/// One entry in the change log produced by a consolidation cycle.
///
/// Synthesized against the pre-merge snapshot and returned to callers
/// for audit purposes; never re-derived later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEntry {
    /// Field the operation targeted
    pub field: String,
    /// The proposed value, as raw JSON
    pub value: Value,
    /// How the operation was classified
    pub event: ChangeEvent,
}
