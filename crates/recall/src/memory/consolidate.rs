//! Memory consolidation engine
//!
//! The pure merge algorithm at the core of Recall: takes a user's current
//! snapshot plus a decoded operation set and deterministically produces
//! the next snapshot along with an auditable change log.
//!
//! The engine is total. Malformed operation shapes are degraded at decode
//! time (see `OperationSet::from_json`), removals of missing fields are
//! no-ops, and nothing here can fail. Stage order is load-bearing:
//! removals, then replacements, then conflict resolution, then additions,
//! so a replacement discards anything an earlier stage left behind and a
//! same-key add afterward re-merges on top of the replaced value
//! (last-stage-wins, an explicit policy).

use std::collections::HashSet;

use crate::memory::types::{
    ChangeEntry, ChangeEvent, FieldValue, Operation, OperationSet, RemoveTarget, Scalar, Snapshot,
};

/// Field-name pairs whose item sets are kept mutually exclusive.
///
/// Adding an item to one side strips the normalized-equal item from the
/// other side. The default pairs `likes` with `dislikes`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictPairs {
    pairs: Vec<(String, String)>,
}

impl Default for ConflictPairs {
    fn default() -> Self {
        Self {
            pairs: vec![("likes".to_string(), "dislikes".to_string())],
        }
    }
}

impl ConflictPairs {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// The field that conflicts with `field`, if any.
    pub fn opposite_of(&self, field: &str) -> Option<&str> {
        self.pairs.iter().find_map(|(a, b)| {
            if a == field {
                Some(b.as_str())
            } else if b == field {
                Some(a.as_str())
            } else {
                None
            }
        })
    }
}

/// Merge an operation set into a snapshot.
///
/// Pure and deterministic: identical input produces byte-identical output
/// across runs. Returns the next snapshot and one change-log entry per
/// operation, classified against the pre-merge snapshot.
pub fn consolidate(
    current: &Snapshot,
    ops: &OperationSet,
    conflict_pairs: &ConflictPairs,
) -> (Snapshot, Vec<ChangeEntry>) {
    // Classification must reflect state before any mutation.
    let changes = synthesize_changes(current, ops);

    let mut next = current.clone();

    for op in ops.iter() {
        if let Operation::Remove { field, target } = op {
            apply_removal(&mut next, field, target);
        }
    }

    for op in ops.iter() {
        if let Operation::Replace { field, value } = op {
            apply_replacement(&mut next, field, value);
        }
    }

    for op in ops.iter() {
        if let Operation::Add { field, value } = op {
            if let FieldValue::List(items) = value {
                if !items.is_empty() {
                    resolve_conflict(&mut next, field, items, conflict_pairs);
                }
            }
        }
    }

    for op in ops.iter() {
        if let Operation::Add { field, value } = op {
            apply_addition(&mut next, field, value);
        }
    }

    (next, changes)
}

/// Classify every operation against the pre-merge snapshot.
fn synthesize_changes(current: &Snapshot, ops: &OperationSet) -> Vec<ChangeEntry> {
    ops.iter()
        .map(|op| {
            let event = match op {
                Operation::Remove { .. } => ChangeEvent::Remove,
                Operation::Replace { .. } => ChangeEvent::Replace,
                Operation::Add { field, .. } => {
                    // Fully-redundant list updates still report UPDATE;
                    // this is a reporting nuance, not a merge concern.
                    if current.contains_field(field) {
                        ChangeEvent::Update
                    } else {
                        ChangeEvent::Add
                    }
                }
            };
            ChangeEntry {
                field: op.field().to_string(),
                value: op.value_json(),
                event,
            }
        })
        .collect()
}

fn normalized_set(items: &[Scalar]) -> HashSet<String> {
    items.iter().map(Scalar::normalized).collect()
}

fn apply_removal(snapshot: &mut Snapshot, field: &str, target: &RemoveTarget) {
    let Some(existing) = snapshot.get(field).cloned() else {
        tracing::debug!("Removal target '{field}' not present, ignoring");
        return;
    };

    match target {
        RemoveTarget::WholeField => {
            snapshot.remove(field);
            tracing::debug!("Deleted field '{field}'");
        }
        RemoveTarget::Items(items) => {
            if items.is_empty() {
                return;
            }
            let doomed = normalized_set(items);
            match existing {
                FieldValue::List(current_items) => {
                    let kept: Vec<Scalar> = current_items
                        .iter()
                        .filter(|item| !doomed.contains(&item.normalized()))
                        .cloned()
                        .collect();
                    let removed = current_items.len() - kept.len();
                    tracing::debug!("Removed {removed} item(s) from '{field}'");
                    if kept.is_empty() {
                        snapshot.remove(field);
                    } else {
                        snapshot.insert(field, FieldValue::List(kept));
                    }
                }
                FieldValue::Scalar(s) => {
                    if doomed.contains(&s.normalized()) {
                        snapshot.remove(field);
                        tracing::debug!("Deleted scalar field '{field}' (value matched)");
                    }
                }
            }
        }
    }
}

fn apply_replacement(snapshot: &mut Snapshot, field: &str, value: &FieldValue) {
    match value {
        FieldValue::List(items) => {
            let deduped = dedupe(items);
            // An empty replacement list clears the field; empty lists
            // are never stored.
            if deduped.is_empty() {
                snapshot.remove(field);
            } else {
                snapshot.insert(field, FieldValue::List(deduped));
            }
        }
        FieldValue::Scalar(s) => {
            snapshot.insert(field, FieldValue::Scalar(s.clone()));
        }
    }
}

/// Strip items being added to `field` from its conflicting opposite.
///
/// Runs before the new items land, so no later removal pass is needed.
fn resolve_conflict(
    snapshot: &mut Snapshot,
    field: &str,
    incoming: &[Scalar],
    conflict_pairs: &ConflictPairs,
) {
    let Some(opposite) = conflict_pairs.opposite_of(field) else {
        return;
    };
    let Some(FieldValue::List(opposite_items)) = snapshot.get(opposite).cloned() else {
        return;
    };

    let incoming_normalized = normalized_set(incoming);
    let kept: Vec<Scalar> = opposite_items
        .iter()
        .filter(|item| !incoming_normalized.contains(&item.normalized()))
        .cloned()
        .collect();

    if kept.len() != opposite_items.len() {
        tracing::debug!(
            "Conflict resolution: stripped {} item(s) from '{opposite}'",
            opposite_items.len() - kept.len()
        );
    }

    if kept.is_empty() {
        snapshot.remove(opposite);
    } else {
        snapshot.insert(opposite, FieldValue::List(kept));
    }
}

fn apply_addition(snapshot: &mut Snapshot, field: &str, value: &FieldValue) {
    match value {
        FieldValue::List(new_items) => {
            match snapshot.get(field).cloned() {
                Some(FieldValue::List(existing)) => {
                    // Append-merge: keep existing order, append items whose
                    // normalized form is genuinely new.
                    let mut merged = existing.clone();
                    let mut seen: HashSet<String> = normalized_set(&existing);
                    for item in new_items {
                        if seen.insert(item.normalized()) {
                            merged.push(item.clone());
                        }
                    }
                    snapshot.insert(field, FieldValue::List(merged));
                }
                _ => {
                    let deduped = dedupe(new_items);
                    if !deduped.is_empty() {
                        snapshot.insert(field, FieldValue::List(deduped));
                    }
                }
            }
        }
        FieldValue::Scalar(s) => {
            snapshot.insert(field, FieldValue::Scalar(s.clone()));
        }
    }
}

/// De-duplicate by normalized form, first occurrence wins, input order kept.
fn dedupe(items: &[Scalar]) -> Vec<Scalar> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|item| seen.insert(item.normalized()))
        .cloned()
        .collect()
}
