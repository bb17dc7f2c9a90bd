//! Integration tests for the consolidation engine
//!
//! Exercises the documented merge properties end to end through the
//! public API: scenario flows, normalization, conflict exclusivity,
//! removal safety, and change-log classification.

use recall_server::memory::{
    ChangeEvent, ConflictPairs, OperationSet, Snapshot, consolidate,
};
use serde_json::json;

fn snap(value: serde_json::Value) -> Snapshot {
    Snapshot::from_json(&value)
}

fn run(
    current: serde_json::Value,
    ops: serde_json::Value,
) -> (Snapshot, Vec<recall_server::memory::ChangeEntry>) {
    consolidate(
        &snap(current),
        &OperationSet::from_json(&ops),
        &ConflictPairs::default(),
    )
}

// =============================================================================
// End-to-end scenarios
// =============================================================================

#[test]
fn scenario_new_user_gets_name_and_age() {
    let (next, changes) = run(json!({}), json!({"name": "John", "age": 28}));

    assert_eq!(next, snap(json!({"name": "John", "age": 28})));
    assert_eq!(changes.len(), 2);
    for change in &changes {
        assert_eq!(change.event, ChangeEvent::Add);
    }
}

#[test]
fn scenario_stops_liking_pizza() {
    let (next, changes) = run(
        json!({"likes": ["pizza", "hiking"]}),
        json!({"remove_likes": ["pizza"]}),
    );

    assert_eq!(next, snap(json!({"likes": ["hiking"]})));
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].field, "likes");
    assert_eq!(changes[0].value, json!(["pizza"]));
    assert_eq!(changes[0].event, ChangeEvent::Remove);
}

#[test]
fn scenario_taste_flips_from_dislike_to_like() {
    let (next, changes) = run(
        json!({"dislikes": ["tomatoes"]}),
        json!({"likes": ["tomatoes"]}),
    );

    assert_eq!(next, snap(json!({"likes": ["tomatoes"]})));
    assert!(!next.contains_field("dislikes"));
    assert!(changes
        .iter()
        .any(|c| c.field == "likes" && c.event == ChangeEvent::Add));
}

#[test]
fn scenario_skill_set_replaced_wholesale() {
    let (next, changes) = run(
        json!({"skills": ["Python", "Java"]}),
        json!({"replace_skills": ["Go", "go"]}),
    );

    assert_eq!(next, snap(json!({"skills": ["Go"]})));
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].field, "skills");
    assert_eq!(changes[0].event, ChangeEvent::Replace);
}

// =============================================================================
// Properties
// =============================================================================

#[test]
fn replacement_is_idempotent() {
    let pairs = ConflictPairs::default();
    let ops = OperationSet::from_json(&json!({"replace_hobbies": ["Chess", "Running"]}));
    let current = snap(json!({"hobbies": ["painting"], "name": "Eve"}));

    let (once, _) = consolidate(&current, &ops, &pairs);
    let (twice, _) = consolidate(&once, &ops, &pairs);

    assert_eq!(once, twice);
}

#[test]
fn normalization_never_produces_duplicate_entries() {
    let (after_first, _) = run(json!({}), json!({"likes": ["Pizza"]}));
    let (after_second, _) = consolidate(
        &after_first,
        &OperationSet::from_json(&json!({"likes": ["pizza"]})),
        &ConflictPairs::default(),
    );

    // Exactly one entry, first-seen form retained
    assert_eq!(after_second, snap(json!({"likes": ["Pizza"]})));
}

#[test]
fn conflict_pair_items_never_coexist() {
    let starting_points = [
        json!({}),
        json!({"likes": ["coffee"]}),
        json!({"dislikes": ["coffee"]}),
        json!({"likes": ["coffee", "tea"], "dislikes": ["beer"]}),
    ];

    for start in starting_points {
        let (next, _) = run(start.clone(), json!({"dislikes": ["Coffee"]}));

        let in_likes = next
            .get("likes")
            .map(|v| v.to_string().to_lowercase().contains("coffee"))
            .unwrap_or(false);
        let in_dislikes = next
            .get("dislikes")
            .map(|v| v.to_string().to_lowercase().contains("coffee"))
            .unwrap_or(false);

        assert!(
            !(in_likes && in_dislikes),
            "'coffee' in both lists after update from {start}"
        );
        assert!(in_dislikes);
    }
}

#[test]
fn removal_of_absent_items_is_identity() {
    let current = json!({"likes": ["pizza"], "name": "John"});

    let cases = [
        json!({"remove_skills": ["Java"]}),
        json!({"remove_likes": ["sushi"]}),
        json!({"remove_name": ["eve"]}),
    ];

    for ops in cases {
        let (next, _) = run(current.clone(), ops);
        assert_eq!(next, snap(current.clone()));
    }
}

#[test]
fn empty_list_fields_never_survive() {
    // Drain a list via removal
    let (next, _) = run(
        json!({"likes": ["pizza", "Pasta"]}),
        json!({"remove_likes": ["PIZZA", "pasta"]}),
    );
    assert!(!next.contains_field("likes"));
    assert_eq!(serde_json::to_value(&next).unwrap(), json!({}));

    // Drain a conflict-pair opposite
    let (next, _) = run(json!({"dislikes": ["rain"]}), json!({"likes": ["Rain"]}));
    assert!(!next.contains_field("dislikes"));
}

#[test]
fn change_log_covers_every_operation_exactly_once() {
    let ops = json!({
        "name": "John",
        "likes": ["sushi"],
        "remove_skills": ["Java"],
        "replace_hobbies": ["Chess"],
        "age": 28,
    });

    let (_, changes) = run(json!({"name": "Jo", "skills": ["Java"]}), ops.clone());

    let op_count = ops.as_object().unwrap().len();
    assert_eq!(changes.len(), op_count);

    let mut fields: Vec<&str> = changes.iter().map(|c| c.field.as_str()).collect();
    fields.sort_unstable();
    assert_eq!(fields, vec!["age", "hobbies", "likes", "name", "skills"]);
}

#[test]
fn consolidation_tolerates_garbage_operations() {
    let (next, changes) = run(
        json!({"name": "John"}),
        json!({
            "junk": null,
            "nested": {"deep": true},
            "likes": ["pizza", {"not": "a scalar"}],
            "remove_ghost": ["x"],
        }),
    );

    // Garbage drops out, the salvageable parts apply
    assert_eq!(next, snap(json!({"name": "John", "likes": ["pizza"]})));
    assert_eq!(changes.len(), 2);
}

#[test]
fn mixed_pipeline_applies_in_stage_order() {
    // Removal, then replacement, then conflict stripping, then adds.
    let (next, _) = run(
        json!({
            "likes": ["pizza", "tea"],
            "dislikes": ["coffee"],
            "skills": ["Python"],
        }),
        json!({
            "remove_likes": ["tea"],
            "replace_skills": ["Go"],
            "likes": ["coffee"],
        }),
    );

    assert_eq!(
        next,
        snap(json!({
            "likes": ["pizza", "coffee"],
            "skills": ["Go"],
        }))
    );
}
