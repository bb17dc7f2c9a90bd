//! Context formatter
//!
//! Renders a snapshot into the flat text block injected into chat
//! prompts. Deterministic: output follows snapshot iteration order.

use crate::memory::types::Snapshot;

/// Header line preceding the per-field entries.
const CONTEXT_HEADER: &str = "User Personal Information:";

/// Render a snapshot for prompt injection.
///
/// An empty snapshot yields an empty string, not the header alone, so
/// callers can tell whether any personalization context exists at all.
pub fn format_context(snapshot: &Snapshot) -> String {
    if snapshot.is_empty() {
        return String::new();
    }

    let mut lines = Vec::with_capacity(snapshot.len() + 1);
    lines.push(CONTEXT_HEADER.to_string());
    for (field, value) in snapshot.iter() {
        lines.push(format!("- {field}: {value}"));
    }
    lines.join("\n")
}
