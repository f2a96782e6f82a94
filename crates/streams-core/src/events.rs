//! Lifecycle hook passes over the resolved fields of a run.
//!
//! Each pass fires a type's one-time hook the first time the type is seen
//! and the per-field hook for every field. The administrative and public
//! passes track "seen" in separate sets, so either can run without the
//! other. A failing hook is logged and returned; it never stops the pass.

use crate::assignment::FieldAssignment;
use crate::error::{Result, StreamsError};
use crate::field_type::{FieldType, ResolvedField};
use crate::types::SkipList;
use std::collections::HashSet;
use tracing::{debug, warn};

struct Pass {
    name: &'static str,
    once: fn(&dyn FieldType) -> Result<()>,
    once_hook: &'static str,
    each: fn(&dyn FieldType, &FieldAssignment) -> Result<()>,
    each_hook: &'static str,
}

const SETUP_PASS: Pass = Pass {
    name: "setup",
    once: |p| p.setup_event(),
    once_hook: "setup_event",
    each: |p, a| p.field_event(a),
    each_hook: "field_event",
};

const PUBLIC_PASS: Pass = Pass {
    name: "public",
    once: |p| p.public_event(),
    once_hook: "public_event",
    each: |p, a| p.public_field_event(a),
    each_hook: "public_field_event",
};

fn run_pass(
    pass: &Pass,
    fields: &[ResolvedField],
    skips: &SkipList,
    fired: &mut HashSet<String>,
) -> Vec<StreamsError> {
    let mut failures = Vec::new();

    for field in fields {
        let a = &field.assignment;
        if skips.contains(&a.slug) {
            continue;
        }
        let plugin = field.plugin.as_ref();
        let type_slug = plugin.type_slug().to_string();

        if fired.insert(type_slug.clone()) {
            debug!(pass = pass.name, field_type = %type_slug, "type event");
            if let Err(e) = (pass.once)(plugin) {
                warn!(field_type = %type_slug, hook = pass.once_hook, error = %e, "hook failed");
                failures.push(wrap(e, &type_slug, pass.once_hook));
            }
        }

        if let Err(e) = (pass.each)(plugin, a) {
            warn!(field_type = %type_slug, slug = %a.slug, hook = pass.each_hook, error = %e, "hook failed");
            failures.push(wrap(e, &type_slug, pass.each_hook));
        }
    }

    failures
}

/// Plugins may return any error; normalize to a hook failure naming the
/// type and hook.
fn wrap(e: StreamsError, type_slug: &str, hook: &'static str) -> StreamsError {
    match e {
        StreamsError::Hook { .. } => e,
        other => StreamsError::hook(type_slug, hook, other.to_string()),
    }
}

/// Administrative pass: `setup_event` once per type, `field_event` per field.
pub fn run_field_type_events(
    fields: &[ResolvedField],
    skips: &SkipList,
    fired: &mut HashSet<String>,
) -> Vec<StreamsError> {
    run_pass(&SETUP_PASS, fields, skips, fired)
}

/// Public pass: `public_event` once per type, `public_field_event` per field.
pub fn run_field_type_public_events(
    fields: &[ResolvedField],
    skips: &SkipList,
    fired: &mut HashSet<String>,
) -> Vec<StreamsError> {
    run_pass(&PUBLIC_PASS, fields, skips, fired)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
