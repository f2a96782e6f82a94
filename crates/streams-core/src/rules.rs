//! Compiles field assignments into validation rules for one run.

use crate::assignment::FieldAssignment;
use crate::field_type::{FieldTypeRegistry, ResolvedField};
use crate::types::{OperationMode, SkipList, StreamRef};
use serde::{Deserialize, Serialize};

/// Separator between rule expressions in a compiled rule string.
pub const RULE_SEPARATOR: &str = "|";
pub const REQUIRED_RULE: &str = "required";
pub const RECAPTCHA_FIELD: &str = "recaptcha_response_field";

/// File inputs express "required" as a check on the uploaded file.
pub fn file_required_rule(field_slug: &str) -> String {
    format!("streams_file_required[{field_slug}]")
}

// ---------------------------------------------------------------------------
// ValidationRule
// ---------------------------------------------------------------------------

/// One compiled rule set. Transient: rebuilt from assignments each run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRule {
    /// Fully-qualified field identifier (`namespace-stream-field`). Errors
    /// are keyed by it.
    pub field: String,
    /// Submission key the value is read from: the plugin's form slug.
    /// Empty means the same as `field`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub input: String,
    /// Human label used in error messages.
    pub label: String,
    /// Rule expressions joined by [`RULE_SEPARATOR`].
    pub rules: String,
}

impl ValidationRule {
    pub fn input_key(&self) -> &str {
        if self.input.is_empty() {
            &self.field
        } else {
            &self.input
        }
    }

    pub fn expressions(&self) -> impl Iterator<Item = &str> {
        self.rules.split(RULE_SEPARATOR).filter(|r| !r.is_empty())
    }

    /// The rule added after the field rules when captcha checking is on.
    pub fn recaptcha() -> Self {
        Self {
            field: RECAPTCHA_FIELD.to_string(),
            input: String::new(),
            label: "lang:recaptcha_field_name".to_string(),
            rules: format!("{REQUIRED_RULE}{RULE_SEPARATOR}check_recaptcha"),
        }
    }
}

// ---------------------------------------------------------------------------
// Compilation
// ---------------------------------------------------------------------------

/// Build the ordered rule list for the resolved fields of a run.
///
/// Deterministic in its inputs; the only outside calls are plugin capability
/// queries. Fields whose rule list ends up empty contribute nothing, so the
/// output is routinely shorter than the input.
pub fn compile(
    fields: &[ResolvedField],
    stream: &StreamRef,
    skips: &SkipList,
    mode: OperationMode,
) -> Vec<ValidationRule> {
    let mut compiled = Vec::new();

    for field in fields {
        let assignment = &field.assignment;
        if skips.contains(&assignment.slug) {
            continue;
        }
        field.plugin.pre_validation_compile(assignment);

        let mut expressions = Vec::new();
        if assignment.required {
            if field.plugin.is_file_input() {
                expressions.push(file_required_rule(&assignment.slug));
            } else {
                expressions.push(REQUIRED_RULE.to_string());
            }
        }
        // A plugin may hand back pre-joined strings; flatten them.
        for extra in field.plugin.extra_validation_rules(assignment, mode) {
            expressions.extend(
                extra
                    .split(RULE_SEPARATOR)
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(str::to_string),
            );
        }

        let expressions = dedupe(expressions);
        if expressions.is_empty() {
            continue;
        }

        compiled.push(ValidationRule {
            field: stream.qualify(&assignment.slug),
            input: field.plugin.form_slug(assignment, stream),
            label: assignment.name.clone(),
            rules: expressions.join(RULE_SEPARATOR),
        });
    }

    compiled
}

/// Resolve and compile in one step. Unresolvable assignments are left out.
pub fn compile_assignments(
    registry: &FieldTypeRegistry,
    assignments: &[FieldAssignment],
    stream: &StreamRef,
    skips: &SkipList,
    mode: OperationMode,
) -> Vec<ValidationRule> {
    let (fields, _excluded) = registry.resolve_all(assignments, skips);
    compile(&fields, stream, skips, mode)
}

/// Set semantics on expression text, first occurrence wins.
fn dedupe(expressions: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(expressions.len());
    for e in expressions {
        if !out.contains(&e) {
            out.push(e);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
