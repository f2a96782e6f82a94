//! The field type plugin contract and the registry that resolves type
//! identifiers to plugin instances.
//!
//! Every capability on [`FieldType`] except [`FieldType::type_slug`] has a
//! default, so a plugin implements only what differs from a plain text
//! field. A missing capability is a no-op, never an error.

use crate::assignment::{FieldAssignment, PLACEHOLDER_PARAM};
use crate::error::{Result, StreamsError};
use crate::markup;
use crate::types::{value_text, OperationMode, SkipList, StreamRef};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// DefaultContext
// ---------------------------------------------------------------------------

/// What a plugin may consult when no submitted or stored value exists.
#[derive(Debug, Clone, Copy)]
pub struct DefaultContext<'a> {
    /// Form-level defaults keyed by field slug.
    pub defaults: &'a BTreeMap<String, Value>,
    /// The actor performing the request, e.g. a user id.
    pub current_actor: Option<&'a Value>,
}

impl<'a> DefaultContext<'a> {
    /// The form-level default configured for this field, if any.
    pub fn configured(&self, assignment: &FieldAssignment) -> Option<&'a Value> {
        self.defaults.get(&assignment.slug)
    }
}

// ---------------------------------------------------------------------------
// FieldType
// ---------------------------------------------------------------------------

pub trait FieldType {
    /// The type identifier this plugin was registered under.
    fn type_slug(&self) -> &str;

    /// Storage attribute on the entry record.
    fn column_name(&self, assignment: &FieldAssignment) -> String {
        assignment.slug.clone()
    }

    /// Name under which the submitted value is posted.
    fn form_slug(&self, assignment: &FieldAssignment, stream: &StreamRef) -> String {
        stream.qualify(&assignment.slug)
    }

    /// Value shown when neither a submission nor a stored value exists.
    /// Consults the form-level default, then the assignment's own
    /// `default_value` parameter. Plugins with a context fallback (such as
    /// the current actor) try it after both.
    fn default_value(&self, assignment: &FieldAssignment, ctx: &DefaultContext<'_>) -> Option<Value> {
        ctx.configured(assignment)
            .or_else(|| assignment.configured_default())
            .cloned()
    }

    /// Called for each non-skipped field just before its rules are built.
    fn pre_validation_compile(&self, _assignment: &FieldAssignment) {}

    /// Receive the form-level defaults before rendering.
    fn apply_defaults(&mut self, _defaults: &BTreeMap<String, Value>) {}

    /// The editable control.
    fn render_input(&self, assignment: &FieldAssignment, form_slug: &str, value: &Value) -> String {
        markup::input(
            "text",
            form_slug,
            &value_text(value),
            assignment.parameter_str(PLACEHOLDER_PARAM),
        )
    }

    /// Read-only representation of a stored value; `None` means no output.
    fn render_value(&self, _assignment: &FieldAssignment, stored: &Value) -> Option<String> {
        match stored {
            Value::Null => None,
            v => Some(markup::escape(&value_text(v))),
        }
    }

    /// Rule expressions contributed on top of the required rule.
    fn extra_validation_rules(&self, _assignment: &FieldAssignment, _mode: OperationMode) -> Vec<String> {
        Vec::new()
    }

    /// File inputs express "required" as a file-presence rule.
    fn is_file_input(&self) -> bool {
        false
    }

    /// The type persists its own data; the binder leaves its column alone.
    fn alt_process(&self) -> bool {
        false
    }

    /// Once per type per run, administrative context.
    fn setup_event(&self) -> Result<()> {
        Ok(())
    }

    /// Once per field occurrence, administrative context.
    fn field_event(&self, _assignment: &FieldAssignment) -> Result<()> {
        Ok(())
    }

    /// Once per type per run, public context.
    fn public_event(&self) -> Result<()> {
        Ok(())
    }

    /// Once per field occurrence, public context.
    fn public_field_event(&self, _assignment: &FieldAssignment) -> Result<()> {
        Ok(())
    }

    /// Schema-authoring screen hook; `current` is the field being edited.
    fn schema_setup_event(&self, _current: Option<&FieldAssignment>) -> Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ResolvedField
// ---------------------------------------------------------------------------

/// An assignment paired with its plugin instance. Resolution happens once
/// per assignment per run; phases share this pairing instead of resolving
/// again.
pub struct ResolvedField {
    pub assignment: FieldAssignment,
    pub plugin: Box<dyn FieldType>,
}

impl std::fmt::Debug for ResolvedField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedField")
            .field("slug", &self.assignment.slug)
            .field("field_type", &self.plugin.type_slug())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// FieldTypeRegistry
// ---------------------------------------------------------------------------

pub type FieldTypeFactory = Box<dyn Fn() -> Box<dyn FieldType>>;

/// Type identifier → plugin factory. Holds no per-run state.
#[derive(Default)]
pub struct FieldTypeRegistry {
    factories: BTreeMap<String, FieldTypeFactory>,
}

impl FieldTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with `text`, `email`, `integer`, `file` and `user`.
    pub fn with_builtin_types() -> Self {
        let mut registry = Self::new();
        crate::field_types::register_builtins(&mut registry);
        registry
    }

    pub fn register<F, T>(&mut self, type_slug: impl Into<String>, factory: F)
    where
        F: Fn() -> T + 'static,
        T: FieldType + 'static,
    {
        self.factories
            .insert(type_slug.into(), Box::new(move || Box::new(factory())));
    }

    pub fn contains(&self, type_slug: &str) -> bool {
        self.factories.contains_key(type_slug)
    }

    pub fn type_slugs(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// A fresh plugin instance for the assignment's declared type.
    pub fn resolve(&self, assignment: &FieldAssignment) -> Result<Box<dyn FieldType>> {
        self.factories
            .get(&assignment.field_type)
            .map(|factory| factory())
            .ok_or_else(|| StreamsError::TypeResolution {
                slug: assignment.slug.clone(),
                field_type: assignment.field_type.clone(),
            })
    }

    /// Pair each assignment with a plugin instance, in declaration order.
    ///
    /// Skip-listed assignments are dropped. Assignments whose type cannot be
    /// resolved are excluded from the rest of the run; their errors are
    /// returned (and logged) so callers can surface them as diagnostics.
    /// Neither case reorders the surviving fields.
    pub fn resolve_all(
        &self,
        assignments: &[FieldAssignment],
        skips: &SkipList,
    ) -> (Vec<ResolvedField>, Vec<StreamsError>) {
        let mut fields = Vec::with_capacity(assignments.len());
        let mut excluded = Vec::new();
        for assignment in assignments {
            if skips.contains(&assignment.slug) {
                debug!(slug = %assignment.slug, "field skipped");
                continue;
            }
            match self.resolve(assignment) {
                Ok(plugin) => fields.push(ResolvedField {
                    assignment: assignment.clone(),
                    plugin,
                }),
                Err(e) => {
                    warn!(
                        slug = %assignment.slug,
                        field_type = %assignment.field_type,
                        "excluding field with unknown type"
                    );
                    excluded.push(e);
                }
            }
        }
        (fields, excluded)
    }

    /// Invoke `schema_setup_event` on every registered type. Failures are
    /// logged and returned; they never stop the remaining types.
    pub fn run_schema_setup_events(&self, current: Option<&FieldAssignment>) -> Vec<StreamsError> {
        let mut failures = Vec::new();
        for (type_slug, factory) in &self.factories {
            if let Err(e) = factory().schema_setup_event(current) {
                warn!(field_type = %type_slug, error = %e, "schema setup event failed");
                failures.push(e);
            }
        }
        failures
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
