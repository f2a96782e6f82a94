//! Binds submitted and stored values onto the record and the field views.

use crate::assignment::PLACEHOLDER_PARAM;
use crate::field_type::{DefaultContext, ResolvedField};
use crate::lang::{lang_label, Translator};
use crate::record::EntryRecord;
use crate::types::{Parity, StreamRef, Submission};
use crate::validation::FieldErrors;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// One field prepared for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedField {
    pub slug: String,
    pub label: String,
    pub field_type: String,
    /// Name the value is submitted under.
    pub form_slug: String,
    /// Storage attribute on the record.
    pub column: String,
    pub value: Value,
    pub error: Option<String>,
    /// Editable control markup.
    pub input: String,
    /// Read-only markup; `None` when nothing is resolvable.
    pub display: Option<String>,
    pub instructions: Option<String>,
    pub placeholder: Option<String>,
    pub required: bool,
    pub required_marker: Option<String>,
    pub hidden: bool,
    pub parity: Parity,
}

pub struct FormValueBinder<'a> {
    pub stream: &'a StreamRef,
    pub defaults: &'a BTreeMap<String, Value>,
    pub current_actor: Option<&'a Value>,
    /// Slugs hidden by form configuration, on top of per-assignment flags.
    pub hidden: &'a BTreeSet<String>,
    pub required_marker: &'a str,
    pub translator: &'a dyn Translator,
}

impl<'a> FormValueBinder<'a> {
    fn default_context(&self) -> DefaultContext<'a> {
        DefaultContext {
            defaults: self.defaults,
            current_actor: self.current_actor,
        }
    }

    /// Copy submitted values onto the record's columns.
    ///
    /// Only keys present in the submission are written, so a partial
    /// submission leaves other stored values intact. Uploaded files write
    /// their file name. Types that persist their own data are left alone.
    pub fn apply(&self, fields: &[ResolvedField], record: &mut dyn EntryRecord, submission: &Submission) {
        for field in fields {
            let a = &field.assignment;
            if field.plugin.alt_process() {
                debug!(slug = %a.slug, "alt-process field, column untouched");
                continue;
            }
            let form_slug = field.plugin.form_slug(a, self.stream);
            let column = field.plugin.column_name(a);
            if let Some(file) = submission.file(&form_slug) {
                record.set(&column, Value::String(file.name.clone()));
            } else if let Some(value) = submission.value(&form_slug) {
                record.set(&column, value.clone());
            }
        }
    }

    /// Build the display list, in field order.
    ///
    /// A field with an error shows the value just submitted. Otherwise it
    /// shows the stored column value, falling back to the type's default
    /// when nothing was submitted.
    pub fn bind(
        &self,
        fields: &mut [ResolvedField],
        record: &dyn EntryRecord,
        submission: Option<&Submission>,
        errors: &FieldErrors,
    ) -> Vec<RenderedField> {
        let ctx = self.default_context();
        let mut out = Vec::with_capacity(fields.len());

        for (index, field) in fields.iter_mut().enumerate() {
            field.plugin.apply_defaults(self.defaults);
            let a = &field.assignment;
            let plugin = &field.plugin;

            let form_slug = plugin.form_slug(a, self.stream);
            let column = plugin.column_name(a);
            let error = errors.get(&self.stream.qualify(&a.slug)).cloned();

            let stored = record.get(&column).filter(|v| !v.is_null());
            let value = if error.is_some() {
                submission
                    .and_then(|s| {
                        s.value(&form_slug)
                            .cloned()
                            .or_else(|| s.file(&form_slug).map(|f| Value::String(f.name.clone())))
                    })
                    .unwrap_or(Value::Null)
            } else {
                match (stored.clone(), submission) {
                    (Some(v), _) => v,
                    (None, None) => plugin.default_value(a, &ctx).unwrap_or(Value::Null),
                    (None, Some(_)) => Value::Null,
                }
            };

            let placeholder = a
                .parameter_str(PLACEHOLDER_PARAM)
                .filter(|p| !p.is_empty())
                .map(|p| lang_label(self.translator, p));
            let mut shown = a.clone();
            if let Some(p) = &placeholder {
                shown.parameters.insert(PLACEHOLDER_PARAM.to_string(), Value::String(p.clone()));
            }

            let input = plugin.render_input(&shown, &form_slug, &value);
            let display = stored.as_ref().and_then(|v| plugin.render_value(a, v));

            out.push(RenderedField {
                slug: a.slug.clone(),
                label: lang_label(self.translator, &a.name),
                field_type: plugin.type_slug().to_string(),
                form_slug,
                column,
                value,
                error,
                input,
                display,
                instructions: a
                    .instructions
                    .as_deref()
                    .map(|i| lang_label(self.translator, i)),
                placeholder,
                required: a.required,
                required_marker: a.required.then(|| self.required_marker.to_string()),
                hidden: a.hidden || self.hidden.contains(&a.slug),
                parity: Parity::at_position(index + 1),
            });
        }

        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
