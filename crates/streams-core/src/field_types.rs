//! Built-in field types. Deliberately small: enough behavior to exercise the
//! plugin contract end to end.

use crate::assignment::{FieldAssignment, PLACEHOLDER_PARAM};
use crate::field_type::{DefaultContext, FieldType, FieldTypeRegistry};
use crate::markup;
use crate::types::{value_text, OperationMode};
use serde_json::Value;

pub const DEFAULT_TO_CURRENT_USER_PARAM: &str = "default_to_current_user";

pub fn register_builtins(registry: &mut FieldTypeRegistry) {
    registry.register("text", || Text);
    registry.register("email", || Email);
    registry.register("integer", || Integer);
    registry.register("file", || File);
    registry.register("user", || User);
}

fn length_rules(assignment: &FieldAssignment) -> Vec<String> {
    let mut rules = Vec::new();
    if let Some(n) = assignment.parameter_u64("min_length") {
        rules.push(format!("min_length[{n}]"));
    }
    if let Some(n) = assignment.parameter_u64("max_length") {
        rules.push(format!("max_length[{n}]"));
    }
    rules
}

// ---------------------------------------------------------------------------
// text
// ---------------------------------------------------------------------------

pub struct Text;

impl FieldType for Text {
    fn type_slug(&self) -> &str {
        "text"
    }

    fn extra_validation_rules(&self, assignment: &FieldAssignment, _mode: OperationMode) -> Vec<String> {
        length_rules(assignment)
    }
}

// ---------------------------------------------------------------------------
// email
// ---------------------------------------------------------------------------

pub struct Email;

impl FieldType for Email {
    fn type_slug(&self) -> &str {
        "email"
    }

    fn render_input(&self, assignment: &FieldAssignment, form_slug: &str, value: &Value) -> String {
        markup::input(
            "email",
            form_slug,
            &value_text(value),
            assignment.parameter_str(PLACEHOLDER_PARAM),
        )
    }

    fn extra_validation_rules(&self, assignment: &FieldAssignment, _mode: OperationMode) -> Vec<String> {
        let mut rules = vec!["valid_email".to_string()];
        rules.extend(length_rules(assignment));
        rules
    }
}

// ---------------------------------------------------------------------------
// integer
// ---------------------------------------------------------------------------

pub struct Integer;

impl FieldType for Integer {
    fn type_slug(&self) -> &str {
        "integer"
    }

    fn render_input(&self, assignment: &FieldAssignment, form_slug: &str, value: &Value) -> String {
        markup::input(
            "number",
            form_slug,
            &value_text(value),
            assignment.parameter_str(PLACEHOLDER_PARAM),
        )
    }

    fn extra_validation_rules(&self, _assignment: &FieldAssignment, _mode: OperationMode) -> Vec<String> {
        vec!["integer".to_string()]
    }
}

// ---------------------------------------------------------------------------
// file
// ---------------------------------------------------------------------------

pub struct File;

impl FieldType for File {
    fn type_slug(&self) -> &str {
        "file"
    }

    fn render_input(&self, _assignment: &FieldAssignment, form_slug: &str, value: &Value) -> String {
        let current = value_text(value);
        let mut html = format!(
            r#"<input type="file" name="{}" id="{}" />"#,
            markup::escape(form_slug),
            markup::escape(form_slug)
        );
        if !current.is_empty() {
            html.push_str(&format!(
                r#"<span class="current-file">{}</span>"#,
                markup::escape(&current)
            ));
        }
        html
    }

    fn is_file_input(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// user
// ---------------------------------------------------------------------------

/// Reference to a user. Stored in `<slug>_id`; options come from the
/// assignment's `users` parameter (`{ "<id>": "<username>" }`).
pub struct User;

impl User {
    fn options(assignment: &FieldAssignment) -> Vec<(String, String)> {
        match assignment.parameter("users") {
            Some(Value::Object(map)) => map
                .iter()
                .map(|(id, name)| (id.clone(), value_text(name)))
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl FieldType for User {
    fn type_slug(&self) -> &str {
        "user"
    }

    fn column_name(&self, assignment: &FieldAssignment) -> String {
        format!("{}_id", assignment.slug)
    }

    fn default_value(&self, assignment: &FieldAssignment, ctx: &DefaultContext<'_>) -> Option<Value> {
        ctx.configured(assignment)
            .or_else(|| assignment.configured_default())
            .cloned()
            .or_else(|| {
                if assignment.parameter_flag(DEFAULT_TO_CURRENT_USER_PARAM) {
                    ctx.current_actor.cloned()
                } else {
                    None
                }
            })
    }

    fn render_input(&self, assignment: &FieldAssignment, form_slug: &str, value: &Value) -> String {
        let options = Self::options(assignment);
        let selected = value_text(value);
        if options.is_empty() {
            return markup::input("number", form_slug, &selected, None);
        }
        let selected = (!selected.is_empty()).then_some(selected.as_str());
        markup::select(form_slug, &options, selected)
    }

    fn render_value(&self, assignment: &FieldAssignment, stored: &Value) -> Option<String> {
        if stored.is_null() {
            return None;
        }
        let id = value_text(stored);
        let name = Self::options(assignment)
            .into_iter()
            .find(|(opt, _)| *opt == id)
            .map(|(_, name)| name)?;
        Some(format!(
            r#"<a href="admin/users/edit/{}">{}</a>"#,
            markup::escape(&id),
            markup::escape(&name)
        ))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
