//! Field assignments: one field bound to a stream, with its own
//! required/default/display parameters.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Parameter holding an assignment's configured default value.
pub const DEFAULT_VALUE_PARAM: &str = "default_value";
/// Parameter holding placeholder text for the input.
pub const PLACEHOLDER_PARAM: &str = "placeholder";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldAssignment {
    /// Unique within the owning stream.
    pub slug: String,
    /// Human label; a `lang:` prefix routes it through localization.
    pub name: String,
    /// Type identifier resolved against the field type registry.
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, Value>,
    #[serde(default)]
    pub sort_order: u32,
    /// Rendered as a hidden control regardless of form config.
    #[serde(default)]
    pub hidden: bool,
}

impl FieldAssignment {
    pub fn new(
        slug: impl Into<String>,
        name: impl Into<String>,
        field_type: impl Into<String>,
    ) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
            field_type: field_type.into(),
            required: false,
            unique: false,
            instructions: None,
            parameters: BTreeMap::new(),
            sort_order: 0,
            hidden: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_instructions(mut self, text: impl Into<String>) -> Self {
        self.instructions = Some(text.into());
        self
    }

    pub fn parameter(&self, key: &str) -> Option<&Value> {
        self.parameters.get(key)
    }

    pub fn parameter_str(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(Value::as_str)
    }

    /// Boolean-ish parameter: `true` or the string `"yes"`.
    pub fn parameter_flag(&self, key: &str) -> bool {
        match self.parameters.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s == "yes",
            _ => false,
        }
    }

    pub fn parameter_u64(&self, key: &str) -> Option<u64> {
        match self.parameters.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// The default value configured on the assignment itself. Empty strings
    /// count as unset.
    pub fn configured_default(&self) -> Option<&Value> {
        match self.parameters.get(DEFAULT_VALUE_PARAM) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(v) => Some(v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_flag_accepts_yes_and_true() {
        let a = FieldAssignment::new("author", "Author", "user")
            .with_parameter("default_to_current_user", "yes")
            .with_parameter("locked", true)
            .with_parameter("other", "no");
        assert!(a.parameter_flag("default_to_current_user"));
        assert!(a.parameter_flag("locked"));
        assert!(!a.parameter_flag("other"));
        assert!(!a.parameter_flag("missing"));
    }

    #[test]
    fn configured_default_ignores_empty() {
        let a = FieldAssignment::new("title", "Title", "text").with_parameter(DEFAULT_VALUE_PARAM, "");
        assert!(a.configured_default().is_none());
        let b = FieldAssignment::new("title", "Title", "text")
            .with_parameter(DEFAULT_VALUE_PARAM, "Untitled");
        assert_eq!(b.configured_default(), Some(&Value::from("Untitled")));
    }

    #[test]
    fn yaml_defaults() {
        let yaml = "slug: title\nname: Title\nfield_type: text\n";
        let a: FieldAssignment = serde_yaml::from_str(yaml).unwrap();
        assert!(!a.required);
        assert!(!a.hidden);
        assert_eq!(a.sort_order, 0);
        assert!(a.parameters.is_empty());
    }

    #[test]
    fn parameter_u64_reads_strings() {
        let a = FieldAssignment::new("title", "Title", "text")
            .with_parameter("max_length", "120")
            .with_parameter("min_length", 3);
        assert_eq!(a.parameter_u64("max_length"), Some(120));
        assert_eq!(a.parameter_u64("min_length"), Some(3));
    }
}
