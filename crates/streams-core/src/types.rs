use crate::error::StreamsError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Storage identity of an entry record.
pub type EntryId = u64;

// ---------------------------------------------------------------------------
// StreamRef
// ---------------------------------------------------------------------------

/// Identifies a content type ("stream") by namespace and slug.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamRef {
    pub namespace: String,
    pub slug: String,
}

impl StreamRef {
    pub fn new(namespace: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            slug: slug.into(),
        }
    }

    /// Prefix shared by every fully-qualified field identifier of this stream.
    pub fn qualified_prefix(&self) -> String {
        format!("{}-{}", self.namespace, self.slug)
    }

    /// Fully-qualified identifier of one field: `namespace-stream-field`.
    pub fn qualify(&self, field_slug: &str) -> String {
        format!("{}-{}-{}", self.namespace, self.slug, field_slug)
    }
}

impl fmt::Display for StreamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.slug)
    }
}

impl std::str::FromStr for StreamRef {
    type Err = StreamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((ns, slug)) if !ns.is_empty() && !slug.is_empty() => {
                crate::paths::validate_slug(ns)?;
                crate::paths::validate_slug(slug)?;
                Ok(StreamRef::new(ns, slug))
            }
            _ => Err(StreamsError::StreamNotFound(format!(
                "'{s}' (expected <namespace>.<slug>)"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// OperationMode
// ---------------------------------------------------------------------------

/// Whether a run creates a new entry or updates an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationMode {
    Create,
    Update,
}

impl OperationMode {
    pub fn from_identity(has_identity: bool) -> Self {
        if has_identity {
            OperationMode::Update
        } else {
            OperationMode::Create
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OperationMode::Create => "create",
            OperationMode::Update => "update",
        }
    }

    /// The method word used by language keys (`new` / `edit`).
    pub fn method(self) -> &'static str {
        match self {
            OperationMode::Create => "new",
            OperationMode::Update => "edit",
        }
    }
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// FormAction
// ---------------------------------------------------------------------------

/// The fixed vocabulary of submit buttons a form may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormAction {
    /// Save and start another new entry.
    Create,
    Save,
    Exit,
    /// Save and keep editing.
    Continue,
}

impl FormAction {
    pub fn all() -> &'static [FormAction] {
        &[
            FormAction::Create,
            FormAction::Save,
            FormAction::Exit,
            FormAction::Continue,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FormAction::Create => "create",
            FormAction::Save => "save",
            FormAction::Exit => "exit",
            FormAction::Continue => "continue",
        }
    }
}

impl fmt::Display for FormAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FormAction {
    type Err = StreamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(FormAction::Create),
            "save" => Ok(FormAction::Save),
            "exit" => Ok(FormAction::Exit),
            "continue" => Ok(FormAction::Continue),
            _ => Err(StreamsError::UnknownAction(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Parity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parity {
    Odd,
    Even,
}

impl Parity {
    /// Parity of a 1-based position.
    pub fn at_position(position: usize) -> Self {
        if position % 2 == 0 {
            Parity::Even
        } else {
            Parity::Odd
        }
    }
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// Metadata of one uploaded file in a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

/// Submitted form data. Its presence on a run distinguishes "form submitted"
/// from "initial display".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    #[serde(default)]
    pub values: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub files: BTreeMap<String, UploadedFile>,
    /// Name of the button that submitted the form, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl Submission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn with_file(mut self, key: impl Into<String>, file: UploadedFile) -> Self {
        self.files.insert(key.into(), file);
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// A submitted value as display text. Strings are returned unquoted.
    pub fn text(&self, key: &str) -> Option<String> {
        self.values.get(key).map(value_text)
    }

    pub fn file(&self, key: &str) -> Option<&UploadedFile> {
        self.files.get(key)
    }
}

/// Render a JSON value the way a form control shows it.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// SkipList
// ---------------------------------------------------------------------------

/// Field slugs excluded from rule compilation, binding and event firing.
/// Resolved once at the start of a run and never mutated during it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkipList(BTreeSet<String>);

impl SkipList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.0.contains(slug)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for SkipList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

// ---------------------------------------------------------------------------
// Notice
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Notice,
}

/// A user-visible flash message produced by a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_ref_parse_and_qualify() {
        let s: StreamRef = "ns.blog".parse().unwrap();
        assert_eq!(s, StreamRef::new("ns", "blog"));
        assert_eq!(s.qualify("title"), "ns-blog-title");
        assert_eq!(s.to_string(), "ns.blog");
    }

    #[test]
    fn stream_ref_rejects_missing_namespace() {
        assert!("blog".parse::<StreamRef>().is_err());
        assert!(".blog".parse::<StreamRef>().is_err());
        assert!("NS.blog".parse::<StreamRef>().is_err());
    }

    #[test]
    fn mode_from_identity() {
        assert_eq!(OperationMode::from_identity(false), OperationMode::Create);
        assert_eq!(OperationMode::from_identity(true), OperationMode::Update);
        assert_eq!(OperationMode::Create.method(), "new");
        assert_eq!(OperationMode::Update.method(), "edit");
    }

    #[test]
    fn form_action_vocabulary() {
        for action in FormAction::all() {
            let parsed: FormAction = action.as_str().parse().unwrap();
            assert_eq!(parsed, *action);
        }
        assert!("delete".parse::<FormAction>().is_err());
    }

    #[test]
    fn parity_alternates_from_one() {
        assert_eq!(Parity::at_position(1), Parity::Odd);
        assert_eq!(Parity::at_position(2), Parity::Even);
        assert_eq!(Parity::at_position(3), Parity::Odd);
    }

    #[test]
    fn skip_list_dedupes() {
        let skips: SkipList = ["body", "title", "body"].into_iter().collect();
        assert_eq!(skips.len(), 2);
        assert!(skips.contains("body"));
        assert!(!skips.contains("summary"));
    }

    #[test]
    fn submission_text_unquotes_strings() {
        let sub = Submission::new()
            .with_value("a", "Hello")
            .with_value("b", 3)
            .with_value("c", Value::Null);
        assert_eq!(sub.text("a").unwrap(), "Hello");
        assert_eq!(sub.text("b").unwrap(), "3");
        assert_eq!(sub.text("c").unwrap(), "");
        assert!(sub.text("missing").is_none());
    }
}
