//! Stream schemas and the store they are loaded from.

use crate::assignment::FieldAssignment;
use crate::error::{Result, StreamsError};
use crate::paths;
use crate::types::StreamRef;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// StreamSchema
// ---------------------------------------------------------------------------

/// One content type: its identity plus its ordered field assignments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamSchema {
    pub namespace: String,
    pub slug: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub assignments: Vec<FieldAssignment>,
}

impl StreamSchema {
    pub fn new(stream: &StreamRef, name: impl Into<String>) -> Self {
        Self {
            namespace: stream.namespace.clone(),
            slug: stream.slug.clone(),
            name: name.into(),
            assignments: Vec::new(),
        }
    }

    pub fn stream_ref(&self) -> StreamRef {
        StreamRef::new(&self.namespace, &self.slug)
    }

    /// Check slugs and the per-stream uniqueness of field slugs.
    pub fn validate(&self) -> Result<()> {
        paths::validate_slug(&self.namespace)?;
        paths::validate_slug(&self.slug)?;
        let mut seen = HashSet::new();
        for a in &self.assignments {
            paths::validate_slug(&a.slug)?;
            if !seen.insert(a.slug.as_str()) {
                return Err(StreamsError::DuplicateSlug {
                    stream: self.stream_ref().to_string(),
                    slug: a.slug.clone(),
                });
            }
        }
        Ok(())
    }

    /// Parse, validate and order a schema document. The sort is stable, so
    /// assignments sharing a `sort_order` keep their declaration order.
    pub fn from_yaml(data: &str) -> Result<Self> {
        let mut schema: StreamSchema = serde_yaml::from_str(data)?;
        schema.validate()?;
        schema.assignments.sort_by_key(|a| a.sort_order);
        Ok(schema)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_yaml(&data)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        crate::io::write_yaml(path, self)
    }
}

// ---------------------------------------------------------------------------
// SchemaStore
// ---------------------------------------------------------------------------

/// Source of field assignments for a stream.
pub trait SchemaStore {
    fn load_assignments(&self, stream: &StreamRef) -> Result<Vec<FieldAssignment>>;
}

/// Reads schemas from `.streams/streams/<namespace>/<slug>.yaml`.
pub struct YamlSchemaStore {
    root: PathBuf,
}

impl YamlSchemaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn load_schema(&self, stream: &StreamRef) -> Result<StreamSchema> {
        let path = paths::schema_path(&self.root, stream);
        if !path.exists() {
            return Err(StreamsError::StreamNotFound(stream.to_string()));
        }
        let schema = StreamSchema::load(&path)?;
        if schema.stream_ref() != *stream {
            return Err(StreamsError::InvalidConfig(format!(
                "{} declares stream '{}'",
                path.display(),
                schema.stream_ref()
            )));
        }
        Ok(schema)
    }

    pub fn save_schema(&self, schema: &StreamSchema) -> Result<()> {
        schema.save(&paths::schema_path(&self.root, &schema.stream_ref()))
    }

    /// Every stream with a schema file, ordered by namespace then slug.
    pub fn list(&self) -> Result<Vec<StreamRef>> {
        let dir = self.root.join(paths::SCHEMAS_DIR);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut streams = Vec::new();
        for ns_entry in std::fs::read_dir(&dir)? {
            let ns_entry = ns_entry?;
            if !ns_entry.file_type()?.is_dir() {
                continue;
            }
            let namespace = ns_entry.file_name().to_string_lossy().into_owned();
            for entry in std::fs::read_dir(ns_entry.path())? {
                let path = entry?.path();
                if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                    continue;
                }
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    streams.push(StreamRef::new(namespace.clone(), stem));
                }
            }
        }
        streams.sort();
        Ok(streams)
    }
}

impl SchemaStore for YamlSchemaStore {
    fn load_assignments(&self, stream: &StreamRef) -> Result<Vec<FieldAssignment>> {
        Ok(self.load_schema(stream)?.assignments)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BLOG: &str = r#"
namespace: ns
slug: blog
name: Blog
assignments:
  - slug: body
    name: Body
    field_type: text
    sort_order: 2
  - slug: title
    name: Title
    field_type: text
    required: true
    sort_order: 1
  - slug: summary
    name: Summary
    field_type: text
    sort_order: 2
"#;

    #[test]
    fn from_yaml_orders_by_sort_order_stably() {
        let schema = StreamSchema::from_yaml(BLOG).unwrap();
        let slugs: Vec<_> = schema.assignments.iter().map(|a| a.slug.as_str()).collect();
        assert_eq!(slugs, ["title", "body", "summary"]);
    }

    #[test]
    fn duplicate_slugs_rejected() {
        let yaml = "namespace: ns\nslug: blog\nassignments:\n  - {slug: title, name: T, field_type: text}\n  - {slug: title, name: T2, field_type: text}\n";
        let err = StreamSchema::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, StreamsError::DuplicateSlug { ref slug, .. } if slug == "title"));
    }

    #[test]
    fn invalid_field_slug_rejected() {
        let yaml = "namespace: ns\nslug: blog\nassignments:\n  - {slug: Bad Slug, name: T, field_type: text}\n";
        assert!(matches!(
            StreamSchema::from_yaml(yaml),
            Err(StreamsError::InvalidSlug(_))
        ));
    }

    #[test]
    fn yaml_store_roundtrip_and_list() {
        let dir = TempDir::new().unwrap();
        let store = YamlSchemaStore::new(dir.path());
        let schema = StreamSchema::from_yaml(BLOG).unwrap();
        store.save_schema(&schema).unwrap();

        let blog = StreamRef::new("ns", "blog");
        let assignments = store.load_assignments(&blog).unwrap();
        assert_eq!(assignments.len(), 3);
        assert_eq!(assignments[0].slug, "title");
        assert_eq!(store.list().unwrap(), vec![blog]);
    }

    #[test]
    fn missing_stream_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = YamlSchemaStore::new(dir.path());
        let err = store.load_assignments(&StreamRef::new("ns", "nope")).unwrap_err();
        assert!(matches!(err, StreamsError::StreamNotFound(_)));
    }
}
