//! Entries persisted as YAML files, one per entry, under
//! `.streams/entries/<namespace>/<slug>/<id>.yaml`.

use crate::error::{Result, StreamsError};
use crate::io;
use crate::paths;
use crate::record::EntryRecord;
use crate::types::{EntryId, SkipList, StreamRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub id: EntryId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub values: BTreeMap<String, Value>,
}

// ---------------------------------------------------------------------------
// FileEntryStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FileEntryStore {
    root: PathBuf,
}

impl FileEntryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn load(&self, stream: &StreamRef, id: EntryId) -> Result<StoredEntry> {
        let path = paths::entry_path(&self.root, stream, id);
        if !path.exists() {
            return Err(StreamsError::EntryNotFound(format!("{stream}#{id}")));
        }
        io::read_yaml(&path)
    }

    /// All entries of a stream, ordered by id.
    pub fn list(&self, stream: &StreamRef) -> Result<Vec<StoredEntry>> {
        let dir = paths::entries_dir(&self.root, stream);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for dirent in std::fs::read_dir(&dir)? {
            let path = dirent?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            entries.push(io::read_yaml::<StoredEntry>(&path)?);
        }
        entries.sort_by_key(|e| e.id);
        Ok(entries)
    }

    /// One page of entries.
    pub fn list_page(&self, stream: &StreamRef, offset: u64, limit: Option<u64>) -> Result<Vec<StoredEntry>> {
        let entries = self.list(stream)?.into_iter().skip(offset as usize);
        Ok(match limit {
            Some(n) => entries.take(n as usize).collect(),
            None => entries.collect(),
        })
    }

    pub fn next_id(&self, stream: &StreamRef) -> Result<EntryId> {
        Ok(self.list(stream)?.last().map(|e| e.id + 1).unwrap_or(1))
    }

    fn write(&self, stream: &StreamRef, entry: &StoredEntry) -> Result<()> {
        let path = paths::entry_path(&self.root, stream, entry.id);
        io::write_yaml(&path, entry)
    }

    /// A record for a new entry; saving assigns the next id.
    pub fn new_record(&self, stream: &StreamRef) -> FileRecord {
        FileRecord {
            store: self.clone(),
            stream: stream.clone(),
            id: None,
            created_at: None,
            values: BTreeMap::new(),
            unique: Vec::new(),
        }
    }

    pub fn open_record(&self, stream: &StreamRef, id: EntryId) -> Result<FileRecord> {
        let entry = self.load(stream, id)?;
        Ok(FileRecord {
            store: self.clone(),
            stream: stream.clone(),
            id: Some(entry.id),
            created_at: Some(entry.created_at),
            values: entry.values,
            unique: Vec::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// FileRecord
// ---------------------------------------------------------------------------

/// An entry record backed by [`FileEntryStore`]. Columns marked unique are
/// checked against the stream's other entries on save; a clash rejects the
/// save.
#[derive(Debug, Clone)]
pub struct FileRecord {
    store: FileEntryStore,
    stream: StreamRef,
    id: Option<EntryId>,
    created_at: Option<DateTime<Utc>>,
    values: BTreeMap<String, Value>,
    unique: Vec<UniqueField>,
}

/// A field whose stored value must not repeat across a stream's entries.
/// The skip-list names field slugs, so the slug travels with the column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueField {
    pub slug: String,
    pub column: String,
}

impl UniqueField {
    pub fn new(slug: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            column: column.into(),
        }
    }
}

impl FileRecord {
    pub fn with_unique_fields(mut self, fields: impl IntoIterator<Item = UniqueField>) -> Self {
        self.unique = fields.into_iter().collect();
        self
    }

    fn clashes(&self, skips: &SkipList) -> Result<Option<String>> {
        let others = self.store.list(&self.stream)?;
        for UniqueField { slug, column } in &self.unique {
            if skips.contains(slug) {
                continue;
            }
            let Some(mine) = self.values.get(column).filter(|v| !v.is_null()) else {
                continue;
            };
            let taken = others
                .iter()
                .filter(|e| Some(e.id) != self.id)
                .any(|e| e.values.get(column) == Some(mine));
            if taken {
                return Ok(Some(column.clone()));
            }
        }
        Ok(None)
    }
}

impl EntryRecord for FileRecord {
    fn stream(&self) -> &StreamRef {
        &self.stream
    }

    fn id(&self) -> Option<EntryId> {
        self.id
    }

    fn get(&self, column: &str) -> Option<Value> {
        self.values.get(column).cloned()
    }

    fn set(&mut self, column: &str, value: Value) {
        self.values.insert(column.to_string(), value);
    }

    fn save(&mut self, skips: &SkipList) -> Result<bool> {
        if let Some(column) = self.clashes(skips)? {
            debug!(stream = %self.stream, column = %column, "unique value already taken");
            return Ok(false);
        }
        let now = Utc::now();
        let id = match self.id {
            Some(id) => id,
            None => self.store.next_id(&self.stream)?,
        };
        let entry = StoredEntry {
            id,
            created_at: self.created_at.unwrap_or(now),
            updated_at: now,
            values: self.values.clone(),
        };
        self.store.write(&self.stream, &entry)?;
        self.id = Some(id);
        self.created_at = Some(entry.created_at);
        info!(stream = %self.stream, id, "entry written");
        Ok(true)
    }

    fn data(&self) -> Map<String, Value> {
        let mut data: Map<String, Value> = self
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if let Some(id) = self.id {
            data.insert("id".to_string(), Value::from(id));
        }
        if let Some(created) = self.created_at {
            data.insert("created_at".to_string(), Value::from(created.to_rfc3339()));
        }
        data
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
