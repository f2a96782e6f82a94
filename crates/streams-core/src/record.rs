//! The record persistence contract and an in-memory record.

use crate::error::{Result, StreamsError};
use crate::types::{EntryId, SkipList, StreamRef};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The content item a form creates or edits.
pub trait EntryRecord {
    fn stream(&self) -> &StreamRef;

    /// `None` for a record that has never been saved.
    fn id(&self) -> Option<EntryId>;

    fn has_identity(&self) -> bool {
        self.id().is_some()
    }

    fn get(&self, column: &str) -> Option<Value>;

    fn set(&mut self, column: &str, value: Value);

    /// Persist the record, leaving out the skip-listed columns' checks.
    ///
    /// `Ok(false)` is a rejection at the storage layer (e.g. a uniqueness
    /// constraint). `Err` is a storage failure.
    fn save(&mut self, skips: &SkipList) -> Result<bool>;

    /// Column data including `id` once assigned. Used for URI templates and
    /// notification context.
    fn data(&self) -> Map<String, Value>;
}

// ---------------------------------------------------------------------------
// MemoryRecord
// ---------------------------------------------------------------------------

/// What [`MemoryRecord::save`] should do.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SaveScript {
    #[default]
    Accept,
    Reject,
    Fail(String),
}

/// A record held in memory. Saves follow a scripted outcome; an accepted
/// save on a new record assigns `next_id`.
#[derive(Debug, Clone)]
pub struct MemoryRecord {
    stream: StreamRef,
    id: Option<EntryId>,
    values: BTreeMap<String, Value>,
    pub script: SaveScript,
    pub next_id: EntryId,
    /// Skip-lists passed to every save call, in order.
    pub saves: Vec<SkipList>,
}

impl MemoryRecord {
    pub fn new(stream: StreamRef) -> Self {
        Self {
            stream,
            id: None,
            values: BTreeMap::new(),
            script: SaveScript::Accept,
            next_id: 1,
            saves: Vec::new(),
        }
    }

    pub fn existing(stream: StreamRef, id: EntryId) -> Self {
        Self {
            id: Some(id),
            next_id: id + 1,
            ..Self::new(stream)
        }
    }

    pub fn with_value(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(column.into(), value.into());
        self
    }

    pub fn with_script(mut self, script: SaveScript) -> Self {
        self.script = script;
        self
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }
}

impl EntryRecord for MemoryRecord {
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
        self.saves.push(skips.clone());
        match &self.script {
            SaveScript::Accept => {
                if self.id.is_none() {
                    self.id = Some(self.next_id);
                    self.next_id += 1;
                }
                Ok(true)
            }
            SaveScript::Reject => Ok(false),
            SaveScript::Fail(msg) => Err(StreamsError::Persistence(msg.clone())),
        }
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
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_save_assigns_identity_once() {
        let mut record = MemoryRecord::new(StreamRef::new("ns", "blog"));
        assert!(!record.has_identity());
        assert!(record.save(&SkipList::new()).unwrap());
        assert_eq!(record.id(), Some(1));
        assert!(record.save(&SkipList::new()).unwrap());
        assert_eq!(record.id(), Some(1));
        assert_eq!(record.data()["id"], Value::from(1));
    }

    #[test]
    fn rejected_and_failed_saves() {
        let mut record =
            MemoryRecord::new(StreamRef::new("ns", "blog")).with_script(SaveScript::Reject);
        assert!(!record.save(&SkipList::new()).unwrap());
        assert!(!record.has_identity());

        record.script = SaveScript::Fail("disk full".to_string());
        let err = record.save(&SkipList::new()).unwrap_err();
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn save_records_skip_list() {
        let mut record = MemoryRecord::existing(StreamRef::new("ns", "blog"), 7);
        let skips: SkipList = ["body"].into_iter().collect();
        record.save(&skips).unwrap();
        assert_eq!(record.saves, vec![skips]);
    }
}
