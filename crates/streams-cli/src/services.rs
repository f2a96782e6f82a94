//! Wires the on-disk collaborators for a streams root.

use anyhow::Context;
use std::path::{Path, PathBuf};
use streams_core::config::FormConfig;
use streams_core::entry_store::{FileEntryStore, FileRecord, UniqueField};
use streams_core::field_type::FieldTypeRegistry;
use streams_core::lang::Catalog;
use streams_core::notify::OutboxNotifier;
use streams_core::orchestrator::Collaborators;
use streams_core::redirect::SiteUris;
use streams_core::schema::{SchemaStore, YamlSchemaStore};
use streams_core::types::{EntryId, StreamRef};
use streams_core::validation::RuleEngine;
use streams_core::{paths, StreamsError};
use tracing::debug;

pub struct Services {
    pub root: PathBuf,
    pub schemas: YamlSchemaStore,
    pub registry: FieldTypeRegistry,
    pub engine: RuleEngine,
    pub catalog: Catalog,
    pub notifier: OutboxNotifier,
    pub uris: SiteUris,
    pub entries: FileEntryStore,
}

impl Services {
    pub fn load(root: &Path) -> anyhow::Result<Self> {
        if !paths::streams_dir(root).is_dir() {
            return Err(StreamsError::NotInitialized.into());
        }

        let mut catalog = Catalog::builtin();
        let lang = paths::lang_path(root);
        if lang.exists() {
            let overrides = Catalog::load(&lang)
                .with_context(|| format!("failed to load {}", lang.display()))?;
            catalog = catalog.merge(overrides);
        }

        Ok(Self {
            root: root.to_path_buf(),
            schemas: YamlSchemaStore::new(root),
            registry: FieldTypeRegistry::with_builtin_types(),
            engine: RuleEngine::new(),
            catalog,
            notifier: OutboxNotifier::new(paths::outbox_path(root)),
            uris: SiteUris::default(),
            entries: FileEntryStore::new(root),
        })
    }

    pub fn collaborators(&self) -> Collaborators<'_> {
        Collaborators {
            schema: &self.schemas,
            registry: &self.registry,
            validator: &self.engine,
            translator: &self.catalog,
            notifier: &self.notifier,
            responder: &self.uris,
        }
    }

    /// The named form config, or the defaults when none exists.
    pub fn form_config(&self, name: &str) -> anyhow::Result<FormConfig> {
        match FormConfig::load(&self.root, name) {
            Ok(cfg) => Ok(cfg),
            Err(StreamsError::FormNotFound(_)) => {
                debug!(form = %name, "no form config, using defaults");
                Ok(FormConfig::default())
            }
            Err(e) => Err(e).with_context(|| format!("failed to load form config '{name}'")),
        }
    }

    /// A new or existing entry of `stream`, with the schema's unique fields
    /// enforced on save.
    pub fn open_record(&self, stream: &StreamRef, entry: Option<EntryId>) -> anyhow::Result<FileRecord> {
        let assignments = self
            .schemas
            .load_assignments(stream)
            .with_context(|| format!("failed to load schema for {stream}"))?;
        let unique: Vec<UniqueField> = assignments
            .iter()
            .filter(|a| a.unique)
            .filter_map(|a| {
                let plugin = self.registry.resolve(a).ok()?;
                Some(UniqueField::new(a.slug.clone(), plugin.column_name(a)))
            })
            .collect();

        let record = match entry {
            Some(id) => self
                .entries
                .open_record(stream, id)
                .with_context(|| format!("failed to open entry {id} of {stream}"))?,
            None => self.entries.new_record(stream),
        };
        Ok(record.with_unique_fields(unique))
    }
}

/// Parse `namespace.slug`.
pub fn parse_stream(raw: &str) -> anyhow::Result<StreamRef> {
    raw.parse::<StreamRef>()
        .with_context(|| format!("invalid stream '{raw}': expected <namespace>.<slug>"))
}
