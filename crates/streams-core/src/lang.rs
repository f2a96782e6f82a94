//! Localization boundary.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Marks text that should be looked up rather than shown verbatim.
pub const LANG_PREFIX: &str = "lang:";

pub trait Translator {
    /// Text for `key`. Missing keys must not fail.
    fn translate(&self, key: &str) -> String;
}

/// Translate `text` when it carries the `lang:` prefix; otherwise return it
/// unchanged.
pub fn lang_label(translator: &dyn Translator, text: &str) -> String {
    match text.strip_prefix(LANG_PREFIX) {
        Some(key) => translator.translate(key),
        None => text.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Key → text map. Missing keys fall back to `fallback`, or to the key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub entries: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The English messages the form builder asks for.
    pub fn builtin() -> Self {
        Self::new()
            .with("streams:new_entry_success", "Entry created.")
            .with("streams:new_entry_error", "There was a problem creating the entry.")
            .with("streams:edit_entry_success", "Entry updated.")
            .with("streams:edit_entry_error", "There was a problem updating the entry.")
            .with("recaptcha_field_name", "Security check")
    }

    pub fn with(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.entries.insert(key.into(), text.into());
        self
    }

    /// Overlay `other` onto this catalog; its entries win.
    pub fn merge(mut self, other: Catalog) -> Self {
        self.entries.extend(other.entries);
        if other.fallback.is_some() {
            self.fallback = other.fallback;
        }
        self
    }

    pub fn load(path: &Path) -> Result<Self> {
        crate::io::read_yaml(path)
    }
}

impl Translator for Catalog {
    fn translate(&self, key: &str) -> String {
        self.entries
            .get(key)
            .cloned()
            .or_else(|| self.fallback.clone())
            .unwrap_or_else(|| key.to_string())
    }
}
