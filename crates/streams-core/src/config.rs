//! Form configuration: every option an entry form recognizes, parsed from
//! YAML and checked up front.

use crate::error::{Result, StreamsError};
use crate::notify::NotificationTarget;
use crate::pagination::Pagination;
use crate::paths;
use crate::types::{FormAction, OperationMode, SkipList};
use crate::validation::ErrorDelimiters;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

pub const DEFAULT_REQUIRED_MARKER: &str = "<span>*</span>";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Notice text after a save. Unset entries fall back to per-mode language
/// keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Messages {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Messages {
    pub fn success_for(&self, mode: OperationMode) -> String {
        self.success
            .clone()
            .unwrap_or_else(|| format!("lang:streams:{}_entry_success", mode.method()))
    }

    pub fn error_for(&self, mode: OperationMode) -> String {
        self.error
            .clone()
            .unwrap_or_else(|| format!("lang:streams:{}_entry_error", mode.method()))
    }
}

// ---------------------------------------------------------------------------
// Redirects / Uris
// ---------------------------------------------------------------------------

/// URI templates keyed by the submit action vocabulary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Redirects {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit: Option<String>,
    #[serde(default, rename = "continue", skip_serializing_if = "Option::is_none")]
    pub continue_editing: Option<String>,
}

impl Redirects {
    pub fn for_action(&self, action: FormAction) -> Option<&str> {
        match action {
            FormAction::Create => self.create.as_deref(),
            FormAction::Save => self.save.as_deref(),
            FormAction::Exit => self.exit.as_deref(),
            FormAction::Continue => self.continue_editing.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Uris {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add: Option<String>,
}

// ---------------------------------------------------------------------------
// FormConfig
// ---------------------------------------------------------------------------

fn default_true() -> bool {
    true
}

fn default_required_marker() -> String {
    DEFAULT_REQUIRED_MARKER.to_string()
}

fn default_buttons() -> Vec<FormAction> {
    vec![FormAction::Save, FormAction::Exit]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormConfig {
    #[serde(default)]
    pub messages: Messages,
    #[serde(default)]
    pub redirects: Redirects,
    #[serde(default)]
    pub uris: Uris,
    /// Markup wrapped around each validation error.
    #[serde(default)]
    pub errors: ErrorDelimiters,
    #[serde(default)]
    pub skips: SkipList,
    #[serde(default)]
    pub hidden: BTreeSet<String>,
    /// Field slug → default value shown on an empty form.
    #[serde(default)]
    pub defaults: BTreeMap<String, Value>,
    #[serde(default)]
    pub notifications: Vec<NotificationTarget>,
    #[serde(default)]
    pub pagination: Pagination,
    #[serde(default = "default_true")]
    pub enable_save: bool,
    #[serde(default)]
    pub recaptcha: bool,
    /// Also run the public hook pass while building fields.
    #[serde(default)]
    pub public_events: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default = "default_buttons")]
    pub buttons: Vec<FormAction>,
    #[serde(default = "default_required_marker")]
    pub required_marker: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_fields_message: Option<String>,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            messages: Messages::default(),
            redirects: Redirects::default(),
            uris: Uris::default(),
            errors: ErrorDelimiters::default(),
            skips: SkipList::new(),
            hidden: BTreeSet::new(),
            defaults: BTreeMap::new(),
            notifications: Vec::new(),
            pagination: Pagination::default(),
            enable_save: true,
            recaptcha: false,
            public_events: false,
            title: None,
            buttons: default_buttons(),
            required_marker: default_required_marker(),
            no_fields_message: None,
        }
    }
}

impl FormConfig {
    pub fn from_yaml(data: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(data)?)
    }

    /// Load `<root>/.streams/forms/<name>.yaml`.
    pub fn load(root: &Path, name: &str) -> Result<Self> {
        paths::validate_slug(name)?;
        let path = paths::form_config_path(root, name);
        if !path.exists() {
            return Err(StreamsError::FormNotFound(name.to_string()));
        }
        Self::load_path(&path)
    }

    pub fn load_path(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_yaml(&data)
    }

    pub fn save(&self, root: &Path, name: &str) -> Result<()> {
        paths::validate_slug(name)?;
        let path = paths::form_config_path(root, name);
        crate::io::write_yaml(&path, self)
    }

    /// Where "cancel" leads: the explicit URI, else the save redirect.
    pub fn cancel_uri(&self) -> Option<&str> {
        self.uris
            .cancel
            .as_deref()
            .or(self.redirects.save.as_deref())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        for (i, target) in self.notifications.iter().enumerate() {
            if target.to.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("notification #{} has no recipients", i + 1),
                });
            }
            if target.template.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("notification #{} has no template", i + 1),
                });
            }
        }

        if self.pagination.limit == Some(0) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "pagination.limit must be greater than zero".to_string(),
            });
        }
        if self.pagination.uri.is_some() && self.pagination.limit.is_none() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "pagination.uri is set but pagination.limit is not; pagination is off"
                    .to_string(),
            });
        }

        for slug in self.skips.iter() {
            if self.hidden.contains(slug) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("field '{slug}' is both skipped and hidden"),
                });
            }
            if self.defaults.contains_key(slug) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("field '{slug}' is skipped but has a default"),
                });
            }
        }

        if self.redirects.continue_editing.is_some() && self.redirects.save.is_none() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "redirects.continue is set without redirects.save".to_string(),
            });
        }

        let mut seen = BTreeSet::new();
        for button in &self.buttons {
            if !seen.insert(*button) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("button '{button}' is listed more than once"),
                });
            } else if self.redirects.for_action(*button).is_none() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "button '{button}' has no redirect; the form re-renders after saving"
                    ),
                });
            }
        }

        if !self.enable_save && !self.notifications.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "notifications are configured but enable_save is false".to_string(),
            });
        }

        warnings
    }

    /// True when validation found anything at error level.
    pub fn has_errors(warnings: &[ConfigWarning]) -> bool {
        warnings.iter().any(|w| w.level == WarnLevel::Error)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_from_empty_yaml() {
        let cfg = FormConfig::from_yaml("{}").unwrap();
        assert!(cfg.enable_save);
        assert!(!cfg.recaptcha);
        assert_eq!(cfg.required_marker, "<span>*</span>");
        assert_eq!(cfg.buttons, vec![FormAction::Save, FormAction::Exit]);
        assert_eq!(cfg, FormConfig::default());
    }

    #[test]
    fn messages_fall_back_per_mode() {
        let m = Messages::default();
        assert_eq!(m.success_for(OperationMode::Create), "lang:streams:new_entry_success");
        assert_eq!(m.error_for(OperationMode::Update), "lang:streams:edit_entry_error");
        let m = Messages {
            success: Some("Thanks!".to_string()),
            error: None,
        };
        assert_eq!(m.success_for(OperationMode::Update), "Thanks!");
    }

    #[test]
    fn unknown_options_rejected() {
        assert!(FormConfig::from_yaml("redirect_to: x\n").is_err());
        assert!(FormConfig::from_yaml("redirects:\n  publish: x\n").is_err());
    }

    #[test]
    fn full_yaml_parses() {
        let yaml = r#"
messages:
  success: Saved!
redirects:
  save: admin/blog/edit/{{ id }}
  continue: admin/blog/edit/{{ id }}
errors:
  start: "<p>"
  end: "</p>"
skips: [slug]
hidden: [author]
defaults:
  title: Untitled
notifications:
  - to: "editor@example.com|email"
    template: new-post
    from: "noreply@example.com|Blog"
pagination:
  limit: 10
  uri: admin/blog/index
recaptcha: true
buttons: [save, continue]
"#;
        let cfg = FormConfig::from_yaml(yaml).unwrap();
        assert_eq!(cfg.messages.success.as_deref(), Some("Saved!"));
        assert_eq!(
            cfg.redirects.for_action(FormAction::Continue),
            Some("admin/blog/edit/{{ id }}")
        );
        assert!(cfg.skips.contains("slug"));
        assert_eq!(cfg.defaults["title"], Value::from("Untitled"));
        assert_eq!(cfg.notifications.len(), 1);
        assert_eq!(cfg.pagination.limit, Some(10));
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn cancel_falls_back_to_save_redirect() {
        let mut cfg = FormConfig::default();
        assert_eq!(cfg.cancel_uri(), None);
        cfg.redirects.save = Some("admin/blog".to_string());
        assert_eq!(cfg.cancel_uri(), Some("admin/blog"));
        cfg.uris.cancel = Some("admin".to_string());
        assert_eq!(cfg.cancel_uri(), Some("admin"));
    }

    #[test]
    fn validate_flags_problems() {
        let mut cfg = FormConfig {
            buttons: vec![],
            ..FormConfig::default()
        };
        cfg.notifications.push(NotificationTarget {
            to: String::new(),
            template: "t".to_string(),
            from: None,
        });
        cfg.pagination.limit = Some(0);
        cfg.redirects.continue_editing = Some("x".to_string());
        cfg.skips = ["body"].into_iter().collect();
        cfg.hidden.insert("body".to_string());

        let warnings = cfg.validate();
        assert!(FormConfig::has_errors(&warnings));
        let text: Vec<_> = warnings.iter().map(|w| w.message.as_str()).collect();
        assert!(text.iter().any(|m| m.contains("no recipients")));
        assert!(text.iter().any(|m| m.contains("pagination.limit")));
        assert!(text.iter().any(|m| m.contains("redirects.continue")));
        assert!(text.iter().any(|m| m.contains("skipped and hidden")));
    }

    #[test]
    fn buttons_without_redirects_warn() {
        let warnings = FormConfig::default().validate();
        assert_eq!(warnings.len(), 2);
        assert!(!FormConfig::has_errors(&warnings));
    }

    #[test]
    fn save_and_load_round_trip_on_disk() {
        let dir = TempDir::new().unwrap();
        let mut cfg = FormConfig::default();
        cfg.title = Some("New post".to_string());
        cfg.save(dir.path(), "blog").unwrap();
        let loaded = FormConfig::load(dir.path(), "blog").unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn missing_form_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = FormConfig::load(dir.path(), "nope").unwrap_err();
        assert!(matches!(err, StreamsError::FormNotFound(_)));
    }
}
