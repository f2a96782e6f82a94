use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreamsError {
    #[error("not initialized: run 'streams init'")]
    NotInitialized,

    #[error("stream not found: {0}")]
    StreamNotFound(String),

    #[error("entry not found: {0}")]
    EntryNotFound(String),

    #[error("form config not found: {0}")]
    FormNotFound(String),

    #[error("invalid slug '{0}': must be lowercase alphanumeric with hyphens or underscores")]
    InvalidSlug(String),

    #[error("duplicate field slug '{slug}' in stream '{stream}'")]
    DuplicateSlug { stream: String, slug: String },

    #[error("unknown field type '{field_type}' for field '{slug}'")]
    TypeResolution { slug: String, field_type: String },

    #[error("{field_type} {hook} hook failed: {message}")]
    Hook {
        field_type: String,
        hook: &'static str,
        message: String,
    },

    #[error("persistence failed: {0}")]
    Persistence(String),

    #[error("notification '{template}' failed: {message}")]
    Notification { template: String, message: String },

    #[error("no redirect configured for action '{0}'")]
    RedirectResolution(String),

    #[error("unknown form action '{0}': expected create, save, exit or continue")]
    UnknownAction(String),

    #[error("invalid form state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl StreamsError {
    /// Build a hook failure for a field type.
    pub fn hook(field_type: impl Into<String>, hook: &'static str, message: impl Into<String>) -> Self {
        Self::Hook {
            field_type: field_type.into(),
            hook,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StreamsError>;
