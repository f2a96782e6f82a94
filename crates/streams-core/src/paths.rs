use crate::error::{Result, StreamsError};
use crate::types::StreamRef;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const STREAMS_DIR: &str = ".streams";
pub const SCHEMAS_DIR: &str = ".streams/streams";
pub const ENTRIES_DIR: &str = ".streams/entries";
pub const FORMS_DIR: &str = ".streams/forms";

pub const LANG_FILE: &str = ".streams/lang.yaml";
pub const OUTBOX_FILE: &str = ".streams/outbox.jsonl";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn streams_dir(root: &Path) -> PathBuf {
    root.join(STREAMS_DIR)
}

pub fn schema_path(root: &Path, stream: &StreamRef) -> PathBuf {
    root.join(SCHEMAS_DIR)
        .join(&stream.namespace)
        .join(format!("{}.yaml", stream.slug))
}

pub fn entries_dir(root: &Path, stream: &StreamRef) -> PathBuf {
    root.join(ENTRIES_DIR)
        .join(&stream.namespace)
        .join(&stream.slug)
}

pub fn entry_path(root: &Path, stream: &StreamRef, id: u64) -> PathBuf {
    entries_dir(root, stream).join(format!("{id}.yaml"))
}

pub fn form_config_path(root: &Path, name: &str) -> PathBuf {
    root.join(FORMS_DIR).join(format!("{name}.yaml"))
}

pub fn lang_path(root: &Path) -> PathBuf {
    root.join(LANG_FILE)
}

pub fn outbox_path(root: &Path) -> PathBuf {
    root.join(OUTBOX_FILE)
}

// ---------------------------------------------------------------------------
// Slug validation
// ---------------------------------------------------------------------------

static SLUG_RE: OnceLock<Regex> = OnceLock::new();

fn slug_re() -> &'static Regex {
    SLUG_RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9_\-]*[a-z0-9]$|^[a-z0-9]$").unwrap())
}

/// Field, stream and namespace slugs share one shape. Underscores are
/// allowed because column names are derived from field slugs.
pub fn validate_slug(slug: &str) -> Result<()> {
    if slug.is_empty() || slug.len() > 64 || !slug_re().is_match(slug) {
        return Err(StreamsError::InvalidSlug(slug.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_slugs() {
        for slug in ["title", "a", "post_body", "author-id", "x1"] {
            validate_slug(slug).unwrap_or_else(|_| panic!("expected valid: {slug}"));
        }
    }

    #[test]
    fn invalid_slugs() {
        for slug in ["", "-title", "title_", "has spaces", "Title", "a.b"] {
            assert!(validate_slug(slug).is_err(), "expected invalid: {slug}");
        }
    }

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/site");
        let blog = StreamRef::new("ns", "blog");
        assert_eq!(
            schema_path(root, &blog),
            PathBuf::from("/tmp/site/.streams/streams/ns/blog.yaml")
        );
        assert_eq!(
            entry_path(root, &blog, 7),
            PathBuf::from("/tmp/site/.streams/entries/ns/blog/7.yaml")
        );
        assert_eq!(
            form_config_path(root, "blog"),
            PathBuf::from("/tmp/site/.streams/forms/blog.yaml")
        );
    }
}
