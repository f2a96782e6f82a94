//! Redirect decision and the URI-building response boundary.

use crate::config::Redirects;
use crate::error::{Result, StreamsError};
use crate::types::{value_text, FormAction};
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::sync::OnceLock;

pub trait ResponseBoundary {
    /// Resolve a URI template against record data.
    fn build_uri(&self, template: &str, data: &Map<String, Value>) -> String;
}

/// Pick the redirect template for a submitted action.
///
/// No action means no redirect. An action outside the vocabulary, or one
/// without a configured target, is an error the caller downgrades to
/// rendering the form.
pub fn select_redirect<'a>(redirects: &'a Redirects, action: Option<&str>) -> Result<Option<(FormAction, &'a str)>> {
    let Some(raw) = action.map(str::trim).filter(|a| !a.is_empty()) else {
        return Ok(None);
    };
    let action: FormAction = raw.parse()?;
    redirects
        .for_action(action)
        .map(|template| Some((action, template)))
        .ok_or_else(|| StreamsError::RedirectResolution(action.to_string()))
}

// ---------------------------------------------------------------------------
// SiteUris
// ---------------------------------------------------------------------------

static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();

fn placeholder_re() -> &'static Regex {
    PLACEHOLDER_RE.get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}").unwrap())
}

/// Site-relative URIs. `{{ key }}` placeholders take the record's values;
/// unknown keys become empty.
#[derive(Debug, Clone, Default)]
pub struct SiteUris {
    base: String,
}

impl SiteUris {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    pub fn interpolate(template: &str, data: &Map<String, Value>) -> String {
        placeholder_re()
            .replace_all(template, |caps: &Captures<'_>| {
                data.get(&caps[1]).map(value_text).unwrap_or_default()
            })
            .into_owned()
    }
}

impl ResponseBoundary for SiteUris {
    fn build_uri(&self, template: &str, data: &Map<String, Value>) -> String {
        let path = Self::interpolate(template, data);
        if self.base.is_empty() || path.starts_with("http://") || path.starts_with("https://") {
            return path;
        }
        format!(
            "{}/{}",
            self.base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> Map<String, Value> {
        let mut m = Map::new();
        m.insert("id".to_string(), Value::from(12));
        m.insert("slug".to_string(), Value::from("hello"));
        m
    }

    #[test]
    fn placeholders_filled_from_data() {
        let uris = SiteUris::default();
        assert_eq!(
            uris.build_uri("admin/blog/edit/{{ id }}/{{slug}}", &data()),
            "admin/blog/edit/12/hello"
        );
        assert_eq!(uris.build_uri("x/{{ missing }}", &data()), "x/");
    }

    #[test]
    fn base_joined_once() {
        let uris = SiteUris::new("https://example.com/");
        assert_eq!(
            uris.build_uri("/admin/{{ id }}", &data()),
            "https://example.com/admin/12"
        );
        assert_eq!(
            uris.build_uri("https://other.test/x", &data()),
            "https://other.test/x"
        );
    }

    #[test]
    fn select_redirect_policy() {
        let redirects = Redirects {
            save: Some("admin/blog".to_string()),
            ..Redirects::default()
        };
        assert_eq!(select_redirect(&redirects, None).unwrap(), None);
        assert_eq!(select_redirect(&redirects, Some("")).unwrap(), None);
        assert_eq!(
            select_redirect(&redirects, Some("save")).unwrap(),
            Some((FormAction::Save, "admin/blog"))
        );
        assert!(matches!(
            select_redirect(&redirects, Some("exit")),
            Err(StreamsError::RedirectResolution(_))
        ));
        assert!(matches!(
            select_redirect(&redirects, Some("publish")),
            Err(StreamsError::UnknownAction(_))
        ));
    }
}
