//! Validation boundary and the rule engine shipped with the crate.

use crate::rules::ValidationRule;
use crate::types::{value_text, Submission};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::debug;

/// Field identifier → error text. An absent entry means no error.
pub type FieldErrors = BTreeMap<String, String>;

/// Markup wrapped around each error message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErrorDelimiters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

impl ErrorDelimiters {
    pub fn wrap(&self, message: &str) -> String {
        format!(
            "{}{}{}",
            self.start.as_deref().unwrap_or(""),
            message,
            self.end.as_deref().unwrap_or("")
        )
    }
}

pub trait ValidationEngine {
    /// Evaluate `rules` against `submission`. Rule labels arrive already
    /// translated.
    fn validate(
        &self,
        rules: &[ValidationRule],
        delimiters: &ErrorDelimiters,
        submission: &Submission,
    ) -> FieldErrors;
}

// ---------------------------------------------------------------------------
// RuleEngine
// ---------------------------------------------------------------------------

static RULE_RE: OnceLock<Regex> = OnceLock::new();
static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn rule_re() -> &'static Regex {
    RULE_RE.get_or_init(|| Regex::new(r"^([a-z_]+)(?:\[(.*)\])?$").unwrap())
}

fn email_re() -> &'static Regex {
    EMAIL_RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap())
}

/// Evaluates the rule vocabulary produced by the compiler and the built-in
/// field types. Reports the first failing rule per field. Rules other than
/// the presence checks are skipped for empty values.
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    recaptcha_token: Option<String>,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `check_recaptcha` only when the response equals `token`.
    /// Without a token any non-empty response passes.
    pub fn with_recaptcha_token(mut self, token: impl Into<String>) -> Self {
        self.recaptcha_token = Some(token.into());
        self
    }

    fn check(
        &self,
        name: &str,
        arg: Option<&str>,
        rule: &ValidationRule,
        text: &str,
        submission: &Submission,
    ) -> Option<String> {
        let label = &rule.label;
        match name {
            "required" => text
                .trim()
                .is_empty()
                .then(|| format!("The {label} field is required.")),
            "streams_file_required" => {
                let uploaded = submission.file(rule.input_key()).is_some();
                (!uploaded && text.trim().is_empty())
                    .then(|| format!("The {label} field is required."))
            }
            _ if text.is_empty() => None,
            "max_length" => {
                let n: usize = arg?.parse().ok()?;
                (text.chars().count() > n).then(|| {
                    format!("The {label} field cannot exceed {n} characters in length.")
                })
            }
            "min_length" => {
                let n: usize = arg?.parse().ok()?;
                (text.chars().count() < n)
                    .then(|| format!("The {label} field must be at least {n} characters in length."))
            }
            "integer" => text
                .trim()
                .parse::<i64>()
                .is_err()
                .then(|| format!("The {label} field must contain an integer.")),
            "numeric" => text
                .trim()
                .parse::<f64>()
                .is_err()
                .then(|| format!("The {label} field must contain only numbers.")),
            "valid_email" => (!email_re().is_match(text.trim()))
                .then(|| format!("The {label} field must contain a valid email address.")),
            "check_recaptcha" => {
                let ok = match &self.recaptcha_token {
                    Some(token) => text == token,
                    None => true,
                };
                (!ok).then(|| format!("The {label} field is incorrect."))
            }
            other => {
                debug!(rule = %other, field = %rule.field, "ignoring unknown validation rule");
                None
            }
        }
    }
}

impl ValidationEngine for RuleEngine {
    fn validate(
        &self,
        rules: &[ValidationRule],
        delimiters: &ErrorDelimiters,
        submission: &Submission,
    ) -> FieldErrors {
        let mut errors = FieldErrors::new();
        for rule in rules {
            let text = submission
                .value(rule.input_key())
                .map(value_text)
                .unwrap_or_default();
            for expression in rule.expressions() {
                let Some(caps) = rule_re().captures(expression) else {
                    debug!(rule = %expression, "unparseable validation rule");
                    continue;
                };
                let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                let arg = caps.get(2).map(|m| m.as_str());
                if let Some(message) = self.check(name, arg, rule, &text, submission) {
                    errors.insert(rule.field.clone(), delimiters.wrap(&message));
                    break;
                }
            }
        }
        errors
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
