//! Run-scoped state for one form build.

use crate::binder::RenderedField;
use crate::error::{Result, StreamsError};
use crate::field_type::ResolvedField;
use crate::notify::NotificationReport;
use crate::rules::ValidationRule;
use crate::types::{EntryId, Notice, OperationMode, SkipList};
use crate::validation::FieldErrors;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tracing::debug;

// ---------------------------------------------------------------------------
// FormState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormState {
    Initialized,
    RulesCompiled,
    Bound,
    Validated,
    Saved,
    SaveFailed,
    FieldsBuilt,
    Rendered,
    Redirected,
}

impl FormState {
    pub fn as_str(self) -> &'static str {
        match self {
            FormState::Initialized => "initialized",
            FormState::RulesCompiled => "rules_compiled",
            FormState::Bound => "bound",
            FormState::Validated => "validated",
            FormState::Saved => "saved",
            FormState::SaveFailed => "save_failed",
            FormState::FieldsBuilt => "fields_built",
            FormState::Rendered => "rendered",
            FormState::Redirected => "redirected",
        }
    }

    pub fn can_transition_to(self, next: FormState) -> bool {
        use FormState::*;
        matches!(
            (self, next),
            (Initialized, RulesCompiled)
                | (RulesCompiled, Bound)
                | (Bound, Validated)
                | (Bound, FieldsBuilt)
                | (Validated, Saved)
                | (Validated, SaveFailed)
                | (Saved, FieldsBuilt)
                | (SaveFailed, FieldsBuilt)
                | (FieldsBuilt, Rendered)
                | (FieldsBuilt, Redirected)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, FormState::Rendered | FormState::Redirected)
    }
}

impl fmt::Display for FormState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SaveOutcome / Diagnostic
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SaveOutcome {
    Saved { id: Option<EntryId> },
    /// Compiled rules rejected the submission.
    ValidationFailed,
    /// The record's save contract returned false.
    Rejected,
    /// The record's save contract errored.
    Failed { message: String },
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    ExcludedField,
    HookFailed,
    SaveRejected,
    SaveFailed,
    RedirectFallback,
}

/// A non-fatal problem recorded during a run. Never user-facing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub subject: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// OrchestrationContext
// ---------------------------------------------------------------------------

/// Everything one run accumulates. Built fresh by each run and dropped at
/// its end; nothing here outlives the run.
#[derive(Debug)]
pub struct OrchestrationContext {
    state: FormState,
    history: Vec<FormState>,
    /// Fixed at construction from the record's identity.
    mode: OperationMode,
    pub skips: SkipList,
    pub defaults: BTreeMap<String, Value>,
    pub submitted: bool,
    pub fields: Vec<ResolvedField>,
    pub rules: Vec<ValidationRule>,
    pub errors: FieldErrors,
    /// Type identifiers whose setup hook already fired.
    pub setup_events_run: HashSet<String>,
    /// Type identifiers whose public hook already fired.
    pub public_events_run: HashSet<String>,
    pub save: Option<SaveOutcome>,
    pub notices: Vec<Notice>,
    pub diagnostics: Vec<Diagnostic>,
    pub notifications: NotificationReport,
    pub rendered: Vec<RenderedField>,
    pub redirect: Option<String>,
}

impl OrchestrationContext {
    pub fn new(
        has_identity: bool,
        skips: SkipList,
        defaults: BTreeMap<String, Value>,
        submitted: bool,
    ) -> Self {
        Self {
            state: FormState::Initialized,
            history: vec![FormState::Initialized],
            mode: OperationMode::from_identity(has_identity),
            skips,
            defaults,
            submitted,
            fields: Vec::new(),
            rules: Vec::new(),
            errors: FieldErrors::new(),
            setup_events_run: HashSet::new(),
            public_events_run: HashSet::new(),
            save: None,
            notices: Vec::new(),
            diagnostics: Vec::new(),
            notifications: NotificationReport::default(),
            rendered: Vec::new(),
            redirect: None,
        }
    }

    pub fn mode(&self) -> OperationMode {
        self.mode
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    /// Every state the run has been in, in order.
    pub fn history(&self) -> &[FormState] {
        &self.history
    }

    /// Move to `next`, refusing transitions the state machine does not have.
    pub fn advance(&mut self, next: FormState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(StreamsError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        debug!(from = %self.state, to = %next, "form state");
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    pub fn diagnose(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(has_identity: bool) -> OrchestrationContext {
        OrchestrationContext::new(has_identity, SkipList::new(), BTreeMap::new(), false)
    }

    #[test]
    fn mode_fixed_from_identity() {
        assert_eq!(ctx(false).mode(), OperationMode::Create);
        assert_eq!(ctx(true).mode(), OperationMode::Update);
    }

    #[test]
    fn display_path_is_legal() {
        let mut c = ctx(false);
        for next in [
            FormState::RulesCompiled,
            FormState::Bound,
            FormState::FieldsBuilt,
            FormState::Rendered,
        ] {
            c.advance(next).unwrap();
        }
        assert!(c.state().is_terminal());
        assert_eq!(c.history().len(), 5);
    }

    #[test]
    fn submission_path_is_legal() {
        let mut c = ctx(true);
        for next in [
            FormState::RulesCompiled,
            FormState::Bound,
            FormState::Validated,
            FormState::SaveFailed,
            FormState::FieldsBuilt,
            FormState::Redirected,
        ] {
            c.advance(next).unwrap();
        }
    }

    #[test]
    fn illegal_transition_rejected() {
        let mut c = ctx(false);
        let err = c.advance(FormState::Saved).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid form state transition: initialized -> saved"
        );
        assert_eq!(c.state(), FormState::Initialized);
        assert!(!FormState::Rendered.can_transition_to(FormState::FieldsBuilt));
    }
}
