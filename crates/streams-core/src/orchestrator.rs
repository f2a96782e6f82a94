//! Entry form orchestration: compile rules, bind values, validate, save,
//! notify, fire field type hooks, then redirect or render.

use crate::binder::{FormValueBinder, RenderedField};
use crate::config::FormConfig;
use crate::context::{
    Diagnostic, DiagnosticKind, FormState, OrchestrationContext, SaveOutcome,
};
use crate::error::{Result, StreamsError};
use crate::events::{run_field_type_events, run_field_type_public_events};
use crate::field_type::FieldTypeRegistry;
use crate::lang::{lang_label, Translator};
use crate::notify::{dispatch_all, NotificationReport, Notifier, RequestMeta};
use crate::pagination::PageMeta;
use crate::record::EntryRecord;
use crate::redirect::{select_redirect, ResponseBoundary};
use crate::rules::{self, ValidationRule};
use crate::schema::SchemaStore;
use crate::types::{FormAction, Notice, NoticeLevel, OperationMode, StreamRef, Submission};
use crate::validation::{FieldErrors, ValidationEngine};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// The external services a form run talks to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub schema: &'a dyn SchemaStore,
    pub registry: &'a FieldTypeRegistry,
    pub validator: &'a dyn ValidationEngine,
    pub translator: &'a dyn Translator,
    pub notifier: &'a dyn Notifier,
    pub responder: &'a dyn ResponseBoundary,
}

/// Per-request input. `submission: None` is an initial display.
#[derive(Debug, Clone, Default)]
pub struct FormRequest {
    pub submission: Option<Submission>,
    /// 1-based page of the surrounding listing.
    pub page: i64,
    /// Entry count for pagination metadata.
    pub total_records: Option<u64>,
    pub current_actor: Option<Value>,
    pub sender: RequestMeta,
}

impl FormRequest {
    pub fn display() -> Self {
        Self::default()
    }

    pub fn submit(submission: Submission) -> Self {
        Self {
            submission: Some(submission),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedForm {
    pub stream: StreamRef,
    pub mode: OperationMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub fields: Vec<RenderedField>,
    pub buttons: Vec<FormAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageMeta>,
    /// Set when the form has no fields to show.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_fields_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FormOutcome {
    Rendered(RenderedForm),
    Redirected { uri: String },
}

/// Everything a finished run reports.
#[derive(Debug, Clone, Serialize)]
pub struct FormRun {
    pub state: FormState,
    pub history: Vec<FormState>,
    pub mode: OperationMode,
    pub outcome: FormOutcome,
    pub rules: Vec<ValidationRule>,
    pub errors: FieldErrors,
    pub notices: Vec<Notice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save: Option<SaveOutcome>,
    pub diagnostics: Vec<Diagnostic>,
    pub notifications: NotificationReport,
}

impl FormRun {
    pub fn rendered(&self) -> Option<&RenderedForm> {
        match &self.outcome {
            FormOutcome::Rendered(form) => Some(form),
            FormOutcome::Redirected { .. } => None,
        }
    }

    pub fn redirect_uri(&self) -> Option<&str> {
        match &self.outcome {
            FormOutcome::Redirected { uri } => Some(uri),
            FormOutcome::Rendered(_) => None,
        }
    }

    pub fn field(&self, slug: &str) -> Option<&RenderedField> {
        self.rendered()?.fields.iter().find(|f| f.slug == slug)
    }
}

// ---------------------------------------------------------------------------
// EntryFormBuilder
// ---------------------------------------------------------------------------

/// Drives one entry form. Holds only collaborators and configuration, so a
/// builder can serve any number of runs; every run starts from a fresh
/// [`OrchestrationContext`].
pub struct EntryFormBuilder<'a> {
    services: Collaborators<'a>,
    config: FormConfig,
}

impl<'a> EntryFormBuilder<'a> {
    pub fn new(services: Collaborators<'a>, config: FormConfig) -> Self {
        Self { services, config }
    }

    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    fn binder<'b>(
        &'b self,
        stream: &'b StreamRef,
        defaults: &'b BTreeMap<String, Value>,
        actor: Option<&'b Value>,
    ) -> FormValueBinder<'b> {
        FormValueBinder {
            stream,
            defaults,
            current_actor: actor,
            hidden: &self.config.hidden,
            required_marker: &self.config.required_marker,
            translator: self.services.translator,
        }
    }

    fn translate(&self, text: &str) -> String {
        lang_label(self.services.translator, text)
    }

    /// Run the form once against `record`.
    ///
    /// Only schema loading and internal state errors are returned as `Err`.
    /// Validation failures, save rejections, hook failures, notification
    /// failures and unusable redirect actions are reported on the run.
    pub fn run(&self, record: &mut dyn EntryRecord, request: &FormRequest) -> Result<FormRun> {
        let stream = record.stream().clone();
        let submission = request.submission.as_ref();
        let mut ctx = OrchestrationContext::new(
            record.has_identity(),
            self.config.skips.clone(),
            self.config.defaults.clone(),
            submission.is_some(),
        );
        let mode = ctx.mode();
        debug!(stream = %stream, mode = %mode, submitted = ctx.submitted, "form run");

        // Rules
        let assignments = self.services.schema.load_assignments(&stream)?;
        let (fields, excluded) = self.services.registry.resolve_all(&assignments, &ctx.skips);
        for e in excluded {
            let subject = match &e {
                StreamsError::TypeResolution { slug, .. } => slug.clone(),
                other => other.to_string(),
            };
            ctx.diagnose(Diagnostic::new(DiagnosticKind::ExcludedField, subject, e.to_string()));
        }
        ctx.fields = fields;
        ctx.rules = rules::compile(&ctx.fields, &stream, &ctx.skips, mode);
        if self.config.recaptcha && ctx.submitted {
            ctx.rules.push(ValidationRule::recaptcha());
        }
        ctx.advance(FormState::RulesCompiled)?;

        // Bind
        if let Some(sub) = submission {
            self.binder(&stream, &ctx.defaults, request.current_actor.as_ref())
                .apply(&ctx.fields, &mut *record, sub);
        }
        ctx.advance(FormState::Bound)?;

        // Validate and save
        if let Some(sub) = submission.filter(|_| self.config.enable_save && !ctx.fields.is_empty()) {
            self.validate_and_save(&mut ctx, &stream, record, sub, &request.sender)?;
        }

        // Build fields
        let rendered = self
            .binder(&stream, &ctx.defaults, request.current_actor.as_ref())
            .bind(&mut ctx.fields, &*record, submission, &ctx.errors);
        ctx.rendered = rendered;
        let mut hook_failures =
            run_field_type_events(&ctx.fields, &ctx.skips, &mut ctx.setup_events_run);
        if self.config.public_events {
            hook_failures.extend(run_field_type_public_events(
                &ctx.fields,
                &ctx.skips,
                &mut ctx.public_events_run,
            ));
        }
        for e in hook_failures {
            let subject = match &e {
                StreamsError::Hook { field_type, .. } => field_type.clone(),
                _ => String::new(),
            };
            ctx.diagnose(Diagnostic::new(DiagnosticKind::HookFailed, subject, e.to_string()));
        }
        ctx.advance(FormState::FieldsBuilt)?;

        // Redirect or render
        if let Some(uri) = self.redirect_target(&mut ctx, &*record, submission) {
            ctx.redirect = Some(uri);
            ctx.advance(FormState::Redirected)?;
        } else {
            ctx.advance(FormState::Rendered)?;
        }

        Ok(self.finish(ctx, stream, &*record, request))
    }

    fn validate_and_save(
        &self,
        ctx: &mut OrchestrationContext,
        stream: &StreamRef,
        record: &mut dyn EntryRecord,
        submission: &Submission,
        sender: &RequestMeta,
    ) -> Result<()> {
        let mode = ctx.mode();
        let labelled: Vec<ValidationRule> = ctx
            .rules
            .iter()
            .map(|r| ValidationRule {
                label: self.translate(&r.label),
                ..r.clone()
            })
            .collect();
        ctx.errors = self
            .services
            .validator
            .validate(&labelled, &self.config.errors, submission);
        ctx.advance(FormState::Validated)?;

        let outcome = if !ctx.errors.is_empty() {
            debug!(stream = %stream, errors = ctx.errors.len(), "validation failed");
            SaveOutcome::ValidationFailed
        } else {
            match record.save(&ctx.skips) {
                Ok(true) => SaveOutcome::Saved { id: record.id() },
                Ok(false) => {
                    warn!(stream = %stream, "save rejected by storage");
                    ctx.diagnose(Diagnostic::new(
                        DiagnosticKind::SaveRejected,
                        stream.to_string(),
                        "record save returned false",
                    ));
                    SaveOutcome::Rejected
                }
                Err(e) => {
                    warn!(stream = %stream, error = %e, "save failed");
                    ctx.diagnose(Diagnostic::new(
                        DiagnosticKind::SaveFailed,
                        stream.to_string(),
                        e.to_string(),
                    ));
                    SaveOutcome::Failed {
                        message: e.to_string(),
                    }
                }
            }
        };

        if outcome.is_saved() {
            info!(stream = %stream, mode = %mode, id = ?record.id(), "entry saved");
            ctx.advance(FormState::Saved)?;
            ctx.notices.push(Notice {
                level: NoticeLevel::Success,
                message: self.translate(&self.config.messages.success_for(mode)),
            });
            let data = notification_data(record, stream, mode, sender);
            ctx.notifications = dispatch_all(
                self.services.notifier,
                &self.config.notifications,
                stream,
                Some(submission),
                &data,
            );
        } else {
            ctx.advance(FormState::SaveFailed)?;
            ctx.notices.push(Notice {
                level: NoticeLevel::Notice,
                message: self.translate(&self.config.messages.error_for(mode)),
            });
        }
        ctx.save = Some(outcome);
        Ok(())
    }

    /// A redirect happens only after a successful save, for an action with a
    /// configured target. Anything else falls back to rendering.
    fn redirect_target(
        &self,
        ctx: &mut OrchestrationContext,
        record: &dyn EntryRecord,
        submission: Option<&Submission>,
    ) -> Option<String> {
        if !ctx.save.as_ref().is_some_and(SaveOutcome::is_saved) {
            return None;
        }
        let action = submission.and_then(|s| s.action.as_deref());
        match select_redirect(&self.config.redirects, action) {
            Ok(Some((action, template))) => {
                let uri = self.services.responder.build_uri(template, &record.data());
                debug!(action = %action, uri = %uri, "redirecting");
                Some(uri)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "redirect unavailable, rendering form");
                ctx.diagnose(Diagnostic::new(
                    DiagnosticKind::RedirectFallback,
                    action.unwrap_or_default(),
                    e.to_string(),
                ));
                None
            }
        }
    }

    fn finish(
        &self,
        ctx: OrchestrationContext,
        stream: StreamRef,
        record: &dyn EntryRecord,
        request: &FormRequest,
    ) -> FormRun {
        let mode = ctx.mode();
        let state = ctx.state();
        let history = ctx.history().to_vec();
        let outcome = match ctx.redirect {
            Some(uri) => FormOutcome::Redirected { uri },
            None => {
                let no_fields_message = if ctx.rendered.is_empty() {
                    self.config
                        .no_fields_message
                        .as_deref()
                        .map(|m| self.translate(m))
                } else {
                    None
                };
                FormOutcome::Rendered(RenderedForm {
                    stream,
                    mode,
                    title: self.config.title.as_deref().map(|t| self.translate(t)),
                    fields: ctx.rendered,
                    buttons: self.config.buttons.clone(),
                    cancel_uri: self
                        .config
                        .cancel_uri()
                        .map(|t| self.services.responder.build_uri(t, &record.data())),
                    pagination: request
                        .total_records
                        .and_then(|total| self.config.pagination.meta(total, request.page)),
                    no_fields_message,
                })
            }
        };
        FormRun {
            state,
            history,
            mode,
            outcome,
            rules: ctx.rules,
            errors: ctx.errors,
            notices: ctx.notices,
            save: ctx.save,
            diagnostics: ctx.diagnostics,
            notifications: ctx.notifications,
        }
    }
}

/// Context handed to each notification: the saved record's data plus run
/// and request metadata.
fn notification_data(
    record: &dyn EntryRecord,
    stream: &StreamRef,
    mode: OperationMode,
    sender: &RequestMeta,
) -> Map<String, Value> {
    let mut data = record.data();
    data.insert("stream".to_string(), Value::from(stream.slug.clone()));
    data.insert("namespace".to_string(), Value::from(stream.namespace.clone()));
    data.insert("created".to_string(), Value::from(mode == OperationMode::Create));
    if let Some(ip) = &sender.ip {
        data.insert("sender_ip".to_string(), Value::from(ip.clone()));
    }
    if let Some(agent) = &sender.agent {
        data.insert("sender_agent".to_string(), Value::from(agent.clone()));
    }
    if let Some(os) = &sender.os {
        data.insert("sender_os".to_string(), Value::from(os.clone()));
    }
    data
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
