use crate::output::{print_json, print_table, truncate};
use crate::services::{parse_stream, Services};
use anyhow::Context;
use clap::Subcommand;
use serde_json::Value;
use std::path::Path;
use streams_core::notify::RequestMeta;
use streams_core::orchestrator::{EntryFormBuilder, FormOutcome, FormRequest, FormRun};
use streams_core::types::{value_text, NoticeLevel, StreamRef, Submission, UploadedFile};

#[derive(Subcommand)]
pub enum FormSubcommand {
    /// Build the form for display without submitting it
    Show {
        /// Stream as <namespace>.<slug>
        stream: String,
        /// Edit this entry instead of creating one
        #[arg(long)]
        entry: Option<u64>,
        /// Page of the surrounding listing (1-based)
        #[arg(long, default_value = "1", allow_negative_numbers = true)]
        page: i64,
        /// Form config name (default: the stream slug)
        #[arg(long)]
        form: Option<String>,
        /// Acting user id
        #[arg(long)]
        actor: Option<String>,
    },

    /// Submit values: validate, save, notify and redirect
    Submit {
        /// Stream as <namespace>.<slug>
        stream: String,
        #[arg(long)]
        entry: Option<u64>,
        /// Field value, repeatable
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
        /// Uploaded file name, repeatable
        #[arg(long = "file", value_name = "FIELD=NAME")]
        file: Vec<String>,
        /// Submit button: create, save, exit or continue
        #[arg(long)]
        action: Option<String>,
        #[arg(long)]
        form: Option<String>,
        #[arg(long)]
        actor: Option<String>,
        /// Client address passed to notifications
        #[arg(long)]
        ip: Option<String>,
    },
}

pub fn run(root: &Path, subcmd: FormSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        FormSubcommand::Show {
            stream,
            entry,
            page,
            form,
            actor,
        } => {
            let request = FormRequest {
                page,
                current_actor: actor.as_deref().map(scalar),
                ..FormRequest::display()
            };
            run_form(root, &stream, entry, form.as_deref(), request, json)
        }
        FormSubcommand::Submit {
            stream,
            entry,
            set,
            file,
            action,
            form,
            actor,
            ip,
        } => {
            let target = parse_stream(&stream)?;
            let submission = build_submission(&target, &set, &file, action)?;
            let request = FormRequest {
                submission: Some(submission),
                page: 1,
                current_actor: actor.as_deref().map(scalar),
                sender: RequestMeta {
                    ip,
                    agent: Some(format!("streams-cli/{}", env!("CARGO_PKG_VERSION"))),
                    os: Some(std::env::consts::OS.to_string()),
                },
                ..FormRequest::default()
            };
            run_form(root, &stream, entry, form.as_deref(), request, json)
        }
    }
}

fn run_form(
    root: &Path,
    stream: &str,
    entry: Option<u64>,
    form: Option<&str>,
    mut request: FormRequest,
    json: bool,
) -> anyhow::Result<()> {
    let services = Services::load(root)?;
    let stream = parse_stream(stream)?;
    let config = services.form_config(form.unwrap_or(&stream.slug))?;
    let mut record = services.open_record(&stream, entry)?;
    request.total_records = Some(
        services
            .entries
            .list(&stream)
            .context("failed to count entries")?
            .len() as u64,
    );

    let builder = EntryFormBuilder::new(services.collaborators(), config);
    let run = builder
        .run(&mut record, &request)
        .with_context(|| format!("form run for {stream} failed"))?;

    if json {
        print_json(&run)
    } else {
        print_run(&run);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Submission parsing
// ---------------------------------------------------------------------------

fn split_pair(raw: &str) -> anyhow::Result<(&str, &str)> {
    raw.split_once('=')
        .filter(|(k, _)| !k.trim().is_empty())
        .map(|(k, v)| (k.trim(), v))
        .with_context(|| format!("expected FIELD=VALUE, got '{raw}'"))
}

/// Field slugs are posted under their qualified form names.
fn build_submission(
    stream: &StreamRef,
    set: &[String],
    files: &[String],
    action: Option<String>,
) -> anyhow::Result<Submission> {
    let mut submission = Submission::new();
    for raw in set {
        let (field, value) = split_pair(raw)?;
        submission = submission.with_value(stream.qualify(field), value);
    }
    for raw in files {
        let (field, name) = split_pair(raw)?;
        submission = submission.with_file(
            stream.qualify(field),
            UploadedFile {
                name: name.to_string(),
                size: 0,
            },
        );
    }
    if let Some(action) = action {
        submission = submission.with_action(action);
    }
    Ok(submission)
}

/// Integers become numbers; anything else stays text.
fn scalar(raw: &str) -> Value {
    raw.parse::<i64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::String(raw.to_string()))
}

// ---------------------------------------------------------------------------
// Human output
// ---------------------------------------------------------------------------

fn print_run(run: &FormRun) {
    for notice in &run.notices {
        let prefix = match notice.level {
            NoticeLevel::Success => "success",
            NoticeLevel::Notice => "notice",
        };
        println!("[{prefix}] {}", notice.message);
    }

    match &run.outcome {
        FormOutcome::Redirected { uri } => println!("redirect: {uri}"),
        FormOutcome::Rendered(form) => {
            if let Some(title) = &form.title {
                println!("{title} ({}, {})", form.stream, form.mode);
            }
            if let Some(message) = &form.no_fields_message {
                println!("{message}");
            }
            let rows = form
                .fields
                .iter()
                .map(|f| {
                    let label = match &f.required_marker {
                        Some(_) => format!("{} *", f.label),
                        None => f.label.clone(),
                    };
                    vec![
                        f.slug.clone(),
                        label,
                        f.field_type.clone(),
                        truncate(&value_text(&f.value), 40),
                        f.error.clone().unwrap_or_default(),
                    ]
                })
                .collect();
            if !form.fields.is_empty() {
                print_table(&["FIELD", "LABEL", "TYPE", "VALUE", "ERROR"], rows);
            }
            if let Some(meta) = &form.pagination {
                println!(
                    "page {} of {} ({} entries)",
                    meta.current, meta.pages, meta.total
                );
            }
        }
    }

    let report = &run.notifications;
    if !report.outcomes.is_empty() {
        println!(
            "notifications: {} sent, {} failed, {} skipped",
            report.sent(),
            report.failed(),
            report.skipped()
        );
    }
    for d in &run.diagnostics {
        println!("note: {}", d.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_uses_qualified_names() {
        let stream = StreamRef::new("site", "blog");
        let sub = build_submission(
            &stream,
            &["title=Hello = world".to_string()],
            &["cover=c.png".to_string()],
            Some("save".to_string()),
        )
        .unwrap();
        assert_eq!(sub.text("site-blog-title").as_deref(), Some("Hello = world"));
        assert_eq!(sub.file("site-blog-cover").unwrap().name, "c.png");
        assert_eq!(sub.action.as_deref(), Some("save"));
    }

    #[test]
    fn malformed_pairs_rejected() {
        let stream = StreamRef::new("site", "blog");
        assert!(build_submission(&stream, &["title".to_string()], &[], None).is_err());
        assert!(build_submission(&stream, &["=x".to_string()], &[], None).is_err());
    }

    #[test]
    fn scalar_parses_integers() {
        assert_eq!(scalar("7"), Value::from(7));
        assert_eq!(scalar("ada"), Value::from("ada"));
    }
}
