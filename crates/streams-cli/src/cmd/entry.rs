use crate::output::{print_json, print_table, truncate};
use crate::services::{parse_stream, Services};
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;
use streams_core::types::value_text;

#[derive(Subcommand)]
pub enum EntrySubcommand {
    /// List stored entries of a stream
    List {
        /// Stream as <namespace>.<slug>
        stream: String,
        /// Page (1-based); paging follows the form config's pagination
        #[arg(long, default_value = "1", allow_negative_numbers = true)]
        page: i64,
        #[arg(long)]
        form: Option<String>,
    },
}

pub fn run(root: &Path, subcmd: EntrySubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        EntrySubcommand::List { stream, page, form } => list(root, &stream, page, form.as_deref(), json),
    }
}

fn list(root: &Path, stream: &str, page: i64, form: Option<&str>, json: bool) -> anyhow::Result<()> {
    let services = Services::load(root)?;
    let stream = parse_stream(stream)?;
    let config = services.form_config(form.unwrap_or(&stream.slug))?;
    let pagination = &config.pagination;

    let total = services
        .entries
        .list(&stream)
        .context("failed to list entries")?
        .len() as u64;
    let entries = services
        .entries
        .list_page(&stream, pagination.offset(page), pagination.limit)
        .context("failed to list entries")?;

    if json {
        return print_json(&serde_json::json!({
            "stream": stream.to_string(),
            "entries": entries,
            "pagination": pagination.meta(total, page),
        }));
    }

    if entries.is_empty() {
        println!("No entries.");
        return Ok(());
    }
    let rows = entries
        .iter()
        .map(|e| {
            let summary = e
                .values
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| format!("{k}={}", value_text(v)))
                .collect::<Vec<_>>()
                .join(", ");
            vec![
                e.id.to_string(),
                e.created_at.format("%Y-%m-%d %H:%M").to_string(),
                e.updated_at.format("%Y-%m-%d %H:%M").to_string(),
                truncate(&summary, 60),
            ]
        })
        .collect();
    print_table(&["ID", "CREATED", "UPDATED", "VALUES"], rows);
    if let Some(meta) = pagination.meta(total, page) {
        println!("page {} of {} ({} entries)", meta.current, meta.pages, meta.total);
    }
    Ok(())
}
