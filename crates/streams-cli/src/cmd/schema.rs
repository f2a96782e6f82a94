use crate::output::{print_json, print_table};
use crate::services::{parse_stream, Services};
use anyhow::Context;
use clap::Subcommand;
use serde::Serialize;
use std::path::Path;

#[derive(Subcommand)]
pub enum SchemaSubcommand {
    /// List the field assignments of a stream
    Show {
        /// Stream as <namespace>.<slug>
        stream: String,
    },

    /// List every stream with a schema file
    List,

    /// List registered field types and run their schema setup hooks
    Types,
}

#[derive(Serialize)]
struct FieldRow<'a> {
    slug: &'a str,
    name: &'a str,
    field_type: &'a str,
    required: bool,
    unique: bool,
    resolved: bool,
}

pub fn run(root: &Path, subcmd: SchemaSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        SchemaSubcommand::Show { stream } => show(root, &stream, json),
        SchemaSubcommand::List => list(root, json),
        SchemaSubcommand::Types => types(root, json),
    }
}

fn show(root: &Path, stream: &str, json: bool) -> anyhow::Result<()> {
    let services = Services::load(root)?;
    let stream = parse_stream(stream)?;
    let schema = services
        .schemas
        .load_schema(&stream)
        .with_context(|| format!("failed to load schema for {stream}"))?;

    let rows: Vec<FieldRow<'_>> = schema
        .assignments
        .iter()
        .map(|a| FieldRow {
            slug: &a.slug,
            name: &a.name,
            field_type: &a.field_type,
            required: a.required,
            unique: a.unique,
            resolved: services.registry.contains(&a.field_type),
        })
        .collect();

    if json {
        return print_json(&serde_json::json!({
            "stream": stream.to_string(),
            "name": schema.name,
            "fields": rows,
        }));
    }

    println!("{} ({stream})", schema.name);
    if rows.is_empty() {
        println!("No fields assigned.");
        return Ok(());
    }
    let table = rows
        .iter()
        .map(|r| {
            vec![
                r.slug.to_string(),
                r.name.to_string(),
                if r.resolved {
                    r.field_type.to_string()
                } else {
                    format!("{} (unknown type)", r.field_type)
                },
                yes_no(r.required),
                yes_no(r.unique),
            ]
        })
        .collect();
    print_table(&["SLUG", "NAME", "TYPE", "REQUIRED", "UNIQUE"], table);
    Ok(())
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let services = Services::load(root)?;
    let streams = services.schemas.list().context("failed to list streams")?;
    if json {
        let names: Vec<String> = streams.iter().map(ToString::to_string).collect();
        return print_json(&names);
    }
    if streams.is_empty() {
        println!("No streams.");
    }
    for s in streams {
        println!("{s}");
    }
    Ok(())
}

fn types(root: &Path, json: bool) -> anyhow::Result<()> {
    let services = Services::load(root)?;
    let failures: Vec<String> = services
        .registry
        .run_schema_setup_events(None)
        .iter()
        .map(ToString::to_string)
        .collect();
    let slugs: Vec<&str> = services.registry.type_slugs().collect();
    if json {
        return print_json(&serde_json::json!({
            "types": slugs,
            "setup_failures": failures,
        }));
    }
    for slug in slugs {
        println!("{slug}");
    }
    for f in failures {
        println!("note: {f}");
    }
    Ok(())
}

fn yes_no(flag: bool) -> String {
    if flag { "yes" } else { "no" }.to_string()
}
