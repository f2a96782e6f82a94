use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;
use streams_core::config::{ConfigWarning, FormConfig, WarnLevel};
use streams_core::paths;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Validate form configs for common mistakes
    Validate {
        /// Only this form (default: every form under .streams/forms)
        #[arg(long)]
        form: Option<String>,
    },
}

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Validate { form } => validate(root, form.as_deref(), json),
    }
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn form_names(root: &Path) -> anyhow::Result<Vec<String>> {
    let dir = root.join(paths::FORMS_DIR);
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in std::fs::read_dir(&dir).with_context(|| format!("failed to read {}", dir.display()))? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            names.push(stem.to_string());
        }
    }
    names.sort();
    Ok(names)
}

fn validate(root: &Path, form: Option<&str>, json: bool) -> anyhow::Result<()> {
    let names = match form {
        Some(name) => vec![name.to_string()],
        None => form_names(root)?,
    };

    let mut results: Vec<(String, Vec<ConfigWarning>)> = Vec::new();
    for name in names {
        let cfg = FormConfig::load(root, &name)
            .with_context(|| format!("failed to load form config '{name}'"))?;
        let warnings = cfg.validate();
        results.push((name, warnings));
    }

    if json {
        let value: Vec<_> = results
            .iter()
            .map(|(name, warnings)| serde_json::json!({ "form": name, "warnings": warnings }))
            .collect();
        print_json(&value)?;
    } else if results.is_empty() {
        println!("No form configs found.");
    } else {
        for (name, warnings) in &results {
            if warnings.is_empty() {
                println!("{name}: valid. No warnings.");
                continue;
            }
            println!("{name}:");
            for w in warnings {
                let prefix = match w.level {
                    WarnLevel::Warning => "warning",
                    WarnLevel::Error => "error",
                };
                println!("  [{prefix}] {}", w.message);
            }
        }
    }

    if results.iter().any(|(_, w)| FormConfig::has_errors(w)) {
        anyhow::bail!("form config validation found errors");
    }
    Ok(())
}
