use anyhow::Context;
use std::path::Path;
use streams_core::types::StreamRef;
use streams_core::{io, paths};

/// Sample stream written by `streams init`.
pub const SAMPLE_STREAM: &str = "site.blog";

const SAMPLE_SCHEMA: &str = r#"namespace: site
slug: blog
name: Blog
assignments:
  - slug: title
    name: lang:blog:title
    field_type: text
    required: true
    instructions: lang:blog:title_help
    parameters:
      max_length: 100
      placeholder: lang:blog:title_placeholder
    sort_order: 1
  - slug: slug
    name: Slug
    field_type: text
    unique: true
    sort_order: 2
  - slug: author_email
    name: Author email
    field_type: email
    sort_order: 3
  - slug: cover
    name: Cover image
    field_type: file
    sort_order: 4
  - slug: author
    name: Author
    field_type: user
    parameters:
      default_to_current_user: yes
    sort_order: 5
"#;

const SAMPLE_FORM: &str = r#"title: lang:blog:form_title
redirects:
  save: admin/blog/edit/{{ id }}
  exit: admin/blog
  create: admin/blog/create
  continue: admin/blog/edit/{{ id }}
defaults:
  title: Untitled
notifications:
  - to: author_email
    template: blog-entry-saved
    from: noreply@example.com|Blog
pagination:
  limit: 10
  uri: admin/blog/index
buttons: [save, continue, exit]
no_fields_message: This stream has no fields yet.
"#;

const SAMPLE_LANG: &str = r#"entries:
  blog:title: Title
  blog:title_help: Shown as the page heading.
  blog:title_placeholder: A catchy headline
  blog:form_title: Write a post
"#;

pub fn run(root: &Path) -> anyhow::Result<()> {
    println!("Initializing streams in: {}", root.display());

    let dirs = [
        paths::STREAMS_DIR,
        paths::SCHEMAS_DIR,
        paths::ENTRIES_DIR,
        paths::FORMS_DIR,
    ];
    for dir in dirs {
        let p = root.join(dir);
        io::ensure_dir(&p).with_context(|| format!("failed to create {}", p.display()))?;
    }

    let stream = SAMPLE_STREAM.parse::<StreamRef>()?;
    let files = [
        (paths::schema_path(root, &stream), SAMPLE_SCHEMA),
        (paths::form_config_path(root, &stream.slug), SAMPLE_FORM),
        (paths::lang_path(root), SAMPLE_LANG),
    ];
    for (path, content) in files {
        let rel = path.strip_prefix(root).unwrap_or(&path).display().to_string();
        let created = io::write_if_missing(&path, content.as_bytes())
            .with_context(|| format!("failed to write {rel}"))?;
        if created {
            println!("  created: {rel}");
        } else {
            println!("  exists:  {rel}");
        }
    }

    println!("\nTry: streams form show {SAMPLE_STREAM}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use streams_core::config::FormConfig;
    use streams_core::lang::Catalog;
    use streams_core::schema::StreamSchema;

    #[test]
    fn samples_parse() {
        let schema = StreamSchema::from_yaml(SAMPLE_SCHEMA).unwrap();
        assert_eq!(schema.stream_ref().to_string(), SAMPLE_STREAM);
        assert_eq!(schema.assignments.len(), 5);
        let form = FormConfig::from_yaml(SAMPLE_FORM).unwrap();
        assert!(form.validate().is_empty());
        let lang: Catalog = serde_yaml::from_str(SAMPLE_LANG).unwrap();
        assert_eq!(lang.entries["blog:title"], "Title");
    }
}
