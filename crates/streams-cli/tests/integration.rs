#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn streams(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("streams").unwrap();
    cmd.current_dir(dir.path()).env("STREAMS_ROOT", dir.path());
    cmd
}

fn init_project(dir: &TempDir) {
    streams(dir).arg("init").assert().success();
}

fn read(dir: &TempDir, rel: &str) -> String {
    std::fs::read_to_string(dir.path().join(rel)).unwrap()
}

// ---------------------------------------------------------------------------
// streams init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_directory_tree() {
    let dir = TempDir::new().unwrap();
    streams(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("created: .streams/streams/site/blog.yaml"));

    assert!(dir.path().join(".streams/entries").is_dir());
    assert!(dir.path().join(".streams/forms/blog.yaml").exists());
    assert!(dir.path().join(".streams/lang.yaml").exists());
}

#[test]
fn init_is_idempotent_and_keeps_edits() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    std::fs::write(dir.path().join(".streams/forms/blog.yaml"), "title: Mine\n").unwrap();
    streams(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("exists:  .streams/forms/blog.yaml"));
    assert_eq!(read(&dir, ".streams/forms/blog.yaml"), "title: Mine\n");
}

#[test]
fn commands_require_init() {
    let dir = TempDir::new().unwrap();
    streams(&dir)
        .args(["form", "show", "site.blog"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}

// ---------------------------------------------------------------------------
// streams schema
// ---------------------------------------------------------------------------

#[test]
fn schema_show_lists_fields_in_order() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let output = streams(&dir)
        .args(["schema", "show", "site.blog"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).unwrap();
    let title = text.find("title").unwrap();
    let cover = text.find("cover").unwrap();
    assert!(title < cover);
    assert!(!text.contains("unknown type"));
}

#[test]
fn schema_types_lists_builtins() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    streams(&dir)
        .args(["schema", "types"])
        .assert()
        .success()
        .stdout(predicate::str::contains("email").and(predicate::str::contains("user")))
        .stdout(predicate::str::contains("note:").not());
}

#[test]
fn schema_show_flags_unknown_types() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let path = dir.path().join(".streams/streams/site/blog.yaml");
    let schema = std::fs::read_to_string(&path)
        .unwrap()
        .replace("field_type: file", "field_type: wysiwyg");
    std::fs::write(&path, schema).unwrap();

    streams(&dir)
        .args(["schema", "show", "site.blog"])
        .assert()
        .success()
        .stdout(predicate::str::contains("wysiwyg (unknown type)"));

    let output = streams(&dir)
        .args(["--json", "schema", "show", "site.blog"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["fields"][3]["resolved"], false);
}

#[test]
fn schema_list_shows_sample_stream() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    streams(&dir)
        .args(["schema", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("site.blog"));
}

// ---------------------------------------------------------------------------
// streams config validate
// ---------------------------------------------------------------------------

#[test]
fn config_validate_sample_is_clean() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    streams(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("blog: valid"));
}

#[test]
fn config_validate_fails_on_errors() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    std::fs::write(
        dir.path().join(".streams/forms/broken.yaml"),
        "pagination:\n  limit: 0\n",
    )
    .unwrap();
    streams(&dir)
        .args(["config", "validate", "--form", "broken"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error] pagination.limit"))
        .stderr(predicate::str::contains("validation found errors"));
}

#[test]
fn config_with_unknown_option_is_rejected() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    std::fs::write(dir.path().join(".streams/forms/typo.yaml"), "redirect: x\n").unwrap();
    streams(&dir)
        .args(["config", "validate", "--form", "typo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown field"));
}

// ---------------------------------------------------------------------------
// streams form
// ---------------------------------------------------------------------------

#[test]
fn form_show_renders_defaults_and_translated_title() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    streams(&dir)
        .args(["form", "show", "site.blog", "--actor", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Write a post"))
        .stdout(predicate::str::contains("Untitled"))
        .stdout(predicate::str::contains("Title *"));
}

#[test]
fn form_show_json_reports_rules() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let output = streams(&dir)
        .args(["-j", "form", "show", "site.blog"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let run: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(run["state"], "rendered");
    assert_eq!(run["mode"], "create");
    assert_eq!(run["rules"][0]["field"], "site-blog-title");
    assert_eq!(run["rules"][0]["rules"], "required|max_length[100]");
    assert_eq!(run["outcome"]["fields"][0]["value"], "Untitled");
}

#[test]
fn submit_with_missing_title_shows_error_and_saves_nothing() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    streams(&dir)
        .args(["form", "submit", "site.blog", "--set", "title="])
        .assert()
        .success()
        .stdout(predicate::str::contains("The Title field is required."))
        .stdout(predicate::str::contains("[notice]"));
    assert!(!dir.path().join(".streams/entries/site/blog/1.yaml").exists());
}

#[test]
fn submit_saves_entry_and_queues_notification() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    streams(&dir)
        .args([
            "form",
            "submit",
            "site.blog",
            "--set",
            "title=Hello",
            "--set",
            "author_email=ada@example.com",
            "--ip",
            "10.0.0.1",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("[success] Entry created."))
        .stdout(predicate::str::contains("notifications: 1 sent, 0 failed"));

    let entry = read(&dir, ".streams/entries/site/blog/1.yaml");
    assert!(entry.contains("title: Hello"));

    let outbox = read(&dir, ".streams/outbox.jsonl");
    let line: serde_json::Value = serde_json::from_str(outbox.lines().next().unwrap()).unwrap();
    assert_eq!(line["to"][0], "ada@example.com");
    assert_eq!(line["template"], "blog-entry-saved");
    assert_eq!(line["data"]["created"], true);
    assert_eq!(line["data"]["sender_ip"], "10.0.0.1");
    assert_eq!(line["data"]["sender_os"], std::env::consts::OS);
}

#[test]
fn notification_failure_does_not_block_save() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    streams(&dir)
        .args(["form", "submit", "site.blog", "--set", "title=Hello"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[success] Entry created."))
        .stdout(predicate::str::contains("0 sent, 1 failed"));
    assert!(dir.path().join(".streams/entries/site/blog/1.yaml").exists());
}

#[test]
fn submit_with_action_redirects() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    streams(&dir)
        .args([
            "form", "submit", "site.blog", "--set", "title=Hello", "--action", "save",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("redirect: admin/blog/edit/1"));
}

#[test]
fn unknown_action_falls_back_to_render() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    streams(&dir)
        .args([
            "form", "submit", "site.blog", "--set", "title=Hello", "--action", "publish",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("[success] Entry created."))
        .stdout(predicate::str::contains("note: unknown form action 'publish'"));
}

#[test]
fn update_existing_entry() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    streams(&dir)
        .args(["form", "submit", "site.blog", "--set", "title=First"])
        .assert()
        .success();
    streams(&dir)
        .args([
            "form", "submit", "site.blog", "--entry", "1", "--set", "title=Second",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("[success] Entry updated."));

    let entry = read(&dir, ".streams/entries/site/blog/1.yaml");
    assert!(entry.contains("title: Second"));
    assert!(!dir.path().join(".streams/entries/site/blog/2.yaml").exists());
}

#[test]
fn duplicate_unique_value_is_rejected() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let submit = |title: &str| {
        streams(&dir)
            .args([
                "form",
                "submit",
                "site.blog",
                "--set",
                &format!("title={title}"),
                "--set",
                "slug=hello",
            ])
            .assert()
            .success()
    };
    submit("One").stdout(predicate::str::contains("[success]"));
    submit("Two").stdout(predicate::str::contains(
        "[notice] There was a problem creating the entry.",
    ));
    assert!(!dir.path().join(".streams/entries/site/blog/2.yaml").exists());
}

#[test]
fn missing_entry_is_an_error() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    streams(&dir)
        .args(["form", "show", "site.blog", "--entry", "42"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("entry not found"));
}

// ---------------------------------------------------------------------------
// streams entry list
// ---------------------------------------------------------------------------

#[test]
fn entry_list_shows_saved_entries() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    streams(&dir)
        .args(["entry", "list", "site.blog"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No entries."));

    for title in ["Alpha", "Beta"] {
        streams(&dir)
            .args(["form", "submit", "site.blog", "--set", &format!("title={title}")])
            .assert()
            .success();
    }

    streams(&dir)
        .args(["entry", "list", "site.blog"])
        .assert()
        .success()
        .stdout(predicate::str::contains("title=Alpha"))
        .stdout(predicate::str::contains("title=Beta"))
        .stdout(predicate::str::contains("page 1 of 1 (2 entries)"));
}

#[test]
fn form_show_interpolates_cancel_uri() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    streams(&dir)
        .args(["--json", "form", "show", "site.blog"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cancel_uri"))
        .stdout(predicate::str::contains("{{").not());
}
