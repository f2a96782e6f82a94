//! Notification dispatch boundary. Each configured target becomes one send;
//! sends are independent and best-effort.

use crate::error::{Result, StreamsError};
use crate::types::{value_text, StreamRef, Submission};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::path::PathBuf;
use tracing::{debug, warn};

/// One configured notification: who gets which template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationTarget {
    /// `|`-separated addresses. A piece without `@` names a submitted field.
    pub to: String,
    pub template: String,
    /// `address` or `address|name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sender {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Request metadata passed along with every notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
}

/// A fully resolved send request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub to: Vec<String>,
    pub template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Sender>,
    pub data: Map<String, Value>,
}

pub trait Notifier {
    fn send(&self, notification: &Notification) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

/// A submitted value by bare field slug or by its qualified name.
fn submitted(submission: Option<&Submission>, stream: &StreamRef, key: &str) -> Option<String> {
    let s = submission?;
    s.value(key)
        .or_else(|| s.value(&stream.qualify(key)))
        .map(value_text)
        .filter(|v| !v.trim().is_empty())
}

fn resolve_address(piece: &str, submission: Option<&Submission>, stream: &StreamRef) -> String {
    if piece.contains('@') {
        return piece.to_string();
    }
    submitted(submission, stream, piece).unwrap_or_else(|| piece.to_string())
}

/// Resolve a target against the submission. Targets without recipients or
/// template are refused.
pub fn build_notification(
    target: &NotificationTarget,
    stream: &StreamRef,
    submission: Option<&Submission>,
    data: &Map<String, Value>,
) -> Result<Notification> {
    if target.template.trim().is_empty() {
        return Err(StreamsError::Notification {
            template: String::new(),
            message: "no template configured".to_string(),
        });
    }
    let to: Vec<String> = target
        .to
        .split('|')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| resolve_address(p, submission, stream))
        .collect();
    if to.is_empty() {
        return Err(StreamsError::Notification {
            template: target.template.clone(),
            message: "no recipients configured".to_string(),
        });
    }

    let from = target.from.as_deref().and_then(|raw| {
        let mut parts = raw.splitn(2, '|').map(str::trim);
        let address = parts.next().filter(|a| !a.is_empty())?;
        let name = parts
            .next()
            .filter(|n| !n.is_empty())
            .map(|n| submitted(submission, stream, n).unwrap_or_else(|| n.to_string()));
        Some(Sender {
            address: resolve_address(address, submission, stream),
            name,
        })
    });

    Ok(Notification {
        to,
        template: target.template.clone(),
        from,
        data: data.clone(),
    })
}

/// Every address must at least look like one.
pub fn check_recipients(notification: &Notification) -> Result<()> {
    match notification.to.iter().find(|a| !a.contains('@')) {
        Some(bad) => Err(StreamsError::Notification {
            template: notification.template.clone(),
            message: format!("invalid recipient '{bad}'"),
        }),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NotificationStatus {
    Sent,
    Skipped { reason: String },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationOutcome {
    pub template: String,
    pub to: Vec<String>,
    #[serde(flatten)]
    pub status: NotificationStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationReport {
    pub outcomes: Vec<NotificationOutcome>,
}

impl NotificationReport {
    pub fn sent(&self) -> usize {
        self.count(|s| matches!(s, NotificationStatus::Sent))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, NotificationStatus::Failed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, NotificationStatus::Skipped { .. }))
    }

    fn count(&self, pred: impl Fn(&NotificationStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

/// Attempt every target. A failed or skipped target never stops the rest.
pub fn dispatch_all(
    notifier: &dyn Notifier,
    targets: &[NotificationTarget],
    stream: &StreamRef,
    submission: Option<&Submission>,
    data: &Map<String, Value>,
) -> NotificationReport {
    let mut report = NotificationReport::default();
    for target in targets {
        let notification = match build_notification(target, stream, submission, data) {
            Ok(n) => n,
            Err(e) => {
                warn!(template = %target.template, error = %e, "notification skipped");
                report.outcomes.push(NotificationOutcome {
                    template: target.template.clone(),
                    to: Vec::new(),
                    status: NotificationStatus::Skipped {
                        reason: e.to_string(),
                    },
                });
                continue;
            }
        };
        let status = match notifier.send(&notification) {
            Ok(()) => {
                debug!(template = %notification.template, "notification sent");
                NotificationStatus::Sent
            }
            Err(e) => {
                warn!(template = %notification.template, error = %e, "notification failed");
                NotificationStatus::Failed {
                    error: e.to_string(),
                }
            }
        };
        report.outcomes.push(NotificationOutcome {
            template: notification.template,
            to: notification.to,
            status,
        });
    }
    report
}

// ---------------------------------------------------------------------------
// Notifiers
// ---------------------------------------------------------------------------

/// Keeps accepted notifications in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: RefCell<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.borrow().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, notification: &Notification) -> Result<()> {
        check_recipients(notification)?;
        self.sent.borrow_mut().push(notification.clone());
        Ok(())
    }
}

/// Appends each notification as one JSON line to an outbox file for a
/// mailer to pick up.
#[derive(Debug, Clone)]
pub struct OutboxNotifier {
    path: PathBuf,
}

impl OutboxNotifier {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn read_all(&self) -> Result<Vec<Notification>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = std::fs::read_to_string(&self.path)?;
        data.lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(StreamsError::from))
            .collect()
    }
}

impl Notifier for OutboxNotifier {
    fn send(&self, notification: &Notification) -> Result<()> {
        check_recipients(notification)?;
        let line = serde_json::to_string(notification)?;
        crate::io::append_line(&self.path, &line)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn stream() -> StreamRef {
        StreamRef::new("ns", "contact")
    }

    fn target(to: &str) -> NotificationTarget {
        NotificationTarget {
            to: to.to_string(),
            template: "contact-received".to_string(),
            from: None,
        }
    }

    #[test]
    fn recipients_resolved_from_submission() {
        let sub = Submission::new()
            .with_value("ns-contact-email", "visitor@example.com")
            .with_value("name", "Ada");
        let mut t = target("admin@example.com|email");
        t.from = Some("email|name".to_string());
        let n = build_notification(&t, &stream(), Some(&sub), &Map::new()).unwrap();
        assert_eq!(n.to, vec!["admin@example.com", "visitor@example.com"]);
        assert_eq!(
            n.from,
            Some(Sender {
                address: "visitor@example.com".to_string(),
                name: Some("Ada".to_string())
            })
        );
    }

    #[test]
    fn empty_targets_refused() {
        assert!(build_notification(&target(" | "), &stream(), None, &Map::new()).is_err());
        let mut t = target("a@example.com");
        t.template = String::new();
        assert!(build_notification(&t, &stream(), None, &Map::new()).is_err());
    }

    #[test]
    fn one_failure_does_not_stop_the_rest() {
        let notifier = RecordingNotifier::new();
        let targets = vec![target("not-an-address"), target(""), target("ok@example.com")];
        let report = dispatch_all(&notifier, &targets, &stream(), None, &Map::new());
        assert_eq!(report.failed(), 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.sent(), 1);
        assert_eq!(notifier.sent().len(), 1);
        assert_eq!(notifier.sent()[0].to, vec!["ok@example.com"]);
    }

    #[test]
    fn outbox_appends_json_lines() {
        let dir = TempDir::new().unwrap();
        let outbox = OutboxNotifier::new(dir.path().join(".streams/outbox.jsonl"));
        let mut data = Map::new();
        data.insert("id".to_string(), Value::from(1));
        for _ in 0..2 {
            let n = build_notification(&target("a@example.com"), &stream(), None, &data).unwrap();
            outbox.send(&n).unwrap();
        }
        let all = outbox.read_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].data["id"], Value::from(1));
    }

    #[test]
    fn report_serializes_with_status_tag() {
        let report = NotificationReport {
            outcomes: vec![NotificationOutcome {
                template: "t".to_string(),
                to: vec![],
                status: NotificationStatus::Failed {
                    error: "boom".to_string(),
                },
            }],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcomes"][0]["status"], "failed");
        assert_eq!(json["outcomes"][0]["error"], "boom");
    }
}
