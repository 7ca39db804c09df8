//! Decoding of the streamed plan/apply log.
//!
//! The tool emits one JSON record per line. Each line is independently
//! decodable and tagged by a `type` discriminator; everything unrecognized
//! (including malformed JSON) becomes [`PlanLogEntry::Other`] so that a
//! single corrupted line never aborts classification of an otherwise valid
//! multi-thousand-line stream.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Change-summary message the tool prints when nothing would change.
pub const NO_CHANGES_SUMMARY: &str = "Plan: 0 to add, 0 to change, 0 to destroy.";

/// Action announced for a resource or output change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ChangeAction {
    /// Nothing to do.
    Noop,
    /// Resource or output will be created.
    Create,
    /// Resource will be read.
    Read,
    /// Resource or output will be updated in place.
    Update,
    /// Resource or output will be destroyed.
    Delete,
    /// Resource will be destroyed and recreated.
    Replace,
    /// Resource will be removed from state without being destroyed.
    Forget,
    /// Resource will be moved to a new address.
    Move,
    /// Any action this version does not recognize.
    Unknown,
}

/// Resource reference inside a change record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResourceRef {
    /// Full resource address.
    pub addr: String,
}

/// Announced change to one resource.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResourceDelta {
    /// The resource the change applies to.
    pub resource: ResourceRef,
    /// The announced action.
    pub action: ChangeAction,
}

/// Announced change to one output.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OutputDelta {
    /// The announced action; absent on apply-phase records.
    #[serde(default = "OutputDelta::default_action")]
    pub action: ChangeAction,
}

/// Diagnostic payload reported inside an otherwise valid stream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DiagnosticBody {
    /// Diagnostic severity as reported by the tool.
    #[serde(default)]
    pub severity: String,
    /// Short description of the problem.
    #[serde(default)]
    pub summary: String,
    /// Longer explanation, often empty.
    #[serde(default)]
    pub detail: String,
}

/// One decoded line of the plan/apply log stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanLogEntry {
    /// Aggregate summary of the run.
    ChangeSummary {
        /// The human-readable summary message.
        #[serde(rename = "@message")]
        message: String,
    },
    /// Announced output changes.
    Outputs {
        /// Output name to its announced change.
        outputs: BTreeMap<String, OutputDelta>,
    },
    /// A change the plan intends to make.
    PlannedChange {
        /// The announced resource change.
        change: ResourceDelta,
    },
    /// A change detected outside the configuration.
    ResourceDrift {
        /// The drifted resource change.
        change: ResourceDelta,
    },
    /// A problem reported by the tool.
    Diagnostic {
        /// The diagnostic payload.
        diagnostic: DiagnosticBody,
    },
    /// Unrecognized or malformed line, ignored by classification.
    Other,
}

/// Decoder for plan/apply log lines.
#[derive(Debug, Default)]
pub struct LogEntryParser;

impl ChangeAction {
    /// Returns true when the action announces no actual change.
    #[must_use]
    pub const fn is_noop(self) -> bool {
        matches!(self, Self::Noop)
    }
}

impl From<&str> for ChangeAction {
    fn from(raw: &str) -> Self {
        match raw {
            "noop" => Self::Noop,
            "create" => Self::Create,
            "read" => Self::Read,
            "update" => Self::Update,
            "delete" => Self::Delete,
            "replace" => Self::Replace,
            "forget" => Self::Forget,
            "move" => Self::Move,
            _ => Self::Unknown,
        }
    }
}

impl From<String> for ChangeAction {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl std::fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Noop => "noop",
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Replace => "replace",
            Self::Forget => "forget",
            Self::Move => "move",
            Self::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

impl OutputDelta {
    const fn default_action() -> ChangeAction {
        ChangeAction::Noop
    }
}

impl PlanLogEntry {
    /// Returns true for lines that carry classification-relevant data.
    #[must_use]
    pub const fn is_recognized(&self) -> bool {
        !matches!(self, Self::Other)
    }
}

impl LogEntryParser {
    /// Creates a new log entry parser.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decodes one line of the log stream. Never fails: unparseable input
    /// becomes [`PlanLogEntry::Other`] for the caller to count and log.
    #[must_use]
    pub fn parse_line(&self, line: &str) -> PlanLogEntry {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return PlanLogEntry::Other;
        }
        serde_json::from_str(trimmed).unwrap_or(PlanLogEntry::Other)
    }

    /// Decodes a newline-delimited stream, one entry per non-blank line.
    #[must_use]
    pub fn parse_stream(&self, stream: &str) -> Vec<PlanLogEntry> {
        stream
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| self.parse_line(line))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_change_summary() {
        let parser = LogEntryParser::new();
        let line = r#"{"@level":"info","@message":"Plan: 1 to add, 0 to change, 0 to destroy.","@module":"terraform.ui","type":"change_summary","changes":{"add":1,"change":0,"remove":0,"operation":"plan"}}"#;

        let entry = parser.parse_line(line);
        assert_eq!(
            entry,
            PlanLogEntry::ChangeSummary {
                message: String::from("Plan: 1 to add, 0 to change, 0 to destroy.")
            }
        );
    }

    #[test]
    fn test_parse_planned_change() {
        let parser = LogEntryParser::new();
        let line = r#"{"@level":"info","@message":"aws_instance.x: Plan to update","type":"planned_change","change":{"resource":{"addr":"aws_instance.x","resource_type":"aws_instance","resource_name":"x"},"action":"update"}}"#;

        match parser.parse_line(line) {
            PlanLogEntry::PlannedChange { change } => {
                assert_eq!(change.resource.addr, "aws_instance.x");
                assert_eq!(change.action, ChangeAction::Update);
            }
            other => panic!("unexpected entry: {other:?}"),
        }
    }

    #[test]
    fn test_parse_resource_drift() {
        let parser = LogEntryParser::new();
        let line = r#"{"@level":"info","@message":"random_pet.server: Drift detected (update)","type":"resource_drift","change":{"resource":{"addr":"random_pet.server"},"action":"update"}}"#;

        match parser.parse_line(line) {
            PlanLogEntry::ResourceDrift { change } => {
                assert_eq!(change.resource.addr, "random_pet.server");
                assert_eq!(change.action, ChangeAction::Update);
            }
            other => panic!("unexpected entry: {other:?}"),
        }
    }

    #[test]
    fn test_parse_outputs() {
        let parser = LogEntryParser::new();
        let line = r#"{"@level":"info","@message":"Outputs: 2","type":"outputs","outputs":{"ip":{"sensitive":false,"action":"create"},"dns":{"sensitive":false,"action":"noop"}}}"#;

        match parser.parse_line(line) {
            PlanLogEntry::Outputs { outputs } => {
                assert_eq!(outputs["ip"].action, ChangeAction::Create);
                assert!(outputs["dns"].action.is_noop());
            }
            other => panic!("unexpected entry: {other:?}"),
        }
    }

    #[test]
    fn test_parse_diagnostic() {
        let parser = LogEntryParser::new();
        let line = r#"{"@level":"error","@message":"Error: bad config","type":"diagnostic","diagnostic":{"severity":"error","summary":"bad config","detail":"Unsupported argument on main.tf line 3."}}"#;

        match parser.parse_line(line) {
            PlanLogEntry::Diagnostic { diagnostic } => {
                assert_eq!(diagnostic.summary, "bad config");
                assert!(diagnostic.detail.contains("main.tf"));
            }
            other => panic!("unexpected entry: {other:?}"),
        }
    }

    #[test]
    fn test_unrecognized_kind_becomes_other() {
        let parser = LogEntryParser::new();
        let line = r#"{"@level":"info","@message":"Terraform 1.5.7","type":"version","terraform":"1.5.7"}"#;
        assert_eq!(parser.parse_line(line), PlanLogEntry::Other);
    }

    #[test]
    fn test_malformed_line_becomes_other() {
        let parser = LogEntryParser::new();
        assert_eq!(parser.parse_line("{truncated"), PlanLogEntry::Other);
        assert_eq!(parser.parse_line(""), PlanLogEntry::Other);
        assert_eq!(parser.parse_line("plain text noise"), PlanLogEntry::Other);
    }

    #[test]
    fn test_unknown_action_is_preserved_as_unknown() {
        let parser = LogEntryParser::new();
        let line = r#"{"type":"planned_change","change":{"resource":{"addr":"a.b"},"action":"transmogrify"}}"#;

        match parser.parse_line(line) {
            PlanLogEntry::PlannedChange { change } => {
                assert_eq!(change.action, ChangeAction::Unknown);
            }
            other => panic!("unexpected entry: {other:?}"),
        }
    }

    #[test]
    fn test_stream_survives_corrupted_lines() {
        let parser = LogEntryParser::new();
        let stream = concat!(
            r#"{"@message":"Plan: 0 to add, 0 to change, 0 to destroy.","type":"change_summary"}"#,
            "\n",
            "<<<garbage>>>",
            "\n",
            r#"{"type":"planned_change","change":{"resource":{"addr":"a.b"},"action":"noop"}}"#,
            "\n",
        );

        let entries = parser.parse_stream(stream);
        assert_eq!(entries.len(), 3);
        assert!(entries[0].is_recognized());
        assert!(!entries[1].is_recognized());
        assert!(entries[2].is_recognized());
    }
}
