//! Aggregation of a plan log stream into a single outcome.
//!
//! The classifier folds a sequence of decoded log entries into one
//! [`PlanOutcome`]. Statuses are tie-broken ERROR > DRIFT > DESYNCHRONIZED
//! > SYNC regardless of record order in the stream.

use serde::{Deserialize, Serialize};

use super::logs::{ChangeAction, PlanLogEntry, NO_CHANGES_SUMMARY};

/// Message published when the plan reports no changes.
pub const SYNC_MESSAGE: &str = "No changes. Your infrastructure matches the configuration.";

/// Message published when diagnostics are present.
pub const ERROR_MESSAGE: &str = "Something went wrong. Check your configuration.";

const DESYNC_PREFIX: &str = "Configuration and infrastructure do not match. ";

const DRIFT_PREFIX: &str = "Drift detected. Configuration and infrastructure do not match. \
    Run apply to align infrastructure and configuration. Changes made outside the tool \
    will be lost unless they are added to the configuration. ";

const MISSING_SUMMARY_MESSAGE: &str =
    "The run aborted before producing a change summary. Check your configuration.";

/// Aggregate drift status of one classified plan run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DriftStatus {
    /// Infrastructure matches the configuration.
    Sync,
    /// Configuration changed but infrastructure has not been updated.
    Desynchronized,
    /// Infrastructure changed outside the configuration.
    Drift,
    /// The tool reported diagnostics.
    Error,
}

/// One announced resource change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceChange {
    /// Resource address.
    pub address: String,
    /// Announced action.
    pub action: ChangeAction,
}

/// One announced output change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputChange {
    /// Output name.
    pub address: String,
    /// Announced action.
    pub action: ChangeAction,
}

/// Aggregate result of classifying a full log stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanOutcome {
    /// The classified drift status.
    pub status: DriftStatus,
    /// Human-readable explanation of the status.
    pub message: String,
    /// Non-noop resource changes, in stream order.
    pub resource_changes: Vec<ResourceChange>,
    /// Non-noop output changes.
    pub output_changes: Vec<OutputChange>,
    /// Diagnostic text, one entry per reported diagnostic.
    pub errors: Vec<String>,
}

/// Classifier for plan log streams.
#[derive(Debug, Default)]
pub struct PlanClassifier;

impl std::fmt::Display for DriftStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Sync => "sync",
            Self::Desynchronized => "desynchronized",
            Self::Drift => "drift",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

impl PlanOutcome {
    /// Returns true when infrastructure matches the configuration.
    #[must_use]
    pub fn is_sync(&self) -> bool {
        self.status == DriftStatus::Sync
    }

    /// Returns true when at least one resource change was announced.
    #[must_use]
    pub fn has_resource_changes(&self) -> bool {
        !self.resource_changes.is_empty()
    }

    /// Returns true when at least one output change was announced.
    #[must_use]
    pub fn has_output_changes(&self) -> bool {
        !self.output_changes.is_empty()
    }
}

impl PlanClassifier {
    /// Creates a new classifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Folds a decoded log stream into a single outcome.
    ///
    /// Steps, in priority order (later steps override earlier status):
    /// change summary → output changes → planned changes → drift →
    /// diagnostics. The absence of a summary means the run aborted before
    /// producing one; classification still proceeds on whatever drift and
    /// diagnostic records exist.
    #[must_use]
    pub fn classify(&self, entries: &[PlanLogEntry]) -> PlanOutcome {
        let summary = entries.iter().find_map(|e| match e {
            PlanLogEntry::ChangeSummary { message } => Some(message.as_str()),
            _ => None,
        });

        let (mut status, mut message) = match summary {
            Some(msg) if is_no_changes(msg) => (DriftStatus::Sync, SYNC_MESSAGE.to_string()),
            Some(msg) => (DriftStatus::Desynchronized, format!("{DESYNC_PREFIX}{msg}")),
            None => (DriftStatus::Desynchronized, MISSING_SUMMARY_MESSAGE.to_string()),
        };

        let output_changes = entries
            .iter()
            .find_map(|e| match e {
                PlanLogEntry::Outputs { outputs } => Some(outputs),
                _ => None,
            })
            .map(|outputs| {
                outputs
                    .iter()
                    .filter(|(_, delta)| !delta.action.is_noop())
                    .map(|(name, delta)| OutputChange {
                        address: name.clone(),
                        action: delta.action,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut resource_changes: Vec<ResourceChange> = entries
            .iter()
            .filter_map(|e| match e {
                PlanLogEntry::PlannedChange { change } if !change.action.is_noop() => {
                    Some(ResourceChange {
                        address: change.resource.addr.clone(),
                        action: change.action,
                    })
                }
                _ => None,
            })
            .collect();

        let drifted: Vec<ResourceChange> = entries
            .iter()
            .filter_map(|e| match e {
                PlanLogEntry::ResourceDrift { change } if !change.action.is_noop() => {
                    Some(ResourceChange {
                        address: change.resource.addr.clone(),
                        action: change.action,
                    })
                }
                _ => None,
            })
            .collect();

        if !drifted.is_empty() {
            status = DriftStatus::Drift;
            message = format!("{DRIFT_PREFIX}{}", summary.unwrap_or_default())
                .trim_end()
                .to_string();
            // fold drifted addresses into the resource changes
            for change in drifted {
                if !resource_changes.contains(&change) {
                    resource_changes.push(change);
                }
            }
        }

        let errors: Vec<String> = entries
            .iter()
            .filter_map(|e| match e {
                PlanLogEntry::Diagnostic { diagnostic } => {
                    if diagnostic.detail.is_empty() {
                        Some(diagnostic.summary.clone())
                    } else {
                        Some(format!("{}: {}", diagnostic.summary, diagnostic.detail))
                    }
                }
                _ => None,
            })
            .collect();

        if !errors.is_empty() {
            // diagnostics win over drift and sync
            status = DriftStatus::Error;
            message = ERROR_MESSAGE.to_string();
        }

        PlanOutcome {
            status,
            message,
            resource_changes,
            output_changes,
            errors,
        }
    }
}

fn is_no_changes(message: &str) -> bool {
    message == NO_CHANGES_SUMMARY || message.starts_with("No changes.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::logs::LogEntryParser;

    fn classify(stream: &str) -> PlanOutcome {
        let parser = LogEntryParser::new();
        PlanClassifier::new().classify(&parser.parse_stream(stream))
    }

    const NO_CHANGES_LINE: &str = r#"{"@message":"No changes. Your infrastructure matches the configuration.","type":"change_summary"}"#;

    #[test]
    fn test_no_changes_classifies_as_sync() {
        let outcome = classify(NO_CHANGES_LINE);
        assert_eq!(outcome.status, DriftStatus::Sync);
        assert_eq!(outcome.message, SYNC_MESSAGE);
        assert!(outcome.resource_changes.is_empty());
        assert!(outcome.errors.is_empty());
    }

    #[test]
    fn test_zero_count_summary_classifies_as_sync() {
        let stream = r#"{"@message":"Plan: 0 to add, 0 to change, 0 to destroy.","type":"change_summary"}"#;
        assert_eq!(classify(stream).status, DriftStatus::Sync);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let first = classify(NO_CHANGES_LINE);
        let second = classify(NO_CHANGES_LINE);
        assert_eq!(first, second);
    }

    #[test]
    fn test_planned_changes_classify_as_desynchronized() {
        let stream = concat!(
            r#"{"@message":"Plan: 0 to add, 2 to change, 0 to destroy.","type":"change_summary"}"#,
            "\n",
            r#"{"type":"planned_change","change":{"resource":{"addr":"aws_instance.x"},"action":"update"}}"#,
        );

        let outcome = classify(stream);
        assert_eq!(outcome.status, DriftStatus::Desynchronized);
        assert!(outcome.message.contains("do not match"));
        assert_eq!(outcome.resource_changes.len(), 1);
        assert_eq!(outcome.resource_changes[0].address, "aws_instance.x");
        assert_eq!(outcome.resource_changes[0].action, ChangeAction::Update);
    }

    #[test]
    fn test_noop_changes_are_ignored() {
        let stream = concat!(
            r#"{"@message":"Plan: 0 to add, 0 to change, 0 to destroy.","type":"change_summary"}"#,
            "\n",
            r#"{"type":"planned_change","change":{"resource":{"addr":"aws_instance.x"},"action":"noop"}}"#,
            "\n",
            r#"{"type":"outputs","outputs":{"ip":{"action":"noop"}}}"#,
        );

        let outcome = classify(stream);
        assert_eq!(outcome.status, DriftStatus::Sync);
        assert!(outcome.resource_changes.is_empty());
        assert!(outcome.output_changes.is_empty());
    }

    #[test]
    fn test_drift_overrides_desynchronized() {
        let stream = concat!(
            r#"{"@message":"Plan: 0 to add, 1 to change, 0 to destroy.","type":"change_summary"}"#,
            "\n",
            r#"{"type":"resource_drift","change":{"resource":{"addr":"random_pet.server"},"action":"update"}}"#,
        );

        let outcome = classify(stream);
        assert_eq!(outcome.status, DriftStatus::Drift);
        assert!(outcome.message.starts_with("Drift detected."));
        assert_eq!(outcome.resource_changes.len(), 1);
        assert_eq!(outcome.resource_changes[0].address, "random_pet.server");
    }

    #[test]
    fn test_drift_folds_into_planned_changes() {
        let stream = concat!(
            r#"{"@message":"Plan: 0 to add, 2 to change, 0 to destroy.","type":"change_summary"}"#,
            "\n",
            r#"{"type":"planned_change","change":{"resource":{"addr":"aws_instance.x"},"action":"update"}}"#,
            "\n",
            r#"{"type":"resource_drift","change":{"resource":{"addr":"random_pet.server"},"action":"delete"}}"#,
        );

        let outcome = classify(stream);
        assert_eq!(outcome.status, DriftStatus::Drift);
        let addresses: Vec<&str> = outcome
            .resource_changes
            .iter()
            .map(|c| c.address.as_str())
            .collect();
        assert_eq!(addresses, vec!["aws_instance.x", "random_pet.server"]);
    }

    #[test]
    fn test_diagnostics_win_over_drift() {
        let stream = concat!(
            r#"{"@message":"Plan: 0 to add, 1 to change, 0 to destroy.","type":"change_summary"}"#,
            "\n",
            r#"{"type":"resource_drift","change":{"resource":{"addr":"random_pet.server"},"action":"update"}}"#,
            "\n",
            r#"{"type":"diagnostic","diagnostic":{"severity":"error","summary":"bad config","detail":""}}"#,
        );

        let outcome = classify(stream);
        assert_eq!(outcome.status, DriftStatus::Error);
        assert_eq!(outcome.message, ERROR_MESSAGE);
        assert_eq!(outcome.errors, vec![String::from("bad config")]);
        // the drifted resource is still reported as changed
        assert_eq!(outcome.resource_changes.len(), 1);
    }

    #[test]
    fn test_diagnostic_only_stream_classifies_as_error() {
        let stream = r#"{"type":"diagnostic","diagnostic":{"severity":"error","summary":"bad config","detail":"Unsupported argument."}}"#;

        let outcome = classify(stream);
        assert_eq!(outcome.status, DriftStatus::Error);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].contains("bad config"));
        assert!(outcome.errors[0].contains("Unsupported argument."));
    }

    #[test]
    fn test_missing_summary_still_classifies() {
        let stream = r#"{"type":"resource_drift","change":{"resource":{"addr":"aws_instance.x"},"action":"update"}}"#;

        let outcome = classify(stream);
        assert_eq!(outcome.status, DriftStatus::Drift);
        assert_eq!(outcome.resource_changes.len(), 1);
    }

    #[test]
    fn test_output_changes_are_collected() {
        let stream = concat!(
            r#"{"@message":"Plan: 0 to add, 0 to change, 0 to destroy.","type":"change_summary"}"#,
            "\n",
            r#"{"type":"outputs","outputs":{"ip":{"action":"update"},"dns":{"action":"noop"}}}"#,
        );

        let outcome = classify(stream);
        assert_eq!(outcome.status, DriftStatus::Sync);
        assert_eq!(outcome.output_changes.len(), 1);
        assert_eq!(outcome.output_changes[0].address, "ip");
        assert_eq!(outcome.output_changes[0].action, ChangeAction::Update);
    }
}
