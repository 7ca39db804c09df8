//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying classification
//! and reconciliation results in text or JSON form.

use colored::Colorize;
use std::collections::BTreeMap;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::planner::{DriftStatus, PlanOutcome};
use crate::reconciler::ReconcileOutcome;
use crate::state::ResourceRecord;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Resource row for table display.
#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Type")]
    resource_type: String,
    #[tabled(rename = "Provider")]
    provider: String,
    #[tabled(rename = "Status")]
    status: String,
}

/// Announced change row for table display.
#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Action")]
    action: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a classified plan outcome.
    #[must_use]
    pub fn format_outcome(&self, outcome: &PlanOutcome) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(outcome).unwrap_or_default(),
            OutputFormat::Text => Self::format_outcome_text(outcome),
        }
    }

    /// Formats a parsed resource map.
    #[must_use]
    pub fn format_resources(&self, resources: &BTreeMap<String, ResourceRecord>) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(resources).unwrap_or_default(),
            OutputFormat::Text => Self::format_resources_text(resources),
        }
    }

    /// Formats a reconciliation diff.
    #[must_use]
    pub fn format_diff(&self, outcome: &ReconcileOutcome) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(outcome).unwrap_or_default(),
            OutputFormat::Text => Self::format_diff_text(outcome),
        }
    }

    fn format_outcome_text(outcome: &PlanOutcome) -> String {
        let mut output = String::new();

        let _ = writeln!(output, "Status: {}", Self::status_label(outcome.status));
        let _ = writeln!(output, "{}", outcome.message);

        if !outcome.resource_changes.is_empty() {
            let rows: Vec<ChangeRow> = outcome
                .resource_changes
                .iter()
                .map(|c| ChangeRow {
                    address: c.address.clone(),
                    action: c.action.to_string(),
                })
                .collect();
            let _ = writeln!(output, "\nResource changes:\n{}", Table::new(rows));
        }

        if !outcome.output_changes.is_empty() {
            let rows: Vec<ChangeRow> = outcome
                .output_changes
                .iter()
                .map(|c| ChangeRow {
                    address: c.address.clone(),
                    action: c.action.to_string(),
                })
                .collect();
            let _ = writeln!(output, "\nOutput changes:\n{}", Table::new(rows));
        }

        if !outcome.errors.is_empty() {
            let _ = writeln!(output, "\n{}", "Errors:".red().bold());
            for error in &outcome.errors {
                let _ = writeln!(output, "  - {error}");
            }
        }

        output
    }

    fn format_resources_text(resources: &BTreeMap<String, ResourceRecord>) -> String {
        if resources.is_empty() {
            return String::from("No resources reported.\n");
        }

        let rows: Vec<ResourceRow> = resources
            .values()
            .map(|r| ResourceRow {
                address: r.address.clone(),
                resource_type: r.resource_type.clone(),
                provider: r.provider.clone(),
                status: r.status.to_string(),
            })
            .collect();

        format!("{}\n", Table::new(rows))
    }

    fn format_diff_text(outcome: &ReconcileOutcome) -> String {
        let mut output = String::new();

        if outcome.total_operations() == 0 {
            return format!("{} Nothing tracked on either side.\n", "✓".green());
        }

        for record in &outcome.additions {
            let _ = writeln!(output, "{} {}", "+".green(), record.address);
        }
        for record in &outcome.updates {
            let _ = writeln!(output, "{} {}", "~".yellow(), record.address);
        }
        for address in &outcome.removals {
            let _ = writeln!(output, "{} {}", "-".red(), address);
        }

        let _ = writeln!(output, "\n{outcome}");
        output
    }

    fn status_label(status: DriftStatus) -> String {
        match status {
            DriftStatus::Sync => "sync".green().to_string(),
            DriftStatus::Desynchronized => "desynchronized".yellow().to_string(),
            DriftStatus::Drift => "drift".yellow().bold().to_string(),
            DriftStatus::Error => "error".red().bold().to_string(),
        }
    }
}
