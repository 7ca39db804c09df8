//! Reconciliation engine computing the minimal change set.
//!
//! A reconciliation pass diffs a freshly parsed snapshot against the
//! currently tracked resource set and produces the add/update/remove
//! operations required to bring the tracked model in line. The engine is a
//! pure function of its inputs; the orchestrator applies the result as one
//! batch against the tracked model.

use std::collections::BTreeMap;
use tracing::debug;

use crate::state::{ResourceRecord, TrackedResourceSet};

/// Engine computing set-difference diffs between a tracked set and a
/// snapshot.
#[derive(Debug, Default)]
pub struct ReconciliationEngine;

/// Result of one reconciliation pass.
///
/// Together the three lists partition the union of tracked and snapshot
/// addresses: every address appears exactly once.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ReconcileOutcome {
    /// Genuinely new resources present only in the snapshot.
    pub additions: Vec<ResourceRecord>,
    /// Resources present on both sides, carrying the fresh record.
    pub updates: Vec<ResourceRecord>,
    /// Addresses no longer reported by the snapshot. These resources were
    /// removed from infrastructure and must be decommissioned by the
    /// caller, never silently re-added under the same address.
    pub removals: Vec<String>,
}

impl ReconciliationEngine {
    /// Creates a new reconciliation engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Diffs `snapshot` against `previous`.
    ///
    /// Every tracked address found in the snapshot becomes an update and is
    /// removed from the working copy; every tracked address missing from
    /// the snapshot is stale and becomes a removal. Whatever remains in the
    /// working copy is the addition set. O(n) in snapshot size and
    /// independent of iteration order.
    #[must_use]
    pub fn reconcile(
        &self,
        previous: &TrackedResourceSet,
        snapshot: &BTreeMap<String, ResourceRecord>,
    ) -> ReconcileOutcome {
        let mut working: BTreeMap<&String, &ResourceRecord> = snapshot.iter().collect();

        let mut updates = Vec::new();
        let mut removals = Vec::new();
        for (address, _) in previous.iter() {
            match working.remove(address) {
                Some(record) => updates.push(record.clone()),
                None => removals.push(address.clone()),
            }
        }

        let additions: Vec<ResourceRecord> = working.into_values().cloned().collect();

        debug!(
            "Reconcile pass: {} updates, {} additions, {} removals",
            updates.len(),
            additions.len(),
            removals.len()
        );

        ReconcileOutcome {
            additions,
            updates,
            removals,
        }
    }
}

impl ReconcileOutcome {
    /// Returns true when the pass changed the shape of the tracked set.
    #[must_use]
    pub fn has_structural_changes(&self) -> bool {
        !self.additions.is_empty() || !self.removals.is_empty()
    }

    /// Total number of operations in the pass.
    #[must_use]
    pub fn total_operations(&self) -> usize {
        self.additions.len() + self.updates.len() + self.removals.len()
    }
}

impl std::fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} additions, {} updates, {} removals",
            self.additions.len(),
            self.updates.len(),
            self.removals.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ResourceMode, ResourceRecord};
    use std::collections::BTreeSet;

    fn record(address: &str) -> ResourceRecord {
        ResourceRecord::new(address, ResourceMode::Managed, "aws_instance", "x", "aws")
    }

    fn snapshot_of(addresses: &[&str]) -> BTreeMap<String, ResourceRecord> {
        addresses
            .iter()
            .map(|a| ((*a).to_string(), record(a)))
            .collect()
    }

    fn tracked_of(addresses: &[&str]) -> TrackedResourceSet {
        TrackedResourceSet::from_records(addresses.iter().map(|a| record(a)))
    }

    #[test]
    fn test_partitions_the_key_union_exactly_once() {
        let previous = tracked_of(&["a.one", "b.two", "c.three"]);
        let snapshot = snapshot_of(&["b.two", "c.three", "d.four"]);

        let outcome = ReconciliationEngine::new().reconcile(&previous, &snapshot);

        let additions: BTreeSet<&str> =
            outcome.additions.iter().map(|r| r.address.as_str()).collect();
        let updates: BTreeSet<&str> = outcome.updates.iter().map(|r| r.address.as_str()).collect();
        let removals: BTreeSet<&str> = outcome.removals.iter().map(String::as_str).collect();

        assert_eq!(additions, BTreeSet::from(["d.four"]));
        assert_eq!(updates, BTreeSet::from(["b.two", "c.three"]));
        assert_eq!(removals, BTreeSet::from(["a.one"]));
        assert_eq!(outcome.total_operations(), 4);
    }

    #[test]
    fn test_empty_previous_yields_only_additions() {
        let previous = TrackedResourceSet::new();
        let snapshot = snapshot_of(&["a.one", "b.two"]);

        let outcome = ReconciliationEngine::new().reconcile(&previous, &snapshot);

        assert_eq!(outcome.additions.len(), 2);
        assert!(outcome.updates.is_empty());
        assert!(outcome.removals.is_empty());
    }

    #[test]
    fn test_empty_snapshot_yields_only_removals() {
        let previous = tracked_of(&["a.one", "b.two"]);
        let snapshot = BTreeMap::new();

        let outcome = ReconciliationEngine::new().reconcile(&previous, &snapshot);

        assert!(outcome.additions.is_empty());
        assert!(outcome.updates.is_empty());
        assert_eq!(outcome.removals, vec!["a.one", "b.two"]);
    }

    #[test]
    fn test_identical_sets_yield_only_updates() {
        let previous = tracked_of(&["a.one", "b.two"]);
        let snapshot = snapshot_of(&["a.one", "b.two"]);

        let outcome = ReconciliationEngine::new().reconcile(&previous, &snapshot);

        assert!(!outcome.has_structural_changes());
        assert_eq!(outcome.updates.len(), 2);
    }

    #[test]
    fn test_updates_carry_the_fresh_record() {
        let previous = tracked_of(&["a.one"]);
        let mut snapshot = snapshot_of(&["a.one"]);
        snapshot
            .get_mut("a.one")
            .unwrap()
            .values
            .insert(String::from("ami"), serde_json::json!("ami-new"));

        let outcome = ReconciliationEngine::new().reconcile(&previous, &snapshot);

        assert_eq!(outcome.updates[0].values["ami"], serde_json::json!("ami-new"));
    }
}
