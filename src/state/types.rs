//! Resource state types for tracking reported infrastructure.
//!
//! These types represent resources as reported by a state snapshot and the
//! working set the reconciliation engine diffs against between cycles.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// How a resource is sourced in the state document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResourceMode {
    /// Resource provisioned and owned by the configuration.
    Managed,
    /// Resource read from the provider without being owned.
    Data,
}

/// Derived liveness status of a tracked resource.
///
/// The tool reports a raw status string (e.g. `instance_state`) for some
/// resource types; anything unrecognized is preserved verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum ResourceStatus {
    /// Resource matches its last-applied configuration.
    Ok,
    /// Resource is up and running.
    Running,
    /// Resource diverged from the last-applied configuration.
    Changed,
    /// Resource is stopped.
    Stopped,
    /// Any other status string reported by the tool.
    Other(String),
}

/// A sensitive attribute value. Rendering it always redacts.
#[derive(Clone, PartialEq)]
pub struct Sensitive(Value);

/// One infrastructure resource as reported by a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceRecord {
    /// Globally unique resource address within a snapshot.
    pub address: String,
    /// Whether the resource is managed or data-sourced.
    pub mode: ResourceMode,
    /// Resource type (e.g. `aws_instance`).
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Resource name within its type.
    pub name: String,
    /// Provider that reported the resource.
    pub provider: String,
    /// Public attributes, blank values suppressed.
    pub values: BTreeMap<String, Value>,
    /// Redacted attributes, blank values suppressed.
    pub sensitive_values: BTreeMap<String, Sensitive>,
    /// Derived status, defaulted when the tool reports none.
    pub status: ResourceStatus,
}

/// A resource in the reconciliation working set: the last-known record plus
/// its live status marker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackedResource {
    /// Last-known record for this resource.
    pub record: ResourceRecord,
    /// Live status marker, updated by reconciliation passes.
    pub status: ResourceStatus,
}

/// The reconciliation engine's working set, keyed by resource address.
///
/// Owned exclusively by the orchestrator between cycles; each cycle applies
/// additions, updates and removals as a single batch so outside readers see
/// either the pre- or post-reconciliation set, never a partial one.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TrackedResourceSet {
    resources: BTreeMap<String, TrackedResource>,
}

impl ResourceMode {
    /// Returns true for managed resources.
    #[must_use]
    pub const fn is_managed(self) -> bool {
        matches!(self, Self::Managed)
    }
}

impl Default for ResourceStatus {
    fn default() -> Self {
        Self::Ok
    }
}

impl From<&str> for ResourceStatus {
    fn from(raw: &str) -> Self {
        match raw {
            "ok" => Self::Ok,
            "running" => Self::Running,
            "changed" => Self::Changed,
            "stopped" => Self::Stopped,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for ResourceStatus {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<ResourceStatus> for String {
    fn from(status: ResourceStatus) -> Self {
        status.to_string()
    }
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Ok => "ok",
            Self::Running => "running",
            Self::Changed => "changed",
            Self::Stopped => "stopped",
            Self::Other(raw) => raw.as_str(),
        };
        write!(f, "{s}")
    }
}

impl Sensitive {
    /// Wraps a raw value as sensitive.
    #[must_use]
    pub const fn new(value: Value) -> Self {
        Self(value)
    }

    /// Exposes the underlying value. Callers are responsible for not
    /// rendering it into logs or user-facing output.
    #[must_use]
    pub const fn reveal(&self) -> &Value {
        &self.0
    }
}

impl std::fmt::Debug for Sensitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(sensitive)")
    }
}

impl std::fmt::Display for Sensitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(sensitive)")
    }
}

impl Serialize for Sensitive {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str("(sensitive)")
    }
}

impl<'de> Deserialize<'de> for Sensitive {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        Ok(Self(Value::deserialize(deserializer)?))
    }
}

impl ResourceRecord {
    /// Creates a record with empty attribute maps and a default status.
    #[must_use]
    pub fn new(
        address: &str,
        mode: ResourceMode,
        resource_type: &str,
        name: &str,
        provider: &str,
    ) -> Self {
        Self {
            address: address.to_string(),
            mode,
            resource_type: resource_type.to_string(),
            name: name.to_string(),
            provider: provider.to_string(),
            values: BTreeMap::new(),
            sensitive_values: BTreeMap::new(),
            status: ResourceStatus::default(),
        }
    }
}

impl TrackedResource {
    /// Creates a tracked resource, seeding the live status from the record.
    #[must_use]
    pub fn new(record: ResourceRecord) -> Self {
        let status = record.status.clone();
        Self { record, status }
    }

    /// Returns true when the live status marker is `running`.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status == ResourceStatus::Running
    }

    /// Returns true when the live status marker is `changed`.
    #[must_use]
    pub fn is_changed(&self) -> bool {
        self.status == ResourceStatus::Changed
    }
}

impl TrackedResourceSet {
    /// Creates an empty working set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            resources: BTreeMap::new(),
        }
    }

    /// Builds a working set from parsed records.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = ResourceRecord>) -> Self {
        let resources = records
            .into_iter()
            .map(|r| (r.address.clone(), TrackedResource::new(r)))
            .collect();
        Self { resources }
    }

    /// Number of tracked resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true when nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Returns true when the address is tracked.
    #[must_use]
    pub fn contains(&self, address: &str) -> bool {
        self.resources.contains_key(address)
    }

    /// Gets a tracked resource by address.
    #[must_use]
    pub fn get(&self, address: &str) -> Option<&TrackedResource> {
        self.resources.get(address)
    }

    /// Gets a mutable tracked resource by address.
    pub fn get_mut(&mut self, address: &str) -> Option<&mut TrackedResource> {
        self.resources.get_mut(address)
    }

    /// Inserts or replaces a record, preserving an existing `changed`
    /// marker so repeated marking stays idempotent across updates.
    pub fn upsert(&mut self, record: ResourceRecord) {
        match self.resources.get_mut(&record.address) {
            Some(existing) => {
                let keep_changed = existing.is_changed();
                existing.record = record;
                if !keep_changed {
                    existing.status = existing.record.status.clone();
                }
            }
            None => {
                self.resources
                    .insert(record.address.clone(), TrackedResource::new(record));
            }
        }
    }

    /// Removes a resource by address.
    pub fn remove(&mut self, address: &str) -> Option<TrackedResource> {
        self.resources.remove(address)
    }

    /// Sets the live status marker for an address. Returns true when the
    /// marker actually transitioned.
    pub fn set_status(&mut self, address: &str, status: ResourceStatus) -> bool {
        match self.resources.get_mut(address) {
            Some(tracked) if tracked.status != status => {
                tracked.status = status;
                true
            }
            _ => false,
        }
    }

    /// All tracked addresses in deterministic order.
    #[must_use]
    pub fn addresses(&self) -> Vec<&str> {
        self.resources.keys().map(String::as_str).collect()
    }

    /// Iterates over tracked resources in address order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &TrackedResource)> {
        self.resources.iter()
    }

    /// Iterates mutably over tracked resources in address order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut TrackedResource)> {
        self.resources.iter_mut()
    }
}
