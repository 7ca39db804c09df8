//! Interface boundary to the external collaborators.
//!
//! The engine never runs the infrastructure tool itself. A
//! [`TerraformDriver`] implementation (SSH, local process, containerized —
//! outside this crate) performs the actual invocations, and a
//! [`StatusSink`] implementation receives the per-resource and
//! process-wide notifications the host runtime consumes.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::planner::{DriftStatus, PlanOutcome};
use crate::state::{ResourceRecord, ResourceStatus};

/// Execution collaborator invoking the underlying tool.
///
/// Every operation may fail with a transport or execution error; the
/// orchestrator propagates such failures verbatim after releasing the
/// change lock.
#[async_trait]
pub trait TerraformDriver: Send + Sync {
    /// Pulls the raw state document.
    async fn pull_state(&self) -> Result<String>;

    /// Renders the full state snapshot in machine-readable form.
    async fn show_state(&self) -> Result<String>;

    /// Runs a plan and returns the newline-delimited JSON log stream.
    async fn run_plan(&self, refresh: bool) -> Result<String>;

    /// Renders a human-readable plan-only view, without applying.
    async fn run_plan_text(&self) -> Result<String>;

    /// Renders the output document.
    async fn run_outputs(&self, refresh: bool) -> Result<String>;

    /// Applies the configuration to the infrastructure.
    async fn run_apply(&self) -> Result<()>;

    /// Destroys the managed infrastructure.
    async fn run_destroy(&self) -> Result<()>;

    /// Removes the tool's own lock file, left behind by an interrupted run.
    async fn remove_lock_file(&self) -> Result<()>;
}

/// Keys of the process-wide problem markers published to the host runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProblemKey {
    /// Resources or outputs no longer match the configuration.
    Drift,
    /// The tool reported diagnostics.
    Error,
}

/// Notification consumer provided by the host runtime.
///
/// Implementations are expected to be fast and non-blocking; they are
/// invoked while the change lock is held.
pub trait StatusSink: Send + Sync {
    /// A genuinely new resource appeared in the snapshot.
    fn resource_added(&self, record: &ResourceRecord);

    /// A tracked resource was refreshed with a new record.
    fn resource_updated(&self, record: &ResourceRecord);

    /// A tracked resource is no longer reported and must be
    /// decommissioned.
    fn resource_removed(&self, address: &str);

    /// A tracked resource's live status marker transitioned.
    fn resource_status(&self, address: &str, status: &ResourceStatus);

    /// The aggregate drift status changed since the last cycle.
    fn drift_status(&self, status: DriftStatus);

    /// A drift outcome is standing; cleared by [`StatusSink::drift_cleared`].
    fn drift_recorded(&self, outcome: &PlanOutcome);

    /// A plan-only preview of the pending changes was stashed.
    fn plan_preview(&self, text: &str);

    /// Any standing drift record and preview are no longer valid.
    fn drift_cleared(&self);

    /// The raw state document was pulled.
    fn state_document(&self, raw: &str);

    /// An output value changed or appeared.
    fn output_changed(&self, name: &str, value: &Value);

    /// An output was removed from the configuration.
    fn output_removed(&self, name: &str);

    /// A process-wide problem marker was set.
    fn problem_set(&self, key: ProblemKey, detail: &str);

    /// A process-wide problem marker was cleared.
    fn problem_cleared(&self, key: ProblemKey);
}

impl std::fmt::Display for ProblemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Drift => "drift",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

#[async_trait]
impl<T: TerraformDriver + ?Sized> TerraformDriver for std::sync::Arc<T> {
    async fn pull_state(&self) -> Result<String> {
        (**self).pull_state().await
    }

    async fn show_state(&self) -> Result<String> {
        (**self).show_state().await
    }

    async fn run_plan(&self, refresh: bool) -> Result<String> {
        (**self).run_plan(refresh).await
    }

    async fn run_plan_text(&self) -> Result<String> {
        (**self).run_plan_text().await
    }

    async fn run_outputs(&self, refresh: bool) -> Result<String> {
        (**self).run_outputs(refresh).await
    }

    async fn run_apply(&self) -> Result<()> {
        (**self).run_apply().await
    }

    async fn run_destroy(&self) -> Result<()> {
        (**self).run_destroy().await
    }

    async fn remove_lock_file(&self) -> Result<()> {
        (**self).remove_lock_file().await
    }
}

impl<T: StatusSink + ?Sized> StatusSink for std::sync::Arc<T> {
    fn resource_added(&self, record: &ResourceRecord) {
        (**self).resource_added(record);
    }

    fn resource_updated(&self, record: &ResourceRecord) {
        (**self).resource_updated(record);
    }

    fn resource_removed(&self, address: &str) {
        (**self).resource_removed(address);
    }

    fn resource_status(&self, address: &str, status: &ResourceStatus) {
        (**self).resource_status(address, status);
    }

    fn drift_status(&self, status: DriftStatus) {
        (**self).drift_status(status);
    }

    fn drift_recorded(&self, outcome: &PlanOutcome) {
        (**self).drift_recorded(outcome);
    }

    fn plan_preview(&self, text: &str) {
        (**self).plan_preview(text);
    }

    fn drift_cleared(&self) {
        (**self).drift_cleared();
    }

    fn state_document(&self, raw: &str) {
        (**self).state_document(raw);
    }

    fn output_changed(&self, name: &str, value: &Value) {
        (**self).output_changed(name, value);
    }

    fn output_removed(&self, name: &str) {
        (**self).output_removed(name);
    }

    fn problem_set(&self, key: ProblemKey, detail: &str) {
        (**self).problem_set(key, detail);
    }

    fn problem_cleared(&self, key: ProblemKey) {
        (**self).problem_cleared(key);
    }
}
