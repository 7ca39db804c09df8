//! Orchestration of the plan → classify → reconcile cycle.
//!
//! The orchestrator drives every mutating operation under the
//! [`ChangeLock`], turns classified plan outcomes into tracked-model and
//! host-runtime updates, and keeps a small cache of the last successful
//! results for failure fallback. The cache answers "what was the last good
//! value" when a later fetch fails; it is never consulted to skip
//! performing the real operation.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ReconcilerConfig;
use crate::driver::{ProblemKey, StatusSink, TerraformDriver};
use crate::error::{OutputError, Result};
use crate::planner::{
    ChangeFingerprint, DriftStatus, LogEntryParser, PlanClassifier, PlanOutcome,
};
use crate::reconciler::ReconciliationEngine;
use crate::state::{
    ChainToken, ChangeLock, ResourceRecord, ResourceStatus, SnapshotParser, TrackedResourceSet,
};

const DRIFT_RESOURCES_DETAIL: &str = "Resources no longer match the initial plan. \
    Invoke 'apply' to synchronize configuration and infrastructure.";

const DRIFT_OUTPUTS_DETAIL: &str = "Outputs no longer match the initial plan. This is not \
    critical as the infrastructure is not affected, but you may want to invoke 'apply'.";

/// One parsed entry of the output document.
#[derive(Debug, Deserialize)]
struct OutputEntry {
    #[serde(default)]
    value: Option<Value>,
}

/// Last successful results, kept for failure fallback.
#[derive(Debug, Default)]
struct OutputsState {
    /// Raw text of the last good output document.
    last_document: Option<String>,
    /// Parsed output values from the last good document.
    values: BTreeMap<String, Value>,
}

/// Drift bookkeeping carried between cycles.
#[derive(Debug, Default)]
struct DriftState {
    status: Option<DriftStatus>,
    changes_digest: Option<String>,
}

/// Drives the reconciliation cycle against the external collaborators.
pub struct Orchestrator<D, S> {
    driver: D,
    sink: S,
    settings: ReconcilerConfig,
    lock: ChangeLock,
    log_parser: LogEntryParser,
    classifier: PlanClassifier,
    snapshot_parser: SnapshotParser,
    engine: ReconciliationEngine,
    fingerprint: ChangeFingerprint,
    managed: RwLock<TrackedResourceSet>,
    data: RwLock<TrackedResourceSet>,
    plan_cache: Mutex<Option<PlanOutcome>>,
    outputs: Mutex<OutputsState>,
    drift: Mutex<DriftState>,
}

impl<D: TerraformDriver, S: StatusSink> Orchestrator<D, S> {
    /// Creates a new orchestrator. The change lock always starts free: any
    /// "in progress" marker from a prior process is meaningless here.
    #[must_use]
    pub fn new(driver: D, sink: S, settings: ReconcilerConfig) -> Self {
        Self {
            driver,
            sink,
            settings,
            lock: ChangeLock::new(),
            log_parser: LogEntryParser::new(),
            classifier: PlanClassifier::new(),
            snapshot_parser: SnapshotParser::new(),
            engine: ReconciliationEngine::new(),
            fingerprint: ChangeFingerprint::new(),
            managed: RwLock::new(TrackedResourceSet::new()),
            data: RwLock::new(TrackedResourceSet::new()),
            plan_cache: Mutex::new(None),
            outputs: Mutex::new(OutputsState::default()),
            drift: Mutex::new(DriftState::default()),
        }
    }

    /// Runs one full refresh cycle: plan, classify, branch, reconcile.
    ///
    /// # Errors
    ///
    /// Propagates lock timeouts, execution failures and parse errors after
    /// the lock is released.
    pub async fn refresh(&self) -> Result<PlanOutcome> {
        self.refresh_with(ChainToken::new(), true).await
    }

    /// Plans and refreshes sensors without applying anything.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::refresh`].
    pub async fn plan(&self) -> Result<PlanOutcome> {
        self.refresh_with(ChainToken::new(), true).await
    }

    /// Applies the configuration, then re-plans to pick up the new state.
    ///
    /// The apply and the follow-up refresh share one chain token, so the
    /// nested operations re-enter the lock instead of deadlocking.
    ///
    /// # Errors
    ///
    /// Propagates execution failures after releasing the lock.
    pub async fn apply(&self) -> Result<PlanOutcome> {
        let chain = ChainToken::new();
        info!(
            "Applying configuration for {}/{}",
            self.settings.project.name, self.settings.project.environment
        );
        self.lock
            .run_exclusive_with(
                "apply configuration",
                chain,
                self.lock_timeout(),
                self.poll_interval(),
                || async { self.driver.run_apply().await },
            )
            .await?;
        self.refresh_with(chain, true).await
    }

    /// Destroys the managed infrastructure. Waits indefinitely for the
    /// lock: a destroy must not fail just because a refresh is running.
    ///
    /// # Errors
    ///
    /// Propagates execution failures after releasing the lock.
    pub async fn destroy(&self) -> Result<()> {
        let chain = ChainToken::new();
        self.lock
            .run_exclusive_with(
                "destroy infrastructure",
                chain,
                None,
                Duration::from_secs(1),
                || async { self.driver.run_destroy().await },
            )
            .await
    }

    /// Removes the tool's own lock file, left behind when a prior run was
    /// interrupted.
    ///
    /// # Errors
    ///
    /// Propagates execution failures after releasing the lock.
    pub async fn clear_tool_lock(&self) -> Result<()> {
        let chain = ChainToken::new();
        self.lock
            .run_exclusive_with(
                "clear tool lock file",
                chain,
                None,
                Duration::from_secs(1),
                || async { self.driver.remove_lock_file().await },
            )
            .await
    }

    /// The last successfully classified plan outcome, if any.
    #[must_use]
    pub fn last_plan_outcome(&self) -> Option<PlanOutcome> {
        guard(&self.plan_cache).clone()
    }

    /// The last good raw output document, if any.
    #[must_use]
    pub fn last_output_document(&self) -> Option<String> {
        guard(&self.outputs).last_document.clone()
    }

    /// The drift status published after the most recent cycle.
    #[must_use]
    pub fn drift_status(&self) -> Option<DriftStatus> {
        guard(&self.drift).status
    }

    /// Returns true while a change or refresh is in progress.
    #[must_use]
    pub fn change_lock_held(&self) -> bool {
        self.lock.is_held()
    }

    /// A consistent snapshot of the tracked managed resources.
    #[must_use]
    pub fn managed_resources(&self) -> TrackedResourceSet {
        self.read_set(&self.managed)
    }

    /// A consistent snapshot of the tracked data resources.
    #[must_use]
    pub fn data_resources(&self) -> TrackedResourceSet {
        self.read_set(&self.data)
    }

    async fn refresh_with(&self, chain: ChainToken, do_refresh: bool) -> Result<PlanOutcome> {
        self.lock
            .run_exclusive_with(
                "refresh model and plan",
                chain,
                self.lock_timeout(),
                self.poll_interval(),
                || async move {
                    let stream = self.driver.run_plan(do_refresh).await?;
                    let entries = self.log_parser.parse_stream(&stream);
                    let skipped = entries.iter().filter(|e| !e.is_recognized()).count();
                    if skipped > 0 {
                        debug!("Skipped {skipped} unrecognized plan log lines");
                    }

                    let outcome = self.classifier.classify(&entries);
                    self.process_outcome(chain, &outcome).await?;
                    *guard(&self.plan_cache) = Some(outcome.clone());

                    self.refresh_outputs(chain, false).await?;
                    Ok(outcome)
                },
            )
            .await
    }

    /// Branches on the classified outcome, per the drift policy.
    async fn process_outcome(&self, chain: ChainToken, outcome: &PlanOutcome) -> Result<()> {
        let ignore_drift = !self.settings.drift_check;
        let (previous_status, previous_digest) = {
            let drift = guard(&self.drift);
            (drift.status, drift.changes_digest.clone())
        };

        if ignore_drift || outcome.is_sync() {
            debug!(
                "Clearing problems and refreshing state; plan status is {}{}",
                outcome.status,
                if outcome.is_sync() { "" } else { " and drift checking is disabled" }
            );
            self.sink.problem_cleared(ProblemKey::Drift);
            self.sink.problem_cleared(ProblemKey::Error);
            self.sink.drift_cleared();
            self.update_deployment_state(chain).await?;
        } else if outcome.status == DriftStatus::Error {
            debug!("Setting error problem; plan reported diagnostics");
            self.sink.problem_set(
                ProblemKey::Error,
                &format!("{}: {}", outcome.message, outcome.errors.join("; ")),
            );
            self.mark_changed_resources(outcome);
        } else {
            debug!("Setting drift problem; plan status is {}", outcome.status);
            // matches the original polling behavior: the new status is
            // visible to the marking policy within this same cycle
            guard(&self.drift).status = Some(outcome.status);

            if outcome.has_resource_changes() {
                self.sink.problem_set(ProblemKey::Drift, DRIFT_RESOURCES_DETAIL);
                // we still reconcile, because the infrastructure must be
                // inspected even when divergent
                self.update_deployment_state(chain).await?;
                self.mark_changed_resources(outcome);

                let preview = self
                    .lock
                    .run_exclusive_with(
                        "plan preview",
                        chain,
                        self.lock_timeout(),
                        self.poll_interval(),
                        || async { self.driver.run_plan_text().await },
                    )
                    .await?;
                self.sink.plan_preview(&preview);
            } else {
                self.sink.problem_set(ProblemKey::Drift, DRIFT_OUTPUTS_DETAIL);
            }
            self.sink.drift_recorded(outcome);
        }

        let digest = self.fingerprint.digest(&outcome.resource_changes);
        let drift_changed = previous_digest.as_deref() != Some(digest.as_str());
        let status_changed = previous_status != Some(outcome.status);
        if drift_changed || status_changed {
            self.sink.drift_status(outcome.status);
        }

        let mut drift = guard(&self.drift);
        drift.status = Some(outcome.status);
        drift.changes_digest = Some(digest);
        Ok(())
    }

    /// Pulls and parses the full state, then reconciles the tracked sets.
    async fn update_deployment_state(&self, chain: ChainToken) -> Result<()> {
        let raw = self
            .lock
            .run_exclusive_with(
                "state pull",
                chain,
                self.lock_timeout(),
                self.poll_interval(),
                || async { self.driver.pull_state().await },
            )
            .await?;
        self.sink.state_document(&raw);

        let show = self
            .lock
            .run_exclusive_with(
                "state show",
                chain,
                self.lock_timeout(),
                self.poll_interval(),
                || async { self.driver.show_state().await },
            )
            .await?;

        let snapshot = self.snapshot_parser.parse(&show)?;
        self.apply_reconciliation(&self.managed, &snapshot);

        if self.settings.track_data_resources {
            let data_snapshot = self.snapshot_parser.parse_data_resources(&show)?;
            self.apply_reconciliation(&self.data, &data_snapshot);
        }
        Ok(())
    }

    /// Applies one reconciliation pass as a single batch, so readers see
    /// either the pre- or post-reconciliation set, never a partial one.
    fn apply_reconciliation(
        &self,
        slot: &RwLock<TrackedResourceSet>,
        snapshot: &BTreeMap<String, ResourceRecord>,
    ) {
        let outcome = {
            let current = slot.read().unwrap_or_else(PoisonError::into_inner);
            self.engine.reconcile(&current, snapshot)
        };
        info!("Reconciled tracked resources: {outcome}");

        let parent_sync = guard(&self.drift).status == Some(DriftStatus::Sync);

        let mut tracked = slot.write().unwrap_or_else(PoisonError::into_inner);
        for record in &outcome.updates {
            tracked.upsert(record.clone());
            self.sink.resource_updated(record);
        }
        for address in &outcome.removals {
            tracked.remove(address);
            self.sink.resource_removed(address);
        }
        for record in &outcome.additions {
            tracked.upsert(record.clone());
            self.sink.resource_added(record);
        }

        if parent_sync {
            for (address, resource) in tracked.iter_mut() {
                if !resource.is_running() {
                    resource.status = ResourceStatus::Running;
                    self.sink.resource_status(address, &ResourceStatus::Running);
                }
            }
        }
    }

    /// Marks the tracked resources named by the outcome as changed.
    /// Idempotent: a resource already marked is not re-notified.
    fn mark_changed_resources(&self, outcome: &PlanOutcome) {
        let mut managed = self.managed.write().unwrap_or_else(PoisonError::into_inner);
        for change in &outcome.resource_changes {
            if managed.set_status(&change.address, ResourceStatus::Changed) {
                self.sink
                    .resource_status(&change.address, &ResourceStatus::Changed);
            }
        }
    }

    /// Fetches and publishes the output document.
    ///
    /// A blank document is the valid "no outputs" case. An invalid one is
    /// an [`OutputError`]; the previously cached good document stays
    /// available through [`Self::last_output_document`].
    async fn refresh_outputs(&self, chain: ChainToken, refresh: bool) -> Result<String> {
        let raw = self
            .lock
            .run_exclusive_with(
                "refresh outputs",
                chain,
                self.lock_timeout(),
                self.poll_interval(),
                || async { self.driver.run_outputs(refresh).await },
            )
            .await?;

        if raw.trim().is_empty() {
            debug!("No outputs are applied");
            return Ok(raw);
        }

        let parsed: BTreeMap<String, OutputEntry> =
            serde_json::from_str(&raw).map_err(|e| {
                warn!("Output document is not valid JSON; keeping last good value");
                OutputError::invalid_format(e.to_string())
            })?;

        let mut outputs = guard(&self.outputs);
        let removed: Vec<String> = outputs
            .values
            .keys()
            .filter(|name| !parsed.contains_key(*name))
            .cloned()
            .collect();
        for name in removed {
            outputs.values.remove(&name);
            self.sink.output_removed(&name);
        }

        for (name, entry) in parsed {
            let value = entry.value.unwrap_or(Value::Null);
            if outputs.values.get(&name) != Some(&value) {
                self.sink.output_changed(&name, &value);
                outputs.values.insert(name, value);
            }
        }

        outputs.last_document = Some(raw.clone());
        Ok(raw)
    }

    fn lock_timeout(&self) -> Option<Duration> {
        self.settings.lock.timeout()
    }

    const fn poll_interval(&self) -> Duration {
        self.settings.lock.poll_interval()
    }

    fn read_set(&self, slot: &RwLock<TrackedResourceSet>) -> TrackedResourceSet {
        slot.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
