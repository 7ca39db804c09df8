//! Configuration schema for the reconciliation engine.
//!
//! Deserialized from `terradrift.yaml` with serde defaults so a minimal
//! file only needs a project name.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level reconciler configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReconcilerConfig {
    /// Project identification.
    #[serde(default)]
    pub project: ProjectConfig,

    /// Whether drift detection reacts to divergence. When disabled, every
    /// cycle reconciles as if the plan reported no changes.
    #[serde(default = "default_true")]
    pub drift_check: bool,

    /// Whether data-sourced resources are tracked alongside managed ones.
    #[serde(default = "default_true")]
    pub track_data_resources: bool,

    /// Seconds between refresh cycles, for the host scheduler.
    #[serde(default = "default_poll_period")]
    pub poll_period_secs: u64,

    /// Change lock tuning.
    #[serde(default)]
    pub lock: LockConfig,
}

/// Project identification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectConfig {
    /// Project name.
    #[serde(default = "default_project_name")]
    pub name: String,
    /// Environment name (dev, staging, prod...).
    #[serde(default = "default_environment")]
    pub environment: String,
}

/// Change lock tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LockConfig {
    /// Seconds to wait for the change lock. Zero or negative means wait
    /// indefinitely.
    #[serde(default = "default_lock_timeout")]
    pub timeout_secs: i64,

    /// Seconds to sleep between lock acquisition attempts.
    #[serde(default = "default_lock_poll")]
    pub poll_interval_secs: u64,
}

const fn default_true() -> bool {
    true
}

const fn default_poll_period() -> u64 {
    30
}

const fn default_lock_timeout() -> i64 {
    60
}

const fn default_lock_poll() -> u64 {
    5
}

fn default_project_name() -> String {
    String::from("default")
}

fn default_environment() -> String {
    String::from("dev")
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            project: ProjectConfig::default(),
            drift_check: true,
            track_data_resources: true,
            poll_period_secs: default_poll_period(),
            lock: LockConfig::default(),
        }
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: default_project_name(),
            environment: default_environment(),
        }
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_lock_timeout(),
            poll_interval_secs: default_lock_poll(),
        }
    }
}

impl ReconcilerConfig {
    /// Seconds between refresh cycles as a duration.
    #[must_use]
    pub const fn poll_period(&self) -> Duration {
        Duration::from_secs(self.poll_period_secs)
    }
}

impl LockConfig {
    /// The configured lock timeout; `None` means wait indefinitely.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        u64::try_from(self.timeout_secs)
            .ok()
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
    }

    /// Sleep between acquisition attempts.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}
