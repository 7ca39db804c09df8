//! Reentrant change lock serializing mutating operations.
//!
//! At most one externally distinct operation may mutate infrastructure at a
//! time. Re-entrancy is scoped to a logical call chain, not a thread: an
//! operation that already holds the lock may invoke nested operations on
//! any worker thread of the same chain without blocking or re-acquiring.
//! Ownership is carried by an explicit [`ChainToken`] created at each
//! external entry point and passed through nested calls.
//!
//! The lock is in-process state only. It is never persisted, so a restarted
//! process always starts with a free lock; any "in progress" marker from a
//! prior process is meaningless.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

use crate::error::{LockError, Result};

/// Default time to wait for the lock before failing.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(60);

/// Default sleep between acquisition attempts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Opaque identity of one logical call chain.
///
/// Created once at the entry point of each external operation and passed
/// to every nested invocation; the lock compares tokens rather than
/// inspecting runtime call-stack state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainToken(Uuid);

/// Information about the current lock holder.
#[derive(Debug, Clone)]
pub struct LockOwner {
    /// Call chain that acquired the lock.
    pub token: ChainToken,
    /// Label of the operation that acquired the lock.
    pub label: String,
    /// Process-level holder identity (host and pid).
    pub holder: String,
    /// When the lock was acquired.
    pub acquired_at: DateTime<Utc>,
}

/// Reentrant, single-owner mutual-exclusion gate with bounded-timeout
/// blocking acquisition.
#[derive(Debug, Default)]
pub struct ChangeLock {
    owner: Mutex<Option<LockOwner>>,
}

impl ChainToken {
    /// Creates a fresh chain token.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ChainToken {
    fn default() -> Self {
        Self::new()
    }
}

impl LockOwner {
    fn new(token: ChainToken, label: &str) -> Self {
        Self {
            token,
            label: label.to_string(),
            holder: generate_holder_id(),
            acquired_at: Utc::now(),
        }
    }

    /// Human-readable description of the holder, used in timeout errors.
    #[must_use]
    pub fn describe(&self) -> String {
        format!(
            "'{}' ({}, since {})",
            self.label,
            self.holder,
            self.acquired_at.to_rfc3339()
        )
    }
}

impl ChangeLock {
    /// Creates a free lock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `body` under the lock with the default timeout and poll
    /// interval.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Timeout`] when the lock is not obtained in
    /// time, or whatever error `body` itself produces.
    pub async fn run_exclusive<T, F, Fut>(&self, label: &str, chain: ChainToken, body: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run_exclusive_with(label, chain, Some(DEFAULT_LOCK_TIMEOUT), DEFAULT_POLL_INTERVAL, body)
            .await
    }

    /// Runs `body` under the lock.
    ///
    /// If the lock is free it is acquired atomically; if it is held by the
    /// same chain the body runs immediately without re-acquiring (and the
    /// outer frame remains responsible for releasing). If it is held by a
    /// different chain the call sleeps for `poll_interval` and retries
    /// until `timeout` elapses. A `timeout` of `None` blocks indefinitely.
    ///
    /// The losing side of a timeout never entered `body`, so no partial
    /// mutation can have occurred.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Timeout`] naming the blocking owner and the
    /// requested label, or whatever error `body` itself produces.
    pub async fn run_exclusive_with<T, F, Fut>(
        &self,
        label: &str,
        chain: ChainToken,
        timeout: Option<Duration>,
        poll_interval: Duration,
        body: F,
    ) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let reentrant = self.acquire(label, chain, timeout, poll_interval).await?;
        if reentrant {
            debug!("Already hold change lock for '{label}', re-entering");
            return body().await;
        }

        // The guard is the single path that clears the owner marker: it
        // does so whether the body succeeds, fails, or unwinds.
        let guard = OwnerGuard { lock: self };
        let result = body().await;
        drop(guard);
        debug!("Cleared change lock after '{label}'");
        result
    }

    /// Returns the current owner, if the lock is held.
    #[must_use]
    pub fn current_owner(&self) -> Option<LockOwner> {
        self.slot().clone()
    }

    /// Returns true while the lock is held.
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.slot().is_some()
    }

    /// Waits until the lock is acquired or re-entered.
    ///
    /// Returns `Ok(true)` when the calling chain already owns the lock.
    async fn acquire(
        &self,
        label: &str,
        chain: ChainToken,
        timeout: Option<Duration>,
        poll_interval: Duration,
    ) -> Result<bool> {
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            let blocking = {
                let mut slot = self.slot();
                match slot.as_ref() {
                    None => {
                        *slot = Some(LockOwner::new(chain, label));
                        debug!("Acquired change lock for '{label}'");
                        return Ok(false);
                    }
                    Some(owner) if owner.token == chain => return Ok(true),
                    Some(owner) => owner.describe(),
                }
            };

            if let Some(deadline) = deadline
                && Instant::now() >= deadline
            {
                return Err(LockError::Timeout {
                    label: label.to_string(),
                    holder: blocking,
                }
                .into());
            }

            debug!("Waiting on change lock for '{label}', held by {blocking}; sleeping then retrying");
            tokio::time::sleep(poll_interval).await;
        }
    }

    fn release(&self) {
        *self.slot() = None;
    }

    fn slot(&self) -> MutexGuard<'_, Option<LockOwner>> {
        self.owner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears the owner marker exactly once, on whatever path the acquiring
/// frame exits through.
struct OwnerGuard<'a> {
    lock: &'a ChangeLock,
}

impl Drop for OwnerGuard<'_> {
    fn drop(&mut self) {
        self.lock.release();
    }
}

/// Generates a holder identifier for the current process.
#[must_use]
pub fn generate_holder_id() -> String {
    let host = hostname::get()
        .map_or_else(|_| String::from("unknown"), |h| h.to_string_lossy().to_string());
    let pid = std::process::id();
    format!("{host}-{pid}")
}
