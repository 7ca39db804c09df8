//! Fingerprinting of announced resource changes.
//!
//! The orchestrator re-notifies about drift only when the announced change
//! set actually differs from the previous cycle. Comparing a digest keeps
//! that check cheap and avoids retaining full outcomes just for equality.

use sha2::{Digest, Sha256};

use super::classify::ResourceChange;

/// Hasher for resource-change sets.
#[derive(Debug, Default)]
pub struct ChangeFingerprint;

impl ChangeFingerprint {
    /// Creates a new fingerprint hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes a digest over a change set.
    ///
    /// The digest is independent of announcement order: the same addresses
    /// with the same actions always hash identically.
    #[must_use]
    pub fn digest(&self, changes: &[ResourceChange]) -> String {
        let mut entries: Vec<(String, String)> = changes
            .iter()
            .map(|c| (c.address.clone(), c.action.to_string()))
            .collect();
        entries.sort();

        let mut hasher = Sha256::new();
        for (address, action) in entries {
            hasher.update(address.as_bytes());
            hasher.update([0u8]);
            hasher.update(action.as_bytes());
            hasher.update([1u8]);
        }
        hex::encode(hasher.finalize())
    }

    /// Shortens a digest for display.
    #[must_use]
    pub fn short_digest(digest: &str) -> &str {
        digest.get(..8).unwrap_or(digest)
    }
}
