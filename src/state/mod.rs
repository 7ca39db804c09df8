//! State module: snapshot parsing, resource tracking, change locking.
//!
//! This module owns everything the engine knows about reported
//! infrastructure state, plus the lock that serializes changes to it.

mod lock;
mod snapshot;
mod types;

pub use lock::{
    generate_holder_id, ChainToken, ChangeLock, LockOwner, DEFAULT_LOCK_TIMEOUT,
    DEFAULT_POLL_INTERVAL,
};
pub use snapshot::{SnapshotParser, BLANK_ITEMS};
pub use types::{
    ResourceMode, ResourceRecord, ResourceStatus, Sensitive, TrackedResource, TrackedResourceSet,
};
