//! Planner module: plan log decoding, classification, fingerprinting.
//!
//! This module turns the tool's streamed plan/apply log into a typed
//! outcome the orchestrator can branch on.

mod classify;
mod fingerprint;
mod logs;

pub use classify::{
    DriftStatus, OutputChange, PlanClassifier, PlanOutcome, ResourceChange, ERROR_MESSAGE,
    SYNC_MESSAGE,
};
pub use fingerprint::ChangeFingerprint;
pub use logs::{
    ChangeAction, DiagnosticBody, LogEntryParser, OutputDelta, PlanLogEntry, ResourceDelta,
    ResourceRef, NO_CHANGES_SUMMARY,
};
