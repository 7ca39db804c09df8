// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(nonstandard_style)]           // Non-standard code style is forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Terradrift
//!
//! Drift detection and reconciliation engine for Terraform-managed
//! infrastructure.
//!
//! ## Overview
//!
//! Terradrift reconciles the state reported by the infrastructure tool
//! against a locally tracked model:
//!
//! - Parses the tool's machine-readable output: full state snapshots and
//!   streamed plan/apply logs
//! - Classifies each plan run into a drift status (sync, desynchronized,
//!   drift, error)
//! - Diffs snapshots against the tracked resource set into add/update/remove
//!   operations
//! - Serializes mutating operations through a reentrant change lock so only
//!   one infrastructure change proceeds at a time
//!
//! The engine never runs the tool itself: an execution collaborator
//! implements [`driver::TerraformDriver`] and the host runtime consumes
//! notifications through [`driver::StatusSink`].
//!
//! ## Modules
//!
//! - [`config`]: Configuration parsing and defaults
//! - [`state`]: Snapshot parsing, resource tracking, change locking
//! - [`planner`]: Plan log decoding and classification
//! - [`reconciler`]: Set-difference reconciliation engine
//! - [`driver`]: External collaborator interfaces
//! - [`orchestrator`]: The plan → classify → reconcile cycle
//! - [`cli`]: Offline inspection commands
//!
//! ## Example
//!
//! ```
//! use terradrift::planner::{DriftStatus, LogEntryParser, PlanClassifier};
//!
//! let stream = r#"{"@message":"No changes. Your infrastructure matches the configuration.","type":"change_summary"}"#;
//! let entries = LogEntryParser::new().parse_stream(stream);
//! let outcome = PlanClassifier::new().classify(&entries);
//! assert_eq!(outcome.status, DriftStatus::Sync);
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod orchestrator;
pub mod planner;
pub mod reconciler;
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigParser, ReconcilerConfig};
pub use driver::{ProblemKey, StatusSink, TerraformDriver};
pub use error::{Result, TerradriftError};
pub use orchestrator::Orchestrator;
pub use planner::{
    ChangeAction, DriftStatus, LogEntryParser, PlanClassifier, PlanLogEntry, PlanOutcome,
};
pub use reconciler::{ReconcileOutcome, ReconciliationEngine};
pub use state::{
    ChainToken, ChangeLock, ResourceRecord, ResourceStatus, SnapshotParser, TrackedResourceSet,
};
