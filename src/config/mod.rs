//! Configuration module for the reconciliation engine.
//!
//! Handles parsing and deserializing `terradrift.yaml`, environment
//! variable overrides, and config file discovery.

mod parser;
mod spec;

pub use parser::{find_config_file, ConfigParser, DEFAULT_CONFIG_FILES};
pub use spec::{LockConfig, ProjectConfig, ReconcilerConfig};
