//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.
//! Every command works offline on files; none of them invoke the
//! infrastructure tool.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Terradrift - drift inspection for Terraform-managed infrastructure.
#[derive(Parser, Debug)]
#[command(name = "terradrift")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify a plan/apply log stream into a drift status.
    Classify {
        /// Path to the newline-delimited JSON log file.
        log_file: PathBuf,
    },

    /// List the resources reported by a state snapshot document.
    Resources {
        /// Path to the state snapshot JSON file.
        state_file: PathBuf,

        /// List data-sourced resources instead of managed ones.
        #[arg(long)]
        data: bool,
    },

    /// Diff two state snapshots into add/update/remove operations.
    Diff {
        /// Path to the previously captured snapshot.
        previous: PathBuf,

        /// Path to the freshly captured snapshot.
        current: PathBuf,
    },
}

/// Output format for command results.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text with tables.
    Text,
    /// Pretty-printed JSON.
    Json,
}
