//! Terradrift CLI entrypoint.
//!
//! Offline inspection of the infrastructure tool's machine-readable
//! output: classify a plan log, list snapshot resources, or diff two
//! snapshots. Nothing here executes the tool.

use std::process::ExitCode;

use terradrift::cli::{Cli, Commands, OutputFormatter};
use terradrift::error::Result;
use terradrift::planner::{LogEntryParser, PlanClassifier};
use terradrift::reconciler::ReconciliationEngine;
use terradrift::state::{SnapshotParser, TrackedResourceSet};

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Dispatches the selected command.
fn run(cli: &Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);

    match &cli.command {
        Commands::Classify { log_file } => {
            let raw = std::fs::read_to_string(log_file)?;
            let entries = LogEntryParser::new().parse_stream(&raw);
            let outcome = PlanClassifier::new().classify(&entries);
            println!("{}", formatter.format_outcome(&outcome));
        }

        Commands::Resources { state_file, data } => {
            let raw = std::fs::read_to_string(state_file)?;
            let parser = SnapshotParser::new();
            let resources = if *data {
                parser.parse_data_resources(&raw)?
            } else {
                parser.parse(&raw)?
            };
            println!("{}", formatter.format_resources(&resources));
        }

        Commands::Diff { previous, current } => {
            let parser = SnapshotParser::new();
            let before = parser.parse(&std::fs::read_to_string(previous)?)?;
            let after = parser.parse(&std::fs::read_to_string(current)?)?;

            let tracked = TrackedResourceSet::from_records(before.into_values());
            let outcome = ReconciliationEngine::new().reconcile(&tracked, &after);
            println!("{}", formatter.format_diff(&outcome));
        }
    }

    Ok(())
}
