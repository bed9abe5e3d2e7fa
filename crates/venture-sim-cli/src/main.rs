// crates/venture-sim-cli/src/main.rs
// ============================================================================
// Module: Venture Sim CLI Entry Point
// Description: Offline command dispatcher for simulation runs and bundle
//              verification.
// Purpose: Run simulations from blueprint/timeline files, export audit
//          bundles and checkpoints, and verify both offline.
// Dependencies: clap, serde_json, venture-sim-{core,config,industry}
// ============================================================================

//! ## Overview
//! The CLI drives the engine without agents: ticks advance on the timeline,
//! events fire, the industry model runs, and the audit chain records every
//! tick. Exit codes are stable for integrators: 0 success, 1 invalid input,
//! 2 integrity failure, 3 runtime abort.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::Subcommand;
use venture_sim_config::ConfigError;
use venture_sim_core::AppendRequest;
use venture_sim_core::AuditBundle;
use venture_sim_core::AuditLedger;
use venture_sim_core::Checkpoint;
use venture_sim_core::EngineConfig;
use venture_sim_core::EngineError;
use venture_sim_core::EntryType;
use venture_sim_core::ImpactExpiry;
use venture_sim_core::InputError;
use venture_sim_core::LedgerError;
use venture_sim_core::RunId;
use venture_sim_core::SimulationEngine;
use venture_sim_core::verify_bundle;
use venture_sim_industry::model_for;

// ============================================================================
// SECTION: Exit Codes
// ============================================================================

/// Success.
const EXIT_OK: u8 = 0;
/// Invalid input: blueprint/timeline schema or time ordering failure.
const EXIT_INVALID_INPUT: u8 = 1;
/// Integrity failure: broken ledger chain or corrupted checkpoint.
const EXIT_INTEGRITY: u8 = 2;
/// Runtime abort.
const EXIT_RUNTIME: u8 = 3;

// ============================================================================
// SECTION: CLI Definition
// ============================================================================

/// Venture Sim offline command-line interface.
#[derive(Debug, Parser)]
#[command(name = "venture-sim", version, about = "Deterministic company simulation runner")]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Supported subcommands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Run a simulation and export its metrics and audit bundle.
    Run(RunArgs),
    /// Verify an exported audit bundle offline.
    VerifyBundle(VerifyBundleArgs),
    /// Integrity-check an exported checkpoint.
    VerifyCheckpoint(VerifyCheckpointArgs),
}

/// Arguments for `run`.
#[derive(Debug, clap::Args)]
struct RunArgs {
    /// Path to the blueprint JSON file.
    #[arg(long)]
    blueprint: PathBuf,
    /// Path to the timeline JSON file.
    #[arg(long)]
    timeline: PathBuf,
    /// Run seed.
    #[arg(long)]
    seed: u64,
    /// Run identifier.
    #[arg(long, default_value = "cli-run")]
    run_id: String,
    /// Number of ticks to execute (stops early at timeline end).
    #[arg(long, default_value_t = 52)]
    ticks: u32,
    /// Tick length in days.
    #[arg(long, default_value_t = 7)]
    tick_days: u32,
    /// Treat event impacts as transient: invert them on expiry.
    #[arg(long)]
    transient_impacts: bool,
    /// Optional output path for the signed audit bundle.
    #[arg(long)]
    bundle: Option<PathBuf>,
    /// Optional output path for the final checkpoint.
    #[arg(long)]
    checkpoint: Option<PathBuf>,
}

/// Arguments for `verify-bundle`.
#[derive(Debug, clap::Args)]
struct VerifyBundleArgs {
    /// Path to the bundle JSON file.
    #[arg(long)]
    bundle: PathBuf,
}

/// Arguments for `verify-checkpoint`.
#[derive(Debug, clap::Args)]
struct VerifyCheckpointArgs {
    /// Path to the checkpoint JSON file.
    #[arg(long)]
    checkpoint: PathBuf,
}

// ============================================================================
// SECTION: CLI Errors
// ============================================================================

/// CLI failure carrying its exit code.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable failure description.
    message: String,
    /// Process exit code.
    code: u8,
}

impl CliError {
    /// Invalid-input failure.
    fn invalid(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: EXIT_INVALID_INPUT,
        }
    }

    /// Integrity failure.
    fn integrity(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: EXIT_INTEGRITY,
        }
    }

    /// Runtime failure.
    fn runtime(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: EXIT_RUNTIME,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::invalid(err.to_string())
    }
}

impl From<EngineError> for CliError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Input(inner) => Self::invalid(inner.to_string()),
            EngineError::CheckpointCorrupted { .. } | EngineError::CheckpointMismatch { .. } => {
                Self::integrity(err.to_string())
            }
            EngineError::Timelock(_) | EngineError::Hashing(_) => Self::runtime(err.to_string()),
        }
    }
}

impl From<LedgerError> for CliError {
    fn from(err: LedgerError) -> Self {
        Self::integrity(err.to_string())
    }
}

impl From<InputError> for CliError {
    fn from(err: InputError) -> Self {
        Self::invalid(err.to_string())
    }
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point: parse, dispatch, map failures to stable exit codes.
fn main() -> ExitCode {
    let cli = Cli::parse();
    match dispatch(cli.command) {
        Ok(()) => ExitCode::from(EXIT_OK),
        Err(err) => {
            let _ = writeln!(std::io::stderr(), "error: {err}");
            ExitCode::from(err.code)
        }
    }
}

/// Dispatches one subcommand.
fn dispatch(command: Command) -> Result<(), CliError> {
    match command {
        Command::Run(args) => run(&args),
        Command::VerifyBundle(args) => verify_bundle_file(&args),
        Command::VerifyCheckpoint(args) => verify_checkpoint_file(&args),
    }
}

// ============================================================================
// SECTION: Run Command
// ============================================================================

/// Runs a simulation from files and exports the requested artifacts.
fn run(args: &RunArgs) -> Result<(), CliError> {
    let blueprint = venture_sim_config::load_blueprint(&args.blueprint)?;
    let timeline = venture_sim_config::load_timeline(&args.timeline)?;
    let run_id = RunId::new(args.run_id.clone());

    let mut config = EngineConfig::new(blueprint, timeline, args.seed, run_id.clone());
    config.tick_days = args.tick_days;
    config.impact_expiry = if args.transient_impacts {
        ImpactExpiry::Transient
    } else {
        ImpactExpiry::Permanent
    };

    let industry = config.blueprint.industry.clone();
    let mut engine = SimulationEngine::new(config)?;
    if let Some(model) = model_for(&industry) {
        engine = engine.with_industry_model(model);
    }

    let ledger = AuditLedger::new(engine.signing_key().clone());
    for _ in 0..args.ticks {
        if !engine.tick()? {
            break;
        }
        let now = engine.current_time();
        ledger.append(AppendRequest {
            run_id: run_id.clone(),
            wall_time: now,
            sim_time: now,
            entry_type: EntryType::TickAdvanced,
            agent_role: None,
            data: serde_json::json!({
                "tick": engine.current_tick(),
                "cash": engine.state().cash,
                "state_version": engine.state().version,
            }),
        })?;
    }

    if !ledger.verify_chain(&run_id)? {
        return Err(CliError::integrity("audit chain verification failed"));
    }

    if let Some(path) = &args.bundle {
        let bundle = ledger.export_bundle(&run_id, engine.current_time())?;
        write_json(path, &bundle)?;
    }
    if let Some(path) = &args.checkpoint {
        let checkpoint = engine.checkpoint()?;
        write_json(path, &checkpoint)?;
    }

    let metrics = engine.metrics();
    let text = serde_json::to_string_pretty(&metrics)
        .map_err(|err| CliError::runtime(err.to_string()))?;
    write_stdout_line(&text)?;
    Ok(())
}

// ============================================================================
// SECTION: Verify Commands
// ============================================================================

/// Verifies a bundle file offline.
fn verify_bundle_file(args: &VerifyBundleArgs) -> Result<(), CliError> {
    let text = fs::read_to_string(&args.bundle)
        .map_err(|err| CliError::invalid(format!("cannot read bundle: {err}")))?;
    let bundle: AuditBundle = serde_json::from_str(&text)
        .map_err(|err| CliError::invalid(format!("cannot parse bundle: {err}")))?;
    verify_bundle(&bundle)?;
    write_stdout_line(&format!(
        "bundle ok: run {} with {} entries",
        bundle.run_id, bundle.entry_count
    ))
}

/// Integrity-checks a checkpoint file.
fn verify_checkpoint_file(args: &VerifyCheckpointArgs) -> Result<(), CliError> {
    let bytes = fs::read(&args.checkpoint)
        .map_err(|err| CliError::invalid(format!("cannot read checkpoint: {err}")))?;
    let checkpoint = Checkpoint::decode(&bytes)?;
    write_stdout_line(&format!(
        "checkpoint ok: run {} at {}",
        checkpoint.payload.run_id, checkpoint.payload.current_time
    ))
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes one line to stdout.
fn write_stdout_line(line: &str) -> Result<(), CliError> {
    let mut stdout = std::io::stdout();
    writeln!(stdout, "{line}").map_err(|err| CliError::runtime(format!("stdout: {err}")))
}

/// Writes a serializable value as pretty JSON to a file.
fn write_json<T>(path: &Path, value: &T) -> Result<(), CliError>
where
    T: serde::Serialize,
{
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::runtime(err.to_string()))?;
    fs::write(path, text)
        .map_err(|err| CliError::runtime(format!("cannot write {}: {err}", path.display())))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use super::*;

    #[test]
    fn input_errors_map_to_exit_code_one() {
        let err = CliError::from(InputError::MissingField {
            field: "industry".to_string(),
        });
        assert_eq!(err.code, EXIT_INVALID_INPUT);
    }

    #[test]
    fn checkpoint_corruption_maps_to_exit_code_two() {
        let err = CliError::from(EngineError::CheckpointCorrupted {
            detail: "digest mismatch".to_string(),
        });
        assert_eq!(err.code, EXIT_INTEGRITY);
    }

    #[test]
    fn engine_input_errors_map_to_exit_code_one() {
        let err = CliError::from(EngineError::Input(InputError::MissingField {
            field: "industry".to_string(),
        }));
        assert_eq!(err.code, EXIT_INVALID_INPUT);
    }
}
