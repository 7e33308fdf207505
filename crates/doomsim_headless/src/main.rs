//! Headless level runner.
//!
//! Runs a level without graphics or audio. Reports go to stdout as JSON,
//! logs to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Play a level against an input script and record it
//! cargo run -p doomsim_headless -- run --level e1m1.ron --input walk.ron --record walk.replay
//!
//! # Verify determinism with 8 parallel runs
//! cargo run -p doomsim_headless -- verify --level e1m1.ron --input walk.ron --runs 8
//!
//! # Check a recorded replay
//! cargo run -p doomsim_headless -- replay --file walk.replay --verify
//!
//! # Describe a level
//! cargo run -p doomsim_headless -- inspect --level maps/E1M1/
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use doomsim_core::replay::{Replay, ReplayPlayer};
use doomsim_headless::level_source::{load_config, load_input, load_level, LevelSourceError, Result};
use doomsim_headless::runner::{inspect_level, run_level, save_json, RunConfig};
use doomsim_headless::batch::{verify_runs, VerifyConfig};

#[derive(Parser)]
#[command(name = "doomsim_headless")]
#[command(about = "Headless level runner for determinism checks and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Level, settings and input shared by `run` and `verify`.
#[derive(clap::Args)]
struct LevelArgs {
    /// Level: a RON file or a directory of map lumps
    #[arg(short, long)]
    level: PathBuf,

    /// Game settings (RON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input script (RON)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Tics to run; defaults to the length of the input script
    #[arg(short, long)]
    tics: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a level against an input script
    Run {
        #[command(flatten)]
        args: LevelArgs,

        /// Keep running after the level exits
        #[arg(long)]
        keep_going: bool,

        /// Record a replay to this file
        #[arg(long)]
        record: Option<PathBuf>,

        /// Also write the JSON report to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Verify determinism by running the same input several times
    Verify {
        #[command(flatten)]
        args: LevelArgs,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        /// Maximum parallel runs (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: usize,

        /// Also write the JSON report to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Play back a recorded replay
    Replay {
        /// Replay file path
        #[arg(short, long)]
        file: PathBuf,

        /// Verify replay produces identical hash
        #[arg(long)]
        verify: bool,

        /// Stop before this tic instead of at the end
        #[arg(long, conflicts_with = "verify")]
        seek: Option<usize>,
    },

    /// Describe a level as built
    Inspect {
        /// Level: a RON file or a directory of map lumps
        #[arg(short, long)]
        level: PathBuf,

        /// Game settings (RON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for reports)
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .init();

    let outcome = match cli.command {
        Commands::Run {
            args,
            keep_going,
            record,
            report,
        } => cmd_run(&args, keep_going, record.as_deref(), report.as_deref()),
        Commands::Verify {
            args,
            runs,
            parallel,
            report,
        } => cmd_verify(&args, runs, parallel, report.as_deref()),
        Commands::Replay { file, verify, seek } => cmd_replay(&file, verify, seek),
        Commands::Inspect { level, config } => cmd_inspect(&level, config.as_deref()),
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("FATAL: {e}");
            ExitCode::FAILURE
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| LevelSourceError::Io {
        path: "<stdout>".into(),
        source: std::io::Error::other(e),
    })?;
    println!("{json}");
    Ok(())
}

fn load_run_config(args: &LevelArgs, stop_on_exit: bool) -> Result<RunConfig> {
    let level = load_level(&args.level)?;
    let game = load_config(args.config.as_deref())?;
    let script = load_input(args.input.as_deref())?;
    let commands = match args.tics {
        Some(tics) => script.expand_to(tics),
        None => script.expand(),
    };
    Ok(RunConfig {
        level,
        game,
        commands,
        stop_on_exit,
    })
}

/// Play a level once
fn cmd_run(args: &LevelArgs, keep_going: bool, record: Option<&Path>, report: Option<&Path>) -> Result<bool> {
    let config = load_run_config(args, !keep_going)?;
    tracing::info!(level = %config.level.name, tics = config.commands.len(), "starting run");

    let outcome = run_level(&config)?;
    if let Some(path) = record {
        outcome.replay.save(path)?;
        tracing::info!(path = %path.display(), tics = outcome.replay.duration(), "replay recorded");
    }
    if let Some(path) = report {
        outcome.report.save(path)?;
    }
    print_json(&outcome.report)?;
    Ok(true)
}

/// Verify determinism with parallel runs
fn cmd_verify(args: &LevelArgs, runs: u32, parallel: usize, report: Option<&Path>) -> Result<bool> {
    let config = VerifyConfig {
        run: load_run_config(args, false)?,
        runs,
        parallel,
    };
    let result = verify_runs(&config)?;
    if let Some(path) = report {
        save_json(&result, path)?;
    }
    print_json(&result)?;

    if result.deterministic {
        eprintln!("PASS: All {} runs produced identical results", result.runs);
    } else {
        eprintln!("FAIL: Non-determinism detected!");
    }
    Ok(result.deterministic)
}

#[derive(Serialize)]
struct ReplayReport {
    level: String,
    tics: usize,
    position: usize,
    expected_hash: u64,
    actual_hash: u64,
    verified: Option<bool>,
}

/// Replay a recorded run
fn cmd_replay(file: &Path, verify: bool, seek: Option<usize>) -> Result<bool> {
    let replay = Replay::load(file)?;
    eprintln!("Loaded replay:");
    eprintln!("  Level: {}", replay.level.name);
    eprintln!("  Players: {}", replay.config.player_count());
    eprintln!("  Duration: {} tics", replay.duration());

    let mut player = ReplayPlayer::new(&replay)?;
    let verified = if verify {
        Some(player.verify()?)
    } else {
        player.seek(seek.unwrap_or_else(|| replay.duration()))?;
        None
    };

    print_json(&ReplayReport {
        level: replay.level.name.clone(),
        tics: replay.duration(),
        position: player.position(),
        expected_hash: replay.final_hash,
        actual_hash: player.world().state_hash(),
        verified,
    })?;

    match verified {
        Some(true) => eprintln!("PASS: Replay verification successful"),
        Some(false) => eprintln!("FAIL: Replay produced different hash!"),
        None => {}
    }
    Ok(verified.unwrap_or(true))
}

/// Describe a level
fn cmd_inspect(level: &Path, config: Option<&Path>) -> Result<bool> {
    let level = load_level(level)?;
    let game = load_config(config)?;
    print_json(&inspect_level(&level, &game)?)?;
    Ok(true)
}
