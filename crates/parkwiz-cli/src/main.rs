//! # parkwiz CLI entry point
//!
//! Parses command-line arguments, initialises logging, loads configuration,
//! and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use parkwiz_cli::flows::{run_flows, FlowsArgs};
use parkwiz_cli::load_config;
use parkwiz_cli::replay::{run_replay, ReplayArgs};
use parkwiz_cli::score::{run_score, ScoreArgs};

/// Form wizard engine for the parking dashboard.
///
/// Scores passwords, lists the registration, login and password-reset
/// flows, and replays scripted sessions against an in-memory backend.
#[derive(Parser, Debug)]
#[command(name = "parkwiz", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML configuration file. Defaults to PARKWIZ_* variables.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score a password and show which criteria it meets.
    Score(ScoreArgs),

    /// List flows with their steps and field rules.
    Flows(FlowsArgs),

    /// Run an intent script and print a snapshot after each intent.
    Replay(ReplayArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("parkwiz CLI v{} starting", env!("CARGO_PKG_VERSION"));

    let result = load_config(cli.config.as_deref()).and_then(|config| match &cli.command {
        Commands::Score(args) => run_score(args),
        Commands::Flows(args) => run_flows(args, &config),
        Commands::Replay(args) => run_replay(args, &config),
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
