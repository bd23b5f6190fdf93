//! # credbridge CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use credbridge_cli::check::{run_check, run_subject, CheckArgs, SubjectArgs};
use credbridge_cli::hash::{run_hash, HashArgs};

/// credbridge operator tooling.
///
/// Inspects the on-chain credential registry and reproduces the credential
/// hashes the webhook service computes.
#[derive(Parser, Debug)]
#[command(name = "credbridge", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read a credential's existence, status, record and metadata.
    Check(CheckArgs),

    /// List the credential hashes stored for a subject DID.
    Subject(SubjectArgs),

    /// Compute the credential hash of a JSON payload file.
    Hash(HashArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level.
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

    let result = match cli.command {
        Commands::Check(args) => run_check(&args),
        Commands::Subject(args) => run_subject(&args),
        Commands::Hash(args) => run_hash(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
