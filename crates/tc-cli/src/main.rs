//! # tracechain CLI entry point

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tc_cli::did::{run_did, DidArgs};
use tc_cli::hash::{run_hash, HashArgs};
use tc_cli::proof::{run_proof, ProofArgs};

/// Offline tooling for TraceChain records, proofs and keys.
#[derive(Parser, Debug)]
#[command(name = "tracechain", version, about, long_about = None)]
struct Cli {
    /// Verbose output. Repeat for more (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Canonical SHA-256 of a JSON file.
    Hash(HashArgs),
    /// Generate or verify a commitment proof.
    Proof(ProofArgs),
    /// Key generation for DIDs.
    Did(DidArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Hash(args) => run_hash(args),
        Commands::Proof(args) => run_proof(args),
        Commands::Did(args) => run_did(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
