//! # DID Subcommand
//!
//! Offline Ed25519 key generation. With `--entity-type` the DID the
//! registry would derive from the key is printed as well.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tc_core::Did;
use tc_crypto::Ed25519KeyPair;

/// Hex chars of the public key embedded in a TracePost DID.
const KEY_FRAGMENT_LEN: usize = 16;

#[derive(Args, Debug)]
pub struct DidArgs {
    #[command(subcommand)]
    pub command: DidCommand,
}

#[derive(Subcommand, Debug)]
pub enum DidCommand {
    /// Generate an Ed25519 keypair.
    Keygen {
        /// Directory for `<prefix>.key` and `<prefix>.pub`. Prints to
        /// stdout when omitted.
        #[arg(long, short)]
        output: Option<PathBuf>,
        #[arg(long, default_value = "tracechain")]
        prefix: String,
        /// Also print the DID for this entity type.
        #[arg(long)]
        entity_type: Option<String>,
    },
}

pub fn run_did(args: &DidArgs) -> Result<u8> {
    match &args.command {
        DidCommand::Keygen {
            output,
            prefix,
            entity_type,
        } => cmd_keygen(output.as_deref(), prefix, entity_type.as_deref()),
    }
}

/// DID for `entity_type` bound to `public_key_hex`.
pub fn derive_did(entity_type: &str, public_key_hex: &str) -> Result<Did> {
    let fragment = public_key_hex
        .get(..KEY_FRAGMENT_LEN)
        .context("public key is too short")?;
    Ok(Did::tracepost(entity_type, fragment)?)
}

fn cmd_keygen(output: Option<&Path>, prefix: &str, entity_type: Option<&str>) -> Result<u8> {
    let key_pair = Ed25519KeyPair::generate();
    let public_hex = key_pair.public_key().to_hex();
    let secret_hex = key_pair.secret_hex();

    match output {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
            let key_path = dir.join(format!("{prefix}.key"));
            let pub_path = dir.join(format!("{prefix}.pub"));
            std::fs::write(&key_path, secret_hex.as_bytes())
                .with_context(|| format!("failed to write {}", key_path.display()))?;
            std::fs::write(&pub_path, &public_hex)
                .with_context(|| format!("failed to write {}", pub_path.display()))?;
            println!("OK: generated Ed25519 keypair");
            println!("  Private key: {}", key_path.display());
            println!("  Public key:  {}", pub_path.display());
        }
        None => {
            println!("public_key:  {public_hex}");
            println!("private_key: {}", secret_hex.as_str());
        }
    }
    if let Some(entity_type) = entity_type {
        println!("did:         {}", derive_did(entity_type, &public_hex)?);
    }
    Ok(0)
}
