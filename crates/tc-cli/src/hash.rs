//! # Hash Subcommand
//!
//! Prints the canonical content hash of a JSON file. Key order and number
//! formatting do not change the result.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tc_core::{sha256_hex, CanonicalBytes};

#[derive(Args, Debug)]
pub struct HashArgs {
    /// JSON file to hash.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

pub fn run_hash(args: &HashArgs) -> Result<u8> {
    let hash = hash_file(&args.file)?;
    println!("{hash}");
    Ok(0)
}

pub fn hash_file(path: &std::path::Path) -> Result<String> {
    let doc = crate::read_document(path)?;
    Ok(sha256_hex(&CanonicalBytes::new(&doc)?))
}
