//! # Proof Subcommand
//!
//! Offline counterpart of `/zkp/generate` and `/zkp/verify`. Proofs are
//! the same JSON text the service returns, so either side can check the
//! other's output.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tc_proof::{ProofService, ProofType};

#[derive(Args, Debug)]
pub struct ProofArgs {
    #[command(subcommand)]
    pub command: ProofCommand,
}

#[derive(Subcommand, Debug)]
pub enum ProofCommand {
    /// Commit to a JSON document and print the proof.
    Generate {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Write the proof here instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Check a proof against a document. Exits 1 when it does not match.
    Verify {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(value_name = "PROOF_FILE")]
        proof: PathBuf,
    },
}

pub fn run_proof(args: &ProofArgs) -> Result<u8> {
    match &args.command {
        ProofCommand::Generate { file, output } => cmd_generate(file, output.as_deref()),
        ProofCommand::Verify { file, proof } => cmd_verify(file, proof),
    }
}

pub fn generate_proof(file: &Path) -> Result<String> {
    let doc = crate::read_document(file)?;
    let proof = ProofService::new().generate(&doc, ProofType::Merkle)?;
    tracing::debug!(leaves = proof.leaf_count, root = %proof.root, "proof generated");
    Ok(proof.to_json()?)
}

pub fn verify_proof(file: &Path, proof_file: &Path) -> Result<bool> {
    let doc = crate::read_document(file)?;
    let proof = std::fs::read_to_string(proof_file)
        .with_context(|| format!("failed to read {}", proof_file.display()))?;
    Ok(ProofService::new().verify(&doc, proof.trim())?)
}

fn cmd_generate(file: &Path, output: Option<&Path>) -> Result<u8> {
    let proof = generate_proof(file)?;
    match output {
        Some(path) => {
            std::fs::write(path, &proof)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("OK: proof written to {}", path.display());
        }
        None => println!("{proof}"),
    }
    Ok(0)
}

fn cmd_verify(file: &Path, proof_file: &Path) -> Result<u8> {
    if verify_proof(file, proof_file)? {
        println!("OK: proof matches {}", file.display());
        Ok(0)
    } else {
        println!("FAIL: proof does not match {}", file.display());
        Ok(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_proof_verifies_until_the_document_changes() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("batch.json");
        let proof = dir.path().join("batch.proof");
        std::fs::write(&doc, r#"{"batch_code":"B-1","quantity":500}"#).unwrap();

        assert_eq!(cmd_generate(&doc, Some(&proof)).unwrap(), 0);
        assert!(verify_proof(&doc, &proof).unwrap());
        assert_eq!(cmd_verify(&doc, &proof).unwrap(), 0);

        std::fs::write(&doc, r#"{"batch_code":"B-1","quantity":501}"#).unwrap();
        assert!(!verify_proof(&doc, &proof).unwrap());
        assert_eq!(cmd_verify(&doc, &proof).unwrap(), 1);
    }

    #[test]
    fn plain_text_documents_are_committed_as_strings() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("note.txt");
        std::fs::write(&doc, "harvested at dawn\n").unwrap();
        let proof_text = generate_proof(&doc).unwrap();
        let proof = dir.path().join("note.proof");
        std::fs::write(&proof, proof_text).unwrap();
        assert!(verify_proof(&doc, &proof).unwrap());
    }

    #[test]
    fn garbage_proof_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("d.json");
        let proof = dir.path().join("p.json");
        std::fs::write(&doc, r#"{"a":1}"#).unwrap();
        std::fs::write(&proof, "not a proof").unwrap();
        assert!(verify_proof(&doc, &proof).is_err());
    }
}
