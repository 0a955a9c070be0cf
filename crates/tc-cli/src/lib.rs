//! # tc-cli: Offline TraceChain Tooling
//!
//! - `hash`: canonical SHA-256 of a JSON record, the value anchors carry
//! - `proof`: generate and verify commitment proofs without the service
//! - `did`: Ed25519 key generation
//!
//! Handlers return a process exit code: 0 on success, 1 when a check
//! fails. Errors propagate as `anyhow::Error`.

pub mod did;
pub mod hash;
pub mod proof;

use std::path::Path;

use anyhow::{Context, Result};

/// Read a file as JSON, falling back to a JSON string of its contents.
pub(crate) fn read_document(path: &Path) -> Result<serde_json::Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(tc_proof::parse_input(text.trim_end()))
}
