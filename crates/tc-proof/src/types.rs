use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tc_crypto::{PathStep, Peak};

use crate::error::ProofError;

/// Current proof format version.
pub const PROOF_VERSION: u32 = 1;

/// Proof constructions the service can produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofType {
    #[default]
    Merkle,
}

impl ProofType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Merkle => "merkle",
        }
    }
}

impl std::fmt::Display for ProofType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProofType {
    type Err = ProofError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "merkle" => Ok(Self::Merkle),
            other => Err(ProofError::Serialization(format!("unknown proof type '{other}'"))),
        }
    }
}

/// Salted MMR commitment to a JSON document.
///
/// Crosses the wire as its JSON text. The inclusion path and peaks are for
/// leaf `leaf_index`, which the service always sets to 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleProof {
    #[serde(rename = "type")]
    pub proof_type: ProofType,
    pub version: u32,
    /// Hex-encoded per-proof salt.
    pub salt: String,
    pub root: String,
    pub leaf_count: usize,
    pub leaf_index: usize,
    pub path: Vec<PathStep>,
    pub peaks: Vec<Peak>,
    pub created_at: DateTime<Utc>,
    pub nonce: String,
}

impl MerkleProof {
    pub fn to_json(&self) -> Result<String, ProofError> {
        serde_json::to_string(self).map_err(|e| ProofError::Serialization(e.to_string()))
    }

    pub fn from_json(text: &str) -> Result<Self, ProofError> {
        serde_json::from_str(text).map_err(|e| ProofError::Serialization(e.to_string()))
    }

    /// Decode, and report whether `text` is exactly this proof's encoding up
    /// to key order and whitespace. Re-encoding normalizes timestamps and
    /// numbers, so an altered but equivalent spelling reports `false`.
    pub fn from_json_strict(text: &str) -> Result<(Self, bool), ProofError> {
        let ser = |e: serde_json::Error| ProofError::Serialization(e.to_string());
        let raw: serde_json::Value = serde_json::from_str(text).map_err(ser)?;
        let proof: Self = serde_json::from_value(raw.clone()).map_err(ser)?;
        let exact = serde_json::to_value(&proof).map_err(ser)? == raw;
        Ok((proof, exact))
    }
}

/// One field of a committed document, revealed with the path that ties it
/// to the proof's root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Disclosure {
    pub field: String,
    pub value: serde_json::Value,
    /// Hex leaf key derived from the proof's salt, nonce and creation time.
    /// The raw salt is not revealed.
    pub salt: String,
    pub leaf_index: usize,
    pub leaf_count: usize,
    pub path: Vec<PathStep>,
    pub peaks: Vec<Peak>,
    pub root: String,
}
