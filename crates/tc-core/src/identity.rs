//! # Domain Identity Newtypes
//!
//! Newtype wrappers for identifiers that cross component boundaries.
//! A `TxId` cannot be passed where a `Did` is expected, and a related-table
//! name is a closed enum rather than a free string.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// DID method used for identities provisioned by this system.
pub const DID_METHOD: &str = "tracepost";

/// Relational table an anchor refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelatedTable {
    Batch,
    BatchExtended,
    BatchStatusExtended,
    Event,
    Environment,
}

impl RelatedTable {
    pub const ALL: [RelatedTable; 5] = [
        Self::Batch,
        Self::BatchExtended,
        Self::BatchStatusExtended,
        Self::Event,
        Self::Environment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Batch => "batch",
            Self::BatchExtended => "batch_extended",
            Self::BatchStatusExtended => "batch_status_extended",
            Self::Event => "event",
            Self::Environment => "environment",
        }
    }

    /// Tables whose anchors refer to a batch row, so search results can
    /// carry a batch snapshot.
    pub fn is_summarizable(&self) -> bool {
        matches!(
            self,
            Self::Batch | Self::BatchExtended | Self::BatchStatusExtended
        )
    }
}

impl fmt::Display for RelatedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelatedTable {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownTable(s.to_string()))
    }
}

/// A `(table, id)` pair naming one domain row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub table: RelatedTable,
    pub id: i64,
}

impl EntityRef {
    pub fn new(table: RelatedTable, id: i64) -> Self {
        Self { table, id }
    }

    pub fn batch(id: i64) -> Self {
        Self::new(RelatedTable::Batch, id)
    }

    pub fn event(id: i64) -> Self {
        Self::new(RelatedTable::Event, id)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.table, self.id)
    }
}

/// Ledger-side stream of transactions for one root entity.
///
/// Events and readings are recorded on their parent batch's chain, so a
/// batch's chain lists every transaction that touched the batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(String);

impl ChainId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn for_batch(batch_id: i64) -> Self {
        Self(format!("batch:{batch_id}"))
    }

    /// Chain for identity and claim registry transactions.
    pub fn identity_registry() -> Self {
        Self("identity-registry".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ledger transaction identifier as returned by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(String);

impl TxId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decentralized identifier, `did:<method>:<method-specific-id>`.
///
/// Construction validates the shape; the method-specific part may contain
/// further colons (`did:tracepost:hatchery:1a2b...`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Did(String);

impl Did {
    /// Parse and validate a DID string.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let mut parts = s.splitn(3, ':');
        let scheme = parts.next().unwrap_or_default();
        let method = parts.next().unwrap_or_default();
        let rest = parts.next().unwrap_or_default();
        let method_ok = !method.is_empty()
            && method
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
        if scheme != "did" || !method_ok || rest.is_empty() || rest.ends_with(':') {
            return Err(ValidationError::InvalidDid(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    /// Build a `did:tracepost:<entity_type>:<key_fragment>` identifier.
    pub fn tracepost(entity_type: &str, key_fragment: &str) -> Result<Self, ValidationError> {
        if entity_type.is_empty() || entity_type.contains(':') {
            return Err(ValidationError::field(
                "entity_type",
                "must be non-empty and contain no ':'",
            ));
        }
        Self::parse(&format!("did:{DID_METHOD}:{entity_type}:{key_fragment}"))
    }

    pub fn method(&self) -> &str {
        self.0.split(':').nth(1).unwrap_or_default()
    }

    /// Entity type segment for `did:tracepost:` identifiers.
    pub fn entity_type(&self) -> Option<&str> {
        if self.method() == DID_METHOD {
            self.0.split(':').nth(2)
        } else {
            None
        }
    }

    /// DID URL of the first verification key.
    pub fn key_id(&self) -> String {
        format!("{}#keys-1", self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Did {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Did> for String {
    fn from(value: Did) -> Self {
        value.0
    }
}

impl FromStr for Did {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for a verifiable claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimId(pub Uuid);

impl ClaimId {
    /// Generate a new random claim identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ClaimId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for ClaimId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| ValidationError::field("claim_id", e.to_string()))
    }
}

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
