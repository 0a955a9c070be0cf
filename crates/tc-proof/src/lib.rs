//! # tc-proof
//!
//! Commitments over JSON documents that can later be checked against the
//! document, or opened one field at a time.
//!
//! - [`ProofService::generate`] salts each top-level field and builds a
//!   Merkle Mountain Range over them (see `tc_crypto::mmr`).
//! - [`ProofService::verify`] recomputes the root from the data and checks
//!   the embedded path. It is pure and total: a mismatch is `false`.
//! - [`ProofService::disclose`] and [`ProofService::verify_disclosure`]
//!   reveal a single field without the others.
//!
//! These are salted hash commitments, not zero-knowledge proofs in the
//! circuit sense.

pub mod error;
pub mod service;
pub mod types;

pub use error::ProofError;
pub use service::{parse_input, ProofService};
pub use types::{Disclosure, MerkleProof, ProofType, PROOF_VERSION};
