//! # tc-identity
//!
//! Decentralized identifiers (`did:tracepost:<type>:<key>`) and verifiable
//! claims between them.
//!
//! - [`IdentityRegistry`] provisions Ed25519-backed DIDs, resolves them from
//!   the ledger, changes their status, and verifies signatures made with
//!   their keys.
//! - [`ClaimRegistry`] issues, verifies and revokes claims. The ledger holds
//!   the claim's content hash and status; the store holds the document.
//!
//! Private keys are returned once, at creation, and never persisted.

pub mod claims;
pub mod error;
pub mod memory;
pub mod registry;
pub mod store;
pub mod types;

pub use claims::ClaimRegistry;
pub use error::IdentityError;
pub use memory::{MemoryClaimStore, MemoryIdentityStore};
pub use registry::{verify_self_proof, IdentityRegistry, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
pub use store::{ClaimStore, IdentityStore};
pub use types::{
    ClaimVerification, CreatedDid, DecentralizedIdentity, DidProof, DidProofVerification,
    IdentityPage, IdentityQuery, VerifiableClaim,
};
