//! # tc-crypto: Cryptographic Primitives
//!
//! - **Ed25519** key pairs for DID provisioning and DID proof verification.
//! - **Merkle Mountain Range** inclusion proofs, used by the proof service
//!   to commit to a payload's fields.
//! - **Hex** encoding helpers (no external hex crate dependency).
//!
//! ## Crate Policy
//!
//! - Depends only on `tc-core` internally.
//! - Tests use real SHA-256 and real Ed25519; nothing is mocked.

pub mod ed25519;
pub mod error;
pub mod hex;
pub mod mmr;

pub use ed25519::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use error::CryptoError;
pub use mmr::{InclusionProof, PathStep, Peak, Side};
