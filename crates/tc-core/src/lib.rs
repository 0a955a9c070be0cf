//! # tc-core: Foundational Types for TraceChain
//!
//! Every other crate in the workspace depends on `tc-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **`CanonicalBytes` newtype.** ALL content hashing flows through
//!    `CanonicalBytes::new()`. Anchor hashes, claim hashes and proof leaves
//!    are computed over the same normalized encoding, so a payload that was
//!    re-serialized with different key order or `28.0` instead of `28`
//!    hashes identically.
//!
//! 2. **Newtype identifiers.** `Did`, `ClaimId`, `TxId`, `ChainId` and
//!    `EntityRef` are distinct types. A transaction id cannot be passed
//!    where a DID is expected.
//!
//! 3. **Explicit lifecycle.** Domain rows are `Active` or `Retired`. Read
//!    paths filter through [`Lifecycle::is_visible`] or
//!    [`lifecycle::ACTIVE_PREDICATE`] rather than re-implementing the flag
//!    check per query.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `tc-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod status;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use digest::{sha256, sha256_hex};
pub use error::{CanonicalizationError, StoreError, ValidationError};
pub use identity::{ChainId, ClaimId, Did, EntityRef, RelatedTable, TxId};
pub use lifecycle::Lifecycle;
pub use status::{ClaimStatus, DidStatus};
pub use temporal::now_micros;
