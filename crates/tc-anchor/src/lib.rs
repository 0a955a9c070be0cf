//! # tc-anchor: Anchoring, Verification and Audit
//!
//! Ties relational records to ledger transactions and answers whether a
//! record has changed since it was anchored.
//!
//! - [`writer`]: outbox that submits a mutation's canonical hash to the
//!   ledger and appends an [`AnchorRecord`].
//! - [`verify`]: recomputes a record's hash and checks it against stored
//!   anchors and the ledger.
//! - [`audit`]: merges a batch's events, their anchors and the ledger's view
//!   of the batch chain.
//! - [`search`]: filtered anchor listing with batch snapshots.
//! - [`records`]: batch, event and reading mutations wired to the writer.
//!
//! Stores are traits ([`AnchorStore`], [`DomainStore`]); [`memory`] holds the
//! in-process implementations. The Postgres implementations live with the
//! HTTP service.

pub mod audit;
pub mod domain;
pub mod error;
pub mod memory;
pub mod records;
pub mod search;
pub mod store;
pub mod verify;
pub mod writer;

pub use audit::{AuditEvent, AuditTrail, AuditTrailBuilder};
pub use domain::{
    Batch, BatchSnapshot, DomainStore, EnvironmentReading, Event, NewBatch, NewEvent, NewReading,
};
pub use error::AnchorError;
pub use memory::{MemoryAnchorStore, MemoryDomainStore};
pub use records::RecordService;
pub use search::{clamp_limit, AnchorSearch, SearchHit, SearchResults};
pub use store::{AnchorFilter, AnchorRecord, AnchorStore};
pub use verify::{BatchVerification, ChainSummary, Discrepancy, VerificationResult, Verifier};
pub use writer::{
    submit_timeout_for, AnchorIntent, AnchorOutcome, AnchorWriter, PendingAnchor, SUBMIT_GRACE,
};
