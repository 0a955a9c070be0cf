//! # Record Lifecycle
//!
//! Domain rows and anchors are never physically deleted. A row is either
//! `Active` or `Retired`, and every read path hides retired rows. Stores
//! apply the rule through this module: in-memory stores call
//! [`Lifecycle::is_visible`], SQL stores splice [`ACTIVE_PREDICATE`] into
//! their `WHERE` clauses.

use serde::{Deserialize, Serialize};

/// SQL predicate selecting visible rows. Every table carries `is_active`.
pub const ACTIVE_PREDICATE: &str = "is_active = TRUE";

/// Lifecycle state of a stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    #[default]
    Active,
    Retired,
}

impl Lifecycle {
    /// Whether a row in this state is returned by read paths.
    pub fn is_visible(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Map the persisted `is_active` column.
    pub fn from_active_flag(active: bool) -> Self {
        if active {
            Self::Active
        } else {
            Self::Retired
        }
    }

    pub fn as_active_flag(&self) -> bool {
        self.is_visible()
    }
}
