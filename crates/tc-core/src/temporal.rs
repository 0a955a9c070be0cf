//! # Storage-Precision Time
//!
//! Postgres keeps microseconds. A timestamp with nanoseconds survives the
//! write but not the read-back, and any payload that embeds it then hashes
//! differently after a reload. Every timestamp that ends up in a hashed
//! payload is taken from [`now_micros`] or truncated the same way.

use chrono::{DateTime, SubsecRound, Utc};

/// Current UTC time truncated to microseconds.
pub fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
