//! # Canonical Serialization: JCS-Compatible Byte Production
//!
//! This module defines `CanonicalBytes`, the sole construction path for bytes
//! used in content hashing across TraceChain.
//!
//! ## Invariant
//!
//! The `CanonicalBytes` newtype has a private inner field. The only way to
//! construct it is through `CanonicalBytes::new()`, which applies numeric
//! normalization before JCS serialization. Any function that hashes a
//! payload accepts `&CanonicalBytes`, so a raw `serde_json::to_vec()` can
//! never leak into an anchor hash.
//!
//! ## Normalization Rules
//!
//! 1. **Integral floats become integers.** Sensor payloads arrive as
//!    `28.0` from one client and `28` from another; both hash identically.
//!    Applies to floats whose magnitude is below 2^53.
//! 2. **Non-integral floats** keep their value and are written in the
//!    ECMAScript shortest round-trip form by `serde_jcs`.
//! 3. **Object keys** are sorted by UTF-16 code units (RFC 8785).
//! 4. **Datetimes** reach this layer already serialized as RFC 3339 UTC
//!    strings by `chrono`.
//!
//! After normalization, serialization uses `serde_jcs`: sorted keys, compact
//! separators, deterministic byte sequence.

use serde::Serialize;
use serde_json::{Number, Value};

use crate::error::CanonicalizationError;

/// Largest magnitude at which every integer is exactly representable as f64.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Bytes produced exclusively by JCS canonicalization with numeric
/// normalization.
///
/// # Invariants
///
/// - The only constructor is `CanonicalBytes::new()`.
/// - Integral numbers are always encoded as integers.
/// - Serialization uses sorted keys with compact separators (RFC 8785).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::SerializationFailed` if the value
    /// cannot be represented as JSON (e.g. a map with non-string keys).
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        let normalized = normalize_json_value(value);
        let bytes = serialize_canonical(&normalized)?;
        Ok(Self(bytes))
    }

    /// Access the canonical bytes for digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The canonical encoding as a UTF-8 string.
    ///
    /// JCS output is always valid UTF-8.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Recursively normalize numbers in a JSON value tree.
fn normalize_json_value(value: Value) -> Value {
    match value {
        Value::Number(n) => Value::Number(normalize_number(n)),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_json_value).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, normalize_json_value(v)))
                .collect(),
        ),
        other => other,
    }
}

fn normalize_number(n: Number) -> Number {
    if n.is_i64() || n.is_u64() {
        return n;
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < MAX_SAFE_INTEGER => Number::from(f as i64),
        _ => n,
    }
}

fn serialize_canonical(value: &Value) -> Result<Vec<u8>, CanonicalizationError> {
    let s = serde_jcs::to_string(value)?;
    Ok(s.into_bytes())
}
