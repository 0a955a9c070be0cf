//! # Content Hash
//!
//! Hashes are only taken over [`CanonicalBytes`], so an anchor hash, a
//! claim hash and a CLI `hash` all agree for the same record regardless of
//! key order. The stored form is 64 lowercase hex characters with no
//! algorithm prefix.

use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;

/// Raw SHA-256 of canonical bytes.
pub fn sha256(data: &CanonicalBytes) -> [u8; 32] {
    Sha256::digest(data.as_bytes()).into()
}

/// Lowercase hex SHA-256 of canonical bytes.
pub fn sha256_hex(data: &CanonicalBytes) -> String {
    use std::fmt::Write;

    sha256(data).iter().fold(String::with_capacity(64), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hash(v: serde_json::Value) -> String {
        sha256_hex(&CanonicalBytes::new(&v).unwrap())
    }

    #[test]
    fn empty_object_vector() {
        assert_eq!(
            hash(json!({})),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }

    #[test]
    fn hex_form() {
        let h = hash(json!({"batch_id": "1"}));
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn key_order_is_irrelevant_but_values_are_not() {
        assert_eq!(
            hash(json!({"species": "vannamei", "quantity": 10})),
            hash(json!({"quantity": 10, "species": "vannamei"}))
        );
        assert_ne!(hash(json!({"status": "created"})), hash(json!({"status": "shipped"})));
    }

    #[test]
    fn raw_and_hex_agree() {
        let cb = CanonicalBytes::new(&json!([1, 2, 3])).unwrap();
        assert_eq!(crate::digest::sha256(&cb).len(), 32);
        assert!(sha256_hex(&cb).starts_with(&format!("{:02x}", sha256(&cb)[0])));
    }
}
