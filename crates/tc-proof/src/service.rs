//! # Proof Service
//!
//! Commits to a JSON document with a salted Merkle Mountain Range.
//!
//! ## Leaves
//!
//! An object with at least one field yields one leaf per top-level field, in
//! sorted key order, over the canonical bytes of `[key, value]`. Anything
//! else (scalars, arrays, the empty object) yields a single leaf over its
//! own canonical bytes. Every leaf is `SHA256(0x00 || key || material)`,
//! so equal field values in different proofs are unlinkable.
//!
//! The leaf key is `SHA256(canonical [salt, nonce, createdAt])`. Every
//! field of a proof therefore feeds the root or is compared against a fresh
//! rebuild, and a disclosure carries the leaf key rather than the raw salt.
//!
//! ## Verification
//!
//! Pure. Nothing is cached and proofs do not expire. Verification answers
//! `false` for every mismatch, malformed hash, or non-canonical encoding;
//! only a proof text that is not a proof at all is an error.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rand_core::{OsRng, RngCore};
use tc_core::CanonicalBytes;
use tc_crypto::mmr::{self, Hash32, InclusionProof};
use tc_crypto::hex;

use crate::error::ProofError;
use crate::types::{Disclosure, MerkleProof, ProofType, PROOF_VERSION};

const SALT_LEN: usize = 32;

/// Interpret a request body: JSON when it parses, otherwise a JSON string.
pub fn parse_input(text: &str) -> serde_json::Value {
    serde_json::from_str(text).unwrap_or_else(|_| serde_json::Value::String(text.to_string()))
}

/// Sorted `(key, value)` pairs of a non-empty object.
fn fields(data: &serde_json::Value) -> Option<Vec<(&String, &serde_json::Value)>> {
    let map = data.as_object().filter(|m| !m.is_empty())?;
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    Some(entries)
}

/// Key for every leaf of one proof.
fn leaf_key(salt: &[u8], nonce: &str, created_at: &DateTime<Utc>) -> Result<Hash32, ProofError> {
    let binding = CanonicalBytes::new(&serde_json::json!([
        hex::encode(salt),
        nonce,
        created_at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
    ]))?;
    Ok(tc_core::sha256(&binding))
}

fn salted_leaf(key: &[u8], material: &CanonicalBytes) -> Hash32 {
    let mut buf = Vec::with_capacity(key.len() + material.len());
    buf.extend_from_slice(key);
    buf.extend_from_slice(material.as_bytes());
    mmr::leaf_hash(&buf)
}

fn field_leaf(key: &[u8], name: &str, value: &serde_json::Value) -> Result<Hash32, ProofError> {
    let material = CanonicalBytes::new(&serde_json::json!([name, value]))?;
    Ok(salted_leaf(key, &material))
}

fn leaf_hashes(data: &serde_json::Value, key: &[u8]) -> Result<Vec<Hash32>, ProofError> {
    match fields(data) {
        Some(entries) => entries
            .into_iter()
            .map(|(k, v)| field_leaf(key, k, v))
            .collect(),
        None => Ok(vec![salted_leaf(key, &CanonicalBytes::new(data)?)]),
    }
}

/// Lowercase hex only. Upper case decodes to the same bytes but is a
/// different proof text.
fn is_lower_hex(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

fn decode_lower(s: &str) -> Option<Vec<u8>> {
    is_lower_hex(s).then(|| hex::decode(s).ok()).flatten()
}

fn parse_hash(s: &str) -> Option<Hash32> {
    (hex::is_hex_32(s) && is_lower_hex(s))
        .then(|| hex::decode_array::<32>(s).ok())
        .flatten()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProofService;

impl ProofService {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(
        &self,
        data: &serde_json::Value,
        proof_type: ProofType,
    ) -> Result<MerkleProof, ProofError> {
        match proof_type {
            ProofType::Merkle => {}
        }
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let nonce = uuid::Uuid::new_v4().to_string();
        let created_at = Utc::now().trunc_subsecs(6);

        let key = leaf_key(&salt, &nonce, &created_at)?;
        let leaves = leaf_hashes(data, &key)?;
        let inclusion = mmr::build_inclusion_proof(&leaves, 0)?;
        tracing::debug!(leaf_count = leaves.len(), root = %inclusion.root, "generated merkle proof");

        Ok(MerkleProof {
            proof_type,
            version: PROOF_VERSION,
            salt: hex::encode(&salt),
            root: inclusion.root,
            leaf_count: inclusion.size,
            leaf_index: inclusion.leaf_index,
            path: inclusion.path,
            peaks: inclusion.peaks,
            created_at,
            nonce,
        })
    }

    /// Verify proof text against `data`. Errors only when `proof_text` does
    /// not decode. Text that decodes but is not the proof's own encoding
    /// (key order and whitespace aside) is `false`.
    pub fn verify(&self, data: &serde_json::Value, proof_text: &str) -> Result<bool, ProofError> {
        let (proof, exact) = MerkleProof::from_json_strict(proof_text)?;
        Ok(exact && self.verify_proof(data, &proof))
    }

    pub fn verify_proof(&self, data: &serde_json::Value, proof: &MerkleProof) -> bool {
        if proof.version != PROOF_VERSION {
            return false;
        }
        let Some(salt) = decode_lower(&proof.salt) else {
            return false;
        };
        let Ok(key) = leaf_key(&salt, &proof.nonce, &proof.created_at) else {
            return false;
        };
        let Ok(leaves) = leaf_hashes(data, &key) else {
            return false;
        };
        if leaves.len() != proof.leaf_count {
            return false;
        }
        let Ok(fresh) = mmr::build_inclusion_proof(&leaves, proof.leaf_index) else {
            return false;
        };
        // The rebuild is deterministic, so every embedded string must match
        // it exactly.
        fresh.root == proof.root && fresh.peaks == proof.peaks && fresh.path == proof.path
    }

    /// Reveal one top-level field of `data` under an existing proof.
    pub fn disclose(
        &self,
        data: &serde_json::Value,
        proof_text: &str,
        field: &str,
    ) -> Result<Disclosure, ProofError> {
        let (proof, exact) = MerkleProof::from_json_strict(proof_text)?;
        if !exact || !self.verify_proof(data, &proof) {
            return Err(ProofError::ProofMismatch);
        }
        let entries = fields(data).ok_or_else(|| ProofError::UnknownField(field.to_string()))?;
        let (leaf_index, (_, value)) = entries
            .iter()
            .enumerate()
            .find(|(_, (k, _))| k.as_str() == field)
            .ok_or_else(|| ProofError::UnknownField(field.to_string()))?;

        let salt = hex::decode(&proof.salt)?;
        let key = leaf_key(&salt, &proof.nonce, &proof.created_at)?;
        let leaves = leaf_hashes(data, &key)?;
        let inclusion = mmr::build_inclusion_proof(&leaves, leaf_index)?;

        Ok(Disclosure {
            field: field.to_string(),
            value: (*value).clone(),
            salt: hex::encode(&key),
            leaf_index,
            leaf_count: inclusion.size,
            path: inclusion.path,
            peaks: inclusion.peaks,
            root: inclusion.root,
        })
    }

    /// Check a single disclosed field against its root.
    pub fn verify_disclosure(&self, disclosure: &Disclosure) -> bool {
        let hashes_canonical = disclosure
            .path
            .iter()
            .map(|s| s.hash.as_str())
            .chain(disclosure.peaks.iter().map(|p| p.hash.as_str()))
            .all(|h| parse_hash(h).is_some());
        if !hashes_canonical {
            return false;
        }
        let Some(key) = decode_lower(&disclosure.salt) else {
            return false;
        };
        let Ok(leaf) = field_leaf(&key, &disclosure.field, &disclosure.value) else {
            return false;
        };
        let Some(root) = parse_hash(&disclosure.root) else {
            return false;
        };
        let Some((peak_index, peak_height)) =
            mmr::peak_for_leaf(disclosure.leaf_count, disclosure.leaf_index)
        else {
            return false;
        };
        let inclusion = InclusionProof {
            size: disclosure.leaf_count,
            leaf_index: disclosure.leaf_index,
            leaf_hash: hex::encode(&leaf),
            peak_index,
            peak_height,
            path: disclosure.path.clone(),
            peaks: disclosure.peaks.clone(),
            root: disclosure.root.clone(),
        };
        mmr::verify_inclusion(&inclusion, &leaf, &root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn doc() -> serde_json::Value {
        json!({
            "batch_code": "B-2024-001",
            "species": "vannamei",
            "quantity": 12000,
            "certified": true,
            "hatchery": {"name": "Blue Lagoon", "region": "Ca Mau"}
        })
    }

    fn flip_first_hex(s: &str) -> String {
        let mut chars: Vec<char> = s.chars().collect();
        chars[0] = if chars[0] == '0' { '1' } else { '0' };
        chars.into_iter().collect()
    }

    #[test]
    fn round_trip_verifies() {
        let svc = ProofService::new();
        let proof = svc.generate(&doc(), ProofType::Merkle).unwrap();
        assert_eq!(proof.leaf_count, 5);
        assert_eq!(proof.leaf_index, 0);
        let text = proof.to_json().unwrap();
        assert!(svc.verify(&doc(), &text).unwrap());
    }

    #[test]
    fn key_order_does_not_matter() {
        let svc = ProofService::new();
        let a: serde_json::Value = serde_json::from_str(r#"{"a":1,"b":2}"#).unwrap();
        let b: serde_json::Value = serde_json::from_str(r#"{"b":2,"a":1}"#).unwrap();
        let text = svc.generate(&a, ProofType::Merkle).unwrap().to_json().unwrap();
        assert!(svc.verify(&b, &text).unwrap());
    }

    #[test]
    fn different_data_fails() {
        let svc = ProofService::new();
        let text = svc.generate(&doc(), ProofType::Merkle).unwrap().to_json().unwrap();
        let mut other = doc();
        other["quantity"] = json!(12001);
        assert!(!svc.verify(&other, &text).unwrap());

        let mut extra = doc();
        extra["note"] = json!("x");
        assert!(!svc.verify(&extra, &text).unwrap());
    }

    #[test]
    fn flipped_hashes_are_false_not_errors() {
        let svc = ProofService::new();
        let proof = svc.generate(&doc(), ProofType::Merkle).unwrap();

        let mut bad_root = proof.clone();
        bad_root.root = flip_first_hex(&proof.root);
        assert!(!svc.verify(&doc(), &bad_root.to_json().unwrap()).unwrap());

        let mut bad_path = proof.clone();
        bad_path.path[0].hash = flip_first_hex(&proof.path[0].hash);
        assert!(!svc.verify(&doc(), &bad_path.to_json().unwrap()).unwrap());

        let mut bad_peak = proof.clone();
        bad_peak.peaks[0].hash = flip_first_hex(&proof.peaks[0].hash);
        assert!(!svc.verify(&doc(), &bad_peak.to_json().unwrap()).unwrap());

        let mut bad_salt = proof.clone();
        bad_salt.salt = "zz".into();
        assert!(!svc.verify(&doc(), &bad_salt.to_json().unwrap()).unwrap());

        let mut not_hex = proof;
        not_hex.root = "nothex".into();
        assert!(!svc.verify(&doc(), &not_hex.to_json().unwrap()).unwrap());
    }

    #[test]
    fn undecodable_proof_is_serialization_error() {
        let svc = ProofService::new();
        assert!(matches!(
            svc.verify(&doc(), "not a proof"),
            Err(ProofError::Serialization(_))
        ));
        assert!(matches!(
            svc.verify(&doc(), r#"{"type":"merkle"}"#),
            Err(ProofError::Serialization(_))
        ));
    }

    #[test]
    fn salts_differ_between_proofs() {
        let svc = ProofService::new();
        let a = svc.generate(&doc(), ProofType::Merkle).unwrap();
        let b = svc.generate(&doc(), ProofType::Merkle).unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.root, b.root);
        assert_ne!(a.nonce, b.nonce);
    }

    #[test]
    fn every_single_byte_change_is_rejected() {
        let svc = ProofService::new();
        let proof = svc.generate(&doc(), ProofType::Merkle).unwrap();
        let verify = |p: &MerkleProof| svc.verify(&doc(), &p.to_json().unwrap()).unwrap();
        assert!(verify(&proof));

        let mut upper_path = proof.clone();
        upper_path.path[0].hash = proof.path[0].hash.to_uppercase();
        assert!(!verify(&upper_path));

        let mut upper_peak = proof.clone();
        upper_peak.peaks[0].hash = proof.peaks[0].hash.to_uppercase();
        assert!(!verify(&upper_peak));

        let mut upper_salt = proof.clone();
        upper_salt.salt = proof.salt.to_uppercase();
        assert!(!verify(&upper_salt));

        let mut nonce = proof.clone();
        nonce.nonce = flip_first_hex(&proof.nonce);
        assert!(!verify(&nonce));

        let mut created = proof.clone();
        created.created_at = proof.created_at + chrono::Duration::microseconds(1);
        assert!(!verify(&created));

        let mut index = proof;
        index.leaf_index = 1;
        assert!(!verify(&index));
    }

    #[test]
    fn equivalent_but_altered_text_is_rejected() {
        let svc = ProofService::new();
        let text = svc.generate(&doc(), ProofType::Merkle).unwrap().to_json().unwrap();

        let mut value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let created = value["createdAt"].as_str().unwrap().to_string();
        value["createdAt"] = json!(created.replacen('Z', "+00:00", 1));
        assert!(!svc.verify(&doc(), &value.to_string()).unwrap());

        let mut extended: serde_json::Value = serde_json::from_str(&text).unwrap();
        extended["extra"] = json!(null);
        assert!(!svc.verify(&doc(), &extended.to_string()).unwrap());

        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        let pretty = serde_json::to_string_pretty(&parsed).unwrap();
        assert!(svc.verify(&doc(), &pretty).unwrap());
    }

    #[test]
    fn disclosure_does_not_reveal_proof_salt() {
        let svc = ProofService::new();
        let proof = svc.generate(&doc(), ProofType::Merkle).unwrap();
        let d = svc.disclose(&doc(), &proof.to_json().unwrap(), "quantity").unwrap();
        assert_ne!(d.salt, proof.salt);
        assert!(svc.verify_disclosure(&d));

        let mut upper = d;
        upper.root = upper.root.to_uppercase();
        assert!(!svc.verify_disclosure(&upper));
    }

    #[test]
    fn scalars_and_strings_use_one_leaf() {
        let svc = ProofService::new();
        for data in [json!(42), json!("plain text"), json!([1, 2, 3]), json!({})] {
            let proof = svc.generate(&data, ProofType::Merkle).unwrap();
            assert_eq!(proof.leaf_count, 1);
            assert!(proof.path.is_empty());
            assert!(svc.verify_proof(&data, &proof));
        }
    }

    #[test]
    fn parse_input_prefers_json() {
        assert_eq!(parse_input(r#"{"a":1}"#), json!({"a": 1}));
        assert_eq!(parse_input("7"), json!(7));
        assert_eq!(parse_input("hello world"), json!("hello world"));
    }

    #[test]
    fn disclosure_round_trip() {
        let svc = ProofService::new();
        let text = svc.generate(&doc(), ProofType::Merkle).unwrap().to_json().unwrap();
        let d = svc.disclose(&doc(), &text, "species").unwrap();
        assert_eq!(d.value, json!("vannamei"));
        assert_eq!(d.root, MerkleProof::from_json(&text).unwrap().root);
        assert!(svc.verify_disclosure(&d));

        let mut forged = d.clone();
        forged.value = json!("monodon");
        assert!(!svc.verify_disclosure(&forged));

        let mut moved = d;
        moved.leaf_index = (moved.leaf_index + 1) % moved.leaf_count;
        assert!(!svc.verify_disclosure(&moved));
    }

    #[test]
    fn disclose_rejects_unknown_field_and_wrong_data() {
        let svc = ProofService::new();
        let text = svc.generate(&doc(), ProofType::Merkle).unwrap().to_json().unwrap();
        assert!(matches!(
            svc.disclose(&doc(), &text, "missing"),
            Err(ProofError::UnknownField(_))
        ));
        let mut other = doc();
        other["species"] = json!("monodon");
        assert!(matches!(
            svc.disclose(&other, &text, "species"),
            Err(ProofError::ProofMismatch)
        ));
    }

    proptest! {
        #[test]
        fn any_object_proves_each_field(
            entries in proptest::collection::btree_map("[a-z]{1,6}", any::<i32>(), 1..12)
        ) {
            let svc = ProofService::new();
            let data = serde_json::to_value(&entries).unwrap();
            let proof = svc.generate(&data, ProofType::Merkle).unwrap();
            prop_assert!(svc.verify_proof(&data, &proof));
            let text = proof.to_json().unwrap();
            for key in entries.keys() {
                let d = svc.disclose(&data, &text, key).unwrap();
                prop_assert!(svc.verify_disclosure(&d));
            }
        }
    }
}
