//! # Merkle Mountain Range (MMR)
//!
//! Append-ordered authenticated structure over a list of leaves, with
//! compact inclusion proofs for any single leaf.
//!
//! ## Algorithm
//!
//! Domain-separated SHA-256:
//! - Leaf: `SHA256(0x00 || leaf_bytes)`.
//! - Node: `SHA256(0x01 || left || right)`.
//!
//! Leaves are merged into perfect binary trees ("peaks") left to right. The
//! root is the peaks bagged right-to-left:
//! `bag = peaks[-1]; for p in rev(peaks[:-1]): bag = node_hash(p, bag)`.
//!
//! The 0x00/0x01 prefixes keep a leaf from ever being reinterpreted as an
//! interior node.
//!
//! Hashes cross the serialization boundary as 64-char lowercase hex.
//! Verification never errors: malformed hex or inconsistent structure
//! returns `false`.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CryptoError;
use crate::hex;

/// Raw 32-byte hash.
pub type Hash32 = [u8; 32];

const LEAF_PREFIX: u8 = 0x00;
const NODE_PREFIX: u8 = 0x01;

// ---------------------------------------------------------------------------
// Core hashing
// ---------------------------------------------------------------------------

/// Compute the MMR leaf hash: `SHA256(0x00 || leaf_bytes)`.
pub fn leaf_hash(leaf_bytes: &[u8]) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update([LEAF_PREFIX]);
    hasher.update(leaf_bytes);
    hasher.finalize().into()
}

/// Compute a parent node hash: `SHA256(0x01 || left || right)`.
pub fn node_hash(left: &Hash32, right: &Hash32) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update([NODE_PREFIX]);
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

fn parse_hash(s: &str) -> Option<Hash32> {
    if !hex::is_hex_32(s) {
        return None;
    }
    hex::decode_array::<32>(s).ok()
}

// ---------------------------------------------------------------------------
// Peaks
// ---------------------------------------------------------------------------

/// A peak in the MMR: a complete binary tree root at a given height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peak {
    /// Height of the binary tree (0 = single leaf).
    pub height: u32,
    /// Root hash of this peak's subtree (64 hex chars).
    pub hash: String,
}

/// Build MMR peaks from leaf hashes in append order.
pub fn build_peaks(leaf_hashes: &[Hash32]) -> Vec<(u32, Hash32)> {
    let mut peaks: Vec<(u32, Hash32)> = Vec::new();
    for leaf in leaf_hashes {
        let mut cur_h: u32 = 0;
        let mut cur = *leaf;
        while let Some(&(top_h, left)) = peaks.last() {
            if top_h != cur_h {
                break;
            }
            peaks.pop();
            cur = node_hash(&left, &cur);
            cur_h += 1;
        }
        peaks.push((cur_h, cur));
    }
    peaks
}

/// Bag peaks right-to-left into a single root. `None` for an empty MMR.
pub fn bag_peaks(peaks: &[Hash32]) -> Option<Hash32> {
    let (last, rest) = peaks.split_last()?;
    let mut bag = *last;
    for p in rest.iter().rev() {
        bag = node_hash(p, &bag);
    }
    Some(bag)
}

/// Compute the MMR root of a non-empty leaf list.
pub fn root(leaf_hashes: &[Hash32]) -> Result<Hash32, CryptoError> {
    let peaks: Vec<Hash32> = build_peaks(leaf_hashes).into_iter().map(|(_, h)| h).collect();
    bag_peaks(&peaks).ok_or_else(|| CryptoError::Mmr("cannot compute root of empty MMR".into()))
}

/// Peaks as `(height, leaf_count)` from left to right for a given size.
fn peak_plan(size: usize) -> Vec<(u32, usize)> {
    let mut out = Vec::new();
    let mut n = size;
    while n > 0 {
        let h = usize::BITS - n.leading_zeros() - 1;
        let cnt = 1usize << h;
        out.push((h, cnt));
        n -= cnt;
    }
    out
}

/// `(peak_index, peak_start, peak_height)` for `leaf_index`.
fn find_peak_for_leaf(size: usize, leaf_index: usize) -> Option<(usize, usize, u32)> {
    if leaf_index >= size {
        return None;
    }
    let mut start = 0usize;
    for (i, (h, cnt)) in peak_plan(size).into_iter().enumerate() {
        if leaf_index < start + cnt {
            return Some((i, start, h));
        }
        start += cnt;
    }
    None
}

/// `(peak_index, peak_height)` of the peak holding `leaf_index` in an MMR of
/// `size` leaves. Lets a verifier that holds one leaf check a path without
/// the other leaves.
pub fn peak_for_leaf(size: usize, leaf_index: usize) -> Option<(usize, u32)> {
    find_peak_for_leaf(size, leaf_index).map(|(i, _, h)| (i, h))
}

// ---------------------------------------------------------------------------
// Inclusion proofs
// ---------------------------------------------------------------------------

/// Which side of the running hash a sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// A path step in a Merkle inclusion proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    pub side: Side,
    /// Sibling hash (64 hex chars).
    pub hash: String,
}

/// Sibling path from `leaf_pos` to the root of a power-of-two leaf list.
fn merkle_path_for_power_of_two(leaves: &[Hash32], leaf_pos: usize) -> Vec<PathStep> {
    let mut level: Vec<Hash32> = leaves.to_vec();
    let mut pos = leaf_pos;
    let mut path = Vec::new();
    while level.len() > 1 {
        let sibling_pos = pos ^ 1;
        let side = if sibling_pos < pos { Side::Left } else { Side::Right };
        path.push(PathStep {
            side,
            hash: hex::encode(&level[sibling_pos]),
        });
        level = level
            .chunks_exact(2)
            .map(|pair| node_hash(&pair[0], &pair[1]))
            .collect();
        pos /= 2;
    }
    path
}

/// An inclusion proof for one leaf of an MMR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionProof {
    /// Total number of leaves.
    pub size: usize,
    /// Index of the proven leaf.
    pub leaf_index: usize,
    /// Hash of the proven leaf (64 hex chars).
    pub leaf_hash: String,
    /// Index of the peak containing the leaf.
    pub peak_index: usize,
    /// Height of that peak.
    pub peak_height: u32,
    /// Path from the leaf to its peak.
    pub path: Vec<PathStep>,
    /// All peaks, left to right.
    pub peaks: Vec<Peak>,
    /// Bagged MMR root (64 hex chars).
    pub root: String,
}

/// Build an inclusion proof for `leaf_index` over `leaf_hashes`.
pub fn build_inclusion_proof(
    leaf_hashes: &[Hash32],
    leaf_index: usize,
) -> Result<InclusionProof, CryptoError> {
    let size = leaf_hashes.len();
    if size == 0 {
        return Err(CryptoError::Mmr("cannot build proof for empty MMR".into()));
    }
    let (peak_index, peak_start, peak_height) = find_peak_for_leaf(size, leaf_index)
        .ok_or_else(|| CryptoError::Mmr(format!("leaf_index {leaf_index} out of range")))?;

    let peaks = build_peaks(leaf_hashes);
    let peak_hashes: Vec<Hash32> = peaks.iter().map(|(_, h)| *h).collect();
    let root = bag_peaks(&peak_hashes)
        .ok_or_else(|| CryptoError::Mmr("cannot compute root of empty MMR".into()))?;

    let peak_leaf_count = 1usize << peak_height;
    let peak_leaves = &leaf_hashes[peak_start..peak_start + peak_leaf_count];
    let path = merkle_path_for_power_of_two(peak_leaves, leaf_index - peak_start);

    Ok(InclusionProof {
        size,
        leaf_index,
        leaf_hash: hex::encode(&leaf_hashes[leaf_index]),
        peak_index,
        peak_height,
        path,
        peaks: peaks
            .into_iter()
            .map(|(height, h)| Peak {
                height,
                hash: hex::encode(&h),
            })
            .collect(),
        root: hex::encode(&root),
    })
}

/// Verify that `proof` places `expected_leaf` under `expected_root`.
///
/// Returns `false`, never an error, for malformed or non-matching proofs.
pub fn verify_inclusion(proof: &InclusionProof, expected_leaf: &Hash32, expected_root: &Hash32) -> bool {
    let (Some(leaf), Some(root)) = (parse_hash(&proof.leaf_hash), parse_hash(&proof.root)) else {
        return false;
    };
    if &leaf != expected_leaf || &root != expected_root {
        return false;
    }

    // Peak selection must be consistent with the declared size.
    match find_peak_for_leaf(proof.size, proof.leaf_index) {
        Some((pi, _, h)) if pi == proof.peak_index && h == proof.peak_height => {}
        _ => return false,
    }
    if proof.peaks.len() != peak_plan(proof.size).len()
        || proof.path.len() != proof.peak_height as usize
    {
        return false;
    }

    let mut peaks = Vec::with_capacity(proof.peaks.len());
    for p in &proof.peaks {
        match parse_hash(&p.hash) {
            Some(h) => peaks.push(h),
            None => return false,
        }
    }

    let mut cur = leaf;
    for step in &proof.path {
        let Some(sibling) = parse_hash(&step.hash) else {
            return false;
        };
        cur = match step.side {
            Side::Left => node_hash(&sibling, &cur),
            Side::Right => node_hash(&cur, &sibling),
        };
    }

    // Substitute the computed peak and re-bag.
    peaks[proof.peak_index] = cur;
    bag_peaks(&peaks).is_some_and(|bagged| bagged == root)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn any_leaf_of_any_tree_verifies(n in 1usize..64, pick in any::<prop::sample::Index>()) {
            let l: Vec<Hash32> = (0..n).map(|i| leaf_hash(&i.to_le_bytes())).collect();
            let i = pick.index(n);
            let r = root(&l).unwrap();
            let proof = build_inclusion_proof(&l, i).unwrap();
            prop_assert!(verify_inclusion(&proof, &l[i], &r));
        }
    }
}
