//! Merkle inclusion proofs over block transaction digests
//!
//! The relay contract verifies a transaction against a committed block root
//! using the UTXO chain's consensus convention: double-SHA256 pairwise
//! hashing, left to right, duplicating the final element when a level has an
//! odd count. A proof records the sibling path for a leaf; orientation at
//! each height comes from the corresponding bit of the leaf index, so
//! `(leaf, siblings, index)` is enough to re-derive the root.

use sha2::{Digest, Sha256};

use crate::error::BridgeError;

/// Sibling path from a leaf at `index` to the block root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleProof {
    /// One 32-byte digest per tree level, leaf level first.
    pub siblings: Vec<[u8; 32]>,
    /// Position of the proven leaf in the original ordered list.
    pub index: u64,
}

fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    let first = hasher.finalize();
    Sha256::digest(first).into()
}

/// Build the inclusion proof for `leaves[index]`.
///
/// Fails with [`BridgeError::IndexOutOfRange`] when `index` does not name a
/// leaf, including the empty-list case.
pub fn build_proof(leaves: &[[u8; 32]], index: u64) -> Result<MerkleProof, BridgeError> {
    if index >= leaves.len() as u64 {
        return Err(BridgeError::IndexOutOfRange {
            index,
            leaves: leaves.len(),
        });
    }

    let mut level: Vec<[u8; 32]> = leaves.to_vec();
    let mut position = index as usize;
    let mut siblings = Vec::new();

    while level.len() > 1 {
        if level.len() % 2 == 1 {
            let last = level[level.len() - 1];
            level.push(last);
        }
        siblings.push(level[position ^ 1]);

        let mut next = Vec::with_capacity(level.len() / 2);
        for pair in level.chunks(2) {
            next.push(hash_pair(&pair[0], &pair[1]));
        }
        level = next;
        position >>= 1;
    }

    Ok(MerkleProof { siblings, index })
}

/// Root of the full leaf list; `None` for an empty list.
pub fn merkle_root(leaves: &[[u8; 32]]) -> Option<[u8; 32]> {
    if leaves.is_empty() {
        return None;
    }

    let mut level: Vec<[u8; 32]> = leaves.to_vec();
    while level.len() > 1 {
        if level.len() % 2 == 1 {
            let last = level[level.len() - 1];
            level.push(last);
        }
        let mut next = Vec::with_capacity(level.len() / 2);
        for pair in level.chunks(2) {
            next.push(hash_pair(&pair[0], &pair[1]));
        }
        level = next;
    }
    Some(level[0])
}

/// Re-derive the root from a leaf and its proof.
///
/// Bit `h` of `proof.index` decides orientation at height `h`: set means the
/// sibling concatenates on the left.
pub fn root_from_proof(leaf: &[u8; 32], proof: &MerkleProof) -> [u8; 32] {
    let mut acc = *leaf;
    for (height, sibling) in proof.siblings.iter().enumerate() {
        if (proof.index >> height) & 1 == 1 {
            acc = hash_pair(sibling, &acc);
        } else {
            acc = hash_pair(&acc, sibling);
        }
    }
    acc
}

/// Parse a 32-byte digest from hex (optional `0x` prefix).
///
/// Byte order is passed through untouched; callers supply digests in the
/// order the verifying contract expects, exactly as received from the block
/// index service.
pub fn digest_from_hex(input: &str) -> Result<[u8; 32], BridgeError> {
    let stripped = input.strip_prefix("0x").unwrap_or(input);
    let bytes = hex::decode(stripped)
        .map_err(|e| BridgeError::Validation(format!("invalid digest hex {input:?}: {e}")))?;
    if bytes.len() != 32 {
        return Err(BridgeError::Validation(format!(
            "invalid digest length: expected 32 bytes, got {}",
            bytes.len()
        )));
    }
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&bytes);
    Ok(digest)
}
