//! # Binary Merkle Tree
//!
//! BLAKE3 Merkle tree over an ordered list of leaf hashes.
//!
//! ## Reduction Rule
//!
//! - parent = BLAKE3(left || right)
//! - A level with an odd node count pairs its last node with itself
//!   (duplicate-last). The chain-side verifier uses the same rule, so the
//!   rule is part of the on-chain format and must not change.
//! - One leaf: the root is the leaf itself.
//! - Zero leaves: no tree, no root.
//!
//! Levels wider than [`PARALLEL_THRESHOLD`] are hashed with rayon.

use crate::hashing::{blake3_hash_many, Hash};
use crate::CryptoError;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Level width above which pair hashing is spread across the rayon pool.
pub const PARALLEL_THRESHOLD: usize = 1024;

/// Hash two child nodes into their parent.
pub fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    blake3_hash_many(&[left.as_slice(), right.as_slice()])
}

fn next_level(level: &[Hash]) -> Vec<Hash> {
    let reduce = |pair: &[Hash]| {
        let left = &pair[0];
        hash_pair(left, pair.get(1).unwrap_or(left))
    };
    if level.len() > PARALLEL_THRESHOLD {
        level.par_chunks(2).map(reduce).collect()
    } else {
        level.chunks(2).map(reduce).collect()
    }
}

/// Merkle tree kept level by level, leaves first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    levels: Vec<Vec<Hash>>,
}

impl MerkleTree {
    /// Build from ordered leaves. Returns `None` for an empty list.
    pub fn build(leaves: Vec<Hash>) -> Option<Self> {
        if leaves.is_empty() {
            return None;
        }
        let mut levels = vec![leaves];
        while let Some(top) = levels.last() {
            if top.len() == 1 {
                break;
            }
            let parent = next_level(top);
            levels.push(parent);
        }
        Some(Self { levels })
    }

    /// Root hash.
    pub fn root(&self) -> Hash {
        // build() guarantees a non-empty top level
        self.levels
            .last()
            .and_then(|top| top.first())
            .copied()
            .unwrap_or_default()
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.levels.first().map_or(0, Vec::len)
    }

    /// Tree height (number of levels above the leaves).
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    /// Inclusion proof for the leaf at `index`.
    pub fn proof(&self, index: usize) -> Result<MerkleProof, CryptoError> {
        let leaf_count = self.leaf_count();
        if index >= leaf_count {
            return Err(CryptoError::LeafIndexOutOfRange { index, leaf_count });
        }

        let mut path = Vec::with_capacity(self.depth());
        let mut idx = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let (sibling_idx, position) = if idx % 2 == 0 {
                // Missing right sibling means this node was duplicated
                (if idx + 1 < level.len() { idx + 1 } else { idx }, SiblingPosition::Right)
            } else {
                (idx - 1, SiblingPosition::Left)
            };
            path.push(ProofNode {
                hash: level[sibling_idx],
                position,
            });
            idx /= 2;
        }

        Ok(MerkleProof {
            leaf_index: index as u64,
            leaf: self.levels[0][index],
            path,
        })
    }
}

/// Root of an ordered leaf list, `None` when empty.
pub fn merkle_root(leaves: &[Hash]) -> Option<Hash> {
    MerkleTree::build(leaves.to_vec()).map(|t| t.root())
}

/// Proof that a leaf sits at a given position under a root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub leaf_index: u64,
    pub leaf: Hash,
    pub path: Vec<ProofNode>,
}

impl MerkleProof {
    /// Recompute the root from this proof and compare.
    pub fn verify(&self, expected_root: &Hash) -> bool {
        verify_proof(&self.leaf, self.leaf_index, &self.path, expected_root)
    }
}

/// One sibling on the path from a leaf to the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofNode {
    pub hash: Hash,
    pub position: SiblingPosition,
}

/// Side of the sibling relative to the running hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiblingPosition {
    Left,
    Right,
}

/// Verify a leaf against a root.
///
/// The sibling sides must agree with `leaf_index`, so a valid path cannot
/// be replayed for a different position.
pub fn verify_proof(leaf: &Hash, leaf_index: u64, path: &[ProofNode], expected_root: &Hash) -> bool {
    if path.len() >= 64 {
        return false;
    }
    let mut current = *leaf;
    let mut idx = leaf_index;
    for node in path {
        let expected_side = if idx % 2 == 0 {
            SiblingPosition::Right
        } else {
            SiblingPosition::Left
        };
        if node.position != expected_side {
            return false;
        }
        current = match node.position {
            SiblingPosition::Left => hash_pair(&node.hash, &current),
            SiblingPosition::Right => hash_pair(&current, &node.hash),
        };
        idx /= 2;
    }
    idx == 0 && current == *expected_root
}
