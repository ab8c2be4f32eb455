use serde::{Deserialize, Serialize};

use crate::hasher::{digest, digest_concat};

/// Input hashed to form the root of an empty tree.
pub const EMPTY_ROOT_INPUT: &str = "empty";

/// Side of a sibling in a Merkle proof path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// Merkle root over an ordered list of leaf inputs.
///
/// Shorthand for `MerkleTree::from_inputs(inputs).root()`.
pub fn merkle_root<S: AsRef<str>>(inputs: &[S]) -> String {
    MerkleTree::from_inputs(inputs).root
}

/// Binary Merkle tree over hex digests.
///
/// Leaves are `digest(input)`. Adjacent nodes are combined left-to-right as
/// `digest(left ‖ right)` over their hex strings; an odd trailing node is
/// combined with itself. The tree is order-sensitive: permuting distinct
/// inputs changes the root.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    root: String,
    /// Level 0 = leaf hashes, last level = `[root]`. Empty for an empty tree.
    levels: Vec<Vec<String>>,
}

impl MerkleTree {
    /// Build a tree from raw leaf inputs (each is hashed once to form a leaf).
    ///
    /// An empty list produces `digest("empty")` as root. A single input's
    /// leaf hash is the root.
    pub fn from_inputs<S: AsRef<str>>(inputs: &[S]) -> Self {
        if inputs.is_empty() {
            return Self {
                root: digest(EMPTY_ROOT_INPUT),
                levels: vec![],
            };
        }

        let leaves: Vec<String> = inputs.iter().map(|input| digest(input.as_ref())).collect();
        let mut levels = vec![leaves];

        while levels[levels.len() - 1].len() > 1 {
            let current = &levels[levels.len() - 1];
            let mut next = Vec::with_capacity(current.len().div_ceil(2));
            for pair in current.chunks(2) {
                let hash = match pair {
                    [left, right] => hash_pair(left, right),
                    // Odd node: hash with itself
                    [single] => hash_pair(single, single),
                    _ => unreachable!("chunks(2) yields one or two items"),
                };
                next.push(hash);
            }
            levels.push(next);
        }

        let root = levels[levels.len() - 1][0].clone();
        Self { root, levels }
    }

    /// The root hash of the tree.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.levels.first().map_or(0, Vec::len)
    }

    /// Generate an inclusion proof for the leaf at `index`.
    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        if index >= self.leaf_count() {
            return None;
        }

        let mut path = Vec::new();
        let mut idx = index;

        for level in &self.levels[..self.levels.len() - 1] {
            let sibling_idx = if idx % 2 == 0 { idx + 1 } else { idx - 1 };
            let sibling = level.get(sibling_idx).unwrap_or(&level[idx]).clone();
            let side = if idx % 2 == 0 { Side::Right } else { Side::Left };
            path.push((sibling, side));
            idx /= 2;
        }

        Some(MerkleProof {
            leaf: self.levels[0][index].clone(),
            path,
            root: self.root.clone(),
        })
    }
}

/// Merkle inclusion proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// Hash of the leaf being proven.
    pub leaf: String,
    /// Path of (sibling_hash, sibling_side) pairs from leaf to root.
    pub path: Vec<(String, Side)>,
    /// Expected root hash.
    pub root: String,
}

impl MerkleProof {
    /// Verify the proof: recompute the root from the leaf and path.
    pub fn verify(&self) -> bool {
        let mut current = self.leaf.clone();
        for (sibling, side) in &self.path {
            current = match side {
                Side::Left => hash_pair(sibling, &current),
                Side::Right => hash_pair(&current, sibling),
            };
        }
        current == self.root
    }

    /// Verify the proof and that `input` is the pre-image of its leaf.
    pub fn verify_input(&self, input: &str) -> bool {
        digest(input) == self.leaf && self.verify()
    }
}

fn hash_pair(left: &str, right: &str) -> String {
    digest_concat(&[left.as_bytes(), right.as_bytes()])
}
