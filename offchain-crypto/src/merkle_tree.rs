// This file is part of midnight-offchain-storage.
// Copyright (C) 2025 Midnight Foundation
// SPDX-License-Identifier: Apache-2.0
// Licensed under the Apache License, Version 2.0 (the "License");
// You may not use this file except in compliance with the License.
// You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Sparse, fixed-depth Merkle trees, and the witnesses proving a leaf's
//! position under a root.

use crate::curve::Fr;
use crate::hash::{EMPTY_LEAF, leaf_hash, node_hash};
use crate::repr::FieldRepr;
use lazy_static::lazy_static;
use rand::Rng;
use rand::distributions::{Distribution, Standard};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::Arc;

/// The largest supported tree height.
pub const MAX_HEIGHT: u16 = 256;

lazy_static! {
    static ref EMPTY_ROOTS: Vec<Fr> = {
        let mut roots = Vec::with_capacity(MAX_HEIGHT as usize + 1);
        roots.push(EMPTY_LEAF);
        for h in 0..MAX_HEIGHT as usize {
            roots.push(node_hash(roots[h], roots[h]));
        }
        roots
    };
}

/// The root of a subtree of the given height in which every leaf is empty.
///
/// # Panics
///
/// If `height` exceeds [`MAX_HEIGHT`].
pub fn empty_root(height: u16) -> Fr {
    EMPTY_ROOTS[height as usize]
}

/// An index outside of the `2^height` leaf slots of a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidIndex {
    /// The offending index.
    pub index: u64,
    /// The height of the tree it was used against.
    pub height: u16,
}

impl Display for InvalidIndex {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "index {} out of range for merkle tree of height {}",
            self.index, self.height
        )
    }
}

impl Error for InvalidIndex {}

/// The hash of a Merkle tree node.
#[derive(
    Copy, Clone, Hash, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MerkleTreeDigest(pub Fr);

impl Distribution<MerkleTreeDigest> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> MerkleTreeDigest {
        MerkleTreeDigest(rng.r#gen())
    }
}

impl From<Fr> for MerkleTreeDigest {
    fn from(field: Fr) -> MerkleTreeDigest {
        MerkleTreeDigest(field)
    }
}

impl From<MerkleTreeDigest> for Fr {
    fn from(digest: MerkleTreeDigest) -> Fr {
        digest.0
    }
}

impl Debug for MerkleTreeDigest {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl Display for MerkleTreeDigest {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// One entry in the Merkle path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerklePathEntry {
    /// The hash of the sibling element.
    pub sibling: MerkleTreeDigest,
    /// Whether the path went left at this branch, making the sibling the
    /// right-hand operand.
    pub goes_left: bool,
}

impl FieldRepr for MerklePathEntry {
    fn field_repr<W: crate::repr::MemWrite<Fr>>(&self, writer: &mut W) {
        writer.write(&[self.sibling.0, Fr::from(self.goes_left)]);
    }
    fn field_size(&self) -> usize {
        2
    }
}

/// A path in a Merkle tree, from the leaf up to the root.
///
/// Unlike a membership proof, a path does not carry its leaf: the same path
/// yields the root before an update via the old leaf, and the root after it
/// via the new one.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MerklePath {
    /// How to reach the tree root from the leaf.
    pub path: Vec<MerklePathEntry>,
}

impl MerklePath {
    /// The tree root implied by a leaf with the given hash.
    pub fn root_for_hash(&self, hash: Fr) -> MerkleTreeDigest {
        MerkleTreeDigest(self.path.iter().fold(hash, |acc, entry| {
            if entry.goes_left {
                node_hash(acc, entry.sibling.0)
            } else {
                node_hash(entry.sibling.0, acc)
            }
        }))
    }

    /// The tree root implied by a leaf holding `value`.
    pub fn root_for_leaf<T: FieldRepr + ?Sized>(&self, value: &T) -> MerkleTreeDigest {
        self.root_for_hash(leaf_hash(value))
    }

    /// The tree root implied by the leaf slot being empty.
    pub fn root_for_empty(&self) -> MerkleTreeDigest {
        self.root_for_hash(EMPTY_LEAF)
    }

    /// The height of the tree this path was taken from.
    pub fn height(&self) -> usize {
        self.path.len()
    }

    /// The leaf index addressed by this path's direction bits, or `None` if
    /// it does not fit into a `u64`.
    pub fn index(&self) -> Option<u64> {
        self.path
            .iter()
            .enumerate()
            .try_fold(0u64, |acc, (level, entry)| match (entry.goes_left, level) {
                (true, _) => Some(acc),
                (false, level) if level < 64 => Some(acc | (1u64 << level)),
                (false, _) => None,
            })
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
enum MerkleTreeNode {
    Leaf {
        hash: Fr,
    },
    /// A subtree with no occupied leaves.
    Stub {
        height: u16,
    },
    Node {
        hash: Option<Fr>,
        left: Arc<MerkleTreeNode>,
        right: Arc<MerkleTreeNode>,
        height: u16,
    },
}

use MerkleTreeNode::*;

// Whether the path to `index` branches right when descending into a child
// of the given height.
fn goes_right(index: u64, child_height: u16) -> bool {
    child_height < 64 && (index >> child_height) & 1 == 1
}

impl MerkleTreeNode {
    fn height(&self) -> u16 {
        match self {
            Leaf { .. } => 0,
            Stub { height } | Node { height, .. } => *height,
        }
    }

    fn root(&self) -> Option<Fr> {
        match self {
            Leaf { hash } => Some(*hash),
            Stub { height } => Some(empty_root(*height)),
            Node { hash, .. } => *hash,
        }
    }

    fn compute_root(&self) -> Fr {
        match self {
            Node {
                hash: None,
                left,
                right,
                ..
            } => node_hash(left.compute_root(), right.compute_root()),
            Leaf { hash } | Node { hash: Some(hash), .. } => *hash,
            Stub { height } => empty_root(*height),
        }
    }

    fn rehash(self: &Arc<Self>) -> Arc<Self> {
        match self.as_ref() {
            Node {
                hash: None,
                left,
                right,
                height,
            } => {
                let left = left.rehash();
                let right = right.rehash();
                let hash = node_hash(left.compute_root(), right.compute_root());
                Arc::new(Node {
                    hash: Some(hash),
                    left,
                    right,
                    height: *height,
                })
            }
            _ => self.clone(),
        }
    }

    fn leaf(&self, index: u64) -> Option<Fr> {
        match self {
            Leaf { hash } => Some(*hash),
            Stub { .. } => None,
            Node {
                left,
                right,
                height,
                ..
            } => {
                if goes_right(index, height - 1) {
                    right.leaf(index)
                } else {
                    left.leaf(index)
                }
            }
        }
    }

    fn update(self: &Arc<Self>, index: u64, new_leaf: Option<Fr>) -> Arc<Self> {
        let height = self.height();
        if height == 0 {
            return Arc::new(match new_leaf {
                Some(hash) => Leaf { hash },
                None => Stub { height: 0 },
            });
        }
        let (left, right) = match self.as_ref() {
            Stub { .. } if new_leaf.is_none() => return self.clone(),
            Stub { .. } => {
                let child = Arc::new(Stub { height: height - 1 });
                (child.clone(), child)
            }
            Node { left, right, .. } => (left.clone(), right.clone()),
            Leaf { .. } => unreachable!("leaves have height zero"),
        };
        let (left, right) = if goes_right(index, height - 1) {
            (left, right.update(index, new_leaf))
        } else {
            (left.update(index, new_leaf), right)
        };
        if matches!((left.as_ref(), right.as_ref()), (Stub { .. }, Stub { .. })) {
            return Arc::new(Stub { height });
        }
        Arc::new(Node {
            hash: None,
            left,
            right,
            height,
        })
    }

    fn collect_leaves(&self, offset: u64, out: &mut Vec<(u64, Fr)>) {
        match self {
            Leaf { hash } => out.push((offset, *hash)),
            Stub { .. } => {}
            Node {
                left,
                right,
                height,
                ..
            } => {
                left.collect_leaves(offset, out);
                // Right subtrees above bit 63 are never addressed.
                if let Some(shift) = 1u64.checked_shl(u32::from(height - 1)) {
                    right.collect_leaves(offset | shift, out);
                }
            }
        }
    }
}

/// A Merkle tree, represented sparsely.
///
/// Unless otherwise specified, operations are O(height). The tree is indexed
/// as if it were an array of length `2^height`; indices above `u64::MAX` are
/// not addressable, and remain empty.
///
/// Updates are lazy: after a batch of updates, [`MerkleTree::rehash`] must be
/// called before [`MerkleTree::root`] reports a root.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MerkleTree(Arc<MerkleTreeNode>);

impl Debug for MerkleTree {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_fmt(format_args!("MerkleTree(root = {:?}) ", self.root()))?;
        f.debug_map().entries(self.iter()).finish()
    }
}

/// An iterator over Merkle tree leaf indices and hashes.
pub struct MerkleTreeIter(std::vec::IntoIter<(u64, Fr)>);

impl Iterator for MerkleTreeIter {
    type Item = (u64, Fr);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}

impl MerkleTree {
    /// Create an empty Merkle tree with a given height. Must be O(1).
    ///
    /// # Panics
    ///
    /// If `height` exceeds [`MAX_HEIGHT`].
    pub fn blank(height: u16) -> Self {
        assert!(
            height <= MAX_HEIGHT,
            "merkle tree height {height} exceeds {MAX_HEIGHT}"
        );
        MerkleTree(Arc::new(Stub { height }))
    }

    /// Retrieves the height of this tree. Must be O(1).
    pub fn height(&self) -> u16 {
        self.0.height()
    }

    /// Retrieves the Merkle root of this tree. Must be O(1).
    ///
    /// This returns `Some` iff the underlying tree has been rehashed.
    pub fn root(&self) -> Option<MerkleTreeDigest> {
        self.0.root().map(MerkleTreeDigest)
    }

    /// Computes the Merkle root, whether or not the tree has been rehashed.
    pub fn compute_root(&self) -> MerkleTreeDigest {
        MerkleTreeDigest(self.0.compute_root())
    }

    /// Rehashes the Merkle tree, computing the new root and intermediate hashes.
    /// This is a separate operation as it amortizes costs across sequential
    /// insertions to `O(n + h)` instead of `O(nh)`.
    pub fn rehash(&self) -> Self {
        MerkleTree(self.0.rehash())
    }

    fn check_index(&self, index: u64) -> Result<(), InvalidIndex> {
        let height = self.height();
        if height < 64 && index >> height != 0 {
            Err(InvalidIndex { index, height })
        } else {
            Ok(())
        }
    }

    /// Inserts a hash value at a specific index, returning the resulting tree.
    pub fn update_hash(&self, index: u64, new_leaf: Fr) -> Result<Self, InvalidIndex> {
        self.check_index(index)?;
        Ok(MerkleTree(self.0.update(index, Some(new_leaf))))
    }

    /// Inserts a value into a specific index of the tree.
    pub fn update<T: FieldRepr + ?Sized>(&self, index: u64, value: &T) -> Result<Self, InvalidIndex> {
        self.update_hash(index, leaf_hash(value))
    }

    /// Empties the leaf slot at a specific index.
    pub fn remove(&self, index: u64) -> Result<Self, InvalidIndex> {
        self.check_index(index)?;
        Ok(MerkleTree(self.0.update(index, None)))
    }

    /// Retrieves the leaf hash value at a given index, or `None` if the slot
    /// is empty.
    pub fn leaf_hash(&self, index: u64) -> Result<Option<Fr>, InvalidIndex> {
        self.check_index(index)?;
        Ok(self.0.leaf(index))
    }

    /// Iterate over the occupied leaves and leaf indices of the tree, in
    /// index order.
    pub fn iter(&self) -> MerkleTreeIter {
        let mut leaves = Vec::new();
        self.0.collect_leaves(0, &mut leaves);
        MerkleTreeIter(leaves.into_iter())
    }

    /// Produces the [`MerklePath`] for a leaf slot, occupied or not.
    ///
    /// Intermediate hashes missing from a tree that was not rehashed are
    /// computed on the fly, at `O(n)` cost.
    pub fn path_for_index(&self, index: u64) -> Result<MerklePath, InvalidIndex> {
        self.check_index(index)?;
        let mut at = Some(self.0.as_ref());
        let mut path = Vec::with_capacity(self.height() as usize);
        for child_height in (0..self.height()).rev() {
            let goes_left = !goes_right(index, child_height);
            let sibling = match at {
                Some(Node { left, right, .. }) => {
                    let (next, sibling) = if goes_left { (left, right) } else { (right, left) };
                    at = Some(next.as_ref());
                    sibling.compute_root()
                }
                // Everything below a stub is empty.
                _ => {
                    at = None;
                    empty_root(child_height)
                }
            };
            path.push(MerklePathEntry {
                sibling: MerkleTreeDigest(sibling),
                goes_left,
            });
        }
        path.reverse();
        Ok(MerklePath { path })
    }
}

impl Distribution<MerkleTree> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> MerkleTree {
        let height: u16 = rng.gen_range(1..17);
        let mut mt = MerkleTree::blank(height);

        for _ in 0..height {
            let index = rng.gen_range(0..(1u64 << height));
            if let Ok(updated) = mt.update(index, &rng.r#gen::<Fr>()) {
                mt = updated;
            }
        }

        mt.rehash()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn sample_tree() -> MerkleTree {
        [(0, 42u64), (0, 41), (3, 43), (62, 12)]
            .into_iter()
            .fold(MerkleTree::blank(32), |t, (i, v)| {
                t.update(i, &Fr::from(v)).unwrap()
            })
            .rehash()
    }

    #[test]
    fn test_membership() {
        let tree = sample_tree();
        let root = tree.root().unwrap();
        assert_eq!(tree.path_for_index(0).unwrap().root_for_leaf(&Fr::from(41u64)), root);
        assert_eq!(tree.path_for_index(3).unwrap().root_for_leaf(&Fr::from(43u64)), root);
        assert_eq!(tree.path_for_index(62).unwrap().root_for_leaf(&Fr::from(12u64)), root);
        // The overwritten value is no longer a member.
        assert_ne!(tree.path_for_index(0).unwrap().root_for_leaf(&Fr::from(42u64)), root);
    }

    #[test]
    fn test_empty_slots_have_paths() {
        let tree = sample_tree();
        let root = tree.root().unwrap();
        for index in [1, 2, 63, 1 << 20, (1 << 32) - 1] {
            assert_eq!(tree.path_for_index(index).unwrap().root_for_empty(), root);
        }
    }

    #[test]
    fn test_blank_root_is_empty_root() {
        for height in [1, 8, 32, 64, 256] {
            assert_eq!(
                MerkleTree::blank(height).rehash().root(),
                Some(MerkleTreeDigest(empty_root(height)))
            );
        }
        assert_eq!(empty_root(0), EMPTY_LEAF);
        assert_eq!(empty_root(1), node_hash(EMPTY_LEAF, EMPTY_LEAF));
    }

    #[test]
    fn test_root_requires_rehash() {
        let tree = MerkleTree::blank(8).update(5, &Fr::from(1u64)).unwrap();
        assert_eq!(tree.root(), None);
        let rehashed = tree.rehash();
        assert_eq!(rehashed.root(), Some(tree.compute_root()));
        assert!(rehashed.root().is_some());
        // Paths from an un-rehashed tree agree with the rehashed one.
        assert_eq!(tree.path_for_index(5).unwrap(), rehashed.path_for_index(5).unwrap());
    }

    #[test]
    fn test_incremental_update_matches_rebuild() {
        let tree = sample_tree();
        let path = tree.path_for_index(3).unwrap();
        let rebuilt = tree.update(3, &Fr::from(99u64)).unwrap().rehash();
        assert_eq!(path.root_for_leaf(&Fr::from(99u64)), rebuilt.root().unwrap());
    }

    #[test]
    fn test_remove_restores_root() {
        let before = MerkleTree::blank(8).update(1, &Fr::from(7u64)).unwrap().rehash();
        let during = before.update(200, &Fr::from(8u64)).unwrap().rehash();
        let after = during.remove(200).unwrap().rehash();
        assert_eq!(after.root(), before.root());
        assert_eq!(after.leaf_hash(200).unwrap(), None);
        let emptied = after.remove(1).unwrap().rehash();
        assert_eq!(emptied.root(), Some(MerkleTreeDigest(empty_root(8))));
        assert_eq!(emptied.iter().count(), 0);
    }

    #[test]
    fn test_out_of_range() {
        let tree = MerkleTree::blank(8);
        assert_eq!(
            tree.update(256, &Fr::from(1u64)).unwrap_err(),
            InvalidIndex { index: 256, height: 8 }
        );
        assert!(tree.path_for_index(256).is_err());
        assert!(tree.leaf_hash(1000).is_err());
        assert!(tree.path_for_index(255).is_ok());
    }

    #[test]
    fn test_path_index_recovery() {
        let tree = sample_tree();
        for index in [0u64, 3, 62, 12345] {
            let path = tree.path_for_index(index).unwrap();
            assert_eq!(path.height(), 32);
            assert_eq!(path.index(), Some(index));
        }
        let mut path = tree.path_for_index(0).unwrap();
        path.path.resize(
            70,
            MerklePathEntry {
                sibling: MerkleTreeDigest::default(),
                goes_left: false,
            },
        );
        assert_eq!(path.index(), None);
    }

    #[test]
    fn test_tall_trees() {
        let tree = MerkleTree::blank(MAX_HEIGHT)
            .update(u64::MAX, &Fr::from(1u64))
            .unwrap()
            .update(0, &Fr::from(2u64))
            .unwrap()
            .rehash();
        let path = tree.path_for_index(u64::MAX).unwrap();
        assert_eq!(path.root_for_leaf(&Fr::from(1u64)), tree.root().unwrap());
        assert_eq!(path.index(), Some(u64::MAX));
        assert_eq!(
            tree.iter().map(|(i, _)| i).collect::<Vec<_>>(),
            vec![0, u64::MAX]
        );
    }

    #[test]
    fn test_tiny_trees() {
        let t = MerkleTree::blank(1)
            .update(0, &Fr::from(42u64))
            .unwrap()
            .update(1, &Fr::from(42u64))
            .unwrap()
            .rehash();
        let path = t.path_for_index(1).unwrap();
        assert_eq!(path.height(), 1);
        assert!(!path.path[0].goes_left);
        assert_eq!(path.root_for_leaf(&Fr::from(42u64)), t.root().unwrap());
    }

    #[test]
    fn test_swapped_direction_changes_root() {
        let tree = sample_tree();
        let mut path = tree.path_for_index(3).unwrap();
        path.path[0].goes_left = !path.path[0].goes_left;
        assert_ne!(path.root_for_leaf(&Fr::from(43u64)), tree.root().unwrap());
    }

    #[test]
    fn test_path_json() {
        let tree = MerkleTree::blank(2).update(2, &Fr::from(5u64)).unwrap().rehash();
        let json = serde_json::to_value(tree.path_for_index(2).unwrap()).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 2);
        assert_eq!(json[0]["goesLeft"], serde_json::Value::Bool(true));
        assert_eq!(json[1]["goesLeft"], serde_json::Value::Bool(false));
        assert!(json[0]["sibling"].is_string());
    }

    #[test]
    fn test_random_trees_are_consistent() {
        let mut rng = StdRng::seed_from_u64(0x1234);
        for _ in 0..8 {
            let tree: MerkleTree = rng.r#gen();
            let root = tree.root().unwrap();
            for (index, hash) in tree.iter() {
                assert_eq!(tree.path_for_index(index).unwrap().root_for_hash(hash), root);
            }
        }
    }
}
