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

//! Locally reconstructed views of off-chain datasets, and the pure functions
//! relating them to Merkle trees.

use crate::error::StorageError;
use crate::verify::LeafUpdate;
use crate::wire::SnapshotItem;
use offchain_crypto::curve::Fr;
use offchain_crypto::merkle_tree::{
    InvalidIndex, MAX_HEIGHT, MerklePath, MerkleTree, MerkleTreeDigest,
};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// The value stored in one occupied leaf slot.
pub type LeafValue = Vec<Fr>;

/// An index-to-value mapping for one off-chain dataset.
///
/// Every index is below `2^height`, and every value has the same number of
/// elements. The view holds no tree state: its root is always re-derived
/// through [`map_to_tree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffChainView {
    height: u16,
    entries: BTreeMap<u64, LeafValue>,
}

impl OffChainView {
    /// An empty view over a tree of the given height.
    ///
    /// # Panics
    ///
    /// If `height` is zero or exceeds [`MAX_HEIGHT`]. Use [`check_height`]
    /// first for untrusted heights.
    pub fn new(height: u16) -> Self {
        assert!(
            (1..=MAX_HEIGHT).contains(&height),
            "view height must be between 1 and {MAX_HEIGHT}"
        );
        OffChainView {
            height,
            entries: BTreeMap::new(),
        }
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// The number of occupied slots.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, index: u64) -> Option<&LeafValue> {
        self.entries.get(&index)
    }

    pub fn is_occupied(&self, index: u64) -> bool {
        self.entries.contains_key(&index)
    }

    /// The occupied slots, in index order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &LeafValue)> {
        self.entries.iter().map(|(index, value)| (*index, value))
    }

    // The arity pinned by the entries other than `index`.
    fn arity_excluding(&self, index: u64) -> Option<usize> {
        self.entries
            .iter()
            .find(|(other, _)| **other != index)
            .map(|(_, value)| value.len())
    }

    fn check_arity(&self, index: u64, value: &[Fr]) -> Result<(), StorageError> {
        match self.arity_excluding(index) {
            Some(expected) if expected != value.len() => Err(StorageError::ArityMismatch {
                index,
                expected,
                actual: value.len(),
            }),
            _ => Ok(()),
        }
    }

    fn check_index(&self, index: u64) -> Result<(), InvalidIndex> {
        if self.height < 64 && index >> self.height != 0 {
            Err(InvalidIndex {
                index,
                height: self.height,
            })
        } else {
            Ok(())
        }
    }

    /// Stores `value` at `index`, returning the value it replaces.
    ///
    /// This is a local mutation only; it is authenticated once the resulting
    /// root has been attested to and verified.
    pub fn set(
        &mut self,
        index: u64,
        value: LeafValue,
    ) -> Result<Option<LeafValue>, StorageError> {
        self.check_index(index)?;
        self.check_arity(index, &value)?;
        Ok(self.entries.insert(index, value))
    }

    /// Empties the slot at `index`, returning the value it held.
    pub fn remove(&mut self, index: u64) -> Option<LeafValue> {
        self.entries.remove(&index)
    }

    /// Replaces the slot at `index` with `new_leaf` (emptying it on `None`),
    /// returning the [`LeafUpdate`] that proves the change against the
    /// view's current root.
    pub fn stage(
        &mut self,
        index: u64,
        new_leaf: Option<LeafValue>,
    ) -> Result<LeafUpdate, StorageError> {
        let witness = build_witness(self, index)?;
        let leaf = match &new_leaf {
            Some(value) => self.set(index, value.clone())?,
            None => self.remove(index),
        };
        Ok(LeafUpdate {
            leaf,
            new_leaf,
            witness,
        })
    }

    /// The snapshot items describing this view, in index order.
    pub fn to_items(&self) -> Vec<SnapshotItem> {
        self.iter()
            .map(|(index, value)| SnapshotItem {
                index,
                value: value.clone(),
            })
            .collect()
    }
}

/// Rejects tree heights a view cannot be built for.
pub fn check_height(height: u16) -> Result<(), StorageError> {
    if height == 0 || height > MAX_HEIGHT {
        return Err(StorageError::InvalidSnapshot(format!(
            "unsupported tree height {height}"
        )));
    }
    Ok(())
}

/// Builds a view from the entries of a server snapshot.
///
/// Rejects indices outside of the tree, repeated indices, and values whose
/// length differs from that of the first entry.
pub fn view_from_snapshot<I>(height: u16, entries: I) -> Result<OffChainView, StorageError>
where
    I: IntoIterator<Item = (u64, LeafValue)>,
{
    check_height(height)?;
    let mut view = OffChainView::new(height);
    for (index, value) in entries {
        view.check_index(index)?;
        view.check_arity(index, &value)?;
        match view.entries.entry(index) {
            Entry::Occupied(_) => {
                return Err(StorageError::InvalidSnapshot(format!(
                    "index {index} appears more than once"
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
        }
    }
    Ok(view)
}

/// Rebuilds the full tree for a view: occupied slots hold the hash of their
/// value, all other slots the empty leaf. The result is rehashed.
pub fn map_to_tree(view: &OffChainView) -> MerkleTree {
    view.iter()
        // Indices are range checked on insertion into the view.
        .fold(MerkleTree::blank(view.height()), |tree, (index, value)| {
            tree.update(index, value).unwrap_or(tree)
        })
        .rehash()
}

/// The root committing to a view.
pub fn view_root(view: &OffChainView) -> MerkleTreeDigest {
    map_to_tree(view).compute_root()
}

/// The witness for the slot at `index`, occupied or not, under the view's
/// current root.
pub fn build_witness(view: &OffChainView, index: u64) -> Result<MerklePath, InvalidIndex> {
    view.check_index(index)?;
    map_to_tree(view).path_for_index(index)
}

/// The lowest index holding exactly `target`.
pub fn lookup_index(view: &OffChainView, target: &[Fr]) -> Option<u64> {
    view.iter()
        .find(|(_, value)| value.as_slice() == target)
        .map(|(index, _)| index)
}
