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

//! Verification of signed root transitions.
//!
//! A transition carries one [`LeafUpdate`] per changed slot, each with a
//! witness taken against the tree as left by the updates before it. The
//! verifier replays the updates from the previous root using only those
//! witnesses, and accepts the resulting root and count iff the store's signer
//! attested to exactly that pair.

use crate::error::VerificationError;
use crate::policy::StorePolicy;
use crate::view::LeafValue;
use offchain_crypto::curve::Fr;
use offchain_crypto::merkle_tree::{MerklePath, MerkleTreeDigest};
use offchain_crypto::schnorr::{Signature, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One leaf mutation within a root transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeafUpdate {
    /// The value held before the update, `None` if the slot was empty.
    pub leaf: Option<LeafValue>,
    /// The value held after the update, `None` if the slot is emptied.
    pub new_leaf: Option<LeafValue>,
    /// The slot's path, taken before this update is applied.
    pub witness: MerklePath,
}

impl LeafUpdate {
    /// Whether the slot was empty before the update.
    pub fn leaf_is_empty(&self) -> bool {
        self.leaf.is_none()
    }

    /// Whether the update empties the slot.
    pub fn new_leaf_is_empty(&self) -> bool {
        self.new_leaf.is_none()
    }

    /// The slot addressed by the witness.
    pub fn index(&self) -> Option<u64> {
        self.witness.index()
    }

    fn implied_root(&self, value: &Option<LeafValue>) -> MerkleTreeDigest {
        match value {
            Some(value) => self.witness.root_for_leaf(value),
            None => self.witness.root_for_empty(),
        }
    }
}

/// An attested transition, as submitted for verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootTransition {
    /// The updates, in application order.
    pub updates: Vec<LeafUpdate>,
    /// The entry count the signer claims results from the updates.
    pub claimed_count: u64,
    /// The signer's attestation over the claimed count and resulting root.
    pub signature: Signature,
}

/// The root and count established by a successful verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VerifiedTransition {
    /// The root after every update.
    pub root: MerkleTreeDigest,
    /// The number of occupied slots, as attested.
    pub count: u64,
}

/// The message an attestation signs: the entry count, then the root.
pub fn attestation_message(count: u64, root: MerkleTreeDigest) -> [Fr; 2] {
    [Fr::from(count), root.0]
}

/// Verifies a root transition of the store committed to `previous_root`
/// with `previous_count` occupied slots.
///
/// Checks, in order: each update's witness shape and index, and that its old
/// leaf reproduces the running root; the claimed count against the number of
/// newly occupied slots; the policy's capacity; and finally the signature
/// over the claimed count and the recomputed root. Nothing is returned for
/// partial success.
pub fn verify_root_transition(
    signer: &VerifyingKey,
    policy: &StorePolicy,
    previous_count: u64,
    previous_root: MerkleTreeDigest,
    updates: &[LeafUpdate],
    claimed_count: u64,
    signature: &Signature,
) -> Result<VerifiedTransition, VerificationError> {
    let height = policy.height() as usize;
    let mut running_root = previous_root;
    let mut newly_occupied = 0u64;
    let mut seen = BTreeSet::new();

    for (position, update) in updates.iter().enumerate() {
        if update.witness.height() != height {
            return Err(VerificationError::MalformedWitness {
                position,
                expected: height,
                actual: update.witness.height(),
            });
        }
        let index = update
            .index()
            .ok_or(VerificationError::UnaddressableIndex { position })?;
        if !seen.insert(index) {
            return Err(VerificationError::DuplicateIndex(index));
        }
        let computed = update.implied_root(&update.leaf);
        if computed != running_root {
            warn!(position, index, expected = %running_root, %computed, "witness does not reproduce the running root");
            return Err(VerificationError::WitnessRootMismatch {
                position,
                expected: running_root,
                computed,
            });
        }
        running_root = update.implied_root(&update.new_leaf);
        if update.leaf_is_empty() && !update.new_leaf_is_empty() {
            newly_occupied += 1;
        }
        debug!(position, index, root = %running_root, "applied leaf update");
    }

    let capacity = policy.capacity();
    let computed_count =
        previous_count
            .checked_add(newly_occupied)
            .ok_or(VerificationError::CapacityExceeded {
                count: u64::MAX,
                capacity,
            })?;
    if claimed_count != computed_count {
        return Err(VerificationError::CountMismatch {
            claimed: claimed_count,
            computed: computed_count,
        });
    }
    if computed_count > capacity {
        return Err(VerificationError::CapacityExceeded {
            count: computed_count,
            capacity,
        });
    }
    if !signer.verify(&attestation_message(claimed_count, running_root), signature) {
        warn!(count = claimed_count, root = %running_root, "attestation signature rejected");
        return Err(VerificationError::SignatureInvalid);
    }
    Ok(VerifiedTransition {
        root: running_root,
        count: claimed_count,
    })
}

impl RootTransition {
    /// Verifies this transition; see [`verify_root_transition`].
    pub fn verify(
        &self,
        signer: &VerifyingKey,
        policy: &StorePolicy,
        previous_count: u64,
        previous_root: MerkleTreeDigest,
    ) -> Result<VerifiedTransition, VerificationError> {
        verify_root_transition(
            signer,
            policy,
            previous_count,
            previous_root,
            &self.updates,
            self.claimed_count,
            &self.signature,
        )
    }
}
