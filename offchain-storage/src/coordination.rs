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

//! Committed state for any number of independently signed stores, keyed by
//! logical role, and atomic application of verified transitions to them.

use crate::error::{CoordinationError, VerificationError};
use crate::policy::StorePolicy;
use crate::verify::{RootTransition, VerifiedTransition};
use offchain_crypto::merkle_tree::{MerkleTreeDigest, empty_root};
use offchain_crypto::schnorr::VerifyingKey;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// The trusted state of one store: its signer, and the root and count of
/// the last verified transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommittedStore {
    signer: VerifyingKey,
    root: MerkleTreeDigest,
    count: u64,
    policy: StorePolicy,
}

impl CommittedStore {
    /// A store with an empty tree of the policy's height.
    pub fn genesis(signer: VerifyingKey, policy: StorePolicy) -> Self {
        CommittedStore {
            signer,
            root: MerkleTreeDigest(empty_root(policy.height())),
            count: 0,
            policy,
        }
    }

    /// The key attestations for this store must be signed with.
    pub fn signer(&self) -> &VerifyingKey {
        &self.signer
    }

    /// The last verified root.
    pub fn root(&self) -> MerkleTreeDigest {
        self.root
    }

    /// The last verified count of occupied slots.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// The height and capacity transitions are checked against.
    pub fn policy(&self) -> &StorePolicy {
        &self.policy
    }

    /// Verifies `transition` against the committed root and count, without
    /// committing it.
    pub fn check(&self, transition: &RootTransition) -> Result<VerifiedTransition, VerificationError> {
        transition.verify(&self.signer, &self.policy, self.count, self.root)
    }

    fn commit(&mut self, verified: VerifiedTransition) {
        self.root = verified.root;
        self.count = verified.count;
    }
}

/// A set of committed stores, each addressed by a role.
#[derive(Debug, Clone)]
pub struct StoreRegistry<R> {
    stores: BTreeMap<R, CommittedStore>,
}

impl<R> Default for StoreRegistry<R> {
    fn default() -> Self {
        StoreRegistry {
            stores: BTreeMap::new(),
        }
    }
}

impl<R: Ord + Clone + Debug> StoreRegistry<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a store under `role`, returning any store it replaces.
    pub fn insert_store(&mut self, role: R, store: CommittedStore) -> Option<CommittedStore> {
        self.stores.insert(role, store)
    }

    pub fn committed(&self, role: &R) -> Option<&CommittedStore> {
        self.stores.get(role)
    }

    fn store(&self, role: &R) -> Result<&CommittedStore, CoordinationError> {
        self.stores
            .get(role)
            .ok_or_else(|| CoordinationError::UnknownStore(format!("{role:?}")))
    }

    /// Verifies `transition` against the store under `role` and, on success,
    /// commits its root and count.
    pub fn apply(
        &mut self,
        role: &R,
        transition: &RootTransition,
    ) -> Result<VerifiedTransition, CoordinationError> {
        let store = self
            .stores
            .get_mut(role)
            .ok_or_else(|| CoordinationError::UnknownStore(format!("{role:?}")))?;
        let verified = store.check(transition).inspect_err(|err| {
            warn!(?role, %err, "rejected root transition");
        })?;
        store.commit(verified);
        info!(?role, root = %verified.root, count = verified.count, "committed root transition");
        Ok(verified)
    }

    /// Verifies every transition before committing any of them.
    ///
    /// Transitions are applied in order; a role appearing more than once is
    /// verified against the state its earlier transitions leave behind.
    pub fn apply_all(
        &mut self,
        transitions: &[(R, RootTransition)],
    ) -> Result<Vec<VerifiedTransition>, CoordinationError> {
        let mut staged: BTreeMap<R, CommittedStore> = BTreeMap::new();
        let mut results = Vec::with_capacity(transitions.len());
        for (role, transition) in transitions {
            let store = match staged.get(role) {
                Some(store) => *store,
                None => *self.store(role)?,
            };
            let verified = store.check(transition).inspect_err(|err| {
                warn!(?role, %err, "rejected root transition");
            })?;
            let mut updated = store;
            updated.commit(verified);
            staged.insert(role.clone(), updated);
            results.push(verified);
        }
        for (role, store) in staged {
            info!(?role, root = %store.root, count = store.count, "committed root transition");
            self.stores.insert(role, store);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::attestation_message;
    use crate::view::{OffChainView, view_root};
    use offchain_crypto::curve::Fr;
    use offchain_crypto::schnorr::SigningKey;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    enum Role {
        Left,
        Right,
    }

    fn transition(
        rng: &mut StdRng,
        sk: &SigningKey,
        view: &mut OffChainView,
        count: u64,
        index: u64,
        value: u64,
    ) -> RootTransition {
        let update = view.stage(index, Some(vec![Fr::from(value)])).unwrap();
        let signature = sk.sign(rng, &attestation_message(count, view_root(view)));
        RootTransition {
            updates: vec![update],
            claimed_count: count,
            signature,
        }
    }

    #[test]
    fn test_apply_commits_and_chains() {
        let mut rng = StdRng::seed_from_u64(0x10);
        let sk = SigningKey::sample(&mut rng);
        let mut registry = StoreRegistry::new();
        registry.insert_store(Role::Left, CommittedStore::genesis(sk.verifying_key(), StorePolicy::default()));
        let mut view = OffChainView::new(8);

        let first = transition(&mut rng, &sk, &mut view, 1, 0, 1);
        registry.apply(&Role::Left, &first).unwrap();
        assert_eq!(registry.committed(&Role::Left).unwrap().root(), view_root(&view));

        // A transition can only be applied once: its witness is tied to the
        // root it was produced against.
        assert!(matches!(
            registry.apply(&Role::Left, &first),
            Err(CoordinationError::Verification(VerificationError::WitnessRootMismatch { .. }))
        ));

        let second = transition(&mut rng, &sk, &mut view, 2, 1, 2);
        assert_eq!(
            registry.apply(&Role::Left, &second).unwrap(),
            VerifiedTransition {
                root: view_root(&view),
                count: 2
            }
        );
        assert!(matches!(
            registry.apply(&Role::Right, &second),
            Err(CoordinationError::UnknownStore(_))
        ));
    }

    #[test]
    fn test_apply_all_is_atomic() {
        let mut rng = StdRng::seed_from_u64(0x11);
        let left_sk = SigningKey::sample(&mut rng);
        let right_sk = SigningKey::sample(&mut rng);
        let mut registry = StoreRegistry::new();
        registry.insert_store(Role::Left, CommittedStore::genesis(left_sk.verifying_key(), StorePolicy::default()));
        registry.insert_store(Role::Right, CommittedStore::genesis(right_sk.verifying_key(), StorePolicy::default()));
        let before = registry.clone();

        let mut left = OffChainView::new(8);
        let mut right = OffChainView::new(8);
        let good = transition(&mut rng, &left_sk, &mut left, 1, 3, 7);
        // Signed by the wrong key.
        let bad = transition(&mut rng, &left_sk, &mut right, 1, 3, 8);
        assert_eq!(
            registry.apply_all(&[(Role::Left, good.clone()), (Role::Right, bad)]),
            Err(CoordinationError::Verification(VerificationError::SignatureInvalid))
        );
        assert_eq!(registry.committed(&Role::Left), before.committed(&Role::Left));
        assert_eq!(registry.committed(&Role::Left).unwrap().count(), 0);

        let mut right = OffChainView::new(8);
        let fixed = transition(&mut rng, &right_sk, &mut right, 1, 3, 8);
        let results = registry
            .apply_all(&[(Role::Left, good), (Role::Right, fixed)])
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(registry.committed(&Role::Right).unwrap().root(), view_root(&right));
    }

    #[test]
    fn test_apply_all_chains_within_role() {
        let mut rng = StdRng::seed_from_u64(0x12);
        let sk = SigningKey::sample(&mut rng);
        let mut registry = StoreRegistry::new();
        registry.insert_store(Role::Left, CommittedStore::genesis(sk.verifying_key(), StorePolicy::default()));
        let mut view = OffChainView::new(8);
        let first = transition(&mut rng, &sk, &mut view, 1, 0, 1);
        let second = transition(&mut rng, &sk, &mut view, 1, 0, 2);
        registry
            .apply_all(&[(Role::Left, first), (Role::Left, second)])
            .unwrap();
        let committed = registry.committed(&Role::Left).unwrap();
        assert_eq!((committed.root(), committed.count()), (view_root(&view), 1));
    }
}
