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

//! An eligibility board: an identity tree and a message tree, signed by
//! independent servers, whose slots correspond positionally. Slot `n` of the
//! message tree holds the message of the identity in slot `n` of the
//! identity tree.

use crate::coordination::{CommittedStore, StoreRegistry};
use crate::error::{CoordinationError, VerificationError};
use crate::policy::{FlagSetPolicy, MessagePolicy, StorePolicy};
use crate::verify::{LeafUpdate, RootTransition};
use crate::view::{OffChainView, lookup_index, view_root};
use offchain_crypto::curve::Fr;
use offchain_crypto::merkle_tree::MerklePath;
use offchain_crypto::schnorr::VerifyingKey;

/// The two trees of an [`EligibilityBoard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BoardTree {
    /// The registered identities.
    Eligibility,
    /// One message per registered identity, in the identity's slot.
    Message,
}

/// A new identity, together with the initial message in its slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Writes the identity into an empty slot.
    pub eligibility: RootTransition,
    /// Writes the initial message into the same slot.
    pub message: RootTransition,
}

/// Committed state of an identity tree and a message tree, with the policy
/// messages are checked against.
#[derive(Debug, Clone)]
pub struct EligibilityBoard<P = FlagSetPolicy> {
    registry: StoreRegistry<BoardTree>,
    message_policy: P,
}

fn single_update(transition: &RootTransition) -> Result<&LeafUpdate, CoordinationError> {
    match transition.updates.as_slice() {
        [update] => Ok(update),
        updates => Err(CoordinationError::UnexpectedUpdateCount {
            expected: 1,
            actual: updates.len(),
        }),
    }
}

impl<P: MessagePolicy> EligibilityBoard<P> {
    /// Both trees start out empty, with a count of zero.
    pub fn new(
        eligibility_signer: VerifyingKey,
        message_signer: VerifyingKey,
        policy: StorePolicy,
        message_policy: P,
    ) -> Self {
        let mut registry = StoreRegistry::new();
        registry.insert_store(
            BoardTree::Eligibility,
            CommittedStore::genesis(eligibility_signer, policy),
        );
        registry.insert_store(
            BoardTree::Message,
            CommittedStore::genesis(message_signer, policy),
        );
        EligibilityBoard {
            registry,
            message_policy,
        }
    }

    /// The committed state of one of the trees.
    pub fn committed(&self, tree: BoardTree) -> Option<&CommittedStore> {
        self.registry.committed(&tree)
    }

    fn eligibility(&self) -> Result<&CommittedStore, CoordinationError> {
        self.registry
            .committed(&BoardTree::Eligibility)
            .ok_or_else(|| CoordinationError::UnknownStore(format!("{:?}", BoardTree::Eligibility)))
    }

    /// Applies a registration to both trees in one atomic step, returning the
    /// slot it occupies. Both transitions must update that same slot, and
    /// nothing else. The identity must land in an empty slot, and neither
    /// tree may be left empty there.
    pub fn register(&mut self, registration: &Registration) -> Result<u64, CoordinationError> {
        let identity = single_update(&registration.eligibility)?;
        let message = single_update(&registration.message)?;
        let index = identity
            .index()
            .ok_or(VerificationError::UnaddressableIndex { position: 0 })?;
        if !identity.leaf_is_empty() {
            return Err(CoordinationError::SlotOccupied(index));
        }
        if identity.new_leaf_is_empty() || message.new_leaf_is_empty() {
            return Err(CoordinationError::EmptyRegistration);
        }
        let message_index = message.index();
        if message_index != Some(index) {
            return Err(CoordinationError::IndexMismatch {
                expected: index,
                actual: message_index,
            });
        }
        self.registry.apply_all(&[
            (BoardTree::Eligibility, registration.eligibility.clone()),
            (BoardTree::Message, registration.message.clone()),
        ])?;
        Ok(index)
    }

    /// Posts a message for `identity`, returning the slot it was written to.
    ///
    /// `eligibility_view` must hash to the committed eligibility root, and
    /// locates the identity's slot. `transition` must update exactly that
    /// slot of the message tree, to a message the policy accepts.
    pub fn post_message(
        &mut self,
        identity: &[Fr],
        eligibility_view: &OffChainView,
        transition: &RootTransition,
    ) -> Result<u64, CoordinationError> {
        let expected = self.eligibility()?.root();
        let computed = view_root(eligibility_view);
        if computed != expected {
            return Err(CoordinationError::IntegrityMismatch { expected, computed });
        }
        let index = lookup_index(eligibility_view, identity).ok_or(CoordinationError::NotFound)?;
        let update = single_update(transition)?;
        if update.index() != Some(index) {
            return Err(CoordinationError::IndexMismatch {
                expected: index,
                actual: update.index(),
            });
        }
        match &update.new_leaf {
            Some(message) if self.message_policy.validate(message) => {}
            _ => return Err(CoordinationError::InvalidMessage),
        }
        self.registry.apply(&BoardTree::Message, transition)?;
        Ok(index)
    }

    /// Checks that `identity` is a member of the committed eligibility tree.
    pub fn check_commitment(
        &self,
        identity: &[Fr],
        witness: &MerklePath,
    ) -> Result<(), CoordinationError> {
        let store = self.eligibility()?;
        if witness.height() == store.policy().height() as usize
            && witness.root_for_leaf(identity) == store.root()
        {
            Ok(())
        } else {
            Err(CoordinationError::NotEligible)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::AcceptAll;
    use crate::verify::attestation_message;
    use crate::view::build_witness;
    use offchain_crypto::schnorr::SigningKey;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    struct Signer {
        sk: SigningKey,
        view: OffChainView,
        count: u64,
    }

    impl Signer {
        fn new(rng: &mut StdRng) -> Self {
            Signer {
                sk: SigningKey::sample(rng),
                view: OffChainView::new(8),
                count: 0,
            }
        }

        fn write(&mut self, rng: &mut StdRng, index: u64, value: u64) -> RootTransition {
            let update = self.view.stage(index, Some(vec![Fr::from(value)])).unwrap();
            if update.leaf_is_empty() {
                self.count += 1;
            }
            RootTransition {
                updates: vec![update],
                claimed_count: self.count,
                signature: self
                    .sk
                    .sign(rng, &attestation_message(self.count, view_root(&self.view))),
            }
        }
    }

    fn setup<P: MessagePolicy>(
        seed: u64,
        policy: P,
    ) -> (StdRng, Signer, Signer, EligibilityBoard<P>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let ids = Signer::new(&mut rng);
        let msgs = Signer::new(&mut rng);
        let board = EligibilityBoard::new(
            ids.sk.verifying_key(),
            msgs.sk.verifying_key(),
            StorePolicy::default(),
            policy,
        );
        (rng, ids, msgs, board)
    }

    #[test]
    fn test_register_and_post() {
        let (mut rng, mut ids, mut msgs, mut board) = setup(0x20, FlagSetPolicy);
        let registration = Registration {
            eligibility: ids.write(&mut rng, 0, 0xa11ce),
            message: msgs.write(&mut rng, 0, 0),
        };
        assert_eq!(board.register(&registration), Ok(0));
        let identity = [Fr::from(0xa11ceu64)];
        let witness = build_witness(&ids.view, 0).unwrap();
        assert_eq!(board.check_commitment(&identity, &witness), Ok(()));
        assert_eq!(
            board.check_commitment(&[Fr::from(0xb0bu64)], &witness),
            Err(CoordinationError::NotEligible)
        );

        let post = msgs.write(&mut rng, 0, 100000000001);
        assert_eq!(board.post_message(&identity, &ids.view, &post), Ok(0));
        let message = board.committed(BoardTree::Message).unwrap();
        assert_eq!((message.root(), message.count()), (view_root(&msgs.view), 1));
    }

    #[test]
    fn test_register_requires_matching_slots() {
        let (mut rng, mut ids, mut msgs, mut board) = setup(0x21, AcceptAll);
        let registration = Registration {
            eligibility: ids.write(&mut rng, 0, 1),
            message: msgs.write(&mut rng, 1, 0),
        };
        assert_eq!(
            board.register(&registration),
            Err(CoordinationError::IndexMismatch {
                expected: 0,
                actual: Some(1)
            })
        );
        for tree in [BoardTree::Eligibility, BoardTree::Message] {
            assert_eq!(board.committed(tree).unwrap().count(), 0);
        }
    }

    #[test]
    fn test_register_rejects_occupied_slot() {
        let (mut rng, mut ids, mut msgs, mut board) = setup(0x24, AcceptAll);
        board
            .register(&Registration {
                eligibility: ids.write(&mut rng, 0, 0xa11ce),
                message: msgs.write(&mut rng, 0, 0),
            })
            .unwrap();
        let before = *board.committed(BoardTree::Eligibility).unwrap();

        let overwrite = Registration {
            eligibility: ids.write(&mut rng, 0, 0xbad),
            message: msgs.write(&mut rng, 0, 0),
        };
        assert_eq!(
            board.register(&overwrite),
            Err(CoordinationError::SlotOccupied(0))
        );
        assert_eq!(board.committed(BoardTree::Eligibility), Some(&before));
    }

    #[test]
    fn test_register_rejects_empty_leaves() {
        let (mut rng, mut ids, mut msgs, mut board) = setup(0x25, AcceptAll);
        let deletion = |signer: &mut Signer, rng: &mut StdRng| {
            let update = signer.view.stage(0, None).unwrap();
            RootTransition {
                updates: vec![update],
                claimed_count: signer.count,
                signature: signer
                    .sk
                    .sign(rng, &attestation_message(signer.count, view_root(&signer.view))),
            }
        };
        let registration = Registration {
            eligibility: deletion(&mut ids, &mut rng),
            message: deletion(&mut msgs, &mut rng),
        };
        assert_eq!(
            board.register(&registration),
            Err(CoordinationError::EmptyRegistration)
        );

        let registration = Registration {
            eligibility: ids.write(&mut rng, 0, 0xa11ce),
            message: deletion(&mut msgs, &mut rng),
        };
        assert_eq!(
            board.register(&registration),
            Err(CoordinationError::EmptyRegistration)
        );
        for tree in [BoardTree::Eligibility, BoardTree::Message] {
            assert_eq!(board.committed(tree).unwrap().count(), 0);
        }
    }

    #[test]
    fn test_register_is_atomic() {
        let (mut rng, mut ids, mut msgs, mut board) = setup(0x22, AcceptAll);
        let eligibility = ids.write(&mut rng, 0, 1);
        let mut message = msgs.write(&mut rng, 0, 0);
        message.claimed_count = 5;
        let before = *board.committed(BoardTree::Eligibility).unwrap();
        assert!(matches!(
            board.register(&Registration {
                eligibility,
                message
            }),
            Err(CoordinationError::Verification(
                VerificationError::CountMismatch { .. }
            ))
        ));
        assert_eq!(board.committed(BoardTree::Eligibility), Some(&before));
    }

    #[test]
    fn test_post_rejections() {
        let (mut rng, mut ids, mut msgs, mut board) = setup(0x23, FlagSetPolicy);
        board
            .register(&Registration {
                eligibility: ids.write(&mut rng, 0, 7),
                message: msgs.write(&mut rng, 0, 0),
            })
            .unwrap();
        let message_root = board.committed(BoardTree::Message).unwrap().root();

        // Unregistered identity.
        let mut staged = msgs.view.clone();
        let update = staged.stage(0, Some(vec![Fr::from(1u64)])).unwrap();
        let post = RootTransition {
            updates: vec![update],
            claimed_count: 1,
            signature: msgs
                .sk
                .sign(&mut rng, &attestation_message(1, view_root(&staged))),
        };
        assert_eq!(
            board.post_message(&[Fr::from(8u64)], &ids.view, &post),
            Err(CoordinationError::NotFound)
        );

        // A stale eligibility view.
        assert!(matches!(
            board.post_message(&[Fr::from(7u64)], &OffChainView::new(8), &post),
            Err(CoordinationError::IntegrityMismatch { .. })
        ));

        // A message the policy rejects.
        let mut staged = msgs.view.clone();
        let update = staged.stage(0, Some(vec![Fr::from(0u64)])).unwrap();
        let invalid = RootTransition {
            updates: vec![update],
            claimed_count: 1,
            signature: msgs
                .sk
                .sign(&mut rng, &attestation_message(1, view_root(&staged))),
        };
        assert_eq!(
            board.post_message(&[Fr::from(7u64)], &ids.view, &invalid),
            Err(CoordinationError::InvalidMessage)
        );

        // A message for somebody else's slot.
        let misplaced = msgs.write(&mut rng, 3, 1);
        assert_eq!(
            board.post_message(&[Fr::from(7u64)], &ids.view, &misplaced),
            Err(CoordinationError::IndexMismatch {
                expected: 0,
                actual: Some(3)
            })
        );

        assert_eq!(board.committed(BoardTree::Message).unwrap().root(), message_root);
        assert_eq!(board.post_message(&[Fr::from(7u64)], &ids.view, &post), Ok(0));
    }
}
