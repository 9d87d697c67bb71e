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

//! A client that treats an off-chain storage server as adversarial: every
//! snapshot, root, and index it serves is checked against locally derived
//! values before use.

use crate::error::StorageError;
use crate::server::StorageServer;
use crate::verify::{LeafUpdate, RootTransition};
use crate::view::{OffChainView, check_height, lookup_index, view_from_snapshot, view_root};
use offchain_crypto::curve::Fr;
use offchain_crypto::merkle_tree::MerkleTreeDigest;
use offchain_crypto::schnorr::{Signature, VerifyingKey};

/// A server's signed claim about the dataset it now holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootAttestation {
    /// The number of occupied slots after the store.
    pub count: u64,
    /// The root of the stored dataset.
    pub root: MerkleTreeDigest,
    /// The server's signature over `count` and `root`.
    pub signature: Signature,
}

impl RootAttestation {
    /// The transition this attestation proves, given the updates that led
    /// to it.
    pub fn into_transition(self, updates: Vec<LeafUpdate>) -> RootTransition {
        RootTransition {
            updates,
            claimed_count: self.count,
            signature: self.signature,
        }
    }
}

/// Fetches and stores datasets of one tree height on a [`StorageServer`].
#[derive(Debug, Clone)]
pub struct OffChainStorage<S> {
    server: S,
    height: u16,
}

impl<S: StorageServer> OffChainStorage<S> {
    /// A client for datasets in trees of `height`, which must be between one
    /// and [`MAX_HEIGHT`](offchain_crypto::merkle_tree::MAX_HEIGHT).
    pub fn new(server: S, height: u16) -> Result<Self, StorageError> {
        check_height(height)?;
        Ok(OffChainStorage { server, height })
    }

    /// The height of every tree this client reads and writes.
    pub fn height(&self) -> u16 {
        self.height
    }

    /// The underlying, untrusted server.
    pub fn server(&self) -> &S {
        &self.server
    }

    /// The key the server signs its attestations with.
    pub async fn public_key(&self) -> Result<VerifyingKey, StorageError> {
        self.server.public_key().await
    }

    /// Fetches the dataset of `owner`, which must commit to `expected_root`.
    ///
    /// Both the root the server reports and the root recomputed from the
    /// served entries are checked, so neither a stale root nor entries
    /// altered under a current one are accepted.
    pub async fn get(
        &self,
        owner: &VerifyingKey,
        expected_root: MerkleTreeDigest,
    ) -> Result<OffChainView, StorageError> {
        let snapshot = self.server.fetch_snapshot(owner, self.height).await?;
        if snapshot.root != expected_root {
            warn!(expected = %expected_root, reported = %snapshot.root, "server reported an unexpected root");
            return Err(StorageError::IntegrityMismatch {
                expected: expected_root,
                reported: snapshot.root,
            });
        }
        let view = view_from_snapshot(
            self.height,
            snapshot.items.into_iter().map(|item| (item.index, item.value)),
        )?;
        let computed = view_root(&view);
        if computed != expected_root {
            warn!(expected = %expected_root, %computed, "served entries do not hash to the reported root");
            return Err(StorageError::IntegrityMismatch {
                expected: expected_root,
                reported: computed,
            });
        }
        debug!(root = %expected_root, entries = view.entry_count(), "fetched verified view");
        Ok(view)
    }

    /// Submits `view` as the new dataset of `owner`, returning the server's
    /// attestation. The attested root must match the root of `view`.
    pub async fn request_store(
        &self,
        owner: &VerifyingKey,
        view: &OffChainView,
    ) -> Result<RootAttestation, StorageError> {
        if view.height() != self.height {
            return Err(StorageError::InvalidSnapshot(format!(
                "view of height {} submitted to a store of height {}",
                view.height(),
                self.height
            )));
        }
        let expected = view_root(view);
        let response = self
            .server
            .store_snapshot(owner, self.height, view.to_items())
            .await?;
        if response.new_root != expected {
            warn!(%expected, reported = %response.new_root, "server attested to an unexpected root");
            return Err(StorageError::IntegrityMismatch {
                expected,
                reported: response.new_root,
            });
        }
        Ok(RootAttestation {
            count: response.new_count,
            root: response.new_root,
            signature: response.signature,
        })
    }

    /// Resolves the lowest index holding `target` in the dataset of `owner`
    /// committed to by `expected_root`.
    ///
    /// The answer comes from a scan of the verified view; the server's own
    /// lookup must agree with it.
    pub async fn get_idx(
        &self,
        owner: &VerifyingKey,
        expected_root: MerkleTreeDigest,
        target: &[Fr],
    ) -> Result<Option<u64>, StorageError> {
        let view = self.get(owner, expected_root).await?;
        let local = lookup_index(&view, target);
        let reported = self
            .server
            .find_index(owner, self.height, expected_root, target)
            .await?
            .resolved();
        if local != reported {
            warn!(?local, ?reported, "server index lookup disagrees with the verified view");
            return Err(StorageError::IndexMismatch { local, reported });
        }
        Ok(local)
    }
}
