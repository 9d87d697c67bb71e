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

//! An in-memory storage server, honest unless told otherwise, for tests.

use crate::error::StorageError;
use crate::server::StorageServer;
use crate::verify::attestation_message;
use crate::view::{
    LeafValue, OffChainView, check_height, lookup_index, view_from_snapshot, view_root,
};
use crate::wire::{IndexResponse, Snapshot, SnapshotItem, StoreResponse, owner_param};
use offchain_crypto::curve::Fr;
use offchain_crypto::merkle_tree::MerkleTreeDigest;
use offchain_crypto::schnorr::{SigningKey, VerifyingKey};
use rand::rngs::StdRng;
use rand::{CryptoRng, Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
struct StoredDataset {
    view: OffChainView,
    root: MerkleTreeDigest,
    count: u64,
}

struct ServerState {
    rng: StdRng,
    datasets: HashMap<(String, u16), StoredDataset>,
}

/// A [`StorageServer`] holding datasets in memory and signing `[count,
/// root]` with its own key.
///
/// The count of a dataset advances by the number of slots a store occupies
/// that were empty before it.
pub struct InMemoryStorageServer {
    signing_key: SigningKey,
    state: Mutex<ServerState>,
}

impl InMemoryStorageServer {
    pub fn new<R: Rng + CryptoRng>(rng: &mut R) -> Self {
        InMemoryStorageServer {
            signing_key: SigningKey::sample(rng),
            state: Mutex::new(ServerState {
                rng: StdRng::from_seed(rng.r#gen()),
                datasets: HashMap::new(),
            }),
        }
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    fn state(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dataset(state: &ServerState, owner: &VerifyingKey, height: u16) -> StoredDataset {
        state
            .datasets
            .get(&(owner_param(owner), height))
            .cloned()
            .unwrap_or_else(|| {
                let view = OffChainView::new(height);
                StoredDataset {
                    root: view_root(&view),
                    view,
                    count: 0,
                }
            })
    }

    /// Overwrites a stored entry without updating the reported root, as a
    /// misbehaving server would.
    pub fn tamper_entry(&self, owner: &VerifyingKey, height: u16, index: u64, value: LeafValue) {
        if check_height(height).is_err() {
            return;
        }
        let mut state = self.state();
        let mut dataset = Self::dataset(&state, owner, height);
        if dataset.view.set(index, value).is_ok() {
            state.datasets.insert((owner_param(owner), height), dataset);
        }
    }

    /// Makes the server report `root` for a dataset, leaving its entries
    /// untouched.
    pub fn tamper_root(&self, owner: &VerifyingKey, height: u16, root: MerkleTreeDigest) {
        if check_height(height).is_err() {
            return;
        }
        let mut state = self.state();
        let mut dataset = Self::dataset(&state, owner, height);
        dataset.root = root;
        state.datasets.insert((owner_param(owner), height), dataset);
    }
}

impl StorageServer for InMemoryStorageServer {
    async fn public_key(&self) -> Result<VerifyingKey, StorageError> {
        Ok(self.verifying_key())
    }

    async fn fetch_snapshot(
        &self,
        owner: &VerifyingKey,
        height: u16,
    ) -> Result<Snapshot, StorageError> {
        check_height(height)?;
        let dataset = Self::dataset(&self.state(), owner, height);
        Ok(Snapshot {
            root: dataset.root,
            items: dataset.view.to_items(),
        })
    }

    async fn store_snapshot(
        &self,
        owner: &VerifyingKey,
        height: u16,
        items: Vec<SnapshotItem>,
    ) -> Result<StoreResponse, StorageError> {
        check_height(height)?;
        let view = view_from_snapshot(height, items.into_iter().map(|item| (item.index, item.value)))?;
        let mut state = self.state();
        let previous = Self::dataset(&state, owner, height);
        let newly_occupied = view
            .iter()
            .filter(|(index, _)| !previous.view.is_occupied(*index))
            .count() as u64;
        let count = previous.count + newly_occupied;
        let root = view_root(&view);
        let signature = self
            .signing_key
            .sign(&mut state.rng, &attestation_message(count, root));
        debug!(owner = %owner_param(owner), height, count, %root, "stored snapshot");
        state
            .datasets
            .insert((owner_param(owner), height), StoredDataset { view, root, count });
        Ok(StoreResponse {
            new_count: count,
            new_root: root,
            signature,
        })
    }

    async fn find_index(
        &self,
        owner: &VerifyingKey,
        height: u16,
        root: MerkleTreeDigest,
        target: &[Fr],
    ) -> Result<IndexResponse, StorageError> {
        check_height(height)?;
        let dataset = Self::dataset(&self.state(), owner, height);
        if dataset.root != root {
            return Err(StorageError::InvalidSnapshot(format!(
                "root {root} is not the current root of the dataset"
            )));
        }
        Ok(lookup_index(&dataset.view, target).into())
    }
}
