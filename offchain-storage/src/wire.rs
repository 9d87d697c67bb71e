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

//! JSON messages exchanged with off-chain storage servers.
//!
//! Field elements travel as decimal strings, counts and indices as numbers,
//! and dataset owners as the hex encoding of their compressed public key.

use crate::view::LeafValue;
use offchain_crypto::curve::Fr;
use offchain_crypto::merkle_tree::MerkleTreeDigest;
use offchain_crypto::schnorr::{Signature, VerifyingKey};
use serde::{Deserialize, Serialize};

/// The query-string form of a dataset owner.
pub fn owner_param(owner: &VerifyingKey) -> String {
    owner.0.to_hex()
}

/// The query-string form of a lookup target: its elements in decimal,
/// comma separated.
pub fn value_param(value: &[Fr]) -> String {
    value
        .iter()
        .map(Fr::to_decimal)
        .collect::<Vec<_>>()
        .join(",")
}

/// One occupied slot of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotItem {
    pub index: u64,
    pub value: LeafValue,
}

/// A dataset as served, with the root the server claims it hashes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub root: MerkleTreeDigest,
    pub items: Vec<SnapshotItem>,
}

/// The body of a store request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreRequest {
    pub owner: String,
    pub height: u16,
    pub items: Vec<SnapshotItem>,
}

/// The server's attestation to a newly stored dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreResponse {
    pub new_count: u64,
    pub new_root: MerkleTreeDigest,
    pub signature: Signature,
}

/// The server's answer to an index lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexResponse {
    pub found: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u64>,
}

impl IndexResponse {
    /// The index, if the server reported one as found.
    pub fn resolved(&self) -> Option<u64> {
        if self.found { self.index } else { None }
    }
}

impl From<Option<u64>> for IndexResponse {
    fn from(index: Option<u64>) -> Self {
        IndexResponse {
            found: index.is_some(),
            index,
        }
    }
}
