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

//! The interface of an off-chain storage server, and its HTTP transport.
//!
//! Nothing a server returns is trusted here; callers go through
//! [`OffChainStorage`](crate::client::OffChainStorage), which re-validates
//! every answer.

use crate::config::StorageConfig;
use crate::error::StorageError;
use crate::wire::{
    IndexResponse, Snapshot, SnapshotItem, StoreRequest, StoreResponse, owner_param, value_param,
};
use offchain_crypto::curve::Fr;
use offchain_crypto::merkle_tree::MerkleTreeDigest;
use offchain_crypto::schnorr::VerifyingKey;
use reqwest::Url;

/// An untrusted key-value service holding per-owner datasets, and signing
/// the roots and counts of what it stores.
pub trait StorageServer {
    /// The key the server signs attestations with.
    #[allow(async_fn_in_trait)]
    async fn public_key(&self) -> Result<VerifyingKey, StorageError>;

    /// The current dataset for `owner` in a tree of `height`.
    #[allow(async_fn_in_trait)]
    async fn fetch_snapshot(
        &self,
        owner: &VerifyingKey,
        height: u16,
    ) -> Result<Snapshot, StorageError>;

    /// Replaces the dataset for `owner`, returning the attested new count
    /// and root.
    #[allow(async_fn_in_trait)]
    async fn store_snapshot(
        &self,
        owner: &VerifyingKey,
        height: u16,
        items: Vec<SnapshotItem>,
    ) -> Result<StoreResponse, StorageError>;

    /// The lowest index holding `target` in the dataset with `root`.
    #[allow(async_fn_in_trait)]
    async fn find_index(
        &self,
        owner: &VerifyingKey,
        height: u16,
        root: MerkleTreeDigest,
        target: &[Fr],
    ) -> Result<IndexResponse, StorageError>;
}

impl<S: StorageServer> StorageServer for &S {
    async fn public_key(&self) -> Result<VerifyingKey, StorageError> {
        (**self).public_key().await
    }

    async fn fetch_snapshot(
        &self,
        owner: &VerifyingKey,
        height: u16,
    ) -> Result<Snapshot, StorageError> {
        (**self).fetch_snapshot(owner, height).await
    }

    async fn store_snapshot(
        &self,
        owner: &VerifyingKey,
        height: u16,
        items: Vec<SnapshotItem>,
    ) -> Result<StoreResponse, StorageError> {
        (**self).store_snapshot(owner, height, items).await
    }

    async fn find_index(
        &self,
        owner: &VerifyingKey,
        height: u16,
        root: MerkleTreeDigest,
        target: &[Fr],
    ) -> Result<IndexResponse, StorageError> {
        (**self).find_index(owner, height, root, target).await
    }
}

/// A storage server reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpStorageServer {
    client: reqwest::Client,
    public_key_url: Url,
    data_url: Url,
    index_url: Url,
}

fn endpoint(base: &Url, path: &str) -> Result<Url, StorageError> {
    base.join(path)
        .map_err(|err| StorageError::InvalidEndpoint(format!("{base}{path}: {err}")))
}

impl HttpStorageServer {
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(HttpStorageServer {
            client,
            public_key_url: endpoint(&config.server_url, "publicKey")?,
            data_url: endpoint(&config.server_url, "data")?,
            index_url: endpoint(&config.server_url, "index")?,
        })
    }
}

impl StorageServer for HttpStorageServer {
    async fn public_key(&self) -> Result<VerifyingKey, StorageError> {
        Ok(self
            .client
            .get(self.public_key_url.clone())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    async fn fetch_snapshot(
        &self,
        owner: &VerifyingKey,
        height: u16,
    ) -> Result<Snapshot, StorageError> {
        debug!(owner = %owner_param(owner), height, "fetching snapshot");
        Ok(self
            .client
            .get(self.data_url.clone())
            .query(&[("owner", owner_param(owner)), ("height", height.to_string())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    async fn store_snapshot(
        &self,
        owner: &VerifyingKey,
        height: u16,
        items: Vec<SnapshotItem>,
    ) -> Result<StoreResponse, StorageError> {
        debug!(owner = %owner_param(owner), height, items = items.len(), "storing snapshot");
        let request = StoreRequest {
            owner: owner_param(owner),
            height,
            items,
        };
        Ok(self
            .client
            .post(self.data_url.clone())
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    async fn find_index(
        &self,
        owner: &VerifyingKey,
        height: u16,
        root: MerkleTreeDigest,
        target: &[Fr],
    ) -> Result<IndexResponse, StorageError> {
        Ok(self
            .client
            .get(self.index_url.clone())
            .query(&[
                ("owner", owner_param(owner)),
                ("height", height.to_string()),
                ("root", root.0.to_decimal()),
                ("value", value_param(target)),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }
}
