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

#![deny(unreachable_pub)]
#![deny(missing_docs)]

//! Cryptographic primitives for signed off-chain storage: the commitment
//! field, Poseidon hashing, Schnorr signatures over the embedded curve, and
//! fixed-depth sparse Merkle trees with their witnesses.
//!
//! Everything here is pure and synchronous; the storage protocol built on
//! top lives in `midnight-offchain-storage`.

mod macros;

pub mod curve;
pub mod hash;
pub mod merkle_tree;
pub mod repr;
pub mod schnorr;
