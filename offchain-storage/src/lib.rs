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

//! Verified access to Merkle-committed datasets held on off-chain storage
//! servers.
//!
//! A storage server holds a dataset as a fixed-height Merkle tree and
//! attests to each state it reaches by signing the pair of entry count and
//! root. This crate checks those attestations as root transitions against a
//! committed root ([`verify`]), keeps local views of the datasets
//! ([`view`]), talks to the servers ([`client`], [`server`]), and
//! coordinates trees whose slots correspond ([`coordination`], [`board`]).

#[macro_use]
extern crate tracing;

pub mod board;
pub mod client;
pub mod config;
pub mod coordination;
pub mod error;
pub mod policy;
pub mod server;
#[path = "tracing.rs"]
mod storage_tracing;
pub mod verify;
pub mod view;
pub mod wire;

pub use storage_tracing::{LogLevel, init_logger};

#[cfg(feature = "test-utilities")]
pub mod memory;
