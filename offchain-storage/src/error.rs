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

use offchain_crypto::merkle_tree::{InvalidIndex, MerkleTreeDigest};
use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// A proposed root transition that must not be committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// The attestation does not verify under the signer key for the
    /// recomputed root and claimed count.
    SignatureInvalid,
    /// The witness of an update does not reproduce the root the tree had
    /// after the updates before it.
    WitnessRootMismatch {
        position: usize,
        expected: MerkleTreeDigest,
        computed: MerkleTreeDigest,
    },
    /// The claimed count is not the previous count plus the number of newly
    /// occupied slots.
    CountMismatch { claimed: u64, computed: u64 },
    /// The transition would occupy more slots than the store allows.
    CapacityExceeded { count: u64, capacity: u64 },
    /// A witness path has the wrong length for the store's tree height.
    MalformedWitness {
        position: usize,
        expected: usize,
        actual: usize,
    },
    /// A witness addresses a slot beyond the 64-bit index space.
    UnaddressableIndex { position: usize },
    /// Two updates in the same transition address the same slot.
    DuplicateIndex(u64),
}

impl Display for VerificationError {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        use VerificationError::*;
        match self {
            SignatureInvalid => write!(formatter, "root attestation signature is invalid"),
            WitnessRootMismatch {
                position,
                expected,
                computed,
            } => write!(
                formatter,
                "witness of update {position} implies root {computed}, expected {expected}"
            ),
            CountMismatch { claimed, computed } => write!(
                formatter,
                "claimed entry count {claimed} does not match computed count {computed}"
            ),
            CapacityExceeded { count, capacity } => write!(
                formatter,
                "storage full: {count} entries exceed the capacity of {capacity}"
            ),
            MalformedWitness {
                position,
                expected,
                actual,
            } => write!(
                formatter,
                "witness of update {position} has height {actual}, expected {expected}"
            ),
            UnaddressableIndex { position } => write!(
                formatter,
                "witness of update {position} addresses a slot outside of the 64-bit index space"
            ),
            DuplicateIndex(index) => write!(
                formatter,
                "index {index} is updated more than once in the same transition"
            ),
        }
    }
}

impl Error for VerificationError {}

/// A failure to obtain trustworthy data from, or hand data to, an off-chain
/// storage server.
#[derive(Debug)]
pub enum StorageError {
    /// The server served or attested to a root other than the one expected.
    IntegrityMismatch {
        expected: MerkleTreeDigest,
        reported: MerkleTreeDigest,
    },
    /// The server's index lookup disagrees with a scan of the verified view.
    IndexMismatch {
        local: Option<u64>,
        reported: Option<u64>,
    },
    /// A leaf value's length differs from the other values in its view.
    ArityMismatch {
        index: u64,
        expected: usize,
        actual: usize,
    },
    /// The snapshot is structurally unusable.
    InvalidSnapshot(String),
    /// A server endpoint could not be derived from the configured URL.
    InvalidEndpoint(String),
    /// A leaf index does not fit the tree.
    Index(InvalidIndex),
    /// The transport failed, or the server answered with an error status.
    Http(reqwest::Error),
}

impl Display for StorageError {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        use StorageError::*;
        match self {
            IntegrityMismatch { expected, reported } => write!(
                formatter,
                "integrity mismatch: expected root {expected}, server reported {reported}"
            ),
            IndexMismatch { local, reported } => write!(
                formatter,
                "index lookup mismatch: verified view yields {local:?}, server reported {reported:?}"
            ),
            ArityMismatch {
                index,
                expected,
                actual,
            } => write!(
                formatter,
                "leaf at index {index} has {actual} elements, expected {expected}"
            ),
            InvalidSnapshot(reason) => write!(formatter, "invalid snapshot: {reason}"),
            InvalidEndpoint(reason) => write!(formatter, "invalid storage endpoint: {reason}"),
            Index(err) => err.fmt(formatter),
            Http(err) => {
                err.fmt(formatter)?;
                write!(formatter, " -- while contacting the storage server")
            }
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StorageError::Index(err) => Some(err),
            StorageError::Http(err) => Some(err),
            _ => None,
        }
    }
}

impl From<InvalidIndex> for StorageError {
    fn from(err: InvalidIndex) -> Self {
        StorageError::Index(err)
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        StorageError::Http(err)
    }
}

/// A failure to apply transitions across one or more committed stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinationError {
    /// No store is registered under the given role.
    UnknownStore(String),
    /// The identity is not present in the eligibility view.
    NotFound,
    /// The identity is not a member of the committed eligibility tree.
    NotEligible,
    /// The message was rejected by the message policy.
    InvalidMessage,
    /// An update addresses a different slot than the one it is bound to.
    IndexMismatch { expected: u64, actual: Option<u64> },
    /// A registration targets a slot that already holds an identity.
    SlotOccupied(u64),
    /// A registration would leave its identity or its message slot empty.
    EmptyRegistration,
    /// A transition carries a different number of updates than the operation
    /// requires.
    UnexpectedUpdateCount { expected: usize, actual: usize },
    /// A supplied view does not hash to the committed root.
    IntegrityMismatch {
        expected: MerkleTreeDigest,
        computed: MerkleTreeDigest,
    },
    /// A transition failed verification.
    Verification(VerificationError),
}

impl Display for CoordinationError {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        use CoordinationError::*;
        match self {
            UnknownStore(role) => write!(formatter, "no store registered for role {role}"),
            NotFound => write!(formatter, "identity is not registered"),
            NotEligible => write!(formatter, "identity is not eligible under the committed root"),
            InvalidMessage => write!(formatter, "message failed validation"),
            IndexMismatch { expected, actual } => match actual {
                Some(actual) => write!(
                    formatter,
                    "update addresses index {actual}, expected {expected}"
                ),
                None => write!(
                    formatter,
                    "update addresses an unaddressable index, expected {expected}"
                ),
            },
            SlotOccupied(index) => write!(formatter, "slot {index} is already registered"),
            EmptyRegistration => write!(formatter, "registration leaves a slot empty"),
            UnexpectedUpdateCount { expected, actual } => write!(
                formatter,
                "transition carries {actual} updates, expected {expected}"
            ),
            IntegrityMismatch { expected, computed } => write!(
                formatter,
                "view hashes to {computed}, committed root is {expected}"
            ),
            Verification(err) => {
                err.fmt(formatter)?;
                write!(formatter, " -- while verifying a root transition")
            }
        }
    }
}

impl Error for CoordinationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CoordinationError::Verification(err) => Some(err),
            _ => None,
        }
    }
}

impl From<VerificationError> for CoordinationError {
    fn from(err: VerificationError) -> Self {
        CoordinationError::Verification(err)
    }
}
