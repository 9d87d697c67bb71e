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

//! Per-store limits, and pluggable validation of message leaves.

use offchain_crypto::curve::Fr;
use offchain_crypto::merkle_tree::MAX_HEIGHT;
use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// The tree height used by stores unless configured otherwise.
pub const DEFAULT_TREE_HEIGHT: u16 = 8;
/// The number of occupied slots a store allows unless configured otherwise.
pub const DEFAULT_CAPACITY: u64 = 100;

/// A tree height outside of `1..=MAX_HEIGHT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidPolicy(pub u16);

impl Display for InvalidPolicy {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "tree height {} is outside of the supported range 1..={MAX_HEIGHT}",
            self.0
        )
    }
}

impl Error for InvalidPolicy {}

/// The fixed shape of one committed store: the height of its tree, and the
/// most slots that may ever be occupied at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StorePolicy {
    height: u16,
    capacity: u64,
}

impl StorePolicy {
    pub fn new(height: u16, capacity: u64) -> Result<Self, InvalidPolicy> {
        if height == 0 || height > MAX_HEIGHT {
            return Err(InvalidPolicy(height));
        }
        Ok(StorePolicy { height, capacity })
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }
}

impl Default for StorePolicy {
    fn default() -> Self {
        StorePolicy {
            height: DEFAULT_TREE_HEIGHT,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

/// A caller-supplied predicate deciding whether a leaf value may be posted
/// as a message.
pub trait MessagePolicy {
    fn validate(&self, message: &[Fr]) -> bool;
}

impl<F: Fn(&[Fr]) -> bool> MessagePolicy for F {
    fn validate(&self, message: &[Fr]) -> bool {
        self(message)
    }
}

/// Accepts every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl MessagePolicy for AcceptAll {
    fn validate(&self, _message: &[Fr]) -> bool {
        true
    }
}

/// Interprets the low six bits of a single-element message as flags one to
/// six, and accepts:
///
/// * flag 1 with no other flag,
/// * flag 2 together with flag 3,
/// * flag 4 without flags 5 and 6.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlagSetPolicy;

impl FlagSetPolicy {
    const FLAG_1: u8 = 1;
    const FLAG_2: u8 = 1 << 1;
    const FLAG_3: u8 = 1 << 2;
    const FLAG_4: u8 = 1 << 3;
    const FLAG_5: u8 = 1 << 4;
    const FLAG_6: u8 = 1 << 5;

    fn accepts_flags(flags: u8) -> bool {
        let has = |flag| flags & flag == flag;
        let others = Self::FLAG_2 | Self::FLAG_3 | Self::FLAG_4 | Self::FLAG_5 | Self::FLAG_6;
        (has(Self::FLAG_1) && flags & others == 0)
            || (has(Self::FLAG_2) && has(Self::FLAG_3))
            || (has(Self::FLAG_4) && flags & (Self::FLAG_5 | Self::FLAG_6) == 0)
    }
}

impl MessagePolicy for FlagSetPolicy {
    fn validate(&self, message: &[Fr]) -> bool {
        match message {
            [value] => value
                .as_le_bytes()
                .first()
                .is_some_and(|low| Self::accepts_flags(low & 0b11_1111)),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(value: u64) -> Vec<Fr> {
        vec![Fr::from(value)]
    }

    #[test]
    fn test_flag_set_policy() {
        let policy = FlagSetPolicy;
        assert!(policy.validate(&msg(100000000001)));
        assert!(policy.validate(&msg(0b000001)));
        assert!(policy.validate(&msg(0b000110)));
        assert!(policy.validate(&msg(0b111110)));
        assert!(policy.validate(&msg(0b001000)));
        assert!(policy.validate(&msg(0b001111)));
        assert!(!policy.validate(&msg(0b000000)));
        assert!(!policy.validate(&msg(0b000011)));
        assert!(!policy.validate(&msg(0b011000)));
        assert!(!policy.validate(&msg(0b100000)));
        // Only the low six bits are inspected.
        assert!(!policy.validate(&msg(0b1000000)));
        assert!(!policy.validate(&[]));
        assert!(!policy.validate(&[Fr::from(1u64), Fr::from(1u64)]));
    }

    #[test]
    fn test_closures_are_policies() {
        let non_zero = |message: &[Fr]| message.iter().all(|v| *v != Fr::from(0u64));
        assert!(non_zero.validate(&msg(3)));
        assert!(!non_zero.validate(&msg(0)));
        assert!(AcceptAll.validate(&msg(0)));
    }

    #[test]
    fn test_store_policy_bounds() {
        assert_eq!(StorePolicy::new(0, 1), Err(InvalidPolicy(0)));
        assert_eq!(StorePolicy::new(MAX_HEIGHT + 1, 1), Err(InvalidPolicy(MAX_HEIGHT + 1)));
        assert!(StorePolicy::new(MAX_HEIGHT, 1).is_ok());
        assert_eq!(StorePolicy::default().height(), 8);
        assert_eq!(StorePolicy::default().capacity(), 100);
    }
}
