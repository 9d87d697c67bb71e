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

//! Hashing functions for leaves, tree nodes, and signature challenges.

use crate::curve::{Fr, outer};
use crate::repr::FieldRepr;
use ff::Field;
use lazy_static::lazy_static;
use midnight_circuits::hash::poseidon::PoseidonChip;
use midnight_circuits::instructions::hash::HashCPU;

/// The domain separator used in leaf commitments, as little-endian bytes of
/// a field element.
pub const LEAF_HASH_DOMAIN_SEP: &[u8] = b"mdn:ocs:lh";

/// The hash of an unoccupied leaf slot.
pub const EMPTY_LEAF: Fr = Fr(outer::Scalar::ZERO);

lazy_static! {
    static ref LEAF_HASH_DOMAIN: Fr = Fr::from_le_bytes(LEAF_HASH_DOMAIN_SEP)
        .expect("leaf domain separator must fit in a field element");
}

/// An efficient two-to-many field hash (Poseidon). Operand order matters.
pub fn transient_hash(elems: &[Fr]) -> Fr {
    let h = <PoseidonChip<outer::Scalar> as HashCPU<outer::Scalar, outer::Scalar>>::hash(
        &elems.iter().map(|x| x.0).collect::<Vec<_>>(),
    );
    Fr(h)
}

/// The hash of an occupied leaf holding `value`.
///
/// Domain separated from interior nodes, so no stored value can collide with
/// [`EMPTY_LEAF`] or with a subtree root.
pub fn leaf_hash<T: FieldRepr + ?Sized>(value: &T) -> Fr {
    let mut preimage = Vec::with_capacity(value.field_size() + 1);
    preimage.push(*LEAF_HASH_DOMAIN);
    value.field_repr(&mut preimage);
    transient_hash(&preimage)
}

/// The hash of an interior node.
pub fn node_hash(left: Fr, right: Fr) -> Fr {
    transient_hash(&[left, right])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_hash_is_ordered() {
        let a = Fr::from(1u64);
        let b = Fr::from(2u64);
        assert_ne!(node_hash(a, b), node_hash(b, a));
    }

    #[test]
    fn test_leaf_hash_separated() {
        let value = [Fr::from(42u64)];
        assert_ne!(leaf_hash(&value[..]), transient_hash(&value));
        assert_ne!(leaf_hash(&[EMPTY_LEAF][..]), EMPTY_LEAF);
        assert_eq!(leaf_hash(&value[..]), leaf_hash(&vec![Fr::from(42u64)]));
    }
}
