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

//! Representing data as sequences of field elements, for hashing into leaves
//! and signing, primarily through the [`FieldRepr`] trait.

use crate::curve::Fr;

/// Something that can be written to from in-memory buffers
pub trait MemWrite<T> {
    /// Write a buffer into memory.
    fn write(&mut self, buf: &[T]);
}

impl<T: Copy> MemWrite<T> for Vec<T> {
    fn write(&mut self, buf: &[T]) {
        self.extend(buf);
    }
}

impl<T, W: MemWrite<T>> MemWrite<T> for &mut W {
    fn write(&mut self, buf: &[T]) {
        W::write(self, buf);
    }
}

/// A type this implements this can be transformed into an iterator of [`Fr`]s.
pub trait FieldRepr {
    /// Writes out `self` as a sequence of [Fr] elements.
    /// As a general rule of thumb, this should usually produces a known number of elements.
    fn field_repr<W: MemWrite<Fr>>(&self, writer: &mut W);
    /// The size of a value when represented as field elements.
    fn field_size(&self) -> usize;
    /// Writes the field repr into a vector
    fn field_vec(&self) -> Vec<Fr> {
        let mut res = Vec::with_capacity(self.field_size());
        self.field_repr(&mut res);
        res
    }
}

impl FieldRepr for Fr {
    fn field_repr<W: MemWrite<Fr>>(&self, writer: &mut W) {
        writer.write(&[*self]);
    }
    fn field_size(&self) -> usize {
        1
    }
}

impl FieldRepr for bool {
    fn field_repr<W: MemWrite<Fr>>(&self, writer: &mut W) {
        writer.write(&[Fr::from(*self)]);
    }
    fn field_size(&self) -> usize {
        1
    }
}

impl FieldRepr for u64 {
    fn field_repr<W: MemWrite<Fr>>(&self, writer: &mut W) {
        writer.write(&[Fr::from(*self)]);
    }
    fn field_size(&self) -> usize {
        1
    }
}

// Sequences are written without a length prefix: leaf arity is fixed per
// tree, so the element count is never ambiguous within one tree.
impl<T: FieldRepr> FieldRepr for [T] {
    fn field_repr<W: MemWrite<Fr>>(&self, writer: &mut W) {
        self.iter().for_each(|elem| elem.field_repr(writer));
    }
    fn field_size(&self) -> usize {
        self.iter().map(FieldRepr::field_size).sum()
    }
}

impl<T: FieldRepr, const N: usize> FieldRepr for [T; N] {
    fn field_repr<W: MemWrite<Fr>>(&self, writer: &mut W) {
        self[..].field_repr(writer)
    }
    fn field_size(&self) -> usize {
        self[..].field_size()
    }
}

impl<T: FieldRepr> FieldRepr for Vec<T> {
    fn field_repr<W: MemWrite<Fr>>(&self, writer: &mut W) {
        self[..].field_repr(writer)
    }
    fn field_size(&self) -> usize {
        self[..].field_size()
    }
}

impl<T: FieldRepr + ?Sized> FieldRepr for &T {
    fn field_repr<W: MemWrite<Fr>>(&self, writer: &mut W) {
        (**self).field_repr(writer)
    }
    fn field_size(&self) -> usize {
        (**self).field_size()
    }
}

macro_rules! tuple_repr {
    ($head:ident$(, $tail:ident)*) => {
        #[allow(unused_parens, non_snake_case)]
        impl<$head: FieldRepr$(, $tail: FieldRepr)*> FieldRepr for ($head, $($tail),*) {
            fn field_repr<W: MemWrite<Fr>>(&self, writer: &mut W) {
                let ($head, $($tail),*) = self;
                $head.field_repr(writer);
                $($tail.field_repr(writer);)*
            }
            fn field_size(&self) -> usize {
                let ($head, $($tail),*) = self;
                $head.field_size() $(+ $tail.field_size())*
            }
        }
        tuple_repr!($($tail),*);
    };
    () => {
        impl FieldRepr for () {
            fn field_repr<W: MemWrite<Fr>>(&self, _: &mut W) {
            }
            fn field_size(&self) -> usize {
                0
            }
        }
    };
}

tuple_repr!(A, B, C, D, E, F);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tuple_flattening() {
        let value = (Fr::from(1u64), [Fr::from(2u64), Fr::from(3u64)], true);
        assert_eq!(value.field_size(), 4);
        assert_eq!(
            value.field_vec(),
            vec![1u64.into(), 2u64.into(), 3u64.into(), Fr::from(true)]
        );
    }

    #[test]
    fn test_slice_and_vec_agree() {
        let elems = vec![Fr::from(7u64), Fr::from(8u64)];
        assert_eq!(elems.field_vec(), elems[..].field_vec());
        assert_eq!(Vec::<Fr>::new().field_size(), 0);
    }
}
