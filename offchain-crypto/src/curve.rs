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

//! Curve selection for off-chain storage commitments:
//!
//! * A primary prime field [`Fr`], in which roots, counts, and leaves live.
//! * Embedded elliptic curve points [`EmbeddedGroupAffine`], used as signer
//!   keys.
//! * An embedded prime field [`EmbeddedFr`], used for secret keys and
//!   signature responses.

use crate::macros::{decimal_display, wrap_field_arith, wrap_group_arith};
use ff::{Field, PrimeField};
use group::{Group, GroupEncoding};
use midnight_circuits::ecc::curves::CircuitCurve;
use num_bigint::BigUint;
use rand::Rng;
use rand::distributions::{Distribution, Standard};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::hash::Hasher;
use std::ops::Mul;
use zeroize::DefaultIsZeroes;

/// The outer, main curve
pub mod outer {
    /// The scalar prime field, in which all commitments are computed
    pub type Scalar = midnight_curves::Fq;
}

/// The embedded / cycle curve, used for signatures
pub mod embedded {
    /// The base prime field, used to represent curve points; the scalar of [`outer`](super::outer)
    pub type Base = midnight_curves::Fq;
    /// The scalar prime field of the embedded curve
    pub type Scalar = midnight_curves::Fr;
    /// The affine representation of a curve point over the extended curve
    /// (which contains the relevant cryptographic subgroup).
    pub type AffineExtended = midnight_curves::JubjubExtended;
    /// The affine representation of a curve point of the relevant cryptographic subgroup.
    pub type Affine = midnight_curves::JubjubSubgroup;
}

/// A string that is not the canonical decimal encoding of a field element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidFieldEncoding(pub String);

impl Display for InvalidFieldEncoding {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "invalid decimal field element encoding: {:?}", self.0)
    }
}

impl Error for InvalidFieldEncoding {}

fn parse_decimal(repr: &str) -> Result<Vec<u8>, InvalidFieldEncoding> {
    if repr.is_empty() || !repr.bytes().all(|b| b.is_ascii_digit()) {
        return Err(InvalidFieldEncoding(repr.to_owned()));
    }
    BigUint::parse_bytes(repr.as_bytes(), 10)
        .map(|value| value.to_bytes_le())
        .ok_or_else(|| InvalidFieldEncoding(repr.to_owned()))
}

/// An element of our primary prime field.
#[derive(Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Fr(pub outer::Scalar);
wrap_field_arith!(Fr);
decimal_display!(Fr);

impl std::hash::Hash for Fr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write(&self.0.to_bytes_le()[..]);
    }
}

impl Distribution<Fr> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Fr {
        Fr(outer::Scalar::random(rng))
    }
}

/// The number of bits required to represent [Fr].
pub const FR_BITS: usize = <outer::Scalar as PrimeField>::NUM_BITS as usize;
/// The number of bytes required to represent [Fr].
pub const FR_BYTES: usize = FR_BITS.div_ceil(8);

/// An element of our embedded prime field.
#[derive(Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct EmbeddedFr(pub embedded::Scalar);
wrap_field_arith!(EmbeddedFr);
decimal_display!(EmbeddedFr);

impl DefaultIsZeroes for EmbeddedFr {}

impl std::hash::Hash for EmbeddedFr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write(self.0.to_repr().as_ref());
    }
}

impl Distribution<EmbeddedFr> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> EmbeddedFr {
        EmbeddedFr(embedded::Scalar::random(rng))
    }
}

macro_rules! derive_via {
    ($base:ty, $via:ty, $($ty:ty),*) => {
        $(
        impl From<$ty> for $base {
            fn from(val: $ty) -> $base {
                (val as $via).into()
            }
        }
        )*
    }
}

impl From<bool> for Fr {
    fn from(val: bool) -> Fr {
        Fr(outer::Scalar::from(u64::from(val)))
    }
}

derive_via!(Fr, u64, u8, u16, u32);
derive_via!(EmbeddedFr, u64, u8, u16, u32);

impl From<u64> for Fr {
    fn from(val: u64) -> Fr {
        Fr(outer::Scalar::from(val))
    }
}

impl From<u128> for Fr {
    fn from(val: u128) -> Fr {
        Fr(outer::Scalar::from_u128(val))
    }
}

impl From<u64> for EmbeddedFr {
    fn from(val: u64) -> EmbeddedFr {
        EmbeddedFr(embedded::Scalar::from(val))
    }
}

impl From<u128> for EmbeddedFr {
    fn from(val: u128) -> EmbeddedFr {
        EmbeddedFr(embedded::Scalar::from_u128(val))
    }
}

impl Fr {
    /// Interpret a little-endian byte-string as an [Fr].
    pub fn from_le_bytes(bytes: &[u8]) -> Option<Self> {
        let mut repr = [0u8; FR_BYTES];
        if bytes.len() <= repr.len() {
            repr[..bytes.len()].copy_from_slice(bytes)
        } else {
            return None;
        }
        outer::Scalar::from_repr(repr).map(Fr).into()
    }

    /// Output an [Fr] as a little-endian bytes-string
    ///
    /// # Examples
    ///
    /// ```
    /// use midnight_offchain_crypto::curve::Fr;
    /// assert_eq!(Fr::from(42u64), Fr::from_le_bytes(&Fr::from(42u64).as_le_bytes()).unwrap())
    /// ```
    pub fn as_le_bytes(&self) -> Vec<u8> {
        self.0.to_bytes_le().to_vec()
    }

    /// The canonical decimal representation of this element.
    ///
    /// ```
    /// use midnight_offchain_crypto::curve::Fr;
    /// assert_eq!(Fr::from(100000000001u64).to_decimal(), "100000000001");
    /// ```
    pub fn to_decimal(&self) -> String {
        BigUint::from_bytes_le(&self.as_le_bytes()).to_str_radix(10)
    }

    /// Parses a decimal string, rejecting values outside of the field.
    pub fn from_decimal(repr: &str) -> Result<Self, InvalidFieldEncoding> {
        Fr::from_le_bytes(&parse_decimal(repr)?).ok_or_else(|| InvalidFieldEncoding(repr.to_owned()))
    }
}

impl EmbeddedFr {
    /// Interpret a little-endian byte-string as an [`EmbeddedFr`].
    pub fn from_le_bytes(bytes: &[u8]) -> Option<Self> {
        let mut repr = [0u8; FR_BYTES];
        if bytes.len() <= repr.len() {
            repr[..bytes.len()].copy_from_slice(bytes)
        } else {
            return None;
        }
        embedded::Scalar::from_repr(repr).map(EmbeddedFr).into()
    }

    /// Output an [`EmbeddedFr`] as a little-endian bytes-string
    pub fn as_le_bytes(&self) -> Vec<u8> {
        self.0.to_bytes().to_vec()
    }

    /// The canonical decimal representation of this element.
    pub fn to_decimal(&self) -> String {
        BigUint::from_bytes_le(&self.as_le_bytes()).to_str_radix(10)
    }

    /// Parses a decimal string, rejecting values outside of the field.
    pub fn from_decimal(repr: &str) -> Result<Self, InvalidFieldEncoding> {
        EmbeddedFr::from_le_bytes(&parse_decimal(repr)?)
            .ok_or_else(|| InvalidFieldEncoding(repr.to_owned()))
    }

    /// Reduces a wide little-endian byte string modulo the embedded scalar
    /// field order.
    pub fn from_bytes_wide(bytes: &[u8; 64]) -> Self {
        EmbeddedFr(embedded::Scalar::from_bytes_wide(bytes))
    }
}

/// An element in the embedded elliptic curve.
#[derive(Default, Copy, Clone)]
pub struct EmbeddedGroupAffine(pub embedded::Affine);

wrap_group_arith!(EmbeddedGroupAffine, EmbeddedFr);

impl Display for EmbeddedGroupAffine {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        match (self.x(), self.y()) {
            (Some(x), Some(y)) => write!(formatter, "({x}, {y})"),
            _ => write!(formatter, "<infinity>"),
        }
    }
}

impl fmt::Debug for EmbeddedGroupAffine {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        Display::fmt(self, formatter)
    }
}

impl Distribution<EmbeddedGroupAffine> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> EmbeddedGroupAffine {
        EmbeddedGroupAffine(embedded::Affine::random(rng))
    }
}

impl From<embedded::Affine> for EmbeddedGroupAffine {
    fn from(g: embedded::Affine) -> Self {
        Self(g)
    }
}

#[derive(Serialize, Deserialize)]
struct AffineCoordinates {
    x: Fr,
    y: Fr,
}

impl Serialize for EmbeddedGroupAffine {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        let (Some(x), Some(y)) = (self.x(), self.y()) else {
            return Err(<S::Error as serde::ser::Error>::custom(
                "cannot encode the point at infinity",
            ));
        };
        AffineCoordinates { x, y }.serialize(ser)
    }
}

impl<'de> Deserialize<'de> for EmbeddedGroupAffine {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        let AffineCoordinates { x, y } = AffineCoordinates::deserialize(de)?;
        EmbeddedGroupAffine::new(x, y)
            .ok_or_else(|| serde::de::Error::custom("coordinates are not on the embedded curve"))
    }
}

impl EmbeddedGroupAffine {
    /// Creates a new elliptic curve element from it's affine coordinates. It *is*
    /// checked for validity.
    pub fn new(x: Fr, y: Fr) -> Option<Self> {
        embedded::AffineExtended::from_xy(x.0, y.0).map(|p| EmbeddedGroupAffine(p.into_subgroup()))
    }

    /// Retrieves the curve point's affine `x` coordinate.
    /// Or `None` if this is the identity
    pub fn x(&self) -> Option<Fr> {
        Into::<embedded::AffineExtended>::into(self.0)
            .coordinates()
            .map(|c| Fr(c.0))
    }

    /// Retrieves the curve point's affine `y` coordinate.
    /// Or `None` if this is the identity
    pub fn y(&self) -> Option<Fr> {
        Into::<embedded::AffineExtended>::into(self.0)
            .coordinates()
            .map(|c| Fr(c.1))
    }

    /// Returns the primary generator of the embedded curve.
    pub fn generator() -> Self {
        EmbeddedGroupAffine(embedded::Affine::generator())
    }

    /// Returns the identity element for curve addition.
    pub fn identity() -> Self {
        EmbeddedGroupAffine(embedded::Affine::identity())
    }

    /// Whether this is the identity element.
    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// The compressed point encoding, as lowercase hex.
    pub fn to_hex(&self) -> String {
        const_hex::encode(self.0.to_bytes().as_ref())
    }
}

impl PartialOrd for EmbeddedGroupAffine {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::hash::Hash for EmbeddedGroupAffine {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.x().hash(state);
        self.y().hash(state);
    }
}

impl PartialEq for EmbeddedGroupAffine {
    fn eq(&self, other: &EmbeddedGroupAffine) -> bool {
        (self.x(), self.y()) == (other.x(), other.y())
    }
}

impl Eq for EmbeddedGroupAffine {}

impl Ord for EmbeddedGroupAffine {
    fn cmp(&self, other: &Self) -> Ordering {
        let a: Option<(embedded::Base, embedded::Base)> =
            Into::<embedded::AffineExtended>::into(self.0).coordinates();
        let b: Option<(embedded::Base, embedded::Base)> =
            Into::<embedded::AffineExtended>::into(other.0).coordinates();
        a.cmp(&b)
    }
}

impl AsRef<outer::Scalar> for Fr {
    fn as_ref(&self) -> &outer::Scalar {
        &self.0
    }
}

impl AsRef<embedded::Scalar> for EmbeddedFr {
    fn as_ref(&self) -> &embedded::Scalar {
        &self.0
    }
}

macro_rules! impl_smaller_ints {
    ($($ty:ty),* => $via:ty) => {
        $(
            impl TryFrom<Fr> for $ty {
                type Error = ();
                fn try_from(f: Fr) -> Result<$ty, ()> {
                    <$via>::try_from(f)?.try_into().map_err(|_| ())
                }
            }
        )*
    }
}

impl TryFrom<Fr> for u128 {
    type Error = ();
    fn try_from(f: Fr) -> Result<u128, ()> {
        let repr = f.0.to_bytes_le();
        if repr[16..].iter().any(|byte| byte != &0) {
            Err(())
        } else {
            Ok(repr[..16].iter().enumerate().fold(0, |acc, (i, byte)| {
                acc + ((*byte as u128) << (8 * i as u128))
            }))
        }
    }
}

impl_smaller_ints!(u8, u16, u32, u64 => u128);

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_fr_le_bytes() {
        let val = 0x1234u16;
        let val_le = val.to_le_bytes();
        assert_eq!(val_le, [0x34, 0x12]);
        assert_eq!(Fr::from_le_bytes(&val_le).unwrap(), val.into());
        let restored = Fr::from(val).as_le_bytes();
        assert_eq!(&restored[..2], &val_le);
        assert_eq!(&restored[2..], &[0u8; 30]);
    }

    #[test]
    fn test_decimal() {
        assert_eq!(Fr::from(0u64).to_decimal(), "0");
        assert_eq!(Fr::from(23424000000000013u64).to_decimal(), "23424000000000013");
        assert_eq!(Fr::from_decimal("4242").unwrap(), Fr::from(4242u64));
        assert_eq!(Fr::from_decimal("0042").unwrap(), Fr::from(42u64));
        assert!(Fr::from_decimal("").is_err());
        assert!(Fr::from_decimal("-1").is_err());
        assert!(Fr::from_decimal("+1").is_err());
        assert!(Fr::from_decimal("12a").is_err());
    }

    #[test]
    fn test_decimal_rejects_modulus() {
        let minus_one = Fr::from(0u64) - Fr::from(1u64);
        let modulus = BigUint::parse_bytes(minus_one.to_decimal().as_bytes(), 10).unwrap() + 1u32;
        assert!(Fr::from_decimal(&modulus.to_str_radix(10)).is_err());
        assert_eq!(Fr::from_decimal(&minus_one.to_decimal()).unwrap(), minus_one);
    }

    #[test]
    fn test_fr_serde_is_decimal_string() {
        let json = serde_json::to_string(&Fr::from(100000000001u64)).unwrap();
        assert_eq!(json, "\"100000000001\"");
        let back: Fr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Fr::from(100000000001u64));
    }

    #[test]
    fn test_identity_point() {
        let id = EmbeddedGroupAffine::identity();
        assert_eq!((id.x(), id.y()), (Some(0u64.into()), Some(1u64.into())));
        assert!(id.is_identity());
        assert!(!EmbeddedGroupAffine::generator().is_identity());
    }

    #[test]
    fn test_point_serde() {
        let mut rng = StdRng::seed_from_u64(0x42);
        let sk: EmbeddedFr = rng.r#gen();
        let pk = EmbeddedGroupAffine::generator() * sk;
        let json = serde_json::to_value(pk).unwrap();
        assert_eq!(json["x"], serde_json::Value::String(pk.x().unwrap().to_decimal()));
        let back: EmbeddedGroupAffine = serde_json::from_value(json).unwrap();
        assert_eq!(back, pk);
    }

    #[test]
    fn test_point_serde_rejects_off_curve() {
        let json = serde_json::json!({ "x": "1", "y": "1" });
        assert!(serde_json::from_value::<EmbeddedGroupAffine>(json).is_err());
    }

    #[test]
    fn test_fr_to_small_int() {
        assert_eq!(u64::try_from(Fr::from(99u64)), Ok(99));
        assert!(u64::try_from(Fr::from(u128::MAX)).is_err());
    }
}
