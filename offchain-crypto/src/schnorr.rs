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

//! Schnorr signatures over the embedded Jubjub curve, in two-scalar form.
//!
//! A signature is the pair `(r, s)`, where `r` is the `x` coordinate of the
//! announcement `R = k * G` and `s = k + c * sk` is the response. The
//! challenge `c` is a Poseidon hash over `r`, the public key coordinates, and
//! the message, reduced into the embedded scalar field.

use crate::curve::{EmbeddedFr, EmbeddedGroupAffine, Fr};
use crate::hash::transient_hash;
use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A Schnorr signature over the Jubjub curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
    /// The announcement's `x` coordinate.
    pub r: Fr,
    /// The response scalar, `s = k + c * sk`.
    pub s: EmbeddedFr,
}

/// A public key that signatures are checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerifyingKey(pub EmbeddedGroupAffine);

/// A secret signing key. Wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SigningKey(EmbeddedFr);

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(formatter, "<signing key>")
    }
}

fn compute_challenge(r: Fr, pk: &EmbeddedGroupAffine, msg: &[Fr]) -> Option<EmbeddedFr> {
    let mut hash_input = vec![r, pk.x()?, pk.y()?];
    hash_input.extend_from_slice(msg);
    Some(fr_to_embedded_fr(transient_hash(&hash_input)))
}

/// Converts a BLS12-381 scalar field element to a Jubjub scalar field element
/// by reducing modulo the Jubjub scalar field order.
fn fr_to_embedded_fr(fr: Fr) -> EmbeddedFr {
    let mut wide = [0u8; 64];
    wide[..32].copy_from_slice(&fr.as_le_bytes());
    EmbeddedFr::from_bytes_wide(&wide)
}

impl SigningKey {
    /// Samples a fresh, non-zero signing key.
    pub fn sample<R: Rng + CryptoRng>(rng: &mut R) -> Self {
        loop {
            let sk: EmbeddedFr = rng.r#gen();
            if sk != EmbeddedFr::from(0u64) {
                return SigningKey(sk);
            }
        }
    }

    /// The public key matching this signing key.
    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey(EmbeddedGroupAffine::generator() * self.0)
    }

    /// Produces a signature over a sequence of field elements.
    pub fn sign<R: Rng + CryptoRng>(&self, rng: &mut R, msg: &[Fr]) -> Signature {
        let pk = self.verifying_key().0;
        loop {
            let nonce: EmbeddedFr = rng.r#gen();
            let announcement = EmbeddedGroupAffine::generator() * nonce;
            if announcement.is_identity() {
                continue;
            }
            let (Some(r), Some(c)) = (
                announcement.x(),
                announcement
                    .x()
                    .and_then(|r| compute_challenge(r, &pk, msg)),
            ) else {
                continue;
            };
            return Signature {
                r,
                s: nonce + c * self.0,
            };
        }
    }
}

impl VerifyingKey {
    /// Verifies a signature over a sequence of field elements.
    ///
    /// Rejects the identity as a public key.
    pub fn verify(&self, msg: &[Fr], sig: &Signature) -> bool {
        if self.0.is_identity() {
            return false;
        }
        let Some(challenge) = compute_challenge(sig.r, &self.0, msg) else {
            return false;
        };
        let announcement = EmbeddedGroupAffine::generator() * sig.s - self.0 * challenge;
        !announcement.is_identity() && announcement.x() == Some(sig.r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn test_sign_verify_roundtrip() {
        let mut rng = StdRng::seed_from_u64(0x42);
        let sk = SigningKey::sample(&mut rng);
        let pk = sk.verifying_key();
        let msg = vec![Fr::from(1u64), Fr::from(2u64)];
        let sig = sk.sign(&mut rng, &msg);
        assert!(pk.verify(&msg, &sig), "signature should be valid");
    }

    #[test]
    fn test_wrong_message_fails() {
        let mut rng = StdRng::seed_from_u64(0x43);
        let sk = SigningKey::sample(&mut rng);
        let pk = sk.verifying_key();
        let sig = sk.sign(&mut rng, &[Fr::from(1u64), Fr::from(2u64)]);
        assert!(!pk.verify(&[Fr::from(1u64), Fr::from(3u64)], &sig));
        // Field order within the message is significant.
        assert!(!pk.verify(&[Fr::from(2u64), Fr::from(1u64)], &sig));
    }

    #[test]
    fn test_wrong_key_fails() {
        let mut rng = StdRng::seed_from_u64(0x44);
        let sk = SigningKey::sample(&mut rng);
        let wrong_pk = SigningKey::sample(&mut rng).verifying_key();
        let msg = vec![Fr::from(42u64)];
        let sig = sk.sign(&mut rng, &msg);
        assert!(!wrong_pk.verify(&msg, &sig));
    }

    #[test]
    fn test_tampered_response_fails() {
        let mut rng = StdRng::seed_from_u64(0x45);
        let sk = SigningKey::sample(&mut rng);
        let msg = vec![Fr::from(7u64)];
        let mut sig = sk.sign(&mut rng, &msg);
        sig.s = sig.s + EmbeddedFr::from(1u64);
        assert!(!sk.verifying_key().verify(&msg, &sig));
    }

    #[test]
    fn test_identity_pk_returns_false() {
        let mut rng = StdRng::seed_from_u64(0x46);
        let sk = SigningKey::sample(&mut rng);
        let msg = vec![Fr::from(1u64)];
        let sig = sk.sign(&mut rng, &msg);
        let identity_pk = VerifyingKey(EmbeddedGroupAffine::identity());
        assert!(!identity_pk.verify(&msg, &sig));
    }

    #[test]
    fn test_signature_json_is_two_scalars() {
        let mut rng = StdRng::seed_from_u64(0x47);
        let sk = SigningKey::sample(&mut rng);
        let msg = vec![Fr::from(1u64)];
        let sig = sk.sign(&mut rng, &msg);
        let json = serde_json::to_value(sig).unwrap();
        assert!(json["r"].is_string());
        assert!(json["s"].is_string());
        let back: Signature = serde_json::from_value(json).unwrap();
        assert!(sk.verifying_key().verify(&msg, &back));
    }
}
