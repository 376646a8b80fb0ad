// Copyright 2026 Grzegorz Blach
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Signature verification dispatch.

use aws_lc_rs::signature::{
    RsaParameters, RsaPublicKeyComponents, UnparsedPublicKey, VerificationAlgorithm,
};

use crate::cose::CoseAlgorithm;

/// Public key material in the shape the verification primitives accept.
#[derive(Debug, Clone, Copy)]
pub enum PublicKeyMaterial<'a> {
    /// SEC1 uncompressed point, raw Ed25519 key, or PKCS#1 `RSAPublicKey` DER.
    Raw(&'a [u8]),
    /// Big-endian RSA modulus and exponent.
    RsaComponents { n: &'a [u8], e: &'a [u8] },
}

/// Verifies `signature` over `message` using the primitive registered for `alg`.
///
/// ECDSA signatures are expected in ASN.1 DER form, as authenticators emit them.
/// Every failure, including a key that does not fit the algorithm, is `false`.
pub fn verify_signature(
    alg: CoseAlgorithm,
    key: PublicKeyMaterial<'_>,
    message: &[u8],
    signature: &[u8],
) -> bool {
    let verified = match key {
        PublicKeyMaterial::Raw(bytes) => {
            verify_with(alg.verification_algorithm(), bytes, message, signature)
        }
        PublicKeyMaterial::RsaComponents { n, e } => match alg.rsa_parameters() {
            Some(params) => verify_rsa_components(params, n, e, message, signature),
            None => false,
        },
    };

    if !verified {
        tracing::debug!(alg = %alg, "signature did not verify");
    }
    verified
}

/// Verifies with an explicit primitive, for signatures outside the COSE registry
/// (certificate chains, JWS).
pub(crate) fn verify_with(
    algorithm: &'static dyn VerificationAlgorithm,
    public_key: &[u8],
    message: &[u8],
    signature: &[u8],
) -> bool {
    UnparsedPublicKey::new(algorithm, public_key)
        .verify(message, signature)
        .is_ok()
}

pub(crate) fn verify_rsa_components(
    params: &'static RsaParameters,
    n: &[u8],
    e: &[u8],
    message: &[u8],
    signature: &[u8],
) -> bool {
    RsaPublicKeyComponents { n, e }
        .verify(params, message, signature)
        .is_ok()
}
