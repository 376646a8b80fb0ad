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

//! COSE_Key decoding and algorithm descriptors.

use std::fmt;

use aws_lc_rs::digest;
use aws_lc_rs::signature::{
    RsaParameters, VerificationAlgorithm, ECDSA_P256_SHA256_ASN1, ECDSA_P384_SHA384_ASN1,
    ECDSA_P521_SHA512_ASN1, ED25519, RSA_PKCS1_2048_8192_SHA256, RSA_PSS_2048_8192_SHA256,
};
use ciborium::Value;

use crate::error::{Error, Result};
use crate::signature::{verify_signature, PublicKeyMaterial};

// COSE_Key map labels (RFC 8152 section 7 and 13)
pub(crate) const LABEL_KTY: i64 = 1;
pub(crate) const LABEL_ALG: i64 = 3;
pub(crate) const LABEL_CRV: i64 = -1;
pub(crate) const LABEL_X: i64 = -2;
pub(crate) const LABEL_Y: i64 = -3;
pub(crate) const LABEL_N: i64 = -1;
pub(crate) const LABEL_E: i64 = -2;

const KTY_OKP: i64 = 1;
const KTY_EC2: i64 = 2;
const KTY_RSA: i64 = 3;

/// A signature algorithm registered in the COSE algorithms registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoseAlgorithm {
    /// ECDSA over P-256 with SHA-256 (-7).
    ES256,
    /// ECDSA over P-384 with SHA-384 (-35).
    ES384,
    /// ECDSA over P-521 with SHA-512 (-36).
    ES512,
    /// RSASSA-PKCS1-v1_5 with SHA-256 (-257).
    RS256,
    /// RSASSA-PSS with SHA-256 (-37).
    PS256,
    /// EdDSA over Ed25519 (-8).
    EdDSA,
}

impl CoseAlgorithm {
    /// Returns the COSE algorithm identifier.
    pub fn id(self) -> i64 {
        match self {
            CoseAlgorithm::ES256 => -7,
            CoseAlgorithm::ES384 => -35,
            CoseAlgorithm::ES512 => -36,
            CoseAlgorithm::RS256 => -257,
            CoseAlgorithm::PS256 => -37,
            CoseAlgorithm::EdDSA => -8,
        }
    }

    /// The digest used by the algorithm (SHA-512 for EdDSA, which hashes internally).
    pub fn digest_algorithm(self) -> &'static digest::Algorithm {
        match self {
            CoseAlgorithm::ES256 | CoseAlgorithm::RS256 | CoseAlgorithm::PS256 => &digest::SHA256,
            CoseAlgorithm::ES384 => &digest::SHA384,
            CoseAlgorithm::ES512 | CoseAlgorithm::EdDSA => &digest::SHA512,
        }
    }

    pub(crate) fn verification_algorithm(self) -> &'static dyn VerificationAlgorithm {
        match self {
            CoseAlgorithm::ES256 => &ECDSA_P256_SHA256_ASN1,
            CoseAlgorithm::ES384 => &ECDSA_P384_SHA384_ASN1,
            CoseAlgorithm::ES512 => &ECDSA_P521_SHA512_ASN1,
            CoseAlgorithm::RS256 => &RSA_PKCS1_2048_8192_SHA256,
            CoseAlgorithm::PS256 => &RSA_PSS_2048_8192_SHA256,
            CoseAlgorithm::EdDSA => &ED25519,
        }
    }

    pub(crate) fn rsa_parameters(self) -> Option<&'static RsaParameters> {
        match self {
            CoseAlgorithm::RS256 => Some(&RSA_PKCS1_2048_8192_SHA256),
            CoseAlgorithm::PS256 => Some(&RSA_PSS_2048_8192_SHA256),
            _ => None,
        }
    }

    fn ec_curve(self) -> Option<EcCurve> {
        match self {
            CoseAlgorithm::ES256 => Some(EcCurve::P256),
            CoseAlgorithm::ES384 => Some(EcCurve::P384),
            CoseAlgorithm::ES512 => Some(EcCurve::P521),
            _ => None,
        }
    }
}

impl TryFrom<i64> for CoseAlgorithm {
    type Error = Error;

    fn try_from(id: i64) -> Result<Self> {
        match id {
            -7 => Ok(CoseAlgorithm::ES256),
            -35 => Ok(CoseAlgorithm::ES384),
            -36 => Ok(CoseAlgorithm::ES512),
            -257 => Ok(CoseAlgorithm::RS256),
            -37 => Ok(CoseAlgorithm::PS256),
            -8 => Ok(CoseAlgorithm::EdDSA),
            _ => Err(Error::UnsupportedAlgorithm(format!("COSE algorithm {}", id))),
        }
    }
}

impl fmt::Display for CoseAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.id())
    }
}

/// NIST curves usable with EC2 keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcCurve {
    P256,
    P384,
    P521,
}

impl EcCurve {
    fn from_id(id: i64) -> Result<Self> {
        match id {
            1 => Ok(EcCurve::P256),
            2 => Ok(EcCurve::P384),
            3 => Ok(EcCurve::P521),
            _ => Err(Error::UnsupportedAlgorithm(format!("EC2 curve {}", id))),
        }
    }

    pub fn id(self) -> i64 {
        match self {
            EcCurve::P256 => 1,
            EcCurve::P384 => 2,
            EcCurve::P521 => 3,
        }
    }

    /// Length in bytes of a single affine coordinate.
    pub fn coordinate_len(self) -> usize {
        match self {
            EcCurve::P256 => 32,
            EcCurve::P384 => 48,
            EcCurve::P521 => 66,
        }
    }
}

/// Curves usable with OKP keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OkpCurve {
    Ed25519,
}

impl OkpCurve {
    fn from_id(id: i64) -> Result<Self> {
        match id {
            6 => Ok(OkpCurve::Ed25519),
            _ => Err(Error::UnsupportedAlgorithm(format!("OKP curve {}", id))),
        }
    }

    pub fn id(self) -> i64 {
        match self {
            OkpCurve::Ed25519 => 6,
        }
    }
}

/// A decoded credential public key.
///
/// Each variant carries only the material of its key type; the algorithm has
/// already been checked against the key type and curve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoseKey {
    Ec2 {
        alg: CoseAlgorithm,
        curve: EcCurve,
        x: Vec<u8>,
        y: Vec<u8>,
    },
    Rsa {
        alg: CoseAlgorithm,
        n: Vec<u8>,
        e: Vec<u8>,
    },
    Okp {
        alg: CoseAlgorithm,
        curve: OkpCurve,
        x: Vec<u8>,
    },
}

impl CoseKey {
    /// Decodes a COSE key that must span the whole buffer.
    pub fn from_bytes(bytes: &[u8]) -> Result<CoseKey> {
        let (key, consumed) = Self::from_slice(bytes)?;
        if consumed != bytes.len() {
            return Err(Error::MalformedPublicKey(format!(
                "{} trailing bytes after COSE key",
                bytes.len() - consumed
            )));
        }
        Ok(key)
    }

    /// Decodes a COSE key from the start of `bytes`, returning the key and the
    /// number of bytes it occupied.
    pub fn from_slice(bytes: &[u8]) -> Result<(CoseKey, usize)> {
        let mut remaining = bytes;
        let value: Value = ciborium::from_reader(&mut remaining)
            .map_err(|e| Error::MalformedPublicKey(format!("Failed to parse COSE key: {}", e)))?;
        let consumed = bytes.len() - remaining.len();
        Ok((Self::from_value(&value)?, consumed))
    }

    /// Decodes a COSE key from an already parsed CBOR value.
    pub fn from_value(value: &Value) -> Result<CoseKey> {
        let map = value
            .as_map()
            .ok_or_else(|| Error::MalformedPublicKey("COSE key is not a map".into()))?;

        let kty = int_field(map, LABEL_KTY)
            .ok_or_else(|| Error::MalformedPublicKey("Missing kty in COSE key".into()))?;
        let alg = int_field(map, LABEL_ALG)
            .ok_or_else(|| Error::MalformedPublicKey("Missing alg in COSE key".into()))?;
        let alg = CoseAlgorithm::try_from(alg)?;

        match kty {
            KTY_EC2 => {
                let curve = int_field(map, LABEL_CRV)
                    .ok_or_else(|| Error::MalformedPublicKey("Missing crv in COSE key".into()))
                    .and_then(EcCurve::from_id)?;
                if alg.ec_curve() != Some(curve) {
                    return Err(Error::UnsupportedAlgorithm(format!(
                        "{} is not usable with curve {:?}",
                        alg, curve
                    )));
                }
                let x = bytes_field(map, LABEL_X, "x coordinate")?;
                let y = bytes_field(map, LABEL_Y, "y coordinate")?;
                if x.len() != curve.coordinate_len() || y.len() != curve.coordinate_len() {
                    return Err(Error::MalformedPublicKey(format!(
                        "Invalid {:?} coordinate length",
                        curve
                    )));
                }
                Ok(CoseKey::Ec2 { alg, curve, x, y })
            }
            KTY_RSA => {
                if alg.rsa_parameters().is_none() {
                    return Err(Error::UnsupportedAlgorithm(format!(
                        "{} is not an RSA algorithm",
                        alg
                    )));
                }
                let n = bytes_field(map, LABEL_N, "n (modulus)")?;
                let e = bytes_field(map, LABEL_E, "e (exponent)")?;
                if n.is_empty() || e.is_empty() {
                    return Err(Error::MalformedPublicKey("Empty RSA key component".into()));
                }
                Ok(CoseKey::Rsa { alg, n, e })
            }
            KTY_OKP => {
                let curve = int_field(map, LABEL_CRV)
                    .ok_or_else(|| Error::MalformedPublicKey("Missing crv in COSE key".into()))
                    .and_then(OkpCurve::from_id)?;
                if alg != CoseAlgorithm::EdDSA {
                    return Err(Error::UnsupportedAlgorithm(format!(
                        "{} is not usable with an OKP key",
                        alg
                    )));
                }
                let x = bytes_field(map, LABEL_X, "x coordinate")?;
                if x.len() != 32 {
                    return Err(Error::MalformedPublicKey(
                        "Invalid Ed25519 public key length".into(),
                    ));
                }
                Ok(CoseKey::Okp { alg, curve, x })
            }
            _ => Err(Error::UnsupportedAlgorithm(format!("COSE key type {}", kty))),
        }
    }

    /// Encodes the key as a canonical COSE_Key CBOR map.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let label = |l: i64| Value::Integer(l.into());
        let entries = match self {
            CoseKey::Ec2 { alg, curve, x, y } => vec![
                (label(LABEL_KTY), label(KTY_EC2)),
                (label(LABEL_ALG), label(alg.id())),
                (label(LABEL_CRV), label(curve.id())),
                (label(LABEL_X), Value::Bytes(x.clone())),
                (label(LABEL_Y), Value::Bytes(y.clone())),
            ],
            CoseKey::Rsa { alg, n, e } => vec![
                (label(LABEL_KTY), label(KTY_RSA)),
                (label(LABEL_ALG), label(alg.id())),
                (label(LABEL_N), Value::Bytes(n.clone())),
                (label(LABEL_E), Value::Bytes(e.clone())),
            ],
            CoseKey::Okp { alg, curve, x } => vec![
                (label(LABEL_KTY), label(KTY_OKP)),
                (label(LABEL_ALG), label(alg.id())),
                (label(LABEL_CRV), label(curve.id())),
                (label(LABEL_X), Value::Bytes(x.clone())),
            ],
        };

        let mut out = Vec::new();
        ciborium::into_writer(&Value::Map(entries), &mut out)
            .map_err(|e| Error::MalformedPublicKey(format!("Failed to encode COSE key: {}", e)))?;
        Ok(out)
    }

    pub fn algorithm(&self) -> CoseAlgorithm {
        match self {
            CoseKey::Ec2 { alg, .. } | CoseKey::Rsa { alg, .. } | CoseKey::Okp { alg, .. } => *alg,
        }
    }

    /// The SEC1 uncompressed point (`0x04 || x || y`) of an EC2 key.
    pub fn uncompressed_point(&self) -> Option<Vec<u8>> {
        match self {
            CoseKey::Ec2 { x, y, .. } => {
                let mut point = Vec::with_capacity(1 + x.len() + y.len());
                point.push(0x04);
                point.extend_from_slice(x);
                point.extend_from_slice(y);
                Some(point)
            }
            _ => None,
        }
    }

    /// Verifies `signature` over `message` with this key and its own algorithm.
    ///
    /// Returns `false` on any cryptographic mismatch.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        match self {
            CoseKey::Ec2 { alg, .. } => match self.uncompressed_point() {
                Some(point) => {
                    verify_signature(*alg, PublicKeyMaterial::Raw(&point), message, signature)
                }
                None => false,
            },
            CoseKey::Rsa { alg, n, e } => verify_signature(
                *alg,
                PublicKeyMaterial::RsaComponents { n, e },
                message,
                signature,
            ),
            CoseKey::Okp { alg, x, .. } => {
                verify_signature(*alg, PublicKeyMaterial::Raw(x), message, signature)
            }
        }
    }
}

fn find(map: &[(Value, Value)], label: i64) -> Option<&Value> {
    map.iter()
        .find(|(k, _)| k.as_integer() == Some(label.into()))
        .map(|(_, v)| v)
}

fn int_field(map: &[(Value, Value)], label: i64) -> Option<i64> {
    find(map, label)
        .and_then(|v| v.as_integer())
        .and_then(|i| i.try_into().ok())
}

fn bytes_field(map: &[(Value, Value)], label: i64, name: &str) -> Result<Vec<u8>> {
    find(map, label)
        .and_then(|v| v.as_bytes())
        .cloned()
        .ok_or_else(|| Error::MalformedPublicKey(format!("Missing {} in COSE key", name)))
}
