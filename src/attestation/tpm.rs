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

//! `tpm` attestation.
//!
//! The TPM certifies the credential key (`pubArea`) in a `TPMS_ATTEST`
//! structure (`certInfo`) signed by its attestation identity key (AIK). All
//! TPM structures are big-endian with 16-bit length-prefixed byte buffers.

use std::time::SystemTime;

use aws_lc_rs::digest::{self, SHA256, SHA384, SHA512};
use x509_parser::prelude::*;

use crate::authenticator_data::AuthenticatorData;
use crate::cose::{CoseAlgorithm, CoseKey, EcCurve};
use crate::error::{Error, Result};

use super::{attested_credential, certificate, signed_data, StatementMap};
use super::{AttestationType, VerifiedAttestation};

pub(crate) const FORMAT: &str = "tpm";

const TPM_GENERATED_VALUE: u32 = 0xff54_4347;
const TPM_ST_ATTEST_CERTIFY: u16 = 0x8017;

const TPM_ALG_RSA: u16 = 0x0001;
const TPM_ALG_SHA256: u16 = 0x000b;
const TPM_ALG_SHA384: u16 = 0x000c;
const TPM_ALG_SHA512: u16 = 0x000d;
const TPM_ALG_ECC: u16 = 0x0023;

const TPM_ECC_NIST_P256: u16 = 0x0003;
const TPM_ECC_NIST_P384: u16 = 0x0004;
const TPM_ECC_NIST_P521: u16 = 0x0005;

const RSA_DEFAULT_EXPONENT: u32 = 65537;

/// tcg-kp-AIKCertificate
const OID_TCG_KP_AIK_CERTIFICATE: &str = "2.23.133.8.3";

#[derive(Debug, Clone)]
pub struct TpmStatement {
    pub alg: CoseAlgorithm,
    pub sig: Vec<u8>,
    /// AIK certificate first.
    pub x5c: Vec<Vec<u8>>,
    pub cert_info: Vec<u8>,
    pub pub_area: Vec<u8>,
}

impl TpmStatement {
    pub(crate) fn from_map(map: StatementMap<'_>) -> Result<Self> {
        if map.text("ver")? != "2.0" {
            return Err(map.reject("ver must be \"2.0\""));
        }
        if map.contains("ecdaaKeyId") {
            return Err(map.reject("ECDAA attestation is not supported"));
        }
        Ok(Self {
            alg: map.algorithm()?,
            sig: map.bytes("sig")?,
            x5c: map.required_certificates()?,
            cert_info: map.bytes("certInfo")?,
            pub_area: map.bytes("pubArea")?,
        })
    }

    pub(crate) fn verify(
        &self,
        auth_data: &AuthenticatorData,
        client_data_hash: &[u8],
        now: SystemTime,
    ) -> Result<VerifiedAttestation> {
        let credential = attested_credential(FORMAT, auth_data)?;

        let pub_area = PubArea::parse(&self.pub_area)?;
        if !pub_area.matches(&credential.public_key) {
            return Err(Error::attestation(
                FORMAT,
                "pubArea key does not match credential key",
            ));
        }

        let cert_info = CertInfo::parse(&self.cert_info)?;
        if cert_info.magic != TPM_GENERATED_VALUE {
            return Err(Error::attestation(FORMAT, "certInfo magic is not TPM_GENERATED_VALUE"));
        }
        if cert_info.type_ != TPM_ST_ATTEST_CERTIFY {
            return Err(Error::attestation(FORMAT, "certInfo type is not TPM_ST_ATTEST_CERTIFY"));
        }

        let att_to_be_signed = signed_data(auth_data, client_data_hash);
        let expected_extra_data =
            digest::digest(self.alg.digest_algorithm(), &att_to_be_signed);
        if cert_info.extra_data != expected_extra_data.as_ref() {
            return Err(Error::attestation(FORMAT, "certInfo extraData does not match"));
        }

        if !cert_info.certifies(&self.pub_area)? {
            return Err(Error::attestation(
                FORMAT,
                "certInfo attested name does not match pubArea",
            ));
        }

        let chain = certificate::parse_chain(FORMAT, &self.x5c, now)?;
        let aik = &chain[0];
        certificate::verify(FORMAT, aik, self.alg, &self.cert_info, &self.sig)?;
        check_aik_requirements(aik)?;
        certificate::check_aaguid(FORMAT, aik, &credential.aaguid)?;

        Ok(VerifiedAttestation::new(AttestationType::AttestationCa, self.x5c.clone()))
    }
}

fn check_aik_requirements(aik: &X509Certificate<'_>) -> Result<()> {
    if aik.version() != X509Version::V3 {
        return Err(Error::attestation(FORMAT, "AIK certificate must be version 3"));
    }
    if aik.subject().iter_attributes().next().is_some() {
        return Err(Error::attestation(FORMAT, "AIK certificate subject must be empty"));
    }
    if !certificate::has_extended_key_usage(aik, OID_TCG_KP_AIK_CERTIFICATE) {
        return Err(Error::attestation(
            FORMAT,
            "AIK certificate lacks the tcg-kp-AIKCertificate usage",
        ));
    }
    if certificate::is_ca(aik) {
        return Err(Error::attestation(FORMAT, "AIK certificate must not be a CA"));
    }
    Ok(())
}

fn name_digest(name_alg: u16) -> Option<&'static digest::Algorithm> {
    match name_alg {
        TPM_ALG_SHA256 => Some(&SHA256),
        TPM_ALG_SHA384 => Some(&SHA384),
        TPM_ALG_SHA512 => Some(&SHA512),
        _ => None,
    }
}

/// Sequential big-endian reader over a TPM structure.
struct Reader<'a> {
    bytes: &'a [u8],
    what: &'static str,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8], what: &'static str) -> Self {
        Self { bytes, what }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.bytes.len() < len {
            return Err(Error::attestation(FORMAT, format!("{} truncated", self.what)));
        }
        let (head, tail) = self.bytes.split_at(len);
        self.bytes = tail;
        Ok(head)
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// A TPM2B buffer: u16 length followed by that many bytes.
    fn sized(&mut self) -> Result<&'a [u8]> {
        let len = self.u16()? as usize;
        self.take(len)
    }
}

#[derive(Debug)]
enum PubAreaKey<'a> {
    Rsa { exponent: u32, modulus: &'a [u8] },
    Ecc { curve: u16, x: &'a [u8], y: &'a [u8] },
}

/// `TPMT_PUBLIC`, assuming null symmetric, scheme and KDF parameters.
#[derive(Debug)]
struct PubArea<'a> {
    key: PubAreaKey<'a>,
}

impl<'a> PubArea<'a> {
    fn parse(bytes: &'a [u8]) -> Result<Self> {
        let mut r = Reader::new(bytes, "pubArea");
        let type_ = r.u16()?;
        let _name_alg = r.u16()?;
        let _object_attributes = r.u32()?;
        let _auth_policy = r.sized()?;

        let key = match type_ {
            TPM_ALG_RSA => {
                let _symmetric = r.u16()?;
                let _scheme = r.u16()?;
                let _key_bits = r.u16()?;
                let exponent = match r.u32()? {
                    0 => RSA_DEFAULT_EXPONENT,
                    e => e,
                };
                let modulus = r.sized()?;
                PubAreaKey::Rsa { exponent, modulus }
            }
            TPM_ALG_ECC => {
                let _symmetric = r.u16()?;
                let _scheme = r.u16()?;
                let curve = r.u16()?;
                let _kdf = r.u16()?;
                let x = r.sized()?;
                let y = r.sized()?;
                PubAreaKey::Ecc { curve, x, y }
            }
            other => {
                return Err(Error::attestation(
                    FORMAT,
                    format!("unsupported pubArea type {:#06x}", other),
                ))
            }
        };

        Ok(PubArea { key })
    }

    fn matches(&self, key: &CoseKey) -> bool {
        match (&self.key, key) {
            (PubAreaKey::Rsa { exponent, modulus }, CoseKey::Rsa { n, e, .. }) => {
                let e = certificate::strip_leading_zeros(e);
                let expected_e = exponent.to_be_bytes();
                certificate::strip_leading_zeros(modulus) == certificate::strip_leading_zeros(n)
                    && e == certificate::strip_leading_zeros(&expected_e)
            }
            (PubAreaKey::Ecc { curve, x, y }, CoseKey::Ec2 { curve: cose_curve, x: cx, y: cy, .. }) => {
                let expected_curve = match cose_curve {
                    EcCurve::P256 => TPM_ECC_NIST_P256,
                    EcCurve::P384 => TPM_ECC_NIST_P384,
                    EcCurve::P521 => TPM_ECC_NIST_P521,
                };
                *curve == expected_curve && x == cx && y == cy
            }
            _ => false,
        }
    }
}

/// `TPMS_ATTEST` carrying a `TPMS_CERTIFY_INFO`.
#[derive(Debug)]
struct CertInfo<'a> {
    magic: u32,
    type_: u16,
    extra_data: &'a [u8],
    attested_name: &'a [u8],
}

impl<'a> CertInfo<'a> {
    fn parse(bytes: &'a [u8]) -> Result<Self> {
        let mut r = Reader::new(bytes, "certInfo");
        let magic = r.u32()?;
        let type_ = r.u16()?;
        let _qualified_signer = r.sized()?;
        let extra_data = r.sized()?;
        let _clock_info = r.take(17)?;
        let _firmware_version = r.take(8)?;
        let attested_name = r.sized()?;
        let _attested_qualified_name = r.sized()?;

        Ok(CertInfo {
            magic,
            type_,
            extra_data,
            attested_name,
        })
    }

    /// Whether the attested name is `nameAlg || H_nameAlg(pubArea)`.
    fn certifies(&self, pub_area: &[u8]) -> Result<bool> {
        if self.attested_name.len() < 2 {
            return Ok(false);
        }
        let (alg, hash) = self.attested_name.split_at(2);
        let name_alg = u16::from_be_bytes([alg[0], alg[1]]);
        let algorithm = name_digest(name_alg).ok_or_else(|| {
            Error::attestation(FORMAT, format!("unsupported name algorithm {:#06x}", name_alg))
        })?;
        Ok(digest::digest(algorithm, pub_area).as_ref() == hash)
    }
}
