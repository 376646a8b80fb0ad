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

//! X.509 helpers shared by the certificate-based attestation formats.

use std::time::{SystemTime, UNIX_EPOCH};

use aws_lc_rs::signature::{
    VerificationAlgorithm, ECDSA_P256_SHA256_ASN1, ECDSA_P256_SHA384_ASN1,
    ECDSA_P384_SHA256_ASN1, ECDSA_P384_SHA384_ASN1, ECDSA_P521_SHA512_ASN1, ED25519,
    RSA_PKCS1_2048_8192_SHA256, RSA_PKCS1_2048_8192_SHA384, RSA_PKCS1_2048_8192_SHA512,
};
use uuid::Uuid;
use x509_parser::prelude::*;
use x509_parser::public_key::PublicKey;
use x509_parser::time::ASN1Time;

use crate::cose::{CoseAlgorithm, CoseKey};
use crate::error::{Error, Result};
use crate::signature::{verify_signature, verify_with, PublicKeyMaterial};

/// id-fido-gen-ce-aaguid
pub(crate) const OID_FIDO_AAGUID: &str = "1.3.6.1.4.1.45724.1.1.4";

const OID_EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";
const OID_ECDSA_SHA256: &str = "1.2.840.10045.4.3.2";
const OID_ECDSA_SHA384: &str = "1.2.840.10045.4.3.3";
const OID_ECDSA_SHA512: &str = "1.2.840.10045.4.3.4";
const OID_RSA_SHA256: &str = "1.2.840.113549.1.1.11";
const OID_RSA_SHA384: &str = "1.2.840.113549.1.1.12";
const OID_RSA_SHA512: &str = "1.2.840.113549.1.1.13";
const OID_ED25519: &str = "1.3.101.112";

pub(crate) fn parse<'a>(format: &str, der: &'a [u8]) -> Result<X509Certificate<'a>> {
    let (_, cert) = parse_x509_certificate(der)
        .map_err(|e| Error::attestation(format, format!("invalid certificate: {}", e)))?;
    Ok(cert)
}

/// The raw subject public key: SEC1 point, Ed25519 key, or PKCS#1 RSA key.
pub(crate) fn public_key_bytes<'a>(cert: &'a X509Certificate<'_>) -> &'a [u8] {
    cert.public_key().subject_public_key.data.as_ref()
}

pub(crate) fn is_ec_p256(cert: &X509Certificate<'_>) -> bool {
    cert.public_key().algorithm.algorithm.to_id_string() == OID_EC_PUBLIC_KEY
        && public_key_bytes(cert).len() == 65
}

/// Verifies a statement signature with the certificate's key.
pub(crate) fn verify(
    format: &str,
    cert: &X509Certificate<'_>,
    alg: CoseAlgorithm,
    message: &[u8],
    signature: &[u8],
) -> Result<()> {
    if verify_signature(alg, PublicKeyMaterial::Raw(public_key_bytes(cert)), message, signature) {
        Ok(())
    } else {
        Err(Error::attestation(format, "signature does not verify with the certificate key"))
    }
}

/// Whether the certificate carries the same public key as the credential.
pub(crate) fn key_matches(cert: &X509Certificate<'_>, key: &CoseKey) -> bool {
    match key {
        CoseKey::Ec2 { .. } => key
            .uncompressed_point()
            .map(|point| point == public_key_bytes(cert))
            .unwrap_or(false),
        CoseKey::Okp { x, .. } => x.as_slice() == public_key_bytes(cert),
        CoseKey::Rsa { n, e, .. } => match cert.public_key().parsed() {
            Ok(PublicKey::RSA(rsa)) => {
                strip_leading_zeros(rsa.modulus) == strip_leading_zeros(n)
                    && strip_leading_zeros(rsa.exponent) == strip_leading_zeros(e)
            }
            _ => false,
        },
    }
}

pub(crate) fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

pub(crate) fn extension<'a>(
    cert: &'a X509Certificate<'_>,
    oid: &str,
) -> Option<&'a X509Extension<'a>> {
    cert.extensions()
        .iter()
        .find(|ext| ext.oid.to_id_string() == oid)
}

pub(crate) fn is_ca(cert: &X509Certificate<'_>) -> bool {
    cert.extensions()
        .iter()
        .any(|ext| matches!(ext.parsed_extension(), ParsedExtension::BasicConstraints(bc) if bc.ca))
}

pub(crate) fn has_extended_key_usage(cert: &X509Certificate<'_>, oid: &str) -> bool {
    cert.extensions().iter().any(|ext| match ext.parsed_extension() {
        ParsedExtension::ExtendedKeyUsage(eku) => {
            eku.other.iter().any(|o| o.to_id_string() == oid)
        }
        _ => false,
    })
}

/// If the certificate has an id-fido-gen-ce-aaguid extension, it must be
/// non-critical and equal to the authenticator's AAGUID.
pub(crate) fn check_aaguid(format: &str, cert: &X509Certificate<'_>, aaguid: &Uuid) -> Result<()> {
    let Some(ext) = extension(cert, OID_FIDO_AAGUID) else {
        return Ok(());
    };
    if ext.critical {
        return Err(Error::attestation(format, "AAGUID extension must not be critical"));
    }

    let (_, value) = der_parser::der::parse_der_octetstring(ext.value)
        .map_err(|_| Error::attestation(format, "invalid AAGUID extension"))?;
    let value = value
        .as_slice()
        .map_err(|_| Error::attestation(format, "invalid AAGUID extension"))?;
    if value != aaguid.as_bytes() {
        return Err(Error::attestation(
            format,
            "certificate AAGUID does not match authenticator data",
        ));
    }
    Ok(())
}

/// Parses `x5c` (leaf first) and checks the chain at `now`.
pub(crate) fn parse_chain<'a>(
    format: &str,
    x5c: &'a [Vec<u8>],
    now: SystemTime,
) -> Result<Vec<X509Certificate<'a>>> {
    let chain = x5c
        .iter()
        .map(|der| parse(format, der))
        .collect::<Result<Vec<_>>>()?;
    if chain.is_empty() {
        return Err(Error::attestation(format, "x5c is empty"));
    }
    verify_chain(format, &chain, now)?;
    Ok(chain)
}

/// Checks that every certificate is valid at `now` and signed by the next
/// one. A self-issued last certificate must carry a valid self-signature.
/// The last certificate is not checked against any root.
fn verify_chain(
    format: &str,
    chain: &[X509Certificate<'_>],
    now: SystemTime,
) -> Result<()> {
    let at = asn1_time(format, now)?;
    for cert in chain {
        if !cert.validity().is_valid_at(at) {
            return Err(Error::attestation(format, "certificate outside its validity period"));
        }
    }

    for pair in chain.windows(2) {
        if !issued_by(&pair[0], &pair[1]) {
            return Err(Error::attestation(
                format,
                "certificate is not signed by the next certificate in x5c",
            ));
        }
    }

    if let Some(last) = chain.last() {
        if last.issuer().as_raw() == last.subject().as_raw() && !issued_by(last, last) {
            return Err(Error::attestation(format, "self-signed certificate signature invalid"));
        }
    }
    Ok(())
}

fn asn1_time(format: &str, now: SystemTime) -> Result<ASN1Time> {
    let secs = now
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| i64::try_from(d.as_secs()).ok())
        .ok_or_else(|| Error::attestation(format, "clock is before the UNIX epoch"))?;
    ASN1Time::from_timestamp(secs)
        .map_err(|_| Error::attestation(format, "clock is out of the certificate time range"))
}

fn issued_by(child: &X509Certificate<'_>, issuer: &X509Certificate<'_>) -> bool {
    let issuer_key = public_key_bytes(issuer);
    let Some(algorithm) = chain_algorithm(
        &child.signature_algorithm.algorithm.to_id_string(),
        issuer_key.len(),
    ) else {
        tracing::debug!(
            algorithm = %child.signature_algorithm.algorithm.to_id_string(),
            "unsupported certificate signature algorithm"
        );
        return false;
    };

    verify_with(
        algorithm,
        issuer_key,
        child.tbs_certificate.as_ref(),
        child.signature_value.data.as_ref(),
    )
}

/// Certificate signature primitive, with the ECDSA curve taken from the
/// issuer's point length.
fn chain_algorithm(oid: &str, issuer_key_len: usize) -> Option<&'static dyn VerificationAlgorithm> {
    let algorithm: &'static dyn VerificationAlgorithm = match (oid, issuer_key_len) {
        (OID_ECDSA_SHA256, 65) => &ECDSA_P256_SHA256_ASN1,
        (OID_ECDSA_SHA384, 65) => &ECDSA_P256_SHA384_ASN1,
        (OID_ECDSA_SHA256, 97) => &ECDSA_P384_SHA256_ASN1,
        (OID_ECDSA_SHA384, 97) => &ECDSA_P384_SHA384_ASN1,
        (OID_ECDSA_SHA512, 133) => &ECDSA_P521_SHA512_ASN1,
        (OID_RSA_SHA256, _) => &RSA_PKCS1_2048_8192_SHA256,
        (OID_RSA_SHA384, _) => &RSA_PKCS1_2048_8192_SHA384,
        (OID_RSA_SHA512, _) => &RSA_PKCS1_2048_8192_SHA512,
        (OID_ED25519, 32) => &ED25519,
        _ => return None,
    };
    Some(algorithm)
}

/// Requirements on a `packed` attestation certificate.
pub(crate) fn check_packed_requirements(format: &str, cert: &X509Certificate<'_>) -> Result<()> {
    if cert.version() != X509Version::V3 {
        return Err(Error::attestation(format, "certificate must be version 3"));
    }

    let subject = cert.subject();
    if subject.iter_country().next().is_none()
        || subject.iter_organization().next().is_none()
        || subject.iter_common_name().next().is_none()
    {
        return Err(Error::attestation(format, "certificate subject is incomplete"));
    }
    let attestation_ou = subject
        .iter_organizational_unit()
        .any(|ou| ou.as_str().map(|s| s == "Authenticator Attestation").unwrap_or(false));
    if !attestation_ou {
        return Err(Error::attestation(
            format,
            "certificate OU must be \"Authenticator Attestation\"",
        ));
    }

    if is_ca(cert) {
        return Err(Error::attestation(format, "certificate must not be a CA"));
    }
    Ok(())
}

pub(crate) fn common_name(cert: &X509Certificate<'_>) -> Option<String> {
    cert.subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_string)
}
