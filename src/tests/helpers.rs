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

use crate::*;
use aws_lc_rs::digest::{self, SHA256};
use aws_lc_rs::rand::SystemRandom;
use aws_lc_rs::rsa::KeySize;
use aws_lc_rs::signature::{
    EcdsaKeyPair, EcdsaSigningAlgorithm, Ed25519KeyPair, KeyPair, RsaKeyPair,
    ECDSA_P256_SHA256_ASN1_SIGNING, ECDSA_P384_SHA384_ASN1_SIGNING,
    ECDSA_P521_SHA512_ASN1_SIGNING, RSA_PKCS1_SHA256, RSA_PSS_SHA256,
};
use ciborium::Value;

pub const RP_ID: &str = "example.com";
pub const ORIGIN: &str = "https://example.com";
pub const AAGUID: [u8; 16] = [
    0x2f, 0xc0, 0x57, 0x9f, 0x81, 0x13, 0x47, 0xea, 0xb1, 0x16, 0xbb, 0x5a, 0x8d, 0xb9, 0x20, 0x2a,
];

enum SigningKey {
    Ecdsa(EcdsaKeyPair),
    Ed25519(Ed25519KeyPair),
    Rsa(RsaKeyPair),
}

/// A software authenticator credential: a key pair plus its COSE public key.
pub struct TestCredential {
    key: SigningKey,
    pub cose_key: CoseKey,
}

impl TestCredential {
    /// Generates a fresh key pair for `alg`.
    pub fn generate(alg: CoseAlgorithm) -> Self {
        let rng = SystemRandom::new();
        match alg {
            CoseAlgorithm::ES256 | CoseAlgorithm::ES384 | CoseAlgorithm::ES512 => {
                let pkcs8 = EcdsaKeyPair::generate_pkcs8(ecdsa_signing(alg), &rng).unwrap();
                Self::from_ecdsa_pkcs8(alg, pkcs8.as_ref())
            }
            CoseAlgorithm::EdDSA => {
                let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).unwrap();
                let key_pair = Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).unwrap();
                let cose_key = CoseKey::Okp {
                    alg,
                    curve: OkpCurve::Ed25519,
                    x: key_pair.public_key().as_ref().to_vec(),
                };
                Self {
                    key: SigningKey::Ed25519(key_pair),
                    cose_key,
                }
            }
            CoseAlgorithm::RS256 | CoseAlgorithm::PS256 => {
                let key_pair = RsaKeyPair::generate(KeySize::Rsa2048).unwrap();
                let (n, e) = parse_rsa_public_key(key_pair.public_key().as_ref());
                Self {
                    key: SigningKey::Rsa(key_pair),
                    cose_key: CoseKey::Rsa { alg, n, e },
                }
            }
        }
    }

    /// Wraps an existing ECDSA PKCS#8 key, e.g. one that also backs a test certificate.
    pub fn from_ecdsa_pkcs8(alg: CoseAlgorithm, pkcs8: &[u8]) -> Self {
        let key_pair = EcdsaKeyPair::from_pkcs8(ecdsa_signing(alg), pkcs8).unwrap();
        let point = key_pair.public_key().as_ref();
        let coordinate_len = (point.len() - 1) / 2;
        let curve = match alg {
            CoseAlgorithm::ES256 => EcCurve::P256,
            CoseAlgorithm::ES384 => EcCurve::P384,
            _ => EcCurve::P521,
        };
        let cose_key = CoseKey::Ec2 {
            alg,
            curve,
            x: point[1..1 + coordinate_len].to_vec(),
            y: point[1 + coordinate_len..].to_vec(),
        };
        Self {
            key: SigningKey::Ecdsa(key_pair),
            cose_key,
        }
    }

    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        let rng = SystemRandom::new();
        match &self.key {
            SigningKey::Ecdsa(key_pair) => key_pair.sign(&rng, message).unwrap().as_ref().to_vec(),
            SigningKey::Ed25519(key_pair) => key_pair.sign(message).as_ref().to_vec(),
            SigningKey::Rsa(key_pair) => {
                let padding = match self.cose_key.algorithm() {
                    CoseAlgorithm::PS256 => &RSA_PSS_SHA256,
                    _ => &RSA_PKCS1_SHA256,
                };
                let mut signature = vec![0u8; key_pair.public_modulus_len()];
                key_pair.sign(padding, &rng, message, &mut signature).unwrap();
                signature
            }
        }
    }

    pub fn cose_key_bytes(&self) -> Vec<u8> {
        self.cose_key.to_bytes().unwrap()
    }
}

fn ecdsa_signing(alg: CoseAlgorithm) -> &'static EcdsaSigningAlgorithm {
    match alg {
        CoseAlgorithm::ES384 => &ECDSA_P384_SHA384_ASN1_SIGNING,
        CoseAlgorithm::ES512 => &ECDSA_P521_SHA512_ASN1_SIGNING,
        _ => &ECDSA_P256_SHA256_ASN1_SIGNING,
    }
}

pub fn sha256(data: &[u8]) -> Vec<u8> {
    digest::digest(&SHA256, data).as_ref().to_vec()
}

/// Helper function to create authenticator data without attested credential data
pub fn create_authenticator_data(rp_id: &str, flags: u8, counter: u32) -> Vec<u8> {
    let mut auth_data = Vec::new();
    auth_data.extend_from_slice(&sha256(rp_id.as_bytes())); // rpIdHash
    auth_data.push(flags);
    auth_data.extend_from_slice(&counter.to_be_bytes());
    auth_data
}

/// Helper function to create authenticator data carrying a credential (AT is set)
pub fn create_attested_authenticator_data(
    rp_id: &str,
    flags: u8,
    counter: u32,
    credential_id: &[u8],
    cose_key: &[u8],
) -> Vec<u8> {
    let mut auth_data = create_authenticator_data(
        rp_id,
        flags | AuthenticatorFlags::ATTESTED_CREDENTIAL_DATA,
        counter,
    );
    auth_data.extend_from_slice(&AAGUID);
    auth_data.extend_from_slice(&(credential_id.len() as u16).to_be_bytes());
    auth_data.extend_from_slice(credential_id);
    auth_data.extend_from_slice(cose_key);
    auth_data
}

/// Helper function to create client data JSON
pub fn create_client_data_json(type_: ClientDataType, challenge: &[u8], origin: &str) -> Vec<u8> {
    let client_data = serde_json::json!({
        "type": type_.as_str(),
        "challenge": base64_encode(challenge),
        "origin": origin,
        "crossOrigin": false
    });
    serde_json::to_vec(&client_data).unwrap()
}

/// Helper function to create a CBOR attestation object
pub fn create_attestation_object(fmt: &str, att_stmt: Vec<(Value, Value)>, auth_data: &[u8]) -> Vec<u8> {
    let att_obj = vec![
        (Value::Text("fmt".to_string()), Value::Text(fmt.to_string())),
        (Value::Text("attStmt".to_string()), Value::Map(att_stmt)),
        (Value::Text("authData".to_string()), Value::Bytes(auth_data.to_vec())),
    ];

    let mut result = Vec::new();
    ciborium::into_writer(&Value::Map(att_obj), &mut result).unwrap();
    result
}

pub fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

pub fn creation_options(challenge: &[u8], algs: &[i64]) -> PublicKeyCredentialCreationOptions {
    PublicKeyCredentialCreationOptions {
        rp: RelyingParty {
            id: RP_ID.to_string(),
            name: "Example".to_string(),
        },
        user: UserEntity {
            id: b"user-1234".to_vec(),
            name: "alice".to_string(),
            display_name: "Alice".to_string(),
        },
        challenge: challenge.to_vec(),
        pub_key_cred_params: algs.iter().map(|alg| PubKeyCredParam::new(*alg)).collect(),
        authenticator_selection: AuthenticatorSelection::default(),
        exclude_credentials: Vec::new(),
        timeout: Some(60000),
    }
}

/// A stored credential for `credential`, as a registration would have produced it.
pub fn stored_source(credential_id: &[u8], credential: &TestCredential, counter: u32) -> PublicKeyCredentialSource {
    PublicKeyCredentialSource {
        credential_id: credential_id.to_vec(),
        credential_type: PUBLIC_KEY_CREDENTIAL_TYPE.to_string(),
        transports: vec!["internal".to_string()],
        attestation_type: AttestationType::None,
        trust_path: Vec::new(),
        aaguid: uuid::Uuid::from_bytes(AAGUID),
        credential_public_key: credential.cose_key_bytes(),
        user_handle: b"user-1234".to_vec(),
        counter,
        backup_eligible: false,
        backup_state: false,
        uv_initialized: false,
    }
}

/// Signs an assertion the way an authenticator does: over authData || SHA-256(clientDataJSON).
pub fn create_assertion(
    credential: &TestCredential,
    auth_data: Vec<u8>,
    client_data_json: Vec<u8>,
) -> AuthenticatorAssertionResponse {
    let mut signed = auth_data.clone();
    signed.extend_from_slice(&sha256(&client_data_json));
    AuthenticatorAssertionResponse {
        signature: credential.sign(&signed),
        client_data_json,
        authenticator_data: auth_data,
        user_handle: None,
    }
}

// ===== X.509 and DER =====

/// Certificate parameters with the subject a `packed` attestation certificate needs.
pub fn packed_certificate_params() -> rcgen::CertificateParams {
    use rcgen::{DnType, IsCa};

    let mut params = rcgen::CertificateParams::new(Vec::<String>::new()).unwrap();
    params.distinguished_name.push(DnType::CountryName, "US");
    params.distinguished_name.push(DnType::OrganizationName, "Example Authenticators");
    params
        .distinguished_name
        .push(DnType::OrganizationalUnitName, "Authenticator Attestation");
    params.distinguished_name.push(DnType::CommonName, "Example Batch 1");
    params.is_ca = IsCa::ExplicitNoCa;
    params
}

/// Certificate parameters with a single common name.
pub fn named_certificate_params(common_name: &str) -> rcgen::CertificateParams {
    let mut params = rcgen::CertificateParams::new(Vec::<String>::new()).unwrap();
    params.distinguished_name = rcgen::DistinguishedName::new();
    params
        .distinguished_name
        .push(rcgen::DnType::CommonName, common_name);
    params
}

/// Limits the certificate to calendar year `year`.
pub fn valid_during(params: &mut rcgen::CertificateParams, year: i32) {
    params.not_before = rcgen::date_time_ymd(year, 1, 1);
    params.not_after = rcgen::date_time_ymd(year + 1, 1, 1);
}

/// The id-fido-gen-ce-aaguid extension.
pub fn aaguid_extension(aaguid: &[u8; 16]) -> rcgen::CustomExtension {
    rcgen::CustomExtension::from_oid_content(&[1, 3, 6, 1, 4, 1, 45724, 1, 1, 4], der(0x04, aaguid))
}

/// A P-256 certificate key, and the same key as an ES256 test credential.
pub fn certificate_key() -> (rcgen::KeyPair, TestCredential) {
    let key_pair = rcgen::KeyPair::generate().unwrap();
    let credential =
        TestCredential::from_ecdsa_pkcs8(CoseAlgorithm::ES256, &key_pair.serialize_der());
    (key_pair, credential)
}

pub fn self_sign(params: rcgen::CertificateParams, key_pair: &rcgen::KeyPair) -> Vec<u8> {
    params.self_signed(key_pair).unwrap().der().to_vec()
}

/// Signs `params` with a freshly generated P-256 key, returning the DER
/// certificate and the key as an ES256 test credential.
pub fn self_signed_certificate(params: rcgen::CertificateParams) -> (Vec<u8>, TestCredential) {
    let (key_pair, credential) = certificate_key();
    (self_sign(params, &key_pair), credential)
}

/// Encodes a single DER TLV with a one-byte tag.
pub fn der(tag: u8, content: &[u8]) -> Vec<u8> {
    der_with_tag(&[tag], content)
}

pub fn der_with_tag(tag: &[u8], content: &[u8]) -> Vec<u8> {
    let mut out = tag.to_vec();
    let len = content.len();
    if len < 0x80 {
        out.push(len as u8);
    } else if len <= 0xff {
        out.extend_from_slice(&[0x81, len as u8]);
    } else {
        out.extend_from_slice(&[0x82, (len >> 8) as u8, len as u8]);
    }
    out.extend_from_slice(content);
    out
}

/// Parse RSA public key bytes to extract n (modulus) and e (exponent)
fn parse_rsa_public_key(pub_key_bytes: &[u8]) -> (Vec<u8>, Vec<u8>) {
    // RSA public key is DER encoded: SEQUENCE { INTEGER n, INTEGER e }
    let mut pos = 0;

    assert_eq!(pub_key_bytes[pos], 0x30);
    pos += 1;
    let (_, len_bytes) = read_der_length(&pub_key_bytes[pos..]);
    pos += len_bytes;

    assert_eq!(pub_key_bytes[pos], 0x02);
    pos += 1;
    let (n_len, len_bytes) = read_der_length(&pub_key_bytes[pos..]);
    pos += len_bytes;
    let mut n = pub_key_bytes[pos..pos + n_len].to_vec();
    // Remove leading zero if present (used for positive sign in DER)
    if !n.is_empty() && n[0] == 0x00 {
        n.remove(0);
    }
    pos += n_len;

    assert_eq!(pub_key_bytes[pos], 0x02);
    pos += 1;
    let (e_len, len_bytes) = read_der_length(&pub_key_bytes[pos..]);
    pos += len_bytes;
    let e = pub_key_bytes[pos..pos + e_len].to_vec();

    (n, e)
}

/// Read DER length encoding, returns (length, bytes_consumed)
fn read_der_length(data: &[u8]) -> (usize, usize) {
    if data[0] < 0x80 {
        (data[0] as usize, 1)
    } else {
        let num_bytes = (data[0] & 0x7F) as usize;
        let mut len = 0usize;
        for i in 0..num_bytes {
            len = (len << 8) | (data[1 + i] as usize);
        }
        (len, 1 + num_bytes)
    }
}
