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

//! Authenticator data parsing.
//!
//! Layout: `rpIdHash (32) | flags (1) | signCount (4, big-endian)`, then
//! optionally the attested credential data and an extensions map.

use std::fmt;

use aws_lc_rs::digest::{self, SHA256};
use ciborium::Value;
use uuid::Uuid;

use crate::cose::{CoseAlgorithm, CoseKey, OkpCurve};
use crate::error::{Error, Result};

const HEADER_LEN: usize = 37;
const AAGUID_LEN: usize = 16;

// {1: "OKP", 3: -8, -1: "Ed25519"} with a three-entry map header, followed by
// -2 and an array of 32 small integers instead of a byte string.
const LEGACY_ED25519_PREFIX: &[u8] = &[
    0xa3, 0x01, 0x63, b'O', b'K', b'P', 0x03, 0x27, 0x20, 0x67, b'E', b'd', b'2', b'5', b'5',
    b'1', b'9',
];
const LEGACY_ED25519_X_HEADER: &[u8] = &[0x21, 0x98, 0x20];

/// The flags byte of the authenticator data.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatorFlags(u8);

impl AuthenticatorFlags {
    pub const USER_PRESENT: u8 = 0x01;
    pub const USER_VERIFIED: u8 = 0x04;
    pub const BACKUP_ELIGIBLE: u8 = 0x08;
    pub const BACKUP_STATE: u8 = 0x10;
    pub const ATTESTED_CREDENTIAL_DATA: u8 = 0x40;
    pub const EXTENSION_DATA: u8 = 0x80;

    pub fn new(bits: u8) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn user_present(self) -> bool {
        self.0 & Self::USER_PRESENT != 0
    }

    pub fn user_verified(self) -> bool {
        self.0 & Self::USER_VERIFIED != 0
    }

    pub fn backup_eligible(self) -> bool {
        self.0 & Self::BACKUP_ELIGIBLE != 0
    }

    pub fn backup_state(self) -> bool {
        self.0 & Self::BACKUP_STATE != 0
    }

    pub fn has_attested_credential_data(self) -> bool {
        self.0 & Self::ATTESTED_CREDENTIAL_DATA != 0
    }

    pub fn has_extension_data(self) -> bool {
        self.0 & Self::EXTENSION_DATA != 0
    }
}

impl fmt::Debug for AuthenticatorFlags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "AuthenticatorFlags({:#04x} up={} uv={} be={} bs={} at={} ed={})",
            self.0,
            self.user_present(),
            self.user_verified(),
            self.backup_eligible(),
            self.backup_state(),
            self.has_attested_credential_data(),
            self.has_extension_data()
        )
    }
}

/// Credential data present when the AT flag is set.
#[derive(Debug, Clone)]
pub struct AttestedCredentialData {
    pub aaguid: Uuid,

    pub credential_id: Vec<u8>,

    /// Canonical COSE encoding of the credential public key. Identical to the
    /// bytes in the authenticator data except for legacy Ed25519 keys, which
    /// are re-encoded.
    pub credential_public_key: Vec<u8>,

    pub public_key: CoseKey,
}

/// Parsed authenticator data.
#[derive(Debug, Clone)]
pub struct AuthenticatorData {
    pub rp_id_hash: [u8; 32],

    pub flags: AuthenticatorFlags,

    pub sign_count: u32,

    pub attested_credential_data: Option<AttestedCredentialData>,

    /// The extension outputs map, when the ED flag is set.
    pub extensions: Option<Value>,

    raw: Vec<u8>,
}

impl AuthenticatorData {
    /// Parses authenticator data from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedAuthenticatorData`] if:
    /// * The buffer is shorter than 37 bytes
    /// * The credential id length points past the end of the buffer
    /// * The AT flag is set but no credential public key follows
    /// * The ED flag is set but no extensions map follows
    /// * Bytes remain after the last declared structure
    /// * The BS flag is set without BE
    pub fn from_bytes(bytes: &[u8]) -> Result<AuthenticatorData> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::MalformedAuthenticatorData(format!(
                "expected at least {} bytes, got {}",
                HEADER_LEN,
                bytes.len()
            )));
        }

        let mut rp_id_hash = [0u8; 32];
        rp_id_hash.copy_from_slice(&bytes[..32]);
        let flags = AuthenticatorFlags(bytes[32]);
        let sign_count = u32::from_be_bytes([bytes[33], bytes[34], bytes[35], bytes[36]]);

        if flags.backup_state() && !flags.backup_eligible() {
            return Err(Error::MalformedAuthenticatorData(
                "backup state set on a credential that is not backup eligible".into(),
            ));
        }

        let mut offset = HEADER_LEN;

        let attested_credential_data = if flags.has_attested_credential_data() {
            let (data, consumed) = parse_attested_credential_data(&bytes[offset..])?;
            offset += consumed;
            Some(data)
        } else {
            None
        };

        let extensions = if flags.has_extension_data() {
            let rest = &bytes[offset..];
            if rest.is_empty() {
                return Err(Error::MalformedAuthenticatorData(
                    "extension data flag set but no extensions present".into(),
                ));
            }
            let mut remaining = rest;
            let value: Value = ciborium::from_reader(&mut remaining).map_err(|e| {
                Error::MalformedAuthenticatorData(format!("invalid extensions map: {}", e))
            })?;
            if !value.is_map() {
                return Err(Error::MalformedAuthenticatorData(
                    "extensions are not a CBOR map".into(),
                ));
            }
            offset += rest.len() - remaining.len();
            Some(value)
        } else {
            None
        };

        if offset != bytes.len() {
            return Err(Error::MalformedAuthenticatorData(format!(
                "{} trailing bytes",
                bytes.len() - offset
            )));
        }

        Ok(AuthenticatorData {
            rp_id_hash,
            flags,
            sign_count,
            attested_credential_data,
            extensions,
            raw: bytes.to_vec(),
        })
    }

    /// The exact bytes this value was parsed from, as covered by signatures.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Whether `rp_id_hash` is the SHA-256 of `rp_id`.
    pub fn matches_rp_id(&self, rp_id: &str) -> bool {
        digest::digest(&SHA256, rp_id.as_bytes()).as_ref() == self.rp_id_hash
    }
}

fn parse_attested_credential_data(bytes: &[u8]) -> Result<(AttestedCredentialData, usize)> {
    if bytes.len() < AAGUID_LEN + 2 {
        return Err(Error::MalformedAuthenticatorData(
            "attested credential data truncated".into(),
        ));
    }

    let mut aaguid = [0u8; AAGUID_LEN];
    aaguid.copy_from_slice(&bytes[..AAGUID_LEN]);
    let id_len = u16::from_be_bytes([bytes[AAGUID_LEN], bytes[AAGUID_LEN + 1]]) as usize;
    let id_start = AAGUID_LEN + 2;
    let key_start = id_start + id_len;

    if bytes.len() < key_start {
        return Err(Error::MalformedAuthenticatorData(format!(
            "credential id length {} exceeds remaining {} bytes",
            id_len,
            bytes.len() - id_start
        )));
    }
    if bytes.len() == key_start {
        return Err(Error::MalformedAuthenticatorData(
            "credential public key missing".into(),
        ));
    }

    let (public_key, credential_public_key, key_len) = decode_credential_key(&bytes[key_start..])
        .map_err(|e| match e {
            Error::MalformedAuthenticatorData(_) => e,
            other => Error::MalformedAuthenticatorData(format!("credential public key: {}", other)),
        })?;

    Ok((
        AttestedCredentialData {
            aaguid: Uuid::from_bytes(aaguid),
            credential_id: bytes[id_start..key_start].to_vec(),
            credential_public_key,
            public_key,
        },
        key_start + key_len,
    ))
}

/// Returns the key, its canonical encoding, and how many input bytes it used.
fn decode_credential_key(bytes: &[u8]) -> Result<(CoseKey, Vec<u8>, usize)> {
    if let Some((x, consumed)) = legacy_ed25519_x(bytes) {
        tracing::debug!("re-encoding legacy Ed25519 credential key");
        let key = CoseKey::Okp {
            alg: CoseAlgorithm::EdDSA,
            curve: OkpCurve::Ed25519,
            x,
        };
        let encoded = key.to_bytes()?;
        return Ok((key, encoded, consumed));
    }

    let (key, consumed) = CoseKey::from_slice(bytes)?;
    Ok((key, bytes[..consumed].to_vec(), consumed))
}

fn legacy_ed25519_x(bytes: &[u8]) -> Option<(Vec<u8>, usize)> {
    let rest = bytes.strip_prefix(LEGACY_ED25519_PREFIX)?;
    let mut rest = rest.strip_prefix(LEGACY_ED25519_X_HEADER)?;

    let mut x = Vec::with_capacity(32);
    while x.len() < 32 {
        match rest {
            [b, tail @ ..] if *b < 0x18 => {
                x.push(*b);
                rest = tail;
            }
            [0x18, b, tail @ ..] => {
                x.push(*b);
                rest = tail;
            }
            _ => return None,
        }
    }

    Some((x, bytes.len() - rest.len()))
}
