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

//! Attestation objects and attestation statement verification.
//!
//! Each supported statement format has its own module. [`AttestationStatement`]
//! is a closed set: an unknown `fmt` is rejected while decoding, before any
//! verification runs.

mod android_key;
mod android_safetynet;
mod apple;
pub(crate) mod certificate;
mod fido_u2f;
mod packed;
mod tpm;

use std::fmt;
use std::time::SystemTime;

use ciborium::Value;
use serde::{Deserialize, Serialize};

use crate::authenticator_data::AuthenticatorData;
use crate::config::VerifierConfig;
use crate::cose::CoseAlgorithm;
use crate::error::{Error, Result};

pub use android_key::AndroidKeyStatement;
pub use android_safetynet::SafetyNetStatement;
pub use apple::AppleStatement;
pub use fido_u2f::FidoU2fStatement;
pub use packed::PackedStatement;
pub use tpm::TpmStatement;

/// How much the attestation says about the authenticator's provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttestationType {
    /// No attestation was provided.
    #[serde(rename = "none")]
    None,
    /// Signed by the credential key itself.
    #[serde(rename = "self")]
    SelfAttestation,
    /// Signed by a batch attestation key with a certificate chain.
    #[serde(rename = "basic")]
    Basic,
    /// Signed by a key certified by an attestation CA (TPM AIK).
    #[serde(rename = "attca")]
    AttestationCa,
    /// Signed by a per-credential key from an anonymizing CA.
    #[serde(rename = "anonca")]
    AnonymousCa,
}

impl fmt::Display for AttestationType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            AttestationType::None => "none",
            AttestationType::SelfAttestation => "self",
            AttestationType::Basic => "basic",
            AttestationType::AttestationCa => "attca",
            AttestationType::AnonymousCa => "anonca",
        };
        f.write_str(name)
    }
}

/// Outcome of a successful statement verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedAttestation {
    pub attestation_type: AttestationType,

    /// DER certificates, leaf first. Empty for `none` and self attestation.
    pub trust_path: Vec<Vec<u8>>,
}

impl VerifiedAttestation {
    fn new(attestation_type: AttestationType, trust_path: Vec<Vec<u8>>) -> Self {
        Self {
            attestation_type,
            trust_path,
        }
    }
}

/// A decoded attestation statement, one variant per supported format.
#[derive(Debug, Clone)]
pub enum AttestationStatement {
    None,
    Packed(PackedStatement),
    FidoU2f(FidoU2fStatement),
    AndroidKey(AndroidKeyStatement),
    AndroidSafetyNet(SafetyNetStatement),
    Tpm(TpmStatement),
    Apple(AppleStatement),
}

impl AttestationStatement {
    /// Decodes `att_stmt` according to `fmt`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AttestationRejected`] for an unknown format or a
    /// statement missing members its format requires.
    pub fn from_cbor(fmt: &str, att_stmt: &Value) -> Result<Self> {
        let map = att_stmt
            .as_map()
            .ok_or_else(|| Error::attestation(fmt, "attStmt is not a map"))?;

        match fmt {
            "none" => {
                if !map.is_empty() {
                    return Err(Error::attestation(fmt, "attStmt must be empty"));
                }
                Ok(AttestationStatement::None)
            }
            packed::FORMAT => Ok(AttestationStatement::Packed(PackedStatement::from_map(
                StatementMap::new(packed::FORMAT, map),
            )?)),
            fido_u2f::FORMAT => Ok(AttestationStatement::FidoU2f(FidoU2fStatement::from_map(
                StatementMap::new(fido_u2f::FORMAT, map),
            )?)),
            android_key::FORMAT => Ok(AttestationStatement::AndroidKey(
                AndroidKeyStatement::from_map(StatementMap::new(android_key::FORMAT, map))?,
            )),
            android_safetynet::FORMAT => Ok(AttestationStatement::AndroidSafetyNet(
                SafetyNetStatement::from_map(StatementMap::new(android_safetynet::FORMAT, map))?,
            )),
            tpm::FORMAT => Ok(AttestationStatement::Tpm(TpmStatement::from_map(
                StatementMap::new(tpm::FORMAT, map),
            )?)),
            apple::FORMAT => Ok(AttestationStatement::Apple(AppleStatement::from_map(
                StatementMap::new(apple::FORMAT, map),
            )?)),
            other => Err(Error::attestation(other, "unsupported attestation format")),
        }
    }

    /// The `fmt` identifier of this statement.
    pub fn format(&self) -> &'static str {
        match self {
            AttestationStatement::None => "none",
            AttestationStatement::Packed(_) => packed::FORMAT,
            AttestationStatement::FidoU2f(_) => fido_u2f::FORMAT,
            AttestationStatement::AndroidKey(_) => android_key::FORMAT,
            AttestationStatement::AndroidSafetyNet(_) => android_safetynet::FORMAT,
            AttestationStatement::Tpm(_) => tpm::FORMAT,
            AttestationStatement::Apple(_) => apple::FORMAT,
        }
    }

    /// Verifies the statement against the authenticator data and the SHA-256
    /// of the client data JSON.
    pub fn verify(
        &self,
        auth_data: &AuthenticatorData,
        client_data_hash: &[u8],
        config: &VerifierConfig,
    ) -> Result<VerifiedAttestation> {
        self.verify_at(auth_data, client_data_hash, config, SystemTime::now())
    }

    /// Like [`verify`](Self::verify), judging certificate validity and
    /// SafetyNet freshness against `now`.
    pub fn verify_at(
        &self,
        auth_data: &AuthenticatorData,
        client_data_hash: &[u8],
        config: &VerifierConfig,
        now: SystemTime,
    ) -> Result<VerifiedAttestation> {
        let verified = match self {
            AttestationStatement::None => {
                Ok(VerifiedAttestation::new(AttestationType::None, Vec::new()))
            }
            AttestationStatement::Packed(stmt) => stmt.verify(auth_data, client_data_hash, now),
            AttestationStatement::FidoU2f(stmt) => stmt.verify(auth_data, client_data_hash, now),
            AttestationStatement::AndroidKey(stmt) => stmt.verify(auth_data, client_data_hash, now),
            AttestationStatement::AndroidSafetyNet(stmt) => {
                stmt.verify(auth_data, client_data_hash, &config.safetynet, now)
            }
            AttestationStatement::Tpm(stmt) => stmt.verify(auth_data, client_data_hash, now),
            AttestationStatement::Apple(stmt) => stmt.verify(auth_data, client_data_hash, now),
        };

        match &verified {
            Ok(v) => tracing::debug!(
                format = self.format(),
                attestation_type = %v.attestation_type,
                "attestation statement verified"
            ),
            Err(e) => tracing::debug!(format = self.format(), error = %e, "attestation statement rejected"),
        }
        verified
    }
}

/// A decoded attestation object: `{fmt, attStmt, authData}`.
#[derive(Debug, Clone)]
pub struct AttestationObject {
    pub fmt: String,

    pub statement: AttestationStatement,

    pub auth_data: AuthenticatorData,
}

impl AttestationObject {
    /// Decodes a CBOR attestation object.
    ///
    /// # Errors
    ///
    /// * [`Error::MalformedAttestationObject`] if the CBOR structure is wrong
    /// * [`Error::MalformedAuthenticatorData`] if `authData` does not parse
    /// * [`Error::AttestationRejected`] if the statement format is unknown or
    ///   the statement is incomplete
    pub fn from_bytes(bytes: &[u8]) -> Result<AttestationObject> {
        let value: Value = ciborium::from_reader(bytes).map_err(|e| {
            Error::MalformedAttestationObject(format!("Failed to parse attestation object: {}", e))
        })?;
        let map = value
            .as_map()
            .ok_or_else(|| Error::MalformedAttestationObject("not a CBOR map".into()))?;
        let field = |name: &str| {
            map.iter()
                .find(|(k, _)| k.as_text() == Some(name))
                .map(|(_, v)| v)
        };

        let fmt = field("fmt")
            .and_then(|v| v.as_text())
            .ok_or_else(|| Error::MalformedAttestationObject("Missing fmt".into()))?
            .to_string();
        let att_stmt = field("attStmt")
            .ok_or_else(|| Error::MalformedAttestationObject("Missing attStmt".into()))?;
        let auth_data_bytes = field("authData")
            .and_then(|v| v.as_bytes())
            .ok_or_else(|| Error::MalformedAttestationObject("Missing authData".into()))?;

        let auth_data = AuthenticatorData::from_bytes(auth_data_bytes)?;
        let statement = AttestationStatement::from_cbor(&fmt, att_stmt)?;

        Ok(AttestationObject {
            fmt,
            statement,
            auth_data,
        })
    }
}

/// Typed access to the members of an `attStmt` map, reporting failures
/// against the statement format.
#[derive(Clone, Copy)]
pub(crate) struct StatementMap<'a> {
    format: &'static str,
    map: &'a [(Value, Value)],
}

impl<'a> StatementMap<'a> {
    fn new(format: &'static str, map: &'a [(Value, Value)]) -> Self {
        Self { format, map }
    }

    fn get(&self, name: &str) -> Option<&'a Value> {
        self.map
            .iter()
            .find(|(k, _)| k.as_text() == Some(name))
            .map(|(_, v)| v)
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub(crate) fn bytes(&self, name: &str) -> Result<Vec<u8>> {
        self.get(name)
            .and_then(|v| v.as_bytes())
            .cloned()
            .ok_or_else(|| self.missing(name))
    }

    pub(crate) fn text(&self, name: &str) -> Result<String> {
        self.get(name)
            .and_then(|v| v.as_text())
            .map(str::to_string)
            .ok_or_else(|| self.missing(name))
    }

    pub(crate) fn algorithm(&self) -> Result<CoseAlgorithm> {
        let id: i64 = self
            .get("alg")
            .and_then(|v| v.as_integer())
            .and_then(|i| i.try_into().ok())
            .ok_or_else(|| self.missing("alg"))?;
        CoseAlgorithm::try_from(id)
            .map_err(|_| Error::attestation(self.format, format!("unsupported alg {}", id)))
    }

    /// The `x5c` certificate array, if present. Present but empty is an error.
    pub(crate) fn certificates(&self) -> Result<Option<Vec<Vec<u8>>>> {
        let Some(value) = self.get("x5c") else {
            return Ok(None);
        };
        let certs = value
            .as_array()
            .ok_or_else(|| self.reject("x5c is not an array"))?
            .iter()
            .map(|c| c.as_bytes().cloned().ok_or_else(|| self.reject("x5c entry is not bytes")))
            .collect::<Result<Vec<_>>>()?;
        if certs.is_empty() {
            return Err(self.reject("x5c is empty"));
        }
        Ok(Some(certs))
    }

    pub(crate) fn required_certificates(&self) -> Result<Vec<Vec<u8>>> {
        self.certificates()?.ok_or_else(|| self.missing("x5c"))
    }

    pub(crate) fn reject(&self, reason: impl Into<String>) -> Error {
        Error::attestation(self.format, reason)
    }

    fn missing(&self, name: &str) -> Error {
        self.reject(format!("missing or invalid {}", name))
    }
}

/// `authData || clientDataHash`, the message most statement signatures cover.
pub(crate) fn signed_data(auth_data: &AuthenticatorData, client_data_hash: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(auth_data.raw().len() + client_data_hash.len());
    data.extend_from_slice(auth_data.raw());
    data.extend_from_slice(client_data_hash);
    data
}

/// The attested credential data every statement format requires.
pub(crate) fn attested_credential<'a>(
    format: &str,
    auth_data: &'a AuthenticatorData,
) -> Result<&'a crate::authenticator_data::AttestedCredentialData> {
    auth_data
        .attested_credential_data
        .as_ref()
        .ok_or_else(|| Error::attestation(format, "attested credential data missing"))
}
