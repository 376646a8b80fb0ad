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

//! `android-safetynet` attestation: a SafetyNet compact JWS.

use std::time::{SystemTime, UNIX_EPOCH};

use aws_lc_rs::digest::{self, SHA256};
use aws_lc_rs::signature::{VerificationAlgorithm, ECDSA_P256_SHA256_FIXED, RSA_PKCS1_2048_8192_SHA256};

use crate::authenticator_data::AuthenticatorData;
use crate::config::SafetyNetPolicy;
use crate::error::{Error, Result};
use crate::signature::verify_with;

use super::{certificate, signed_data, StatementMap};
use super::{AttestationType, VerifiedAttestation};

pub(crate) const FORMAT: &str = "android-safetynet";

const ATTESTATION_HOSTNAME: &str = "attest.android.com";

#[derive(Debug, Clone)]
pub struct SafetyNetStatement {
    pub ver: String,
    /// The UTF-8 compact JWS returned by the SafetyNet API.
    pub response: Vec<u8>,
}

impl SafetyNetStatement {
    pub(crate) fn from_map(map: StatementMap<'_>) -> Result<Self> {
        let ver = map.text("ver")?;
        if ver.is_empty() {
            return Err(map.reject("ver must not be empty"));
        }
        Ok(Self {
            ver,
            response: map.bytes("response")?,
        })
    }

    pub(crate) fn verify(
        &self,
        auth_data: &AuthenticatorData,
        client_data_hash: &[u8],
        policy: &SafetyNetPolicy,
        now: SystemTime,
    ) -> Result<VerifiedAttestation> {
        let jws = std::str::from_utf8(&self.response)
            .map_err(|_| Error::attestation(FORMAT, "response is not UTF-8"))?;
        let mut parts = jws.split('.');
        let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::attestation(FORMAT, "response is not a compact JWS"));
        };

        let header = decode_json(header_b64, "header")?;
        let payload = decode_json(payload_b64, "payload")?;
        let signature = crate::base64_decode(signature_b64)
            .map_err(|_| Error::attestation(FORMAT, "invalid JWS signature encoding"))?;

        let x5c = header["x5c"]
            .as_array()
            .filter(|certs| !certs.is_empty())
            .ok_or_else(|| Error::attestation(FORMAT, "JWS header has no x5c"))?
            .iter()
            .map(|c| {
                c.as_str()
                    .and_then(|s| crate::base64_decode(s).ok())
                    .ok_or_else(|| Error::attestation(FORMAT, "invalid x5c entry"))
            })
            .collect::<Result<Vec<_>>>()?;
        let chain = certificate::parse_chain(FORMAT, &x5c, now)?;
        let leaf = &chain[0];

        let algorithm: &'static dyn VerificationAlgorithm = match header["alg"].as_str() {
            Some("RS256") => &RSA_PKCS1_2048_8192_SHA256,
            Some("ES256") => &ECDSA_P256_SHA256_FIXED,
            other => {
                return Err(Error::attestation(
                    FORMAT,
                    format!("unsupported JWS alg {:?}", other),
                ))
            }
        };
        let signing_input = format!("{}.{}", header_b64, payload_b64);
        if !verify_with(
            algorithm,
            certificate::public_key_bytes(leaf),
            signing_input.as_bytes(),
            &signature,
        ) {
            return Err(Error::attestation(FORMAT, "JWS signature invalid"));
        }

        if certificate::common_name(leaf).as_deref() != Some(ATTESTATION_HOSTNAME) {
            return Err(Error::attestation(
                FORMAT,
                format!("certificate is not issued to {}", ATTESTATION_HOSTNAME),
            ));
        }

        let expected_nonce = digest::digest(&SHA256, &signed_data(auth_data, client_data_hash));
        let nonce = payload["nonce"]
            .as_str()
            .and_then(|n| crate::base64_decode(n).ok())
            .ok_or_else(|| Error::attestation(FORMAT, "payload nonce missing"))?;
        if nonce != expected_nonce.as_ref() {
            return Err(Error::attestation(FORMAT, "payload nonce does not match"));
        }

        let timestamp_ms = payload["timestampMs"]
            .as_u64()
            .ok_or_else(|| Error::attestation(FORMAT, "payload timestampMs missing"))?;
        check_freshness(timestamp_ms, policy, now)?;

        if policy.require_cts_profile_match && payload["ctsProfileMatch"].as_bool() != Some(true) {
            return Err(Error::attestation(FORMAT, "ctsProfileMatch is not true"));
        }

        Ok(VerifiedAttestation::new(AttestationType::Basic, x5c.clone()))
    }
}

fn decode_json(part: &str, what: &str) -> Result<serde_json::Value> {
    let bytes = crate::base64_decode(part)
        .map_err(|_| Error::attestation(FORMAT, format!("invalid JWS {} encoding", what)))?;
    serde_json::from_slice(&bytes)
        .map_err(|_| Error::attestation(FORMAT, format!("invalid JWS {} JSON", what)))
}

fn check_freshness(timestamp_ms: u64, policy: &SafetyNetPolicy, now: SystemTime) -> Result<()> {
    let now_ms = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    if timestamp_ms > now_ms.saturating_add(policy.leeway_ms) {
        return Err(Error::attestation(FORMAT, "timestampMs is in the future"));
    }
    if timestamp_ms.saturating_add(policy.max_age_ms) < now_ms {
        return Err(Error::attestation(FORMAT, "response is too old"));
    }
    Ok(())
}
