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

//! `apple` anonymous attestation.

use std::time::SystemTime;

use aws_lc_rs::digest::{self, SHA256};
use der_parser::ber::BerObjectContent;

use crate::authenticator_data::AuthenticatorData;
use crate::error::{Error, Result};

use super::{attested_credential, certificate, signed_data, StatementMap};
use super::{AttestationType, VerifiedAttestation};

pub(crate) const FORMAT: &str = "apple";

const OID_APPLE_NONCE: &str = "1.2.840.113635.100.8.2";

#[derive(Debug, Clone)]
pub struct AppleStatement {
    /// Credential certificate first, followed by the Apple intermediate.
    pub x5c: Vec<Vec<u8>>,
}

impl AppleStatement {
    pub(crate) fn from_map(map: StatementMap<'_>) -> Result<Self> {
        Ok(Self {
            x5c: map.required_certificates()?,
        })
    }

    pub(crate) fn verify(
        &self,
        auth_data: &AuthenticatorData,
        client_data_hash: &[u8],
        now: SystemTime,
    ) -> Result<VerifiedAttestation> {
        let credential = attested_credential(FORMAT, auth_data)?;
        let chain = certificate::parse_chain(FORMAT, &self.x5c, now)?;
        let leaf = &chain[0];

        let expected = digest::digest(&SHA256, &signed_data(auth_data, client_data_hash));
        let nonce = certificate::extension(leaf, OID_APPLE_NONCE)
            .ok_or_else(|| Error::attestation(FORMAT, "nonce extension missing"))
            .and_then(|ext| parse_nonce(ext.value))?;
        if nonce != expected.as_ref() {
            return Err(Error::attestation(FORMAT, "nonce does not match"));
        }

        if !certificate::key_matches(leaf, &credential.public_key) {
            return Err(Error::attestation(
                FORMAT,
                "certificate key does not match credential key",
            ));
        }

        Ok(VerifiedAttestation::new(AttestationType::AnonymousCa, self.x5c.clone()))
    }
}

/// `SEQUENCE { [1] EXPLICIT OCTET STRING }`
fn parse_nonce(value: &[u8]) -> Result<Vec<u8>> {
    let invalid = || Error::attestation(FORMAT, "invalid nonce extension");

    let (_, obj) = der_parser::der::parse_der(value).map_err(|_| invalid())?;
    let tagged = obj
        .as_sequence()
        .map_err(|_| invalid())?
        .first()
        .ok_or_else(invalid)?;
    let BerObjectContent::Unknown(any) = &tagged.content else {
        return Err(invalid());
    };
    let (_, octets) = der_parser::der::parse_der_octetstring(any.data).map_err(|_| invalid())?;
    Ok(octets.as_slice().map_err(|_| invalid())?.to_vec())
}
