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

//! `packed` attestation: full (x5c) or self attestation.

use std::time::SystemTime;

use crate::authenticator_data::AuthenticatorData;
use crate::cose::CoseAlgorithm;
use crate::error::{Error, Result};

use super::{attested_credential, certificate, signed_data, StatementMap};
use super::{AttestationType, VerifiedAttestation};

pub(crate) const FORMAT: &str = "packed";

#[derive(Debug, Clone)]
pub struct PackedStatement {
    pub alg: CoseAlgorithm,
    pub sig: Vec<u8>,
    /// Attestation certificate chain, leaf first. Absent for self attestation.
    pub x5c: Option<Vec<Vec<u8>>>,
}

impl PackedStatement {
    pub(crate) fn from_map(map: StatementMap<'_>) -> Result<Self> {
        if map.contains("ecdaaKeyId") {
            return Err(map.reject("ECDAA attestation is not supported"));
        }
        Ok(Self {
            alg: map.algorithm()?,
            sig: map.bytes("sig")?,
            x5c: map.certificates()?,
        })
    }

    pub(crate) fn verify(
        &self,
        auth_data: &AuthenticatorData,
        client_data_hash: &[u8],
        now: SystemTime,
    ) -> Result<VerifiedAttestation> {
        let credential = attested_credential(FORMAT, auth_data)?;
        let message = signed_data(auth_data, client_data_hash);

        let Some(x5c) = &self.x5c else {
            if self.alg != credential.public_key.algorithm() {
                return Err(Error::attestation(
                    FORMAT,
                    format!(
                        "alg {} does not match credential key {}",
                        self.alg,
                        credential.public_key.algorithm()
                    ),
                ));
            }
            if !credential.public_key.verify(&message, &self.sig) {
                return Err(Error::attestation(FORMAT, "self attestation signature invalid"));
            }
            return Ok(VerifiedAttestation::new(
                AttestationType::SelfAttestation,
                Vec::new(),
            ));
        };

        let chain = certificate::parse_chain(FORMAT, x5c, now)?;
        let leaf = &chain[0];
        certificate::verify(FORMAT, leaf, self.alg, &message, &self.sig)?;
        certificate::check_packed_requirements(FORMAT, leaf)?;
        certificate::check_aaguid(FORMAT, leaf, &credential.aaguid)?;

        Ok(VerifiedAttestation::new(AttestationType::Basic, x5c.clone()))
    }
}
