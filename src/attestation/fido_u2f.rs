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

//! `fido-u2f` attestation from CTAP1 authenticators.

use std::time::SystemTime;

use crate::authenticator_data::AuthenticatorData;
use crate::cose::{CoseAlgorithm, CoseKey, EcCurve};
use crate::error::{Error, Result};

use super::{attested_credential, certificate, StatementMap};
use super::{AttestationType, VerifiedAttestation};

pub(crate) const FORMAT: &str = "fido-u2f";

#[derive(Debug, Clone)]
pub struct FidoU2fStatement {
    pub sig: Vec<u8>,
    pub attestation_certificate: Vec<u8>,
}

impl FidoU2fStatement {
    pub(crate) fn from_map(map: StatementMap<'_>) -> Result<Self> {
        let mut x5c = map.required_certificates()?;
        if x5c.len() != 1 {
            return Err(map.reject("x5c must contain exactly one certificate"));
        }
        Ok(Self {
            sig: map.bytes("sig")?,
            attestation_certificate: x5c.remove(0),
        })
    }

    pub(crate) fn verify(
        &self,
        auth_data: &AuthenticatorData,
        client_data_hash: &[u8],
        now: SystemTime,
    ) -> Result<VerifiedAttestation> {
        let chain = certificate::parse_chain(
            FORMAT,
            std::slice::from_ref(&self.attestation_certificate),
            now,
        )?;
        let cert = &chain[0];
        if !certificate::is_ec_p256(cert) {
            return Err(Error::attestation(FORMAT, "certificate key is not on P-256"));
        }

        let credential = attested_credential(FORMAT, auth_data)?;
        let CoseKey::Ec2 {
            curve: EcCurve::P256,
            x,
            y,
            ..
        } = &credential.public_key
        else {
            return Err(Error::attestation(FORMAT, "credential key is not a P-256 key"));
        };

        // 0x00 || rpIdHash || clientDataHash || credentialId || 0x04 || x || y
        let mut verification_data = Vec::with_capacity(
            1 + 32 + client_data_hash.len() + credential.credential_id.len() + 65,
        );
        verification_data.push(0x00);
        verification_data.extend_from_slice(&auth_data.rp_id_hash);
        verification_data.extend_from_slice(client_data_hash);
        verification_data.extend_from_slice(&credential.credential_id);
        verification_data.push(0x04);
        verification_data.extend_from_slice(x);
        verification_data.extend_from_slice(y);

        certificate::verify(FORMAT, cert, CoseAlgorithm::ES256, &verification_data, &self.sig)?;

        Ok(VerifiedAttestation::new(
            AttestationType::Basic,
            vec![self.attestation_certificate.clone()],
        ))
    }
}
