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

//! `android-key` hardware-backed keystore attestation.

use std::time::SystemTime;

use aws_lc_rs::constant_time;
use der_parser::ber::{BerObject, BerObjectContent};
use der_parser::der::Tag;

use crate::authenticator_data::AuthenticatorData;
use crate::cose::CoseAlgorithm;
use crate::error::{Error, Result};

use super::{attested_credential, certificate, signed_data, StatementMap};
use super::{AttestationType, VerifiedAttestation};

pub(crate) const FORMAT: &str = "android-key";

const OID_KEY_DESCRIPTION: &str = "1.3.6.1.4.1.11129.2.1.17";

const TAG_PURPOSE: u32 = 1;
const TAG_ALL_APPLICATIONS: u32 = 600;
const KM_PURPOSE_SIGN: u32 = 2;

#[derive(Debug, Clone)]
pub struct AndroidKeyStatement {
    pub alg: CoseAlgorithm,
    pub sig: Vec<u8>,
    pub x5c: Vec<Vec<u8>>,
}

/// The parts of the keystore key description the ceremony depends on.
#[derive(Debug, Default)]
struct KeyDescription {
    attestation_challenge: Vec<u8>,
    software_enforced: AuthorizationList,
    tee_enforced: AuthorizationList,
}

#[derive(Debug, Default)]
struct AuthorizationList {
    all_applications: bool,
    purposes: Vec<u32>,
}

impl AndroidKeyStatement {
    pub(crate) fn from_map(map: StatementMap<'_>) -> Result<Self> {
        Ok(Self {
            alg: map.algorithm()?,
            sig: map.bytes("sig")?,
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

        certificate::verify(
            FORMAT,
            leaf,
            self.alg,
            &signed_data(auth_data, client_data_hash),
            &self.sig,
        )?;

        if !certificate::key_matches(leaf, &credential.public_key) {
            return Err(Error::attestation(
                FORMAT,
                "certificate key does not match credential key",
            ));
        }

        let description = certificate::extension(leaf, OID_KEY_DESCRIPTION)
            .ok_or_else(|| Error::attestation(FORMAT, "key description extension missing"))
            .and_then(|ext| KeyDescription::parse(ext.value))?;

        if constant_time::verify_slices_are_equal(
            &description.attestation_challenge,
            client_data_hash,
        )
        .is_err()
        {
            return Err(Error::attestation(
                FORMAT,
                "attestation challenge does not match client data hash",
            ));
        }

        if description.software_enforced.all_applications
            || description.tee_enforced.all_applications
        {
            return Err(Error::attestation(FORMAT, "key is not scoped to the relying party"));
        }

        let can_sign = description.software_enforced.purposes.contains(&KM_PURPOSE_SIGN)
            || description.tee_enforced.purposes.contains(&KM_PURPOSE_SIGN);
        if !can_sign {
            return Err(Error::attestation(FORMAT, "key purpose does not include signing"));
        }

        Ok(VerifiedAttestation::new(AttestationType::Basic, self.x5c.clone()))
    }
}

fn invalid() -> Error {
    Error::attestation(FORMAT, "invalid key description extension")
}

impl KeyDescription {
    // attestationVersion, attestationSecurityLevel, keymasterVersion,
    // keymasterSecurityLevel, attestationChallenge, uniqueId, softwareEnforced,
    // teeEnforced
    fn parse(value: &[u8]) -> Result<Self> {
        let (_, obj) = der_parser::der::parse_der(value).map_err(|_| invalid())?;
        let fields = obj.as_sequence().map_err(|_| invalid())?;
        if fields.len() < 8 {
            return Err(invalid());
        }

        Ok(KeyDescription {
            attestation_challenge: fields[4].as_slice().map_err(|_| invalid())?.to_vec(),
            software_enforced: AuthorizationList::parse(&fields[6])?,
            tee_enforced: AuthorizationList::parse(&fields[7])?,
        })
    }
}

impl AuthorizationList {
    fn parse(obj: &BerObject<'_>) -> Result<Self> {
        let mut list = AuthorizationList::default();

        for entry in obj.as_sequence().map_err(|_| invalid())? {
            let BerObjectContent::Unknown(any) = &entry.content else {
                continue;
            };
            match entry.tag() {
                Tag(TAG_ALL_APPLICATIONS) => list.all_applications = true,
                Tag(TAG_PURPOSE) => {
                    let (_, set) = der_parser::der::parse_der(any.data).map_err(|_| invalid())?;
                    for purpose in set.as_set().map_err(|_| invalid())? {
                        list.purposes.push(purpose.as_u32().map_err(|_| invalid())?);
                    }
                }
                _ => {}
            }
        }

        Ok(list)
    }
}
