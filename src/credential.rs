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

//! Decoding of the `PublicKeyCredential` JSON sent by the browser.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::{
    AuthenticatorAssertionResponse, AuthenticatorAttestationResponse, PUBLIC_KEY_CREDENTIAL_TYPE,
};

/// The `response` member, by ceremony.
#[derive(Debug, Clone)]
pub enum CredentialResponse {
    Attestation(AuthenticatorAttestationResponse),
    Assertion(AuthenticatorAssertionResponse),
}

/// A credential returned by `navigator.credentials.create()` or `.get()`.
#[derive(Debug, Clone)]
pub struct PublicKeyCredential {
    /// The credential id as sent (base64url).
    pub id: String,

    pub raw_id: Vec<u8>,

    pub response: CredentialResponse,
}

impl PublicKeyCredential {
    /// Parses the credential JSON.
    ///
    /// Binary members may be base64url or standard base64, padded or not.
    /// A response with `attestationObject` is an attestation; one with
    /// `authenticatorData` and `signature` is an assertion.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedCredential`] if the JSON is invalid, the type
    /// is not `public-key`, `id` and `rawId` disagree, or members are missing.
    pub fn from_json(json: &str) -> Result<PublicKeyCredential> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| Error::MalformedCredential(format!("Invalid credential JSON: {}", e)))?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<PublicKeyCredential> {
        if value["type"].as_str() != Some(PUBLIC_KEY_CREDENTIAL_TYPE) {
            return Err(Error::MalformedCredential("type must be \"public-key\"".into()));
        }

        let id = required_str(value, "id")?.to_string();
        let raw_id = binary(value, "rawId")?;
        if crate::base64_decode(&id)? != raw_id {
            return Err(Error::MalformedCredential("id does not match rawId".into()));
        }

        let response = &value["response"];
        if !response.is_object() {
            return Err(Error::MalformedCredential("Missing response".into()));
        }
        let client_data_json = binary(response, "clientDataJSON")?;

        let response = if response.get("attestationObject").is_some() {
            let transports = response["transports"]
                .as_array()
                .map(|t| t.iter().filter_map(|t| t.as_str().map(str::to_string)).collect())
                .unwrap_or_default();
            CredentialResponse::Attestation(AuthenticatorAttestationResponse {
                client_data_json,
                attestation_object: binary(response, "attestationObject")?,
                transports,
            })
        } else {
            let user_handle = match &response["userHandle"] {
                Value::Null => None,
                Value::String(s) if s.is_empty() => None,
                Value::String(s) => Some(crate::base64_decode(s)?),
                _ => return Err(Error::MalformedCredential("Invalid userHandle".into())),
            };
            CredentialResponse::Assertion(AuthenticatorAssertionResponse {
                client_data_json,
                authenticator_data: binary(response, "authenticatorData")?,
                signature: binary(response, "signature")?,
                user_handle,
            })
        };

        Ok(PublicKeyCredential {
            id,
            raw_id,
            response,
        })
    }
}

fn required_str<'a>(value: &'a Value, name: &str) -> Result<&'a str> {
    value[name]
        .as_str()
        .ok_or_else(|| Error::MalformedCredential(format!("Missing {}", name)))
}

fn binary(value: &Value, name: &str) -> Result<Vec<u8>> {
    crate::base64_decode(required_str(value, name)?)
}
