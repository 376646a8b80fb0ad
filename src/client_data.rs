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

//! Client data parsing and verification for WebAuthn operations.

use std::fmt;
use std::str::FromStr;

use aws_lc_rs::constant_time;
use url::Url;

use crate::error::{ClientDataField, Error, Result};

/// The type of WebAuthn operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientDataType {
    /// Registration operation ("webauthn.create").
    Create,
    /// Authentication operation ("webauthn.get").
    Get,
}

impl ClientDataType {
    /// Returns the string representation used in the client data JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientDataType::Create => "webauthn.create",
            ClientDataType::Get => "webauthn.get",
        }
    }
}

impl FromStr for ClientDataType {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "webauthn.create" => Ok(ClientDataType::Create),
            "webauthn.get" => Ok(ClientDataType::Get),
            _ => Err(Error::ClientDataMismatch(ClientDataField::Type)),
        }
    }
}

impl fmt::Display for ClientDataType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Token binding status reported by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenBindingStatus {
    Present,
    Supported,
    NotSupported,
}

impl FromStr for TokenBindingStatus {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "present" => Ok(TokenBindingStatus::Present),
            "supported" => Ok(TokenBindingStatus::Supported),
            "not-supported" => Ok(TokenBindingStatus::NotSupported),
            _ => Err(Error::ClientDataMismatch(ClientDataField::TokenBinding)),
        }
    }
}

/// The `tokenBinding` member of the client data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBinding {
    pub status: TokenBindingStatus,

    /// base64url-encoded token binding id; only meaningful when `status` is
    /// `Present`.
    pub id: Option<String>,
}

/// The origin the relying party expects for one call, plus an optional token
/// binding id the client must prove.
#[derive(Debug, Clone, Copy)]
pub struct EffectiveOrigin<'a> {
    origin: &'a str,
    token_binding_id: Option<&'a [u8]>,
}

impl<'a> EffectiveOrigin<'a> {
    pub fn new(origin: &'a str) -> Self {
        Self {
            origin,
            token_binding_id: None,
        }
    }

    /// Requires the client data to carry a `present` token binding with this id.
    pub fn with_token_binding(mut self, id: &'a [u8]) -> Self {
        self.token_binding_id = Some(id);
        self
    }

    pub fn origin(&self) -> &str {
        self.origin
    }
}

impl<'a> From<&'a str> for EffectiveOrigin<'a> {
    fn from(origin: &'a str) -> Self {
        Self::new(origin)
    }
}

/// Parsed client data from WebAuthn operations.
///
/// This structure contains the parsed fields from the client data JSON
/// that is sent by the browser during registration and authentication.
#[derive(Debug)]
pub struct ClientData {
    /// The type of operation (Create for registration, Get for authentication).
    pub type_: ClientDataType,

    /// The challenge that was signed (base64url-encoded).
    pub challenge: String,

    /// The origin of the requesting page.
    pub origin: String,

    /// Whether the request came from a cross-origin iframe.
    pub cross_origin: bool,

    pub token_binding: Option<TokenBinding>,
}

impl ClientData {
    /// Parses client data from raw JSON bytes.
    ///
    /// # Arguments
    ///
    /// * `bytes` - The raw JSON bytes
    ///
    /// # Returns
    ///
    /// A `ClientData` struct containing the parsed fields.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The JSON parsing fails
    /// * Required fields are missing
    /// * The type is not a WebAuthn ceremony type
    /// * The token binding status is unknown
    pub fn from_bytes(bytes: &[u8]) -> Result<ClientData> {
        let json: serde_json::Value = serde_json::from_slice(bytes)
            .map_err(|e| Error::MalformedClientData(format!("Invalid client data JSON: {}", e)))?;

        let type_str = json["type"]
            .as_str()
            .ok_or_else(|| Error::MalformedClientData("Missing type in client data".into()))?;

        let type_ = type_str.parse::<ClientDataType>()?;

        let challenge = json["challenge"]
            .as_str()
            .ok_or_else(|| Error::MalformedClientData("Missing challenge in client data".into()))?
            .to_string();

        let origin = json["origin"]
            .as_str()
            .ok_or_else(|| Error::MalformedClientData("Missing origin in client data".into()))?
            .to_string();

        let cross_origin = json["crossOrigin"].as_bool().unwrap_or(false);

        let token_binding = match &json["tokenBinding"] {
            serde_json::Value::Null => None,
            serde_json::Value::Object(binding) => {
                let status = binding
                    .get("status")
                    .and_then(|s| s.as_str())
                    .ok_or(Error::ClientDataMismatch(ClientDataField::TokenBinding))?
                    .parse::<TokenBindingStatus>()?;
                let id = binding
                    .get("id")
                    .and_then(|id| id.as_str())
                    .map(str::to_string);
                Some(TokenBinding { status, id })
            }
            _ => return Err(Error::ClientDataMismatch(ClientDataField::TokenBinding)),
        };

        Ok(ClientData {
            type_,
            challenge,
            origin,
            cross_origin,
            token_binding,
        })
    }

    /// Parses a base64url-encoded client data JSON string.
    #[inline]
    pub fn from_base64(client_data_json: &str) -> Result<ClientData> {
        let bytes = crate::base64_decode(client_data_json)?;
        Self::from_bytes(&bytes)
    }

    /// Verifies the client data against the ceremony expectations.
    ///
    /// Checks, in order, the type, the challenge, the origin and the token
    /// binding.
    ///
    /// # Arguments
    ///
    /// * `expected_type` - The expected type (Create or Get)
    /// * `expected_challenge` - The challenge bytes the relying party issued
    /// * `effective_origin` - The origin of this call and an optional token binding id
    /// * `allowed_origins` - Additional origins accepted from configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClientDataMismatch`] naming the first field that failed.
    pub fn verify(
        &self,
        expected_type: ClientDataType,
        expected_challenge: &[u8],
        effective_origin: &EffectiveOrigin<'_>,
        allowed_origins: &[String],
    ) -> Result<()> {
        if self.type_ != expected_type {
            tracing::debug!(expected = %expected_type, received = %self.type_, "client data type mismatch");
            return Err(Error::ClientDataMismatch(ClientDataField::Type));
        }

        let challenge = crate::base64_decode(&self.challenge)
            .map_err(|_| Error::ClientDataMismatch(ClientDataField::Challenge))?;
        if constant_time::verify_slices_are_equal(&challenge, expected_challenge).is_err() {
            return Err(Error::ClientDataMismatch(ClientDataField::Challenge));
        }

        let origin_ok = origins_match(&self.origin, effective_origin.origin)
            || allowed_origins
                .iter()
                .any(|allowed| origins_match(&self.origin, allowed));
        if !origin_ok {
            tracing::debug!(
                expected = effective_origin.origin,
                received = %self.origin,
                "client data origin mismatch"
            );
            return Err(Error::ClientDataMismatch(ClientDataField::Origin));
        }

        self.verify_token_binding(effective_origin.token_binding_id)
    }

    fn verify_token_binding(&self, expected_id: Option<&[u8]>) -> Result<()> {
        let Some(expected_id) = expected_id else {
            return Ok(());
        };

        let binding = self
            .token_binding
            .as_ref()
            .filter(|b| b.status == TokenBindingStatus::Present)
            .ok_or(Error::ClientDataMismatch(ClientDataField::TokenBinding))?;
        let id = binding
            .id
            .as_deref()
            .and_then(|id| crate::base64_decode(id).ok())
            .ok_or(Error::ClientDataMismatch(ClientDataField::TokenBinding))?;

        constant_time::verify_slices_are_equal(&id, expected_id)
            .map_err(|_| Error::ClientDataMismatch(ClientDataField::TokenBinding))
    }
}

/// Compares web origins by scheme, host and port. Non-web origins such as
/// `android:apk-key-hash:...` must match exactly.
fn origins_match(received: &str, expected: &str) -> bool {
    match (Url::parse(received), Url::parse(expected)) {
        (Ok(r), Ok(e)) if r.origin().is_tuple() && e.origin().is_tuple() => {
            r.origin() == e.origin()
        }
        _ => received == expected,
    }
}
