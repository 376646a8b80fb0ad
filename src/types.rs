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

//! Data structures shared by the registration and authentication ceremonies.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attestation::AttestationType;

/// The only credential type defined by WebAuthn.
pub const PUBLIC_KEY_CREDENTIAL_TYPE: &str = "public-key";

/// User verification requirement for passkey operations.
///
/// Specifies whether user verification (e.g., PIN, biometric) is required
/// during the ceremony. Only `Required` makes the UV flag mandatory.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserVerificationRequirement {
    /// User verification is required.
    Required,
    /// User verification is preferred but not required.
    #[default]
    Preferred,
    /// User verification should not be performed.
    Discouraged,
}

/// A persisted credential, as registered and as updated after each assertion.
///
/// The credential id never changes once stored. The counter only moves forward.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct PublicKeyCredentialSource {
    /// The unique identifier for this credential.
    pub credential_id: Vec<u8>,

    /// Always [`PUBLIC_KEY_CREDENTIAL_TYPE`].
    pub credential_type: String,

    /// Transport hints reported by the client at registration.
    pub transports: Vec<String>,

    pub attestation_type: AttestationType,

    /// DER certificates of the attestation chain, leaf first. Empty for
    /// `none` and self attestation.
    pub trust_path: Vec<Vec<u8>>,

    pub aaguid: Uuid,

    /// The public key in COSE format.
    pub credential_public_key: Vec<u8>,

    /// Opaque user handle the credential was created for.
    pub user_handle: Vec<u8>,

    /// The signature counter used to detect cloned authenticators.
    pub counter: u32,

    #[serde(default)]
    pub backup_eligible: bool,

    #[serde(default)]
    pub backup_state: bool,

    #[serde(default)]
    pub uv_initialized: bool,
}

/// Identifies a credential in allow and exclude lists.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyCredentialDescriptor {
    /// Credential type (always "public-key" for passkeys).
    #[serde(rename = "type")]
    pub type_: String,

    /// The raw credential ID.
    pub id: Vec<u8>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transports: Vec<String>,
}

impl PublicKeyCredentialDescriptor {
    pub fn new(id: impl Into<Vec<u8>>) -> Self {
        Self {
            type_: PUBLIC_KEY_CREDENTIAL_TYPE.to_string(),
            id: id.into(),
            transports: Vec::new(),
        }
    }
}

/// Options the relying party issued for an authentication ceremony.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredentialRequestOptions {
    /// The raw challenge bytes.
    pub challenge: Vec<u8>,

    /// The relying party identifier.
    pub rp_id: String,

    /// Credentials allowed for this ceremony. Empty means any credential
    /// (usernameless / discoverable flow).
    #[serde(default)]
    pub allow_credentials: Vec<PublicKeyCredentialDescriptor>,

    #[serde(default)]
    pub user_verification: UserVerificationRequirement,

    /// Timeout for the operation in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl PublicKeyCredentialRequestOptions {
    pub fn new(challenge: impl Into<Vec<u8>>, rp_id: impl Into<String>) -> Self {
        Self {
            challenge: challenge.into(),
            rp_id: rp_id.into(),
            allow_credentials: Vec::new(),
            user_verification: UserVerificationRequirement::default(),
            timeout: None,
        }
    }
}

/// Information about the relying party (RP).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RelyingParty {
    /// Unique identifier for the relying party (typically the domain).
    pub id: String,

    /// Human-readable name of the relying party.
    pub name: String,
}

/// Information about the user account.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct UserEntity {
    /// Opaque user handle.
    pub id: Vec<u8>,

    /// Username or account identifier.
    pub name: String,

    /// Human-readable display name for the user.
    #[serde(rename = "displayName")]
    pub display_name: String,
}

/// A public key credential parameter specifying an acceptable algorithm.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PubKeyCredParam {
    /// COSE algorithm identifier (e.g., -7 for ES256).
    pub alg: i64,

    /// Credential type (always "public-key" for passkeys).
    #[serde(rename = "type")]
    pub type_: String,
}

impl PubKeyCredParam {
    pub fn new(alg: i64) -> Self {
        Self {
            alg,
            type_: PUBLIC_KEY_CREDENTIAL_TYPE.to_string(),
        }
    }
}

/// Authenticator selection criteria for passkey registration.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct AuthenticatorSelection {
    /// User verification requirement.
    #[serde(rename = "userVerification", default)]
    pub user_verification: UserVerificationRequirement,
}

/// Options the relying party issued for a registration ceremony.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredentialCreationOptions {
    /// Information about the relying party.
    pub rp: RelyingParty,

    /// Information about the user.
    pub user: UserEntity,

    /// The raw challenge bytes.
    pub challenge: Vec<u8>,

    /// Acceptable credential algorithms, in order of preference.
    pub pub_key_cred_params: Vec<PubKeyCredParam>,

    #[serde(default)]
    pub authenticator_selection: AuthenticatorSelection,

    /// Credentials the user already holds.
    #[serde(default)]
    pub exclude_credentials: Vec<PublicKeyCredentialDescriptor>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// The decoded `response` member of an assertion credential.
#[derive(Debug, Clone)]
pub struct AuthenticatorAssertionResponse {
    /// The raw client data JSON bytes.
    pub client_data_json: Vec<u8>,

    /// The raw authenticator data bytes.
    pub authenticator_data: Vec<u8>,

    /// The signature over the authenticator data and client data hash.
    pub signature: Vec<u8>,

    /// The user handle, when the authenticator returned one.
    pub user_handle: Option<Vec<u8>>,
}

/// The decoded `response` member of an attestation credential.
#[derive(Debug, Clone)]
pub struct AuthenticatorAttestationResponse {
    /// The raw client data JSON bytes.
    pub client_data_json: Vec<u8>,

    /// The raw CBOR attestation object.
    pub attestation_object: Vec<u8>,

    pub transports: Vec<String>,
}
