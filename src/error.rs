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

//! Error taxonomy for ceremony verification.

use std::fmt;

/// The client data field that failed to match the ceremony expectations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientDataField {
    /// `type` was not the expected ceremony type.
    Type,
    /// `challenge` differs from the issued challenge.
    Challenge,
    /// `origin` is not an acceptable origin.
    Origin,
    /// `tokenBinding` is malformed or does not satisfy the caller's requirement.
    TokenBinding,
}

impl fmt::Display for ClientDataField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ClientDataField::Type => "type",
            ClientDataField::Challenge => "challenge",
            ClientDataField::Origin => "origin",
            ClientDataField::TokenBinding => "tokenBinding",
        };
        f.write_str(name)
    }
}

/// Every way a registration or authentication ceremony can be rejected.
///
/// All variants are terminal for the ceremony. The transport layer is expected
/// to collapse them into a single opaque rejection for the client while
/// logging the full variant server-side.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A `clientDataJSON` member does not match what the ceremony expects.
    #[error("client data mismatch: {0}")]
    ClientDataMismatch(ClientDataField),

    /// The credential JSON sent by the client could not be decoded.
    #[error("malformed credential: {0}")]
    MalformedCredential(String),

    /// `clientDataJSON` is not valid JSON or lacks a required member.
    #[error("malformed client data: {0}")]
    MalformedClientData(String),

    /// The authenticator data is truncated, inconsistent or has trailing bytes.
    #[error("malformed authenticator data: {0}")]
    MalformedAuthenticatorData(String),

    /// The attestation object is not the expected CBOR map.
    #[error("malformed attestation object: {0}")]
    MalformedAttestationObject(String),

    /// A COSE key is missing parameters or has the wrong sizes.
    #[error("malformed public key: {0}")]
    MalformedPublicKey(String),

    /// The COSE algorithm, key type or curve is not supported.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The assertion signature does not verify with the stored key.
    #[error("signature verification failed")]
    SignatureInvalid,

    /// The sign counter did not increase. Signals a possibly cloned authenticator.
    #[error(
        "sign counter did not increase (stored {stored}, received {received}); \
         the authenticator may have been cloned"
    )]
    CounterReplay {
        /// Counter stored from the previous ceremony.
        stored: u32,
        /// Counter reported by the authenticator.
        received: u32,
    },

    /// No credential source is stored under the credential id.
    #[error("unknown credential")]
    UnknownCredential,

    /// The credential is not in the request's `allowCredentials`.
    #[error("credential is not in the allowed list")]
    CredentialNotAllowed,

    /// `rpIdHash` is not the SHA-256 of the relying party id.
    #[error("relying party id hash mismatch")]
    RelyingPartyMismatch,

    /// The UP flag is not set.
    #[error("user presence flag is not set")]
    UserPresenceRequired,

    /// UV was required but the flag is not set.
    #[error("user verification flag is not set")]
    UserVerificationRequired,

    /// The user handle differs from the one the credential belongs to.
    #[error("user handle mismatch")]
    UserHandleMismatch,

    /// The attestation statement failed verification or policy.
    #[error("attestation statement ({format}) rejected: {reason}")]
    AttestationRejected {
        /// The statement's `fmt`.
        format: String,
        /// What failed.
        reason: String,
    },

    /// The credential key algorithm is not in `pubKeyCredParams`.
    #[error("credential algorithm {0} is not acceptable for this ceremony")]
    UnacceptableAlgorithm(i64),

    /// A registration response carries no attested credential data.
    #[error("attested credential data is missing")]
    MissingCredentialData,

    /// The credential id is already stored in the repository.
    #[error("credential id is already registered")]
    CredentialAlreadyRegistered,

    /// A repository or cache operation failed.
    #[error("repository: {0}")]
    Repository(String),

    /// A binary member is neither base64url nor standard base64.
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl Error {
    /// Whether the caller should flag or revoke the credential involved.
    ///
    /// Only a counter replay carries this signal: it indicates a probable
    /// cloned authenticator rather than a merely bad request.
    pub fn recommends_revocation(&self) -> bool {
        matches!(self, Error::CounterReplay { .. })
    }

    pub(crate) fn attestation(format: &str, reason: impl Into<String>) -> Self {
        Error::AttestationRejected {
            format: format.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
