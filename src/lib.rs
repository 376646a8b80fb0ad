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

//! passkey-verifier - relying-party verification core for WebAuthn/FIDO2
//!
//! Decides whether an authenticator response is cryptographically valid and
//! bound to the challenge the relying party issued, for both the registration
//! (attestation) and the authentication (assertion) ceremony.
//!
//! # Features
//!
//! - ES256, ES384, ES512, RS256, PS256 and EdDSA credential keys
//! - `none`, `packed`, `fido-u2f`, `android-key`, `android-safetynet`, `tpm`
//!   and `apple` attestation statements
//! - Sign counter anti-cloning policy
//! - Backup eligibility and backup state tracking
//! - Storage and trust decisions behind traits, with in-memory implementations
//!
//! # Example
//!
//! ```rust
//! use passkey_verifier::{
//!     AuthenticatorAssertionResponse, AuthenticatorAssertionResponseValidator,
//!     EffectiveOrigin, InMemoryCredentialRepository, PublicKeyCredentialRequestOptions,
//!     VerifierConfig,
//! };
//!
//! let repository = InMemoryCredentialRepository::new();
//! let validator = AuthenticatorAssertionResponseValidator::new(VerifierConfig::default());
//!
//! // Options issued when the ceremony started, retrieved from the options cache
//! let options = PublicKeyCredentialRequestOptions::new(vec![0u8; 32], "example.com");
//!
//! // Decoded from the browser's JSON payload
//! let response = AuthenticatorAssertionResponse {
//!     client_data_json: b"{}".to_vec(),
//!     authenticator_data: vec![0u8; 37],
//!     signature: Vec::new(),
//!     user_handle: None,
//! };
//!
//! let result = validator.check(
//!     &repository,
//!     b"unknown credential",
//!     &response,
//!     &options,
//!     EffectiveOrigin::new("https://example.com"),
//!     None,
//! );
//! assert!(result.is_err());
//! ```
//!
//! # Security Considerations
//!
//! - Take request options out of the cache exactly once per ceremony
//! - Persist the returned credential source to advance its sign counter
//! - Treat [`Error::recommends_revocation`] as a signal of a cloned authenticator
//! - Report every rejection to the client identically; log the detail server-side

pub mod attestation;
mod authentication;
mod authenticator_data;
mod client_data;
pub mod config;
mod cose;
mod credential;
mod error;
mod registration;
pub mod repository;
mod signature;
mod types;

#[cfg(test)]
mod tests;

pub use attestation::{AttestationObject, AttestationStatement, AttestationType, VerifiedAttestation};
pub use authentication::AuthenticatorAssertionResponseValidator;
pub use authenticator_data::{AttestedCredentialData, AuthenticatorData, AuthenticatorFlags};
pub use client_data::{ClientData, ClientDataType, EffectiveOrigin, TokenBinding, TokenBindingStatus};
pub use config::{AttestationPolicy, SafetyNetPolicy, VerifierConfig};
pub use cose::{CoseAlgorithm, CoseKey, EcCurve, OkpCurve};
pub use credential::{CredentialResponse, PublicKeyCredential};
pub use error::{ClientDataField, Error, Result};
pub use registration::AuthenticatorAttestationResponseValidator;
pub use repository::{
    CredentialRepository, InMemoryCredentialRepository, InMemoryOptionsCache, OptionsCache,
    TrustAnchorCatalog, TrustDecision,
};
pub use signature::{verify_signature, PublicKeyMaterial};
pub use types::*;

/// Encodes binary data as base64url (without padding).
#[inline]
pub fn base64_encode(data: &[u8]) -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    URL_SAFE_NO_PAD.encode(data)
}

/// Decodes base64url or standard base64, with or without padding.
///
/// # Errors
///
/// Returns [`Error::Base64`] if the input is not valid in either alphabet.
pub fn base64_decode(s: &str) -> Result<Vec<u8>> {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    let normalized: String = s
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            c => c,
        })
        .collect();
    Ok(URL_SAFE_NO_PAD.decode(normalized)?)
}
