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

//! Passkey authentication (assertion) verification.

use aws_lc_rs::digest::{self, SHA256};

use crate::authenticator_data::AuthenticatorData;
use crate::client_data::{ClientData, ClientDataType, EffectiveOrigin};
use crate::config::VerifierConfig;
use crate::cose::CoseKey;
use crate::error::{Error, Result};
use crate::repository::CredentialRepository;
use crate::types::*;

/// Verifies authentication ceremonies.
///
/// Holds only configuration, so one instance can serve any number of
/// concurrent ceremonies.
#[derive(Debug, Clone, Default)]
pub struct AuthenticatorAssertionResponseValidator {
    config: VerifierConfig,
}

impl AuthenticatorAssertionResponseValidator {
    pub fn new(config: VerifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Verifies an assertion response for the credential `credential_id`.
    ///
    /// # Arguments
    ///
    /// * `repository` - Where the stored credential source is looked up
    /// * `credential_id` - The raw credential id the client used
    /// * `response` - The decoded assertion response
    /// * `options` - The request options issued for this ceremony
    /// * `effective_origin` - The origin this request arrived on
    /// * `expected_user_handle` - The user the relying party expects, if known
    ///
    /// # Returns
    ///
    /// The credential source with its counter and backup state advanced. The
    /// caller persists it.
    ///
    /// # Errors
    ///
    /// Returns the first failed check. [`Error::CounterReplay`] means the
    /// credential should be flagged (see [`Error::recommends_revocation`]).
    pub fn check(
        &self,
        repository: &dyn CredentialRepository,
        credential_id: &[u8],
        response: &AuthenticatorAssertionResponse,
        options: &PublicKeyCredentialRequestOptions,
        effective_origin: EffectiveOrigin<'_>,
        expected_user_handle: Option<&[u8]>,
    ) -> Result<PublicKeyCredentialSource> {
        let source = match repository.find_by_credential_id(credential_id) {
            Ok(Some(source)) => source,
            Ok(None) => return Err(rejected(credential_id, Error::UnknownCredential)),
            Err(e) => return Err(rejected(credential_id, e)),
        };

        self.check_source(
            &source,
            response,
            options,
            effective_origin,
            expected_user_handle,
        )
    }

    /// Like [`check`](Self::check), for a source the caller already loaded.
    pub fn check_source(
        &self,
        source: &PublicKeyCredentialSource,
        response: &AuthenticatorAssertionResponse,
        options: &PublicKeyCredentialRequestOptions,
        effective_origin: EffectiveOrigin<'_>,
        expected_user_handle: Option<&[u8]>,
    ) -> Result<PublicKeyCredentialSource> {
        self.verify(
            source,
            response,
            options,
            effective_origin,
            expected_user_handle,
        )
        .map_err(|e| rejected(&source.credential_id, e))
    }

    fn verify(
        &self,
        source: &PublicKeyCredentialSource,
        response: &AuthenticatorAssertionResponse,
        options: &PublicKeyCredentialRequestOptions,
        effective_origin: EffectiveOrigin<'_>,
        expected_user_handle: Option<&[u8]>,
    ) -> Result<PublicKeyCredentialSource> {
        // Verify credential is allowed (skip check for usernameless/discoverable credential flow)
        if !options.allow_credentials.is_empty()
            && !options
                .allow_credentials
                .iter()
                .any(|c| c.id == source.credential_id)
        {
            return Err(Error::CredentialNotAllowed);
        }

        // Verify client data
        let client_data = ClientData::from_bytes(&response.client_data_json)?;
        client_data.verify(
            ClientDataType::Get,
            &options.challenge,
            &effective_origin,
            &self.config.allowed_origins,
        )?;

        let auth_data = AuthenticatorData::from_bytes(&response.authenticator_data)?;
        tracing::debug!(
            flags = ?auth_data.flags,
            sign_count = auth_data.sign_count,
            "parsed assertion authenticator data"
        );

        if !auth_data.matches_rp_id(&options.rp_id) {
            return Err(Error::RelyingPartyMismatch);
        }

        if !auth_data.flags.user_present() {
            return Err(Error::UserPresenceRequired);
        }
        if options.user_verification == UserVerificationRequirement::Required
            && !auth_data.flags.user_verified()
        {
            return Err(Error::UserVerificationRequired);
        }

        // Verify user handle
        if let Some(user_handle) = &response.user_handle {
            if *user_handle != source.user_handle {
                return Err(Error::UserHandleMismatch);
            }
        }
        if let Some(expected) = expected_user_handle {
            if expected != source.user_handle.as_slice() {
                return Err(Error::UserHandleMismatch);
            }
        }

        // Verify signature
        let public_key = CoseKey::from_bytes(&source.credential_public_key)?;
        let client_data_hash = digest::digest(&SHA256, &response.client_data_json);
        let mut signed_data = response.authenticator_data.clone();
        signed_data.extend_from_slice(client_data_hash.as_ref());
        if !public_key.verify(&signed_data, &response.signature) {
            return Err(Error::SignatureInvalid);
        }

        // Verify counter; authenticators without a counter always report zero
        let stored = source.counter;
        let received = auth_data.sign_count;
        if (stored != 0 || received != 0) && received <= stored {
            tracing::warn!(
                credential_id = %crate::base64_encode(&source.credential_id),
                stored,
                received,
                "sign counter did not increase, possible cloned authenticator"
            );
            return Err(Error::CounterReplay { stored, received });
        }

        let mut updated = source.clone();
        updated.counter = received;
        updated.backup_state = auth_data.flags.backup_state();
        updated.uv_initialized |= auth_data.flags.user_verified();

        tracing::debug!(
            credential_id = %crate::base64_encode(&source.credential_id),
            counter = updated.counter,
            "assertion verified"
        );
        Ok(updated)
    }
}

fn rejected(credential_id: &[u8], error: Error) -> Error {
    tracing::warn!(
        credential_id = %crate::base64_encode(credential_id),
        error = %error,
        "authentication ceremony rejected"
    );
    error
}
