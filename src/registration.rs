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

//! Passkey registration (attestation) verification.

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use aws_lc_rs::digest::{self, SHA256};

use crate::attestation::{AttestationObject, VerifiedAttestation};
use crate::client_data::{ClientData, ClientDataType, EffectiveOrigin};
use crate::config::VerifierConfig;
use crate::error::{Error, Result};
use crate::repository::{CredentialRepository, TrustAnchorCatalog, TrustDecision};
use crate::types::*;

/// Verifies registration ceremonies and builds the new credential source.
#[derive(Clone, Default)]
pub struct AuthenticatorAttestationResponseValidator {
    config: VerifierConfig,
    trust_anchors: Option<Arc<dyn TrustAnchorCatalog>>,
}

impl fmt::Debug for AuthenticatorAttestationResponseValidator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AuthenticatorAttestationResponseValidator")
            .field("config", &self.config)
            .field("trust_anchors", &self.trust_anchors.is_some())
            .finish()
    }
}

impl AuthenticatorAttestationResponseValidator {
    pub fn new(config: VerifierConfig) -> Self {
        Self {
            config,
            trust_anchors: None,
        }
    }

    /// Consults `catalog` for every attestation that carries a trust path.
    pub fn with_trust_anchors(mut self, catalog: Arc<dyn TrustAnchorCatalog>) -> Self {
        self.trust_anchors = Some(catalog);
        self
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Verifies an attestation response against the creation options.
    ///
    /// # Arguments
    ///
    /// * `repository` - Used to refuse credential ids that are already registered
    /// * `response` - The decoded attestation response
    /// * `options` - The creation options issued for this ceremony
    /// * `effective_origin` - The origin this request arrived on
    ///
    /// # Returns
    ///
    /// A new credential source. The caller persists it.
    ///
    /// # Errors
    ///
    /// Returns the first failed check.
    pub fn check(
        &self,
        repository: &dyn CredentialRepository,
        response: &AuthenticatorAttestationResponse,
        options: &PublicKeyCredentialCreationOptions,
        effective_origin: EffectiveOrigin<'_>,
    ) -> Result<PublicKeyCredentialSource> {
        self.check_at(repository, response, options, effective_origin, SystemTime::now())
    }

    /// Like [`check`](Self::check), judging attestation freshness against `now`.
    pub fn check_at(
        &self,
        repository: &dyn CredentialRepository,
        response: &AuthenticatorAttestationResponse,
        options: &PublicKeyCredentialCreationOptions,
        effective_origin: EffectiveOrigin<'_>,
        now: SystemTime,
    ) -> Result<PublicKeyCredentialSource> {
        self.verify(repository, response, options, effective_origin, now)
            .inspect_err(|e| {
                tracing::warn!(rp_id = %options.rp.id, error = %e, "registration ceremony rejected");
            })
    }

    fn verify(
        &self,
        repository: &dyn CredentialRepository,
        response: &AuthenticatorAttestationResponse,
        options: &PublicKeyCredentialCreationOptions,
        effective_origin: EffectiveOrigin<'_>,
        now: SystemTime,
    ) -> Result<PublicKeyCredentialSource> {
        // Verify client data
        let client_data = ClientData::from_bytes(&response.client_data_json)?;
        client_data.verify(
            ClientDataType::Create,
            &options.challenge,
            &effective_origin,
            &self.config.allowed_origins,
        )?;

        let attestation = AttestationObject::from_bytes(&response.attestation_object)?;
        let auth_data = &attestation.auth_data;
        let credential = auth_data
            .attested_credential_data
            .as_ref()
            .ok_or(Error::MissingCredentialData)?;

        if !auth_data.matches_rp_id(&options.rp.id) {
            return Err(Error::RelyingPartyMismatch);
        }

        if !auth_data.flags.user_present() {
            return Err(Error::UserPresenceRequired);
        }
        if options.authenticator_selection.user_verification
            == UserVerificationRequirement::Required
            && !auth_data.flags.user_verified()
        {
            return Err(Error::UserVerificationRequired);
        }

        let alg = credential.public_key.algorithm();
        if !options.pub_key_cred_params.iter().any(|p| p.alg == alg.id()) {
            return Err(Error::UnacceptableAlgorithm(alg.id()));
        }

        let client_data_hash = digest::digest(&SHA256, &response.client_data_json);
        let verified = attestation.statement.verify_at(
            auth_data,
            client_data_hash.as_ref(),
            &self.config,
            now,
        )?;
        self.apply_policy(attestation.statement.format(), &credential.aaguid, &verified)?;

        if repository
            .find_by_credential_id(&credential.credential_id)?
            .is_some()
        {
            return Err(Error::CredentialAlreadyRegistered);
        }

        tracing::debug!(
            format = attestation.statement.format(),
            attestation_type = %verified.attestation_type,
            aaguid = %credential.aaguid,
            alg = %alg,
            "registration verified"
        );

        Ok(PublicKeyCredentialSource {
            credential_id: credential.credential_id.clone(),
            credential_type: PUBLIC_KEY_CREDENTIAL_TYPE.to_string(),
            transports: response.transports.clone(),
            attestation_type: verified.attestation_type,
            trust_path: verified.trust_path,
            aaguid: credential.aaguid,
            credential_public_key: credential.credential_public_key.clone(),
            user_handle: options.user.id.clone(),
            counter: auth_data.sign_count,
            backup_eligible: auth_data.flags.backup_eligible(),
            backup_state: auth_data.flags.backup_state(),
            uv_initialized: auth_data.flags.user_verified(),
        })
    }

    fn apply_policy(
        &self,
        format: &str,
        aaguid: &uuid::Uuid,
        verified: &VerifiedAttestation,
    ) -> Result<()> {
        let policy = &self.config.attestation;
        if !policy.accepts(verified.attestation_type) {
            return Err(Error::attestation(
                format,
                format!("attestation type {} is not accepted", verified.attestation_type),
            ));
        }

        // None and self attestation have no chain to judge
        if verified.trust_path.is_empty() {
            return Ok(());
        }

        let decision = match &self.trust_anchors {
            Some(catalog) => catalog.validate_trust_path(aaguid, &verified.trust_path),
            None if policy.require_trusted_path => TrustDecision::Rejected,
            None => return Ok(()),
        };

        if decision == TrustDecision::Rejected {
            return Err(Error::attestation(format, "trust path is not anchored in a trusted root"));
        }
        Ok(())
    }
}
