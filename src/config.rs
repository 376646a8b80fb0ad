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

//! Verifier configuration.
//!
//! Every field has a default, so a partial JSON or TOML document deserializes
//! into a complete configuration.

use serde::{Deserialize, Serialize};

use crate::attestation::AttestationType;

/// Configuration shared by both ceremony validators.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Origins accepted in addition to the effective origin of each call,
    /// e.g. `android:apk-key-hash:...` or a secondary web front-end.
    pub allowed_origins: Vec<String>,

    pub attestation: AttestationPolicy,

    pub safetynet: SafetyNetPolicy,
}

/// Which attestation outcomes a registration may end with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AttestationPolicy {
    /// Attestation types accepted. Empty accepts every type.
    pub accepted_types: Vec<AttestationType>,

    /// Reject registrations whose trust path the trust-anchor catalog does not
    /// accept. Without a catalog configured every non-empty path is rejected.
    pub require_trusted_path: bool,
}

impl AttestationPolicy {
    pub fn accepts(&self, attestation_type: AttestationType) -> bool {
        self.accepted_types.is_empty() || self.accepted_types.contains(&attestation_type)
    }
}

/// Freshness and integrity requirements for `android-safetynet` statements.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyNetPolicy {
    /// Maximum age of the attestation response, in milliseconds.
    pub max_age_ms: u64,

    /// Tolerated clock skew for timestamps in the future, in milliseconds.
    pub leeway_ms: u64,

    pub require_cts_profile_match: bool,
}

impl Default for SafetyNetPolicy {
    fn default() -> Self {
        Self {
            max_age_ms: 60_000,
            leeway_ms: 0,
            require_cts_profile_match: true,
        }
    }
}
