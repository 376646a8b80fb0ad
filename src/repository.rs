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

//! Collaborators the validators depend on, with in-memory implementations.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::PublicKeyCredentialSource;

/// Persistent storage of credential sources.
///
/// Implementations must be safe to share between threads.
pub trait CredentialRepository: Send + Sync {
    fn find_by_credential_id(&self, credential_id: &[u8])
        -> Result<Option<PublicKeyCredentialSource>>;

    fn find_all_for_user(&self, user_handle: &[u8]) -> Result<Vec<PublicKeyCredentialSource>>;

    /// Inserts or replaces the source keyed by its credential id.
    fn save(&self, source: &PublicKeyCredentialSource) -> Result<()>;

    /// Advances the stored counter from `expected` to `new` atomically.
    ///
    /// Returns `false` without writing when the stored counter is no longer
    /// `expected`, so two concurrent ceremonies cannot both advance it.
    fn compare_and_swap_counter(&self, credential_id: &[u8], expected: u32, new: u32)
        -> Result<bool>;
}

/// Single-use storage of the options issued when a ceremony started.
pub trait OptionsCache<T>: Send + Sync {
    fn insert(&self, token: &str, options: T) -> Result<()>;

    /// Removes and returns the options. A second call with the same token
    /// returns `None`, whatever the outcome of the first ceremony.
    fn take(&self, token: &str) -> Result<Option<T>>;
}

/// Outcome of a trust-anchor lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustDecision {
    Accepted,
    Rejected,
}

/// Decides whether an attestation chain leads to a trusted root, typically
/// backed by the FIDO Metadata Service.
pub trait TrustAnchorCatalog: Send + Sync {
    fn validate_trust_path(&self, aaguid: &Uuid, trust_path: &[Vec<u8>]) -> TrustDecision;
}

fn poisoned<T>(_: T) -> Error {
    Error::Repository("lock poisoned".into())
}

/// A [`CredentialRepository`] backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct InMemoryCredentialRepository {
    sources: RwLock<HashMap<Vec<u8>, PublicKeyCredentialSource>>,
}

impl InMemoryCredentialRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.sources.read().map_err(poisoned)?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl CredentialRepository for InMemoryCredentialRepository {
    fn find_by_credential_id(
        &self,
        credential_id: &[u8],
    ) -> Result<Option<PublicKeyCredentialSource>> {
        Ok(self.sources.read().map_err(poisoned)?.get(credential_id).cloned())
    }

    fn find_all_for_user(&self, user_handle: &[u8]) -> Result<Vec<PublicKeyCredentialSource>> {
        Ok(self
            .sources
            .read()
            .map_err(poisoned)?
            .values()
            .filter(|s| s.user_handle == user_handle)
            .cloned()
            .collect())
    }

    fn save(&self, source: &PublicKeyCredentialSource) -> Result<()> {
        self.sources
            .write()
            .map_err(poisoned)?
            .insert(source.credential_id.clone(), source.clone());
        Ok(())
    }

    fn compare_and_swap_counter(
        &self,
        credential_id: &[u8],
        expected: u32,
        new: u32,
    ) -> Result<bool> {
        let mut sources = self.sources.write().map_err(poisoned)?;
        match sources.get_mut(credential_id) {
            Some(source) if source.counter == expected => {
                source.counter = new;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(Error::UnknownCredential),
        }
    }
}

/// An [`OptionsCache`] backed by a `HashMap`.
#[derive(Debug)]
pub struct InMemoryOptionsCache<T> {
    entries: Mutex<HashMap<String, T>>,
}

impl<T> Default for InMemoryOptionsCache<T> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> InMemoryOptionsCache<T> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: Send> OptionsCache<T> for InMemoryOptionsCache<T> {
    fn insert(&self, token: &str, options: T) -> Result<()> {
        self.entries
            .lock()
            .map_err(poisoned)?
            .insert(token.to_string(), options);
        Ok(())
    }

    fn take(&self, token: &str) -> Result<Option<T>> {
        Ok(self.entries.lock().map_err(poisoned)?.remove(token))
    }
}
