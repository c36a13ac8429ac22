//! Stored-credential tier: secrets bound to an environment id.
//!
//! The default backend is the host OS keystore. An in-memory backend
//! exists for tests and for deployments without keystore access.

use crate::domain::{AwxError, CredentialType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

pub const KEYRING_SERVICE: &str = "awx-mcp-server";

/// Secret material persisted for an environment.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoredCredential {
    pub credential_type: CredentialType,
    pub username: Option<String>,
    pub secret: String,
}

impl std::fmt::Debug for StoredCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredCredential")
            .field("credential_type", &self.credential_type)
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

pub trait CredentialStore: Send + Sync {
    fn store(&self, env_id: Uuid, credential: StoredCredential) -> Result<(), AwxError>;
    fn get(&self, env_id: Uuid) -> Result<Option<StoredCredential>, AwxError>;
    fn delete(&self, env_id: Uuid) -> Result<(), AwxError>;
}

/// OS-keystore backend. One keyring entry per environment id, holding
/// the credential as a JSON blob.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self {
            service: KEYRING_SERVICE.to_string(),
        }
    }

    /// Namespaced store for multi-tenant isolation.
    pub fn for_tenant(tenant_id: &str) -> Self {
        Self {
            service: format!("{KEYRING_SERVICE}:{tenant_id}"),
        }
    }

    fn entry(&self, env_id: Uuid) -> Result<keyring::Entry, AwxError> {
        keyring::Entry::new(&self.service, &env_id.to_string())
            .map_err(|e| store_error(env_id, e))
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringStore {
    fn store(&self, env_id: Uuid, credential: StoredCredential) -> Result<(), AwxError> {
        let blob = serde_json::to_string(&credential).map_err(|e| {
            AwxError::configuration(env_id.to_string(), format!("failed to encode credential: {e}"))
        })?;
        self.entry(env_id)?
            .set_password(&blob)
            .map_err(|e| store_error(env_id, e))
    }

    fn get(&self, env_id: Uuid) -> Result<Option<StoredCredential>, AwxError> {
        match self.entry(env_id)?.get_password() {
            Ok(blob) => {
                let credential = serde_json::from_str(&blob).map_err(|e| {
                    AwxError::configuration(
                        env_id.to_string(),
                        format!("stored credential is corrupt: {e}"),
                    )
                })?;
                Ok(Some(credential))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(store_error(env_id, e)),
        }
    }

    fn delete(&self, env_id: Uuid) -> Result<(), AwxError> {
        match self.entry(env_id)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(store_error(env_id, e)),
        }
    }
}

fn store_error(env_id: Uuid, e: keyring::Error) -> AwxError {
    AwxError::configuration(env_id.to_string(), format!("keystore access failed: {e}"))
}

/// Ephemeral backend for tests and keystore-less deployments.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<Uuid, StoredCredential>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn store(&self, env_id: Uuid, credential: StoredCredential) -> Result<(), AwxError> {
        self.entries
            .lock()
            .expect("credential store lock poisoned")
            .insert(env_id, credential);
        Ok(())
    }

    fn get(&self, env_id: Uuid) -> Result<Option<StoredCredential>, AwxError> {
        Ok(self
            .entries
            .lock()
            .expect("credential store lock poisoned")
            .get(&env_id)
            .cloned())
    }

    fn delete(&self, env_id: Uuid) -> Result<(), AwxError> {
        self.entries
            .lock()
            .expect("credential store lock poisoned")
            .remove(&env_id);
        Ok(())
    }
}
