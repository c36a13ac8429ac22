//! Credential resolution subsystem: stored credentials, pluggable
//! secret providers and the resolver that ties them together.

mod provider;
mod resolver;
mod store;

pub use provider::{
    ensure_env_loaded, EnvSecretProvider, ProviderError, SecretProvider, SecretProviderRegistry,
    StubProvider,
};
pub use resolver::CredentialResolver;
pub use store::{CredentialStore, KeyringStore, MemoryStore, StoredCredential, KEYRING_SERVICE};

use crate::domain::CredentialType;
use serde::Deserialize;

/// Per-session credential supplied by the invoking client alongside a
/// tool invocation. Deserialize-only: it is never echoed back, never
/// persisted, and `Debug` redacts the secret.
#[derive(Clone, Deserialize)]
pub struct CredentialOverride {
    pub credential_type: CredentialType,
    #[serde(default)]
    pub username: Option<String>,
    pub secret: String,
}

impl std::fmt::Debug for CredentialOverride {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialOverride")
            .field("credential_type", &self.credential_type)
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}
