//! Credential resolution: session override, then stored credential,
//! then the secret-provider fallback chain.

use crate::credentials::provider::SecretProviderRegistry;
use crate::credentials::store::CredentialStore;
use crate::credentials::CredentialOverride;
use crate::domain::{AwxError, CredentialMaterial, CredentialOrigin, EnvironmentConfig};
use std::sync::Arc;
use tracing::debug;

pub struct CredentialResolver {
    store: Arc<dyn CredentialStore>,
    providers: Arc<SecretProviderRegistry>,
}

impl CredentialResolver {
    pub fn new(store: Arc<dyn CredentialStore>, providers: Arc<SecretProviderRegistry>) -> Self {
        Self { store, providers }
    }

    /// Produce authentication material for `environment`.
    ///
    /// Precedence, highest first: per-session override (used as-is,
    /// never persisted), stored credential bound to the environment id,
    /// then the provider fallback chain. Resolution never mutates the
    /// environment registry.
    pub async fn resolve(
        &self,
        environment: &EnvironmentConfig,
        session_override: Option<&CredentialOverride>,
        user: &str,
    ) -> Result<CredentialMaterial, AwxError> {
        if let Some(override_) = session_override {
            debug!(
                environment = %environment.name,
                "Using client-provided session credential"
            );
            return Ok(CredentialMaterial {
                credential_type: override_.credential_type,
                username: override_.username.clone(),
                secret: override_.secret.clone(),
                origin: CredentialOrigin::ClientProvided,
            });
        }

        if let Some(stored) = self.store.get(environment.id)? {
            debug!(
                environment = %environment.name,
                "Resolved stored credential"
            );
            return Ok(CredentialMaterial {
                credential_type: stored.credential_type,
                username: stored.username,
                secret: stored.secret,
                origin: CredentialOrigin::Stored,
            });
        }

        if self.providers.is_empty() {
            return Err(AwxError::configuration(
                &environment.name,
                "no credential stored and no secret providers configured",
            ));
        }

        self.providers
            .resolve(user, &environment.name)
            .await
            .map_err(|e| match e {
                // Re-key chain errors on the environment's display name.
                AwxError::Configuration { reason, .. } => {
                    AwxError::configuration(&environment.name, reason)
                }
                other => other,
            })
    }
}
