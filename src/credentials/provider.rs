//! Pluggable secret providers and the ordered fallback registry.
//!
//! Every backend implements one fixed interface. Integrations that are
//! not built yet are registered as stubs that deterministically report
//! `Unsupported`, so the fallback chain stays uniform and a missing
//! integration is never mistaken for a transient outage.

use crate::domain::{AwxError, CredentialMaterial, CredentialOrigin};
use async_trait::async_trait;
use std::env;
use std::sync::Once;
use thiserror::Error;
use tracing::debug;

static ENV_LOADER: Once = Once::new();

/// Load `.env` once before the env-var provider reads anything.
pub fn ensure_env_loaded() {
    ENV_LOADER.call_once(|| {
        let _ = dotenvy::dotenv();
    });
}

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The backend cannot be reached or has nothing for this request;
    /// the chain advances to the next provider.
    #[error("unavailable: {reason}")]
    Unavailable { reason: String },

    /// The integration is registered but not implemented.
    #[error("integration not implemented")]
    Unsupported,

    /// A definitive failure (bad provider configuration, denied access).
    /// Reported immediately instead of advancing the chain.
    #[error("{reason}")]
    Failed { reason: String },
}

impl ProviderError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }
}

#[async_trait]
pub trait SecretProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn get_credentials(
        &self,
        user: &str,
        environment: &str,
    ) -> Result<CredentialMaterial, ProviderError>;

    async fn update_credentials(
        &self,
        user: &str,
        environment: &str,
        material: &CredentialMaterial,
    ) -> Result<(), ProviderError>;

    async fn delete_credentials(&self, user: &str, environment: &str)
        -> Result<(), ProviderError>;

    async fn health_check(&self) -> bool;
}

/// Ordered chain of secret providers.
#[derive(Default)]
pub struct SecretProviderRegistry {
    providers: Vec<Box<dyn SecretProvider>>,
}

impl SecretProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The default chain: env-var lookup first, then the centralized
    /// manager stubs in a stable order.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(EnvSecretProvider::new()));
        registry.register(Box::new(StubProvider::hashicorp_vault()));
        registry.register(Box::new(StubProvider::aws_secrets_manager()));
        registry.register(Box::new(StubProvider::azure_key_vault()));
        registry.register(Box::new(StubProvider::google_secret_manager()));
        registry
    }

    pub fn register(&mut self, provider: Box<dyn SecretProvider>) {
        self.providers.push(provider);
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Walk the chain in order. `Unavailable` and `Unsupported` advance
    /// (each recorded with its own reason); any other failure aborts
    /// immediately. Exhaustion yields one aggregated error naming every
    /// provider's failure reason, except when the chain holds a single
    /// unimplemented integration, which is reported as unsupported
    /// rather than misconfigured.
    pub async fn resolve(
        &self,
        user: &str,
        environment: &str,
    ) -> Result<CredentialMaterial, AwxError> {
        let mut failures: Vec<String> = Vec::new();
        let mut unsupported_only = true;

        for provider in &self.providers {
            match provider.get_credentials(user, environment).await {
                Ok(mut material) => {
                    material.origin = CredentialOrigin::Provider(provider.name().to_string());
                    debug!(
                        provider = provider.name(),
                        environment, "Secret provider supplied credentials"
                    );
                    return Ok(material);
                }
                Err(ProviderError::Unavailable { reason }) => {
                    debug!(
                        provider = provider.name(),
                        environment, %reason, "Secret provider unavailable, advancing"
                    );
                    failures.push(format!("{}: unavailable ({reason})", provider.name()));
                    unsupported_only = false;
                }
                Err(ProviderError::Unsupported) => {
                    failures.push(format!("{}: integration not implemented", provider.name()));
                }
                Err(ProviderError::Failed { reason }) => {
                    return Err(AwxError::configuration(
                        environment,
                        format!("secret provider '{}' failed: {reason}", provider.name()),
                    ));
                }
            }
        }

        if unsupported_only && self.providers.len() == 1 {
            return Err(AwxError::unsupported(self.providers[0].name()));
        }

        Err(AwxError::configuration(
            environment,
            if failures.is_empty() {
                "no secret providers are configured".to_string()
            } else {
                format!(
                    "no secret provider could supply credentials: {}",
                    failures.join("; ")
                )
            },
        ))
    }
}

/// Reads credentials from process environment variables, preferring
/// per-environment names (`AWX_<ENV>_TOKEN`) over the global ones.
pub struct EnvSecretProvider;

impl EnvSecretProvider {
    pub fn new() -> Self {
        ensure_env_loaded();
        Self
    }

    fn lookup(environment: &str, suffix: &str) -> Option<String> {
        let scoped = format!(
            "AWX_{}_{suffix}",
            environment.to_uppercase().replace('-', "_")
        );
        env::var(&scoped)
            .or_else(|_| env::var(format!("AWX_{suffix}")))
            .ok()
            .filter(|v| !v.trim().is_empty())
    }
}

impl Default for EnvSecretProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretProvider for EnvSecretProvider {
    fn name(&self) -> &str {
        "env"
    }

    async fn get_credentials(
        &self,
        _user: &str,
        environment: &str,
    ) -> Result<CredentialMaterial, ProviderError> {
        if let Some(token) = Self::lookup(environment, "TOKEN") {
            return Ok(CredentialMaterial::token(
                token,
                CredentialOrigin::Provider("env".into()),
            ));
        }
        if let (Some(username), Some(password)) = (
            Self::lookup(environment, "USERNAME"),
            Self::lookup(environment, "PASSWORD"),
        ) {
            return Ok(CredentialMaterial::password(
                username,
                password,
                CredentialOrigin::Provider("env".into()),
            ));
        }
        Err(ProviderError::unavailable(format!(
            "no AWX_TOKEN or AWX_USERNAME/AWX_PASSWORD set for environment '{environment}'"
        )))
    }

    async fn update_credentials(
        &self,
        _user: &str,
        _environment: &str,
        _material: &CredentialMaterial,
    ) -> Result<(), ProviderError> {
        // Process environment is read-only from our side.
        Err(ProviderError::Unsupported)
    }

    async fn delete_credentials(
        &self,
        _user: &str,
        _environment: &str,
    ) -> Result<(), ProviderError> {
        Err(ProviderError::Unsupported)
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// Placeholder for a centralized secret manager that is on the roadmap
/// but not integrated yet.
pub struct StubProvider {
    name: &'static str,
}

impl StubProvider {
    pub fn hashicorp_vault() -> Self {
        Self {
            name: "hashicorp-vault",
        }
    }

    pub fn aws_secrets_manager() -> Self {
        Self {
            name: "aws-secrets-manager",
        }
    }

    pub fn azure_key_vault() -> Self {
        Self {
            name: "azure-key-vault",
        }
    }

    pub fn google_secret_manager() -> Self {
        Self {
            name: "google-secret-manager",
        }
    }
}

#[async_trait]
impl SecretProvider for StubProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn get_credentials(
        &self,
        _user: &str,
        _environment: &str,
    ) -> Result<CredentialMaterial, ProviderError> {
        Err(ProviderError::Unsupported)
    }

    async fn update_credentials(
        &self,
        _user: &str,
        _environment: &str,
        _material: &CredentialMaterial,
    ) -> Result<(), ProviderError> {
        Err(ProviderError::Unsupported)
    }

    async fn delete_credentials(
        &self,
        _user: &str,
        _environment: &str,
    ) -> Result<(), ProviderError> {
        Err(ProviderError::Unsupported)
    }

    async fn health_check(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_awx_vars() {
        for key in ["AWX_TOKEN", "AWX_PROD_TOKEN", "AWX_USERNAME", "AWX_PASSWORD"] {
            unsafe {
                env::remove_var(key);
            }
        }
    }

    #[tokio::test]
    #[serial]
    async fn env_provider_prefers_scoped_token_over_global() {
        clear_awx_vars();
        unsafe {
            env::set_var("AWX_TOKEN", "global-token");
            env::set_var("AWX_PROD_TOKEN", "prod-token");
        }

        let provider = EnvSecretProvider::new();
        let material = provider
            .get_credentials("alice", "prod")
            .await
            .expect("credentials");
        assert_eq!(material.secret, "prod-token");

        clear_awx_vars();
    }

    #[tokio::test]
    #[serial]
    async fn env_provider_falls_back_to_username_password_pair() {
        clear_awx_vars();
        unsafe {
            env::set_var("AWX_USERNAME", "admin");
            env::set_var("AWX_PASSWORD", "hunter2");
        }

        let provider = EnvSecretProvider::new();
        let material = provider
            .get_credentials("alice", "staging")
            .await
            .expect("credentials");
        assert_eq!(material.username.as_deref(), Some("admin"));
        assert_eq!(material.secret, "hunter2");

        clear_awx_vars();
    }

    #[tokio::test]
    #[serial]
    async fn env_provider_reports_unavailable_without_variables() {
        clear_awx_vars();

        let provider = EnvSecretProvider::new();
        let result = provider.get_credentials("alice", "prod").await;
        assert!(matches!(result, Err(ProviderError::Unavailable { .. })));
    }

    #[tokio::test]
    #[serial]
    async fn stub_providers_advance_the_default_chain() {
        clear_awx_vars();

        let registry = SecretProviderRegistry::with_defaults();
        let result = registry.resolve("alice", "prod").await;
        match result {
            Err(AwxError::Configuration { reason, .. }) => {
                assert!(reason.contains("hashicorp-vault"));
                assert!(reason.contains("aws-secrets-manager"));
                assert!(reason.contains("azure-key-vault"));
                assert!(reason.contains("google-secret-manager"));
            }
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn lone_stub_chain_reports_unsupported_operation() {
        let mut registry = SecretProviderRegistry::new();
        registry.register(Box::new(StubProvider::google_secret_manager()));

        let result = registry.resolve("alice", "prod").await;
        match result {
            Err(AwxError::UnsupportedOperation { provider }) => {
                assert_eq!(provider, "google-secret-manager");
            }
            other => panic!("expected unsupported operation, got {other:?}"),
        }
    }
}
