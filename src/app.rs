//! Application context shared by both topologies.

use crate::client::{LimitedTransport, PlatformClient, ReqwestTransport, RetryPolicy};
use crate::config::EnvironmentRegistry;
use crate::credentials::{
    CredentialOverride, CredentialResolver, CredentialStore, SecretProviderRegistry,
};
use crate::domain::{AwxError, CredentialMaterial, EnvironmentConfig};
use crate::jobs::JobEngine;
use crate::session::{SessionContext, SessionManager};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tracing::info;

/// Default cap on simultaneous in-flight platform calls per process.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;

/// Builds a platform client from an environment and resolved material.
/// The seam exists so tests can substitute a fake transport. `permits`
/// is the process-wide cap on simultaneous platform calls; every
/// built client must respect it.
pub trait ClientFactory: Send + Sync {
    fn build(
        &self,
        environment: EnvironmentConfig,
        material: &CredentialMaterial,
        permits: Arc<Semaphore>,
    ) -> Result<PlatformClient, AwxError>;
}

pub struct ReqwestClientFactory {
    pub retry: RetryPolicy,
}

impl ClientFactory for ReqwestClientFactory {
    fn build(
        &self,
        environment: EnvironmentConfig,
        material: &CredentialMaterial,
        permits: Arc<Semaphore>,
    ) -> Result<PlatformClient, AwxError> {
        let transport = Arc::new(ReqwestTransport::new(&environment, material)?);
        let limited = Arc::new(LimitedTransport::new(transport, permits));
        Ok(PlatformClient::with_transport(environment, limited, self.retry))
    }
}

pub struct AppContext {
    registry: Mutex<EnvironmentRegistry>,
    store: Arc<dyn CredentialStore>,
    resolver: CredentialResolver,
    factory: Box<dyn ClientFactory>,
    pub sessions: SessionManager,
    permits: Arc<Semaphore>,
}

impl AppContext {
    pub fn new(
        registry: EnvironmentRegistry,
        store: Arc<dyn CredentialStore>,
        providers: SecretProviderRegistry,
        factory: Box<dyn ClientFactory>,
        max_in_flight: usize,
    ) -> Self {
        let providers = Arc::new(providers);
        info!(
            providers = ?providers.provider_names(),
            max_in_flight,
            "Application context initialized"
        );
        Self {
            registry: Mutex::new(registry),
            resolver: CredentialResolver::new(Arc::clone(&store), Arc::clone(&providers)),
            store,
            factory,
            sessions: SessionManager::new(),
            permits: Arc::new(Semaphore::new(max_in_flight)),
        }
    }

    /// Run `f` against the registry under its single-writer lock.
    pub fn with_registry<T>(&self, f: impl FnOnce(&mut EnvironmentRegistry) -> T) -> T {
        let mut registry = self.registry.lock().expect("registry lock poisoned");
        f(&mut registry)
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Pick the named environment, or the default one when no name is
    /// given.
    pub fn select_environment(&self, name: Option<&str>) -> Result<EnvironmentConfig, AwxError> {
        let registry = self.registry.lock().expect("registry lock poisoned");
        match name {
            Some(name) => registry.get_by_name(name).cloned(),
            None => registry.default_environment().cloned().ok_or_else(|| {
                AwxError::configuration(
                    "(default)",
                    "no default environment is configured; register one or name it explicitly",
                )
            }),
        }
    }

    /// Resolve credentials and build an isolated session around a fresh
    /// platform client. Each call produces its own client, even for the
    /// same base URL.
    pub async fn open_session(
        &self,
        environment: Option<&str>,
        override_: Option<&CredentialOverride>,
        user: &str,
    ) -> Result<Arc<SessionContext>, AwxError> {
        let environment = self.select_environment(environment)?;
        let material = self
            .resolver
            .resolve(&environment, override_, user)
            .await?;
        let client = Arc::new(self.factory.build(
            environment.clone(),
            &material,
            Arc::clone(&self.permits),
        )?);
        let engine = JobEngine::new(client);
        Ok(Arc::new(SessionContext::new(user, environment, engine)))
    }

    /// Open a session and register it for reuse across calls on the
    /// same connection. Returns the session id.
    pub async fn create_session(
        &self,
        environment: Option<&str>,
        override_: Option<&CredentialOverride>,
        user: &str,
    ) -> Result<uuid::Uuid, AwxError> {
        let session = self.open_session(environment, override_, user).await?;
        Ok(self.sessions.insert(session))
    }
}
