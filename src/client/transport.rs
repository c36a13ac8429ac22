//! HTTP transport: authenticated requests, status normalization and
//! bounded retry with increasing backoff.

use crate::client::platform;
use crate::domain::{AwxError, CredentialMaterial, CredentialType, EnvironmentConfig};
use async_trait::async_trait;
use base64::Engine;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::warn;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Authentication header, fixed by credential type and independent of
/// the platform dialect.
#[derive(Clone)]
pub enum AuthScheme {
    Bearer(String),
    Basic(String),
}

impl AuthScheme {
    pub fn from_material(material: &CredentialMaterial) -> Self {
        match material.credential_type {
            CredentialType::Token => AuthScheme::Bearer(material.secret.clone()),
            CredentialType::Password => {
                let username = material.username.as_deref().unwrap_or_default();
                let encoded = base64::engine::general_purpose::STANDARD
                    .encode(format!("{username}:{}", material.secret));
                AuthScheme::Basic(encoded)
            }
        }
    }

    pub fn header_value(&self) -> String {
        match self {
            AuthScheme::Bearer(token) => format!("Bearer {token}"),
            AuthScheme::Basic(encoded) => format!("Basic {encoded}"),
        }
    }
}

/// Bounded retry with strictly increasing backoff. Only transient
/// network failures are retried.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(250), 2)
    }
}

impl RetryPolicy {
    /// The tunables are clamped so the backoff stays strictly
    /// increasing: at least one attempt, a non-zero base delay and a
    /// multiplier of at least 2.
    pub fn new(max_attempts: u32, base_delay: Duration, multiplier: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: base_delay.max(Duration::from_millis(1)),
            multiplier: multiplier.max(2),
        }
    }

    /// Delay before the attempt following `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * self.multiplier.saturating_pow(attempt.saturating_sub(1))
    }
}

pub async fn with_retry<T, F, Fut>(
    policy: RetryPolicy,
    operation: &str,
    mut call: F,
) -> Result<T, AwxError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AwxError>>,
{
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.delay(attempt);
                warn!(
                    operation,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    %e,
                    "Transient failure, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Caps simultaneous platform calls across every operation of a
/// client. Sessions share one semaphore, so N concurrent sessions
/// still stay inside the per-process budget.
pub struct LimitedTransport {
    inner: Arc<dyn Transport>,
    permits: Arc<Semaphore>,
}

impl LimitedTransport {
    pub fn new(inner: Arc<dyn Transport>, permits: Arc<Semaphore>) -> Self {
        Self { inner, permits }
    }

    async fn permit(&self) -> Result<tokio::sync::SemaphorePermit<'_>, AwxError> {
        self.permits
            .acquire()
            .await
            .map_err(|_| AwxError::protocol("platform call limiter is closed"))
    }
}

#[async_trait]
impl Transport for LimitedTransport {
    async fn request_json(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value, AwxError> {
        let _permit = self.permit().await?;
        self.inner.request_json(method, path, query, body).await
    }

    async fn request_text(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
    ) -> Result<String, AwxError> {
        let _permit = self.permit().await?;
        self.inner.request_text(method, path, query).await
    }
}

/// Seam between the platform client and the wire. The production
/// implementation speaks HTTP through reqwest; tests inject fakes.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request_json(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value, AwxError>;

    /// Raw-text variant for endpoints like job stdout.
    async fn request_text(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
    ) -> Result<String, AwxError>;
}

pub struct ReqwestTransport {
    http: reqwest::Client,
    base_url: String,
    api_prefix: &'static str,
    auth: AuthScheme,
    environment: String,
}

impl ReqwestTransport {
    pub fn new(
        environment: &EnvironmentConfig,
        material: &CredentialMaterial,
    ) -> Result<Self, AwxError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(!environment.verify_ssl)
            .build()
            .map_err(|e| AwxError::protocol(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: environment.base_url.trim_end_matches('/').to_string(),
            api_prefix: platform::profile(environment.platform_type).api_prefix,
            auth: AuthScheme::from_material(material),
            environment: environment.name.clone(),
        })
    }

    /// Absolute paths (as found in pagination `next` links) are used
    /// as-is; resource paths get the dialect's API prefix.
    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}{}/{path}", self.base_url, self.api_prefix)
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<(StatusCode, String), AwxError> {
        let url = self.url_for(path);
        let mut request = self
            .http
            .request(method, &url)
            .header("Authorization", self.auth.header_value());
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            AwxError::transient(format!("request to {url} failed: {e}"))
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AwxError::transient(format!("failed to read response body: {e}")))?;
        Ok((status, text))
    }

    fn check_status(&self, status: StatusCode, path: &str, body: &str) -> Result<(), AwxError> {
        if status.is_success() {
            return Ok(());
        }
        match status {
            StatusCode::UNAUTHORIZED => Err(AwxError::authentication(&self.environment)),
            StatusCode::FORBIDDEN => Err(AwxError::authorization(
                &self.environment,
                extract_detail(body).unwrap_or_else(|| "permission denied".to_string()),
            )),
            StatusCode::NOT_FOUND => Err(AwxError::not_found(path.trim_end_matches('/'))),
            s if s.is_server_error() => Err(AwxError::transient(format!(
                "platform returned {} for {path}",
                s.as_u16()
            ))),
            s => Err(AwxError::protocol(format!(
                "platform returned {} for {path}: {}",
                s.as_u16(),
                extract_detail(body).unwrap_or_else(|| truncate(body, 200))
            ))),
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn request_json(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value, AwxError> {
        let (status, text) = self.send(method, path, query, body).await?;
        self.check_status(status, path, &text)?;

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| {
            AwxError::protocol(format!("malformed JSON body from {path}: {e}"))
        })
    }

    async fn request_text(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
    ) -> Result<String, AwxError> {
        let (status, text) = self.send(method, path, query, None).await?;
        self.check_status(status, path, &text)?;
        Ok(text)
    }
}

/// Platform error bodies usually carry a `detail` field.
fn extract_detail(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("detail")?
        .as_str()
        .map(ToOwned::to_owned)
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        let mut truncated: String = text.chars().take(limit).collect();
        truncated.push('…');
        truncated
    }
}
