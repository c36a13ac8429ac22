#![allow(dead_code)]

use async_trait::async_trait;
use awx_mcp_server::client::{PlatformClient, RetryPolicy, Transport};
use awx_mcp_server::domain::{AwxError, CredentialMaterial, EnvironmentConfig};
use reqwest::Method;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

/// Scripted transport: each request consumes the next scripted
/// response, and every request is recorded for assertions.
#[derive(Default)]
pub struct FakeTransport {
    json_script: Mutex<VecDeque<Result<Value, AwxError>>>,
    text_script: Mutex<VecDeque<Result<String, AwxError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_json(&self, response: Result<Value, AwxError>) {
        self.json_script
            .lock()
            .expect("script lock")
            .push_back(response);
    }

    pub fn push_text(&self, response: Result<String, AwxError>) {
        self.text_script
            .lock()
            .expect("script lock")
            .push_back(response);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("calls lock").len()
    }

    fn record(&self, method: Method, path: &str, query: &[(String, String)], body: Option<&Value>) {
        self.calls.lock().expect("calls lock").push(RecordedCall {
            method,
            path: path.to_string(),
            query: query.to_vec(),
            body: body.cloned(),
        });
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn request_json(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value, AwxError> {
        self.record(method, path, query, body);
        self.json_script
            .lock()
            .expect("script lock")
            .pop_front()
            .expect("fake transport JSON script exhausted")
    }

    async fn request_text(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
    ) -> Result<String, AwxError> {
        self.record(method, path, query, None);
        self.text_script
            .lock()
            .expect("script lock")
            .pop_front()
            .expect("fake transport text script exhausted")
    }
}

pub fn environment(name: &str) -> EnvironmentConfig {
    EnvironmentConfig::new(name, format!("https://{name}.example.com"))
}

pub fn client_over(
    transport: Arc<FakeTransport>,
    environment: EnvironmentConfig,
) -> PlatformClient {
    PlatformClient::with_transport(environment, transport, fast_retry())
}

pub fn client_over_transport(
    transport: Arc<dyn Transport>,
    environment: EnvironmentConfig,
) -> PlatformClient {
    PlatformClient::with_transport(environment, transport, fast_retry())
}

/// Retry policy with negligible backoff so retry tests stay fast.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, std::time::Duration::from_millis(1), 2)
}

pub fn page(count: i64, next: Option<&str>, results: Vec<Value>) -> Value {
    json!({
        "count": count,
        "next": next,
        "previous": null,
        "results": results,
    })
}

pub fn job_json(id: i64, status: &str) -> Value {
    json!({
        "id": id,
        "name": format!("job-{id}"),
        "status": status,
        "job_template": 7,
        "inventory": 1,
        "project": 1,
        "playbook": "site.yml",
        "started": null,
        "finished": null,
        "elapsed": null,
    })
}

pub fn token_material(secret: &str) -> CredentialMaterial {
    CredentialMaterial::token(
        secret,
        awx_mcp_server::domain::CredentialOrigin::Stored,
    )
}
