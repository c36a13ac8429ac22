// The tool dispatch boundary over an in-memory application context:
// session isolation, environment management and structured failures.

mod support;

use awx_mcp_server::app::{AppContext, ClientFactory, DEFAULT_MAX_IN_FLIGHT};
use awx_mcp_server::client::{LimitedTransport, PlatformClient};
use awx_mcp_server::config::EnvironmentRegistry;
use awx_mcp_server::credentials::{
    CredentialOverride, MemoryStore, SecretProviderRegistry,
};
use awx_mcp_server::domain::{AwxError, CredentialMaterial, CredentialType, EnvironmentConfig};
use awx_mcp_server::tools::{self, ToolRequest, ToolResponse};
use serde_json::json;
use std::sync::{Arc, Mutex};
use support::{job_json, FakeTransport};
use tempfile::TempDir;
use tokio::sync::Semaphore;

/// Factory that records the secret of every built client and wires all
/// clients to one scripted transport, capped like the production one.
struct RecordingFactory {
    secrets: Arc<Mutex<Vec<String>>>,
    transport: Arc<FakeTransport>,
}

impl ClientFactory for RecordingFactory {
    fn build(
        &self,
        environment: EnvironmentConfig,
        material: &CredentialMaterial,
        permits: Arc<Semaphore>,
    ) -> Result<PlatformClient, AwxError> {
        self.secrets
            .lock()
            .expect("secrets lock")
            .push(material.secret.clone());
        let limited = Arc::new(LimitedTransport::new(
            Arc::clone(&self.transport) as Arc<dyn awx_mcp_server::client::Transport>,
            permits,
        ));
        Ok(PlatformClient::with_transport(
            environment,
            limited,
            support::fast_retry(),
        ))
    }
}

struct Harness {
    app: AppContext,
    secrets: Arc<Mutex<Vec<String>>>,
    transport: Arc<FakeTransport>,
    _dir: TempDir,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry =
        EnvironmentRegistry::open(&dir.path().join("environments.json")).expect("open registry");
    let secrets = Arc::new(Mutex::new(Vec::new()));
    let transport = Arc::new(FakeTransport::new());
    let app = AppContext::new(
        registry,
        Arc::new(MemoryStore::new()),
        SecretProviderRegistry::new(),
        Box::new(RecordingFactory {
            secrets: Arc::clone(&secrets),
            transport: Arc::clone(&transport),
        }),
        DEFAULT_MAX_IN_FLIGHT,
    );
    Harness {
        app,
        secrets,
        transport,
        _dir: dir,
    }
}

fn request(tool: &str, arguments: serde_json::Value) -> ToolRequest {
    ToolRequest {
        tool: tool.to_string(),
        arguments,
        environment: None,
        credential_override: None,
        session_id: None,
        user: None,
    }
}

fn override_with(secret: &str) -> CredentialOverride {
    CredentialOverride {
        credential_type: CredentialType::Token,
        username: None,
        secret: secret.to_string(),
    }
}

fn expect_ok(response: ToolResponse) -> serde_json::Value {
    match response {
        ToolResponse::Ok { result } => result,
        ToolResponse::Error { error } => panic!("unexpected failure: {error:?}"),
    }
}

fn expect_error_kind(response: ToolResponse, kind: &str) {
    match response {
        ToolResponse::Error { error } => assert_eq!(error.kind, kind),
        ToolResponse::Ok { result } => panic!("unexpected success: {result}"),
    }
}

#[tokio::test]
async fn env_add_then_list_round_trips() {
    let h = harness();
    let added = expect_ok(
        tools::dispatch(
            &h.app,
            request(
                "env_add",
                json!({"name": "prod", "base_url": "https://awx.example.com"}),
            ),
        )
        .await,
    );
    assert_eq!(added["name"], "prod");

    let listed = expect_ok(tools::dispatch(&h.app, request("env_list", json!({}))).await);
    let environments = listed.as_array().expect("array");
    assert_eq!(environments.len(), 1);
    assert_eq!(environments[0]["name"], "prod");
    // First registered environment becomes the default.
    assert_eq!(environments[0]["is_default"], json!(true));
}

#[tokio::test]
async fn malformed_arguments_produce_invalid_arguments_failure() {
    let h = harness();
    let response = tools::dispatch(
        &h.app,
        request("env_add", json!({"base_url": "https://x.example.com"})),
    )
    .await;
    expect_error_kind(response, "invalid_arguments");
}

#[tokio::test]
async fn unknown_tool_is_rejected() {
    let h = harness();
    let response = tools::dispatch(&h.app, request("jobs_reboot_everything", json!({}))).await;
    expect_error_kind(response, "invalid_arguments");
}

#[tokio::test]
async fn platform_tool_without_any_environment_fails_with_configuration_error() {
    let h = harness();
    let response = tools::dispatch(&h.app, request("job_get", json!({"id": 1}))).await;
    expect_error_kind(response, "configuration_error");
}

#[tokio::test]
async fn sessions_with_different_overrides_never_share_credentials() {
    let h = harness();
    expect_ok(
        tools::dispatch(
            &h.app,
            request(
                "env_add",
                json!({"name": "prod", "base_url": "https://awx.example.com"}),
            ),
        )
        .await,
    );

    let alpha = h
        .app
        .open_session(Some("prod"), Some(&override_with("token-alpha")), "alice")
        .await
        .expect("session alpha");
    let beta = h
        .app
        .open_session(Some("prod"), Some(&override_with("token-beta")), "bob")
        .await
        .expect("session beta");

    assert!(!Arc::ptr_eq(alpha.client(), beta.client()));
    let secrets = h.secrets.lock().expect("secrets lock").clone();
    assert_eq!(secrets, vec!["token-alpha", "token-beta"]);
}

#[tokio::test]
async fn override_session_leaves_later_sessions_unaffected() {
    let h = harness();
    expect_ok(
        tools::dispatch(
            &h.app,
            request(
                "env_add",
                json!({"name": "prod", "base_url": "https://awx.example.com"}),
            ),
        )
        .await,
    );

    h.app
        .open_session(Some("prod"), Some(&override_with("ephemeral")), "alice")
        .await
        .expect("override session");

    // Same environment, no override, nothing stored, no providers: the
    // earlier override must not leak into this resolution.
    let result = h.app.open_session(Some("prod"), None, "bob").await;
    match result {
        Err(AwxError::Configuration { .. }) => {}
        other => panic!("expected configuration error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn stored_credential_enables_platform_tools() {
    let h = harness();
    expect_ok(
        tools::dispatch(
            &h.app,
            request(
                "env_add",
                json!({"name": "prod", "base_url": "https://awx.example.com"}),
            ),
        )
        .await,
    );
    expect_ok(
        tools::dispatch(
            &h.app,
            request(
                "credential_store",
                json!({
                    "environment": "prod",
                    "credential_type": "token",
                    "secret": "stored-token",
                }),
            ),
        )
        .await,
    );

    h.transport.push_json(Ok(job_json(9, "successful")));
    let job = expect_ok(tools::dispatch(&h.app, request("job_get", json!({"id": 9}))).await);
    assert_eq!(job["id"], json!(9));
    assert_eq!(job["status"], json!("successful"));

    let secrets = h.secrets.lock().expect("secrets lock").clone();
    assert_eq!(secrets, vec!["stored-token"]);
}

#[tokio::test]
async fn system_info_fetches_the_requested_section() {
    let h = harness();
    expect_ok(
        tools::dispatch(
            &h.app,
            request(
                "env_add",
                json!({"name": "prod", "base_url": "https://awx.example.com"}),
            ),
        )
        .await,
    );
    expect_ok(
        tools::dispatch(
            &h.app,
            request(
                "credential_store",
                json!({
                    "environment": "prod",
                    "credential_type": "token",
                    "secret": "stored-token",
                }),
            ),
        )
        .await,
    );

    h.transport
        .push_json(Ok(json!({"version": "24.0.0", "time_zone": "UTC"})));
    let info = expect_ok(
        tools::dispatch(&h.app, request("system_info", json!({"section": "config"}))).await,
    );
    assert_eq!(info["version"], json!("24.0.0"));

    let calls = h.transport.calls();
    assert_eq!(calls[0].path, "config/");
}

#[tokio::test]
async fn organizations_list_applies_the_name_filter() {
    let h = harness();
    expect_ok(
        tools::dispatch(
            &h.app,
            request(
                "env_add",
                json!({"name": "prod", "base_url": "https://awx.example.com"}),
            ),
        )
        .await,
    );
    expect_ok(
        tools::dispatch(
            &h.app,
            request(
                "credential_store",
                json!({
                    "environment": "prod",
                    "credential_type": "token",
                    "secret": "stored-token",
                }),
            ),
        )
        .await,
    );

    h.transport.push_json(Ok(support::page(
        1,
        None,
        vec![json!({"id": 3, "name": "Platform", "description": null})],
    )));
    let organizations = expect_ok(
        tools::dispatch(
            &h.app,
            request("organizations_list", json!({"filter": "plat"})),
        )
        .await,
    );
    assert_eq!(organizations[0]["name"], json!("Platform"));

    let calls = h.transport.calls();
    assert_eq!(calls[0].path, "organizations/");
    assert!(calls[0]
        .query
        .contains(&("name__icontains".to_string(), "plat".to_string())));
}

#[tokio::test]
async fn password_credential_without_username_is_rejected() {
    let h = harness();
    expect_ok(
        tools::dispatch(
            &h.app,
            request(
                "env_add",
                json!({"name": "prod", "base_url": "https://awx.example.com"}),
            ),
        )
        .await,
    );

    let response = tools::dispatch(
        &h.app,
        request(
            "credential_store",
            json!({
                "environment": "prod",
                "credential_type": "password",
                "secret": "hunter2",
            }),
        ),
    )
    .await;
    expect_error_kind(response, "invalid_arguments");
}

#[tokio::test]
async fn duplicate_environment_name_surfaces_structured_failure() {
    let h = harness();
    let add = || {
        request(
            "env_add",
            json!({"name": "prod", "base_url": "https://awx.example.com"}),
        )
    };

    expect_ok(tools::dispatch(&h.app, add()).await);
    let second = tools::dispatch(&h.app, add()).await;
    expect_error_kind(second, "duplicate_name_error");
}
