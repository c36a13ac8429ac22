//! JSON-RPC 2.0 surface for remote clients.

use super::state::ServerState;
use crate::credentials::CredentialOverride;
use crate::tools::{self, ToolRequest, ToolResponse};
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    pub id: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    pub id: Option<Value>,
}

impl RpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Option<Value>, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
            id,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::error(None, -32600, message)
    }

    pub fn invalid_params(id: Option<Value>, message: impl Into<String>) -> Self {
        Self::error(id, -32602, message)
    }

    pub fn method_not_found(id: Option<Value>, method: &str) -> Self {
        Self::error(id, -32601, format!("Method '{method}' is not supported."))
    }
}

#[derive(Deserialize)]
struct SessionCreateParams {
    #[serde(default)]
    environment: Option<String>,
    #[serde(default)]
    credential_override: Option<CredentialOverride>,
    #[serde(default)]
    user: Option<String>,
}

#[derive(Deserialize)]
struct SessionCloseParams {
    session_id: Uuid,
}

pub(crate) async fn handle_rpc(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<RpcRequest>,
) -> Json<RpcResponse> {
    debug!(method = %request.method, "Received JSON-RPC request");
    state.metrics().record_request();

    if request.jsonrpc != "2.0" {
        return Json(RpcResponse::invalid_request(
            "Unsupported jsonrpc version (expected 2.0)",
        ));
    }

    let response = match request.method.as_str() {
        "session.create" => handle_session_create(&state, request).await,
        "session.close" => handle_session_close(&state, request),
        "tools.list" => handle_tools_list(request),
        "tools.call" => handle_tools_call(&state, request).await,
        other => {
            error!(method = other, "Unknown JSON-RPC method");
            RpcResponse::method_not_found(request.id, other)
        }
    };

    Json(response)
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Option<Value>) -> Result<T, String> {
    let params = match params {
        None | Some(Value::Null) => Value::Object(serde_json::Map::new()),
        Some(other) => other,
    };
    serde_json::from_value(params).map_err(|e| e.to_string())
}

async fn handle_session_create(state: &Arc<ServerState>, request: RpcRequest) -> RpcResponse {
    let params: SessionCreateParams = match parse_params(request.params) {
        Ok(params) => params,
        Err(message) => return RpcResponse::invalid_params(request.id, message),
    };

    let user = params.user.as_deref().unwrap_or("default");
    match state
        .app()
        .create_session(
            params.environment.as_deref(),
            params.credential_override.as_ref(),
            user,
        )
        .await
    {
        Ok(session_id) => RpcResponse::success(
            request.id,
            json!({ "session_id": session_id }),
        ),
        Err(error) => {
            error!(kind = error.kind(), %error, "Session creation failed");
            RpcResponse::error(request.id, -32000, error.user_message())
        }
    }
}

fn handle_session_close(state: &Arc<ServerState>, request: RpcRequest) -> RpcResponse {
    let params: SessionCloseParams = match parse_params(request.params) {
        Ok(params) => params,
        Err(message) => return RpcResponse::invalid_params(request.id, message),
    };

    let closed = state.app().sessions.remove(params.session_id);
    RpcResponse::success(request.id, json!({ "closed": closed }))
}

fn handle_tools_list(request: RpcRequest) -> RpcResponse {
    let tools: Vec<_> = tools::CATALOG
        .iter()
        .map(|spec| {
            json!({
                "name": spec.name,
                "description": spec.description,
            })
        })
        .collect();
    RpcResponse::success(request.id, json!({ "tools": tools }))
}

async fn handle_tools_call(state: &Arc<ServerState>, request: RpcRequest) -> RpcResponse {
    let call: ToolRequest = match parse_params(request.params) {
        Ok(call) => call,
        Err(message) => return RpcResponse::invalid_params(request.id, message),
    };

    let response = tools::dispatch(state.app(), call).await;
    let failed = matches!(response, ToolResponse::Error { .. });
    state.metrics().record_tool_call(failed);

    match serde_json::to_value(&response) {
        Ok(value) => RpcResponse::success(request.id, value),
        Err(e) => RpcResponse::error(request.id, -32603, e.to_string()),
    }
}
