use super::state::ServerState;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

pub(crate) async fn health_handler(State(state): State<Arc<ServerState>>) -> Json<Value> {
    state.metrics().record_request();
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub(crate) async fn metrics_handler(State(state): State<Arc<ServerState>>) -> String {
    state.metrics().record_request();
    state.metrics().render(state.app().sessions.len())
}
