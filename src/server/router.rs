use super::error::ServerError;
use super::routes;
use super::rpc::handle_rpc;
use super::state::ServerState;
use crate::app::AppContext;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

pub(super) async fn serve(app: Arc<AppContext>, addr: SocketAddr) -> Result<(), ServerError> {
    info!(%addr, "Binding HTTP server");

    let state = Arc::new(ServerState::new(app));
    let router = Router::new()
        .route("/health", get(routes::health_handler))
        .route("/metrics", get(routes::metrics_handler))
        .route("/rpc", post(handle_rpc))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    info!(%addr, "HTTP server ready to accept connections");

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(ServerError::Serve)
}
