//! Remote topology: the HTTP server exposing health, metrics and the
//! JSON-RPC tool surface.

mod error;
mod metrics;
mod router;
mod routes;
mod rpc;
mod state;

pub use error::ServerError;
pub use metrics::Metrics;
pub use rpc::{RpcError, RpcRequest, RpcResponse};

use crate::app::AppContext;
use std::net::SocketAddr;
use std::sync::Arc;

pub async fn serve(app: Arc<AppContext>, addr: SocketAddr) -> Result<(), ServerError> {
    router::serve(app, addr).await
}
