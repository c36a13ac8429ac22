//! Embedded topology: a line-delimited JSON loop over stdin/stdout.
//!
//! Each input line is one tool invocation; each output line is its
//! result. Malformed lines produce an `invalid_arguments` failure
//! instead of terminating the loop. Per-session credential overrides
//! belong to the remote topology; invocations carrying one are
//! rejected here.

use crate::app::AppContext;
use crate::tools::{self, ToolRequest, ToolResponse};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum StdioError {
    #[error("stdin/stdout I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

pub async fn run(app: Arc<AppContext>) -> Result<(), StdioError> {
    let mut stdout = io::stdout();
    let stdin = BufReader::new(io::stdin());
    let mut lines = stdin.lines();

    info!("STDIO loop ready; one JSON invocation per line");

    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<ToolRequest>(input) {
            Ok(request) => match screen(request) {
                Ok(request) => {
                    debug!(tool = %request.tool, "Processing STDIO invocation");
                    tools::dispatch(&app, request).await
                }
                Err(rejection) => rejection,
            },
            Err(e) => ToolResponse::invalid(format!("malformed invocation: {e}")),
        };

        let encoded = serde_json::to_string(&response)?;
        stdout.write_all(encoded.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    info!("STDIN closed; leaving STDIO loop");
    Ok(())
}

/// The embedded loop serves one local user with its own stored
/// credentials; per-request overrides are a remote-session feature.
fn screen(request: ToolRequest) -> Result<ToolRequest, ToolResponse> {
    if request.credential_override.is_some() {
        return Err(ToolResponse::invalid(
            "credential_override is not accepted in embedded mode; \
             store a credential for the environment instead",
        ));
    }
    Ok(request)
}
