mod cli;

use awx_mcp_server::app::{AppContext, ReqwestClientFactory, DEFAULT_MAX_IN_FLIGHT};
use awx_mcp_server::client::RetryPolicy;
use awx_mcp_server::config::EnvironmentRegistry;
use awx_mcp_server::credentials::{ensure_env_loaded, KeyringStore, SecretProviderRegistry};
use awx_mcp_server::domain::{EnvironmentConfig, PlatformType};
use awx_mcp_server::{server, stdio};
use clap::Parser;
use cli::{Cli, Command, EnvCommand};
use serde_json::json;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    ensure_env_loaded();
    info!("Starting awx-mcp-server");

    let cli = Cli::parse();
    debug!(?cli.command, "CLI arguments parsed");

    let registry = EnvironmentRegistry::open_default()?;
    let app = Arc::new(AppContext::new(
        registry,
        Arc::new(KeyringStore::new()),
        SecretProviderRegistry::with_defaults(),
        Box::new(ReqwestClientFactory {
            retry: RetryPolicy::default(),
        }),
        DEFAULT_MAX_IN_FLIGHT,
    ));

    match cli.command {
        Command::Serve { host, port } => {
            let addr: SocketAddr = format!("{host}:{port}").parse()?;
            info!(%addr, "Starting HTTP server");
            server::serve(app, addr).await?;
        }
        Command::Stdio => {
            info!("Entering STDIO mode; awaiting JSON line input");
            stdio::run(app).await?;
        }
        Command::Env { command } => run_env_command(&app, command)?,
    }

    info!("Server execution finished");
    Ok(())
}

fn run_env_command(app: &AppContext, command: EnvCommand) -> Result<(), Box<dyn Error>> {
    match command {
        EnvCommand::List => {
            let environments = app.with_registry(|registry| registry.list().to_vec());
            println!("{}", serde_json::to_string_pretty(&environments)?);
        }
        EnvCommand::Add {
            name,
            base_url,
            platform,
            no_verify_ssl,
            default,
        } => {
            let platform_type = PlatformType::from_str(&platform)
                .ok_or_else(|| format!("unknown platform '{platform}' (expected awx, aap or tower)"))?;
            let mut config =
                EnvironmentConfig::new(name.as_str(), base_url).with_platform(platform_type);
            config.verify_ssl = !no_verify_ssl;
            config.is_default = default;
            let id = config.id;
            app.with_registry(|registry| registry.add(config))?;
            println!("{}", serde_json::to_string_pretty(&json!({ "id": id, "name": name }))?);
        }
        EnvCommand::Remove { name } => {
            app.with_registry(|registry| {
                let id = registry.get_by_name(&name)?.id;
                registry.remove(id)
            })?;
            println!("{}", serde_json::to_string_pretty(&json!({ "removed": name }))?);
        }
        EnvCommand::SetDefault { name } => {
            app.with_registry(|registry| {
                let id = registry.get_by_name(&name)?.id;
                registry.set_default(id)
            })?;
            println!("{}", serde_json::to_string_pretty(&json!({ "default": name }))?);
        }
    }
    Ok(())
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_level(true)
            .init();
    });
}
