use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "awx-mcp-server",
    version,
    about = "Tool-invocation bridge for AWX/AAP/Tower automation controllers"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP server topology.
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        #[arg(long, default_value_t = 8000)]
        port: u16,
    },
    /// Run the embedded stdin/stdout loop.
    Stdio,
    /// Manage registered environments.
    Env {
        #[command(subcommand)]
        command: EnvCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum EnvCommand {
    /// List registered environments.
    List,
    /// Register a new environment.
    Add {
        name: String,
        base_url: String,
        /// Platform dialect: awx, aap or tower.
        #[arg(long, default_value = "awx")]
        platform: String,
        /// Skip TLS certificate verification for this environment.
        #[arg(long)]
        no_verify_ssl: bool,
        /// Make this environment the default.
        #[arg(long)]
        default: bool,
    },
    /// Delete an environment.
    Remove { name: String },
    /// Mark an environment as the default.
    SetDefault { name: String },
}
