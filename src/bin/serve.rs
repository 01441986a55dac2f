use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use log::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use git_gate::config::GatewayConfig;
use git_gate::ssh::service::SshServer;

/// Anonymous read-only git gateway over SSH.
#[derive(Parser, Debug)]
#[command(name = "git-gate")]
struct Cli {
    /// Port to listen on.
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Directory holding the servable git repositories.
    #[arg(short = 'd', long)]
    repos: Option<PathBuf>,

    /// Path to the server host key.
    #[arg(short = 's', long)]
    host_key: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv::dotenv().ok();
    let tracing_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_filter(EnvFilter::new(tracing_level));
    tracing_subscriber::registry().with(fmt_layer).init();

    let cli = Cli::parse();
    let mut config = GatewayConfig::load()?;
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(repos) = cli.repos {
        config.repo_root = repos;
    }
    if let Some(host_key) = cli.host_key {
        config.host_key = host_key;
    }

    SshServer::run(Arc::new(config)).await?;
    info!("ssh gateway exited");
    Ok(())
}
