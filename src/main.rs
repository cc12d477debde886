//! Subgen - Main entry point
//!
//! Serves a freshly generated Clash configuration on the trigger path

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use subgen::{logging, ConfigArgs, ConfigServer, HttpListSource, ServerConfig};
use tracing::info;

/// Subgen - on-demand Clash configuration generator
#[derive(Parser, Debug)]
#[command(name = "subgen")]
#[command(author = "Subgen Contributors")]
#[command(version)]
#[command(about = "Serve a Clash configuration generated from a remote address list")]
struct Args {
    /// HTTP port to listen on
    #[arg(long, env = "HTTP_PORT", default_value = "8080")]
    http_port: u16,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(flatten)]
    generator: ConfigArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init(&args.log_level, false);

    info!("Starting subgen v{}", env!("CARGO_PKG_VERSION"));

    let config = args.generator.resolve().context("Invalid configuration")?;
    info!("Trigger path: {}", config.trigger_path);
    info!("Upstream lists: {}", config.list_urls().join(", "));

    let source = HttpListSource::new().context("Failed to build HTTP client")?;

    let server = Arc::new(ConfigServer::new(
        ServerConfig {
            http_port: args.http_port,
        },
        config,
        Arc::new(source),
    ));

    server.run().await?;

    Ok(())
}
