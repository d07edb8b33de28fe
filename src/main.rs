//! REST → MCP adapter: stdio entry point.
//!
//! Reads newline-delimited JSON-RPC from stdin and answers on stdout. Logs go
//! to stderr.

use clap::Parser;
use rest_mcp_adapter::mcp::{AdapterFacade, StdioServer};
use rest_mcp_adapter::{AppContext, Config};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;

#[derive(Debug, Parser)]
#[command(name = "rest-mcp-adapter", version, about)]
struct Args {
    /// JSON configuration file; built-in defaults are used when omitted.
    #[arg(long, env = "ADAPTER_CONFIG")]
    config: Option<PathBuf>,

    /// Defer backend discovery until the client sends `initialize`.
    #[arg(long)]
    lazy: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    rest_mcp_adapter::observability::init_tracing(&config.observability);
    tracing::info!(
        "Starting {} {} with {} backends",
        config.server.name,
        config.server.version,
        config.services.len()
    );

    let context = Arc::new(AppContext::from_config(&config)?);
    let facade = Arc::new(AdapterFacade::new(context));
    if !args.lazy {
        facade.ensure_started().await;
    }

    let server = StdioServer::new(Arc::clone(&facade));
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    let serving = server.serve(stdin, stdout);
    tokio::pin!(serving);

    let interrupted = tokio::select! {
        result = &mut serving => {
            result?;
            false
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupt received");
            true
        }
    };
    if interrupted {
        // Stop reading and let requests already in flight write their replies.
        server.shutdown();
        serving.await?;
    }

    facade.shutdown().await;
    tracing::info!("Adapter stopped");

    if interrupted {
        // The blocking stdin reader would otherwise hold the runtime open.
        std::process::exit(0);
    }
    Ok(())
}
