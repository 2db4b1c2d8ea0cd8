use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use rtiqa_cli::{build_service, init_logging, load_settings, path_or, server::router};

/// Serve the chat API over HTTP.
#[derive(Parser, Debug)]
#[command(name = "rtiqa-server", version)]
struct Cli {
    /// Listen address; defaults to server.bind
    #[arg(long)]
    bind: Option<String>,
    #[arg(long)]
    index_dir: Option<String>,
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let settings = load_settings()?;

    let index_dir = path_or(cli.index_dir.as_deref(), &settings.paths.index_dir);
    let service = build_service(&settings, &index_dir).await?;

    let bind = cli.bind.unwrap_or_else(|| settings.server.bind.clone());
    let listener = tokio::net::TcpListener::bind(&bind).await.with_context(|| format!("cannot bind {bind}"))?;
    info!(addr = %bind, "listening");
    axum::serve(listener, router(Arc::new(service))).await?;
    Ok(())
}
