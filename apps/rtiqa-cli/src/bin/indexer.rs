use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use rtiqa_cli::{init_logging, load_settings, path_or};
use rtiqa_core::chunker::read_chunk_file;
use rtiqa_embed::load_embedder;
use rtiqa_index::build_index;

/// Embed the chunk file and persist the vector index.
#[derive(Parser, Debug)]
#[command(name = "rtiqa-indexer", version)]
struct Cli {
    /// JSON chunk file produced by rtiqa-preprocess
    #[arg(long)]
    chunks: Option<String>,
    /// Index directory; replaced if it already holds an index
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

    let chunks_file = path_or(cli.chunks.as_deref(), &settings.paths.chunks_file);
    let index_dir = path_or(cli.index_dir.as_deref(), &settings.paths.index_dir);

    let embedder = load_embedder(&settings.embedding).into_result()?;
    let chunks = read_chunk_file(&chunks_file).context("run rtiqa-preprocess first")?;
    let index = build_index(&index_dir, &chunks, embedder.as_ref()).await?;
    info!("Stored {} chunks in {}", index.len(), index_dir.display());
    Ok(())
}
