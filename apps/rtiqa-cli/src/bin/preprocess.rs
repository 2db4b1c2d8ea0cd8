use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use rtiqa_cli::{init_logging, load_settings, path_or};
use rtiqa_core::chunker::{read_document, write_chunk_file, Chunker};

/// Split the source document into overlapping chunks and write the chunk file.
#[derive(Parser, Debug)]
#[command(name = "rtiqa-preprocess", version)]
struct Cli {
    /// Plain-text document to chunk
    #[arg(long)]
    document: Option<String>,
    /// Where to write the JSON chunk file
    #[arg(long)]
    output: Option<String>,
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let settings = load_settings()?;

    let document = path_or(cli.document.as_deref(), &settings.paths.document);
    let output = path_or(cli.output.as_deref(), &settings.paths.chunks_file);

    let text = read_document(&document)?;
    let chunks = Chunker::from_config(&settings.chunking)?.chunk(&text);
    if chunks.is_empty() {
        warn!(document = %document.display(), "document is empty");
    }
    write_chunk_file(&output, &chunks)?;
    info!("Created {} chunks from {}", chunks.len(), document.display());
    Ok(())
}
