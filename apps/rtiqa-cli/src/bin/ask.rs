use anyhow::Result;
use clap::Parser;

use rtiqa_cli::{build_service, init_logging, load_settings, path_or};

/// Answer one question from the command line.
#[derive(Parser, Debug)]
#[command(name = "rtiqa-ask", version)]
struct Cli {
    /// The question, e.g. "what is the right to information"
    #[arg(required = true)]
    query: Vec<String>,
    /// Chunks to retrieve; defaults to retrieval.k
    #[arg(short, long)]
    k: Option<usize>,
    #[arg(long)]
    index_dir: Option<String>,
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let mut settings = load_settings()?;
    if let Some(k) = cli.k {
        settings.retrieval.k = k;
        settings.validate()?;
    }

    let index_dir = path_or(cli.index_dir.as_deref(), &settings.paths.index_dir);
    let service = build_service(&settings, &index_dir).await?;
    println!("{}", service.answer(&cli.query.join(" ")));
    Ok(())
}
