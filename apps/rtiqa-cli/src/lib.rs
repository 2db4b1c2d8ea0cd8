//! Shared bootstrap for the rtiqa binaries: logging, settings, and wiring the
//! query service from its persisted index and embedding model.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rtiqa_answer::Synthesizer;
use rtiqa_core::config::{expand_path, AppConfig, Config};
use rtiqa_embed::load_embedder;
use rtiqa_index::{ChunkIndex, Retriever};
use rtiqa_service::QueryService;

pub mod server;

/// `RUST_LOG` wins; otherwise rtiqa crates log at info, or debug with `verbose`.
pub fn init_logging(verbose: bool) {
    let fallback = if verbose {
        "info,rtiqa_core=debug,rtiqa_embed=debug,rtiqa_index=debug,rtiqa_answer=debug,rtiqa_service=debug,rtiqa_cli=debug,tower_http=debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with_target(false)
        .init();
}

pub fn load_settings() -> Result<AppConfig> {
    Config::load().context("Error loading config")?.settings()
}

/// Load the embedder and index named by `settings` and assemble the service.
///
/// Fails when the embedding model is unavailable or the index is missing or
/// was built by another model; serving without either is pointless.
pub async fn build_service(settings: &AppConfig, index_dir: &Path) -> Result<QueryService> {
    let embedder = load_embedder(&settings.embedding).into_result()?;
    let index = ChunkIndex::load(index_dir, embedder.model_id())
        .await
        .with_context(|| format!("run rtiqa-indexer to build {}", index_dir.display()))?;
    let retriever = Retriever::new(Arc::new(index), embedder)?;
    info!(model = %settings.embedding.model, k = settings.retrieval.k, "query service ready");
    Ok(QueryService::new(Arc::new(retriever), Synthesizer::new(&settings.synthesis), settings.retrieval.k))
}

/// CLI override, else the configured path, with `~` and env vars expanded.
pub fn path_or(override_path: Option<&str>, configured: &str) -> std::path::PathBuf {
    expand_path(override_path.unwrap_or(configured))
}
