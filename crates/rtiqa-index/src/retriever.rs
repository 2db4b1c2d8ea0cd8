use std::sync::Arc;
use tracing::debug;

use rtiqa_core::error::{Error, Result};
use rtiqa_core::traits::{ChunkRetriever, Embedder};
use rtiqa_core::types::RetrievalResult;

use crate::store::ChunkIndex;

/// Embeds queries with the index's own embedding function and returns the
/// nearest chunks.
pub struct Retriever {
    index: Arc<ChunkIndex>,
    embedder: Arc<dyn Embedder>,
}

impl Retriever {
    pub fn new(index: Arc<ChunkIndex>, embedder: Arc<dyn Embedder>) -> Result<Self> {
        index.ensure_model(embedder.model_id())?;
        if index.dim() != embedder.dim() {
            return Err(Error::DimensionMismatch { expected: index.dim(), found: embedder.dim() });
        }
        Ok(Self { index, embedder })
    }

    pub fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult> {
        if k == 0 {
            return Err(Error::InvalidConfig("retrieval k must be greater than 0".to_string()));
        }
        if self.index.is_empty() {
            return Ok(Vec::new());
        }
        let vector = self.embedder.embed_one(query)?;
        let hits = self.index.query(&vector, k)?;
        debug!(k, hits = hits.len(), top = ?hits.first().map(|h| h.score), "retrieved chunks");
        Ok(hits)
    }
}

impl ChunkRetriever for Retriever {
    fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult> {
        Self::retrieve(self, query, k)
    }
}
