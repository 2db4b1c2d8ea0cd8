//! Domain types shared by the chunker, the index, and the query service.

use serde::{Deserialize, Serialize};

pub type ChunkId = usize;

/// A bounded, overlapping window of the source document.
///
/// `id` is the ordinal position of the chunk in the document, so sorting by
/// `id` restores document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub text: String,
}

impl Chunk {
    pub fn new(id: ChunkId, text: impl Into<String>) -> Self {
        Self { id, text: text.into() }
    }
}

/// A chunk returned by a similarity query. Higher `score` is better.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Ranked output of a retrieval, best match first.
pub type RetrievalResult = Vec<ScoredChunk>;
