//! The serving-side chunk index: rehydrated once, then queried read-only.

use anyhow::{anyhow, Context};
use arrow_array::cast::AsArray;
use arrow_array::types::{Float32Type, Int32Type};
use arrow_array::{Array, RecordBatch};
use std::path::Path;
use tracing::{debug, info};

use rtiqa_core::error::{Error, Result};
use rtiqa_core::types::{Chunk, ScoredChunk};

use crate::schema::{CHUNKS_TABLE, META_CHUNK_COUNT, META_DIM, META_MODEL_ID, META_TABLE};
use crate::table::{has_table, open_db, read_all, read_meta};

#[derive(Debug, Clone)]
pub struct IndexedChunk {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// Chunks and their vectors, tagged with the model that embedded them.
///
/// Entries are kept in chunk-id order, which is also the tie-break order for
/// equal similarity scores.
#[derive(Debug, Clone)]
pub struct ChunkIndex {
    model_id: String,
    dim: usize,
    entries: Vec<IndexedChunk>,
}

impl ChunkIndex {
    pub fn from_parts(model_id: impl Into<String>, dim: usize, mut entries: Vec<IndexedChunk>) -> Result<Self> {
        if let Some(bad) = entries.iter().find(|e| e.vector.len() != dim) {
            return Err(Error::DimensionMismatch { expected: dim, found: bad.vector.len() });
        }
        entries.sort_by_key(|e| e.chunk.id);
        Ok(Self { model_id: model_id.into(), dim, entries })
    }

    /// Rehydrate an index from `dir` without re-embedding.
    ///
    /// Fails with `IndexUnavailable` if the directory does not hold a complete
    /// index, and with `ModelMismatch` if it was built by another model.
    pub async fn load(dir: &Path, expected_model_id: &str) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::IndexUnavailable(format!("{} does not exist", dir.display())));
        }
        let index = read_index(dir).await.map_err(|e| Error::IndexUnavailable(format!("{}: {e:#}", dir.display())))?;
        index.ensure_model(expected_model_id)?;
        info!(dir = %dir.display(), model = %index.model_id, chunks = index.len(), "loaded chunk index");
        Ok(index)
    }

    pub fn ensure_model(&self, model_id: &str) -> Result<()> {
        if self.model_id != model_id {
            return Err(Error::ModelMismatch { expected: model_id.to_string(), found: self.model_id.clone() });
        }
        Ok(())
    }

    /// Top `k` chunks by cosine similarity to `vector`, best first.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if vector.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, found: vector.len() });
        }
        let mut scored: Vec<(usize, f32)> =
            self.entries.iter().enumerate().map(|(pos, e)| (pos, cosine_similarity(&e.vector, vector))).collect();
        // Stable sort keeps chunk order among equal scores.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);
        debug!(k, hits = scored.len(), "index query");
        Ok(scored
            .into_iter()
            .map(|(pos, score)| ScoredChunk { chunk: self.entries[pos].chunk.clone(), score })
            .collect())
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IndexedChunk] {
        &self.entries
    }
}

/// Cosine similarity; 0.0 when either vector has zero magnitude or holds
/// non-finite components.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let sim = dot / (norm_a * norm_b);
    if sim.is_finite() { sim } else { 0.0 }
}

async fn read_index(dir: &Path) -> anyhow::Result<ChunkIndex> {
    let conn = open_db(&dir.to_string_lossy()).await?;
    for table in [CHUNKS_TABLE, META_TABLE] {
        if !has_table(&conn, table).await? {
            return Err(anyhow!("table '{table}' is missing"));
        }
    }
    let meta = read_meta(&conn).await?;
    let model_id = meta.get(META_MODEL_ID).cloned().context("meta has no model_id")?;
    let dim: usize = meta.get(META_DIM).context("meta has no dim")?.parse().context("meta dim is not a number")?;
    let expected_count: usize =
        meta.get(META_CHUNK_COUNT).context("meta has no chunk_count")?.parse().context("meta chunk_count is not a number")?;

    let mut entries = Vec::with_capacity(expected_count);
    for batch in read_all(&conn, CHUNKS_TABLE).await? {
        entries.extend(batch_to_entries(&batch)?);
    }
    if entries.len() != expected_count {
        return Err(anyhow!("expected {expected_count} chunks, found {}", entries.len()));
    }
    ChunkIndex::from_parts(model_id, dim, entries).map_err(anyhow::Error::from)
}

fn batch_to_entries(batch: &RecordBatch) -> anyhow::Result<Vec<IndexedChunk>> {
    let ids = batch.column_by_name("id").and_then(|c| c.as_primitive_opt::<Int32Type>()).context("chunks.id column missing")?;
    let texts = batch.column_by_name("text").and_then(|c| c.as_string_opt::<i32>()).context("chunks.text column missing")?;
    let vectors = batch
        .column_by_name("vector")
        .and_then(|c| c.as_fixed_size_list_opt())
        .context("chunks.vector column missing")?;
    let mut out = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        if !vectors.is_valid(i) {
            return Err(anyhow!("chunk {} has no vector", ids.value(i)));
        }
        let id = usize::try_from(ids.value(i)).context("negative chunk id")?;
        let values = vectors.value(i);
        let vector = values.as_primitive_opt::<Float32Type>().context("vector items are not f32")?.values().to_vec();
        out.push(IndexedChunk { chunk: Chunk::new(id, texts.value(i)), vector });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: usize, vector: Vec<f32>) -> IndexedChunk {
        IndexedChunk { chunk: Chunk::new(id, format!("chunk {id}")), vector }
    }

    #[test]
    fn query_ranks_by_cosine_descending() {
        let index = ChunkIndex::from_parts(
            "m",
            2,
            vec![entry(0, vec![0.0, 1.0]), entry(1, vec![1.0, 0.0]), entry(2, vec![0.7, 0.7])],
        )
        .unwrap();
        let hits = index.query(&[1.0, 0.1], 3).unwrap();
        let ids: Vec<usize> = hits.iter().map(|h| h.chunk.id).collect();
        assert_eq!(ids, vec![1, 2, 0]);
        assert!(hits[0].score >= hits[1].score && hits[1].score >= hits[2].score);
    }

    #[test]
    fn ties_keep_chunk_order() {
        let index = ChunkIndex::from_parts(
            "m",
            2,
            vec![entry(2, vec![1.0, 0.0]), entry(0, vec![1.0, 0.0]), entry(1, vec![2.0, 0.0])],
        )
        .unwrap();
        let ids: Vec<usize> = index.query(&[1.0, 0.0], 3).unwrap().iter().map(|h| h.chunk.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn k_bounds_the_result_and_small_indexes_return_what_they_have() {
        let index = ChunkIndex::from_parts("m", 2, vec![entry(0, vec![1.0, 0.0])]).unwrap();
        assert_eq!(index.query(&[1.0, 0.0], 5).unwrap().len(), 1);
        let empty = ChunkIndex::from_parts("m", 2, vec![]).unwrap();
        assert!(empty.query(&[1.0, 0.0], 2).unwrap().is_empty());
    }

    #[test]
    fn wrong_query_dimension_is_an_error() {
        let index = ChunkIndex::from_parts("m", 2, vec![entry(0, vec![1.0, 0.0])]).unwrap();
        assert!(matches!(index.query(&[1.0, 0.0, 0.0], 1), Err(Error::DimensionMismatch { expected: 2, found: 3 })));
    }

    #[test]
    fn mismatched_vectors_are_rejected_at_construction() {
        let err = ChunkIndex::from_parts("m", 3, vec![entry(0, vec![1.0, 0.0])]).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 3, found: 2 }));
    }

    #[test]
    fn model_identity_is_enforced() {
        let index = ChunkIndex::from_parts("model-a", 2, vec![]).unwrap();
        assert!(index.ensure_model("model-a").is_ok());
        assert!(matches!(index.ensure_model("model-b"), Err(Error::ModelMismatch { .. })));
    }

    #[test]
    fn zero_vectors_score_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn nan_vectors_rank_last_without_panicking() {
        let index = ChunkIndex::from_parts(
            "m",
            2,
            vec![entry(0, vec![f32::NAN, 1.0]), entry(1, vec![1.0, 0.0]), entry(2, vec![f32::NAN, f32::NAN]), entry(3, vec![0.5, 0.5])],
        )
        .unwrap();
        let hits = index.query(&[1.0, 0.2], 4).unwrap();
        let ids: Vec<usize> = hits.iter().map(|h| h.chunk.id).collect();
        assert_eq!(ids, vec![1, 3, 0, 2]);
        assert!(hits.iter().all(|h| h.score.is_finite()));
    }
}
