//! Offline index build: embed every chunk and persist chunks, vectors and
//! model identity into a LanceDB directory.

use anyhow::{anyhow, Context};
use arrow_array::{FixedSizeListArray, Int32Array, RecordBatch, StringArray};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::Builder;
use tracing::{info, warn};

use rtiqa_core::error::{Error, Result};
use rtiqa_core::traits::Embedder;
use rtiqa_core::types::Chunk;

use crate::schema::{build_chunks_schema, CHUNKS_TABLE, META_CHUNK_COUNT, META_DIM, META_MODEL_ID};
use crate::store::{ChunkIndex, IndexedChunk};
use crate::table::{create_table, open_db, write_meta};

const EMBED_BATCH_SIZE: usize = 32;

/// Embed `chunks` with `embedder` and persist them under `dir`.
///
/// Any index previously stored in `dir` is replaced, so rebuilding with the
/// same chunks and embedder yields an equivalent index. A non-empty `dir`
/// that does not look like an index is left alone and reported.
pub async fn build_index(dir: &Path, chunks: &[Chunk], embedder: &dyn Embedder) -> Result<ChunkIndex> {
    let vectors = embed_all(chunks, embedder)?;
    let entries: Vec<IndexedChunk> =
        chunks.iter().cloned().zip(vectors).map(|(chunk, vector)| IndexedChunk { chunk, vector }).collect();
    let index = ChunkIndex::from_parts(embedder.model_id(), embedder.dim(), entries)?;
    write_index(dir, &index).await?;
    info!(dir = %dir.display(), model = %index.model_id(), chunks = index.len(), "built chunk index");
    Ok(index)
}

/// Persist `index` into `dir`.
///
/// Tables are written into a sibling staging directory first and swapped in
/// only once complete; on failure the index already in `dir` stays loadable.
pub async fn write_index(dir: &Path, index: &ChunkIndex) -> Result<()> {
    ensure_replaceable(dir)?;
    let parent = match dir.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| Error::Storage(format!("cannot create {}: {e}", parent.display())))?;
    let staging = Builder::new()
        .prefix(".rtiqa-staging-")
        .tempdir_in(parent)
        .map_err(|e| Error::Storage(format!("cannot stage in {}: {e}", parent.display())))?;
    persist(staging.path(), index).await.map_err(|e| Error::Storage(format!("{}: {e:#}", dir.display())))?;
    swap_into_place(staging.path(), dir, parent)
}

fn embed_all(chunks: &[Chunk], embedder: &dyn Embedder) -> Result<Vec<Vec<f32>>> {
    if chunks.is_empty() {
        warn!("no chunks to index");
        return Ok(Vec::new());
    }
    let pb = ProgressBar::new(chunks.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}") {
        pb.set_style(style.progress_chars("#>-"));
    }
    let mut vectors = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(EMBED_BATCH_SIZE) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let embedded = embedder.embed_batch(&texts)?;
        if embedded.len() != texts.len() {
            return Err(Error::EmbeddingFailure(format!("asked for {} vectors, got {}", texts.len(), embedded.len())));
        }
        vectors.extend(embedded);
        pb.set_position(vectors.len() as u64);
    }
    pb.finish_with_message("embedded");
    Ok(vectors)
}

fn ensure_replaceable(dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    let looks_like_index = dir.join(format!("{CHUNKS_TABLE}.lance")).exists();
    let is_empty = fs::read_dir(dir).map(|mut it| it.next().is_none()).unwrap_or(false);
    if !looks_like_index && !is_empty {
        return Err(Error::Storage(format!("refusing to replace {}: not an index directory", dir.display())));
    }
    Ok(())
}

/// Move `staged` to `dir`, parking any previous index aside until the new
/// one is in place. The parked copy is restored if the final rename fails.
fn swap_into_place(staged: &Path, dir: &Path, parent: &Path) -> Result<()> {
    let storage = |what: &str, e: std::io::Error| Error::Storage(format!("cannot {what} {}: {e}", dir.display()));
    if !dir.exists() {
        return fs::rename(staged, dir).map_err(|e| storage("install", e));
    }
    let retired = Builder::new().prefix(".rtiqa-retired-").tempdir_in(parent).map_err(|e| storage("retire", e))?;
    let parked = retired.path().join("index");
    fs::rename(dir, &parked).map_err(|e| storage("retire", e))?;
    if let Err(e) = fs::rename(staged, dir) {
        if let Err(restore) = fs::rename(&parked, dir) {
            warn!(dir = %dir.display(), error = %restore, "could not restore previous index");
        }
        return Err(storage("install", e));
    }
    Ok(())
}

async fn persist(dir: &Path, index: &ChunkIndex) -> anyhow::Result<()> {
    let conn = open_db(&dir.to_string_lossy()).await?;
    let dim = i32::try_from(index.dim()).context("embedding dimension too large")?;
    let schema = build_chunks_schema(dim);
    let batches = if index.is_empty() { Vec::new() } else { vec![entries_to_record_batch(index.entries(), dim)?] };
    create_table(&conn, CHUNKS_TABLE, schema, batches).await?;
    write_meta(
        &conn,
        &[
            (META_MODEL_ID, index.model_id().to_string()),
            (META_DIM, index.dim().to_string()),
            (META_CHUNK_COUNT, index.len().to_string()),
        ],
    )
    .await
}

fn entries_to_record_batch(entries: &[IndexedChunk], dim: i32) -> anyhow::Result<RecordBatch> {
    let mut ids = Vec::with_capacity(entries.len());
    let mut texts = Vec::with_capacity(entries.len());
    let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(entries.len());
    for e in entries {
        ids.push(i32::try_from(e.chunk.id).map_err(|_| anyhow!("chunk id {} out of range", e.chunk.id))?);
        texts.push(e.chunk.text.as_str());
        vectors.push(Some(e.vector.iter().map(|&x| Some(x)).collect()));
    }
    let record_batch = RecordBatch::try_new(build_chunks_schema(dim), vec![
        Arc::new(Int32Array::from(ids)),
        Arc::new(StringArray::from(texts)),
        Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors.into_iter(), dim)),
    ])?;
    Ok(record_batch)
}
