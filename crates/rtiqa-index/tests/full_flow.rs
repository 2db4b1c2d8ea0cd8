use std::sync::Arc;

use rtiqa_core::chunker::Chunker;
use rtiqa_core::error::Error;
use rtiqa_core::traits::Embedder;
use rtiqa_core::types::Chunk;
use rtiqa_embed::FakeEmbedder;
use rtiqa_index::{build_index, write_index, ChunkIndex, Retriever};
use tempfile::TempDir;

const ACT_EXCERPT: &str = "Every public authority shall maintain all its records duly catalogued and indexed. \
Any person who desires to obtain any information shall make a request in writing. \
The Central Information Commission shall consist of the Chief Information Commissioner. \
An appeal lies to an officer senior in rank to the Central Public Information Officer.";

fn sample_chunks() -> Vec<Chunk> {
    Chunker::new(120, 30).unwrap().chunk(ACT_EXCERPT)
}

#[tokio::test]
async fn build_then_load_round_trips_without_reembedding() {
    let tmp = TempDir::new().expect("tmp");
    let dir = tmp.path().join("vectorstore");
    let embedder = FakeEmbedder::new(128);
    let chunks = sample_chunks();

    let built = build_index(&dir, &chunks, &embedder).await.expect("build");
    assert_eq!(built.len(), chunks.len());

    let loaded = ChunkIndex::load(&dir, embedder.model_id()).await.expect("load");
    assert_eq!(loaded.len(), chunks.len());
    assert_eq!(loaded.dim(), 128);
    assert_eq!(loaded.model_id(), "fake-xxhash-d128");
    for (a, b) in built.entries().iter().zip(loaded.entries()) {
        assert_eq!(a.chunk, b.chunk);
        for (x, y) in a.vector.iter().zip(&b.vector) { assert!((x - y).abs() <= 1e-6); }
    }
}

#[tokio::test]
async fn every_chunk_is_its_own_nearest_neighbour() {
    let tmp = TempDir::new().expect("tmp");
    let embedder = FakeEmbedder::new(256);
    let chunks = sample_chunks();
    let index = build_index(tmp.path(), &chunks, &embedder).await.expect("build");

    for chunk in &chunks {
        let v = embedder.embed_one(&chunk.text).unwrap();
        let hits = index.query(&v, 3).unwrap();
        assert_eq!(hits[0].chunk.id, chunk.id, "self-similarity is maximal for chunk {}", chunk.id);
    }
}

#[tokio::test]
async fn rebuilding_the_same_directory_is_idempotent() {
    let tmp = TempDir::new().expect("tmp");
    let dir = tmp.path().join("rti");
    let embedder = FakeEmbedder::new(64);
    let chunks = sample_chunks();

    build_index(&dir, &chunks, &embedder).await.expect("first build");
    build_index(&dir, &chunks, &embedder).await.expect("second build");

    let loaded = ChunkIndex::load(&dir, embedder.model_id()).await.expect("load");
    assert_eq!(loaded.len(), chunks.len(), "rebuild replaces rather than appends");
}

#[tokio::test]
async fn loading_with_another_model_fails_fast() {
    let tmp = TempDir::new().expect("tmp");
    build_index(tmp.path(), &sample_chunks(), &FakeEmbedder::new(64)).await.expect("build");

    let err = ChunkIndex::load(tmp.path(), "sentence-transformers/all-MiniLM-L6-v2").await.unwrap_err();
    assert!(matches!(err, Error::ModelMismatch { .. }), "got {err}");
}

#[tokio::test]
async fn missing_index_is_unavailable() {
    let tmp = TempDir::new().expect("tmp");
    let err = ChunkIndex::load(&tmp.path().join("absent"), "any").await.unwrap_err();
    assert!(matches!(err, Error::IndexUnavailable(_)));

    let err = ChunkIndex::load(tmp.path(), "any").await.unwrap_err();
    assert!(matches!(err, Error::IndexUnavailable(_)), "empty directory holds no tables");
}

#[tokio::test]
async fn refuses_to_overwrite_unrelated_directories() {
    let tmp = TempDir::new().expect("tmp");
    std::fs::write(tmp.path().join("notes.txt"), "keep me").unwrap();
    let err = build_index(tmp.path(), &sample_chunks(), &FakeEmbedder::new(32)).await.unwrap_err();
    assert!(matches!(err, Error::Storage(_)));
    assert!(tmp.path().join("notes.txt").exists());
}

#[tokio::test]
async fn retriever_ranks_relevant_chunks_and_checks_identity() {
    let tmp = TempDir::new().expect("tmp");
    let embedder: Arc<dyn Embedder> = Arc::new(FakeEmbedder::new(256));
    let chunks = vec![
        Chunk::new(0, "Section 4 of the Act establishes the right to information for all citizens."),
        Chunk::new(1, "Government of India Ministry modified up to 2010."),
    ];
    let index = Arc::new(build_index(tmp.path(), &chunks, embedder.as_ref()).await.expect("build"));

    let retriever = Retriever::new(index.clone(), embedder.clone()).expect("same model");
    let hits = retriever.retrieve("what is the right to information", 2).expect("retrieve");
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].chunk.id, 0);
    assert_eq!(retriever.retrieve("right to information", 1).unwrap().len(), 1);

    let other: Arc<dyn Embedder> = Arc::new(FakeEmbedder::new(128));
    assert!(matches!(Retriever::new(index, other), Err(Error::ModelMismatch { .. })));
}

#[tokio::test]
async fn empty_index_retrieves_nothing() {
    let tmp = TempDir::new().expect("tmp");
    let embedder: Arc<dyn Embedder> = Arc::new(FakeEmbedder::new(32));
    let index = build_index(tmp.path(), &[], embedder.as_ref()).await.expect("build empty");
    let loaded = Arc::new(ChunkIndex::load(tmp.path(), embedder.model_id()).await.expect("load empty"));
    assert!(index.is_empty() && loaded.is_empty());

    let retriever = Retriever::new(loaded, embedder).unwrap();
    assert!(retriever.retrieve("anything", 2).unwrap().is_empty());
}

#[tokio::test]
async fn failed_rebuild_keeps_the_previous_index() {
    let tmp = TempDir::new().expect("tmp");
    let dir = tmp.path().join("rti");
    let embedder = FakeEmbedder::new(64);
    let chunks = sample_chunks();
    build_index(&dir, &chunks, &embedder).await.expect("build");

    // Arrow cannot describe a vector column this wide, so persisting fails.
    let unwritable = ChunkIndex::from_parts(embedder.model_id(), i32::MAX as usize + 1, vec![]).unwrap();
    let err = write_index(&dir, &unwritable).await.unwrap_err();
    assert!(matches!(err, Error::Storage(_)), "got {err}");

    let loaded = ChunkIndex::load(&dir, embedder.model_id()).await.expect("previous index survives");
    assert_eq!(loaded.len(), chunks.len());
    let entries: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().map(|e| e.unwrap().file_name()).collect();
    assert_eq!(entries, vec![std::ffi::OsString::from("rti")], "staging directory is cleaned up");
}
