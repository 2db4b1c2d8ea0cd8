use crate::error::Result;

/// An embedding function.
///
/// `model_id` identifies the function; vectors produced under different ids
/// must never be compared. Implementations return L2-normalized vectors of
/// exactly `dim()` components.
pub trait Embedder: Send + Sync {
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| crate::error::Error::EmbeddingFailure("embedder returned no vector".to_string()))
    }
}

/// Ranked lookup of chunks for a natural-language query.
pub trait ChunkRetriever: Send + Sync {
    fn retrieve(&self, query: &str, k: usize) -> Result<crate::types::RetrievalResult>;
}
