//! Embedding functions for chunks and queries.
//!
//! [`MiniLmEmbedder`] runs a sentence-transformers BERT checkpoint through
//! candle; [`FakeEmbedder`] hashes tokens into a fixed-size vector for tests
//! and offline development. [`load_embedder`] reports which one is usable as an
//! explicit [`EmbedderAvailability`] instead of failing deep inside a request.

use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use rtiqa_core::config::{expand_path, EmbeddingConfig};
use rtiqa_core::error::Error;
use rtiqa_core::traits::Embedder;

pub mod device;
pub mod pool;
pub mod tokenize;

pub use device::select_device;
pub use pool::masked_mean_l2;
pub use tokenize::tokenize_on_device;

pub struct MiniLmEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    model_id: String,
    dim: usize,
    max_len: usize,
}

impl MiniLmEmbedder {
    pub fn load(model_id: &str, model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = select_device();
        info!(model = model_id, dir = %model_dir.display(), "loading embedding model");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config_path = model_dir.join("config.json");
        let config: BertConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
        let weights = load_weights(model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DTYPE, &device);
        let model = BertModel::load(vb, &config)?;
        info!(model = model_id, dim = config.hidden_size, "embedding model loaded");
        Ok(Self { model, tokenizer, device, model_id: model_id.to_string(), dim: config.hidden_size, max_len })
    }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize_on_device(&self.tokenizer, text, self.max_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let emb = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1::<f32>()?;
        if emb.len() != self.dim { return Err(anyhow!("model produced {} dims, expected {}", emb.len(), self.dim)); }
        if start.elapsed().as_millis() > 100 { debug!(ms = start.elapsed().as_millis() as u64, "slow embedding"); }
        Ok(emb)
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        return Ok(candle_core::safetensors::load(&safetensors, device)?);
    }
    let pickle = model_dir.join("pytorch_model.bin");
    if pickle.exists() {
        return Ok(candle_core::pickle::read_all(&pickle)?.into_iter().collect());
    }
    Err(anyhow!("No model.safetensors or pytorch_model.bin in {}", model_dir.display()))
}

impl Embedder for MiniLmEmbedder {
    fn model_id(&self) -> &str { &self.model_id }
    fn dim(&self) -> usize { self.dim }
    fn embed_batch(&self, texts: &[String]) -> rtiqa_core::error::Result<Vec<Vec<f32>>> {
        texts
            .iter()
            .map(|t| self.embed_text(t).map_err(|e| Error::EmbeddingFailure(format!("{e:#}"))))
            .collect()
    }
}

/// Deterministic bag-of-tokens embedder: each lowercased token is hashed into
/// a bucket. Texts sharing words score higher, which is enough to exercise
/// ranking without model weights.
pub struct FakeEmbedder { dim: usize, model_id: String }

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim, model_id: format!("fake-xxhash-d{dim}") } }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;
        let mut v = vec![0f32; self.dim];
        let tokens = text
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .filter(|t| !t.is_empty());
        for (i, token) in tokens.enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += 0.5 + val + (i as f32 % 3.0) * 0.01;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        v
    }
}

impl Embedder for FakeEmbedder {
    fn model_id(&self) -> &str { &self.model_id }
    fn dim(&self) -> usize { self.dim }
    fn embed_batch(&self, texts: &[String]) -> rtiqa_core::error::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

/// Outcome of trying to construct the configured embedding function.
pub enum EmbedderAvailability {
    Available(Arc<dyn Embedder>),
    Unavailable { reason: String },
}

impl EmbedderAvailability {
    pub fn is_available(&self) -> bool { matches!(self, Self::Available(_)) }

    pub fn into_result(self) -> rtiqa_core::error::Result<Arc<dyn Embedder>> {
        match self {
            Self::Available(embedder) => Ok(embedder),
            Self::Unavailable { reason } => Err(Error::EmbeddingFailure(format!("embedding model unavailable: {reason}"))),
        }
    }
}

impl std::fmt::Debug for EmbedderAvailability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available(e) => f.debug_tuple("Available").field(&e.model_id()).finish(),
            Self::Unavailable { reason } => f.debug_struct("Unavailable").field("reason", reason).finish(),
        }
    }
}

fn fake_requested_by_env() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

pub fn load_embedder(config: &EmbeddingConfig) -> EmbedderAvailability {
    if config.use_fake || fake_requested_by_env() {
        info!(dim = config.fake_dim, "using FakeEmbedder");
        return EmbedderAvailability::Available(Arc::new(FakeEmbedder::new(config.fake_dim)));
    }
    let loaded = resolve_model_dir(config).and_then(|dir| MiniLmEmbedder::load(&config.model, &dir, config.max_len));
    match loaded {
        Ok(model) => EmbedderAvailability::Available(Arc::new(model)),
        Err(e) => {
            let reason = format!("{e:#}");
            warn!(model = %config.model, %reason, "embedding model unavailable");
            EmbedderAvailability::Unavailable { reason }
        }
    }
}

fn resolve_model_dir(config: &EmbeddingConfig) -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("APP_MODEL_DIR") { let p = expand_path(&dir); if p.exists() { info!(dir = %p.display(), "using APP_MODEL_DIR"); return Ok(p); } }
    if let Some(dir) = &config.model_dir { let p = expand_path(dir); if p.exists() { return Ok(p); } }
    let name = config.model.rsplit('/').next().unwrap_or(config.model.as_str());
    for candidate in [Path::new("models").join(name), Path::new("../models").join(name)] {
        if candidate.exists() { info!(dir = %candidate.display(), "using model dir"); return Ok(candidate); }
    }
    Err(anyhow!("Could not locate model directory for '{}' (set embedding.model_dir or APP_MODEL_DIR)", config.model))
}
