//! Character-window chunking and the persisted chunk file.
//!
//! Windows hold at most `size` characters and consecutive windows share
//! exactly `overlap` characters, so dropping the first `overlap` characters
//! of every chunk after the first and concatenating restores the input.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::Chunk;

#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    size: usize,
    overlap: usize,
}

impl Chunker {
    pub fn new(size: usize, overlap: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidConfig("chunk size must be greater than 0".to_string()));
        }
        if overlap >= size {
            return Err(Error::InvalidConfig(format!(
                "chunk overlap ({overlap}) must be smaller than chunk size ({size})"
            )));
        }
        Ok(Self { size, overlap })
    }

    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.size, config.overlap)
    }

    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        // Byte offset of every char boundary, plus the end of the text.
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let total = bounds.len() - 1;
        let step = self.size - self.overlap;

        let mut chunks = Vec::new();
        let mut start = 0usize;
        while start < total {
            let end = (start + self.size).min(total);
            chunks.push(Chunk::new(chunks.len(), &text[bounds[start]..bounds[end]]));
            if end == total {
                break;
            }
            start += step;
        }
        debug!(chars = total, chunks = chunks.len(), size = self.size, overlap = self.overlap, "chunked text");
        chunks
    }
}

/// Split `text` into overlapping chunks. See [`Chunker`].
pub fn chunk(text: &str, size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    Ok(Chunker::new(size, overlap)?.chunk(text))
}

/// Read a document, falling back to lossy decoding for invalid UTF-8.
pub fn read_document(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| Error::ChunkFile(format!("cannot read {}: {e}", path.display())))?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => Ok(String::from_utf8_lossy(e.as_bytes()).into_owned()),
    }
}

/// Persist chunk texts as a pretty-printed JSON array of strings.
pub fn write_chunk_file(path: &Path, chunks: &[Chunk]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::ChunkFile(format!("cannot create {}: {e}", parent.display())))?;
    }
    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    let json = serde_json::to_string_pretty(&texts).map_err(|e| Error::ChunkFile(e.to_string()))?;
    fs::write(path, json).map_err(|e| Error::ChunkFile(format!("cannot write {}: {e}", path.display())))?;
    info!(path = %path.display(), chunks = chunks.len(), "wrote chunk file");
    Ok(())
}

/// Load a chunk file; ids are assigned from array position.
pub fn read_chunk_file(path: &Path) -> Result<Vec<Chunk>> {
    let raw = fs::read_to_string(path).map_err(|e| Error::ChunkFile(format!("cannot read {}: {e}", path.display())))?;
    let texts: Vec<String> =
        serde_json::from_str(&raw).map_err(|e| Error::ChunkFile(format!("{} is not a JSON array of strings: {e}", path.display())))?;
    Ok(texts.into_iter().enumerate().map(|(id, text)| Chunk { id, text }).collect())
}
