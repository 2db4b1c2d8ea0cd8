//! rtiqa-index
//!
//! Persisted embedding index over document chunks. `writer` builds the LanceDB
//! directory offline, `store` rehydrates it into an immutable in-memory
//! [`ChunkIndex`], and `retriever` answers nearest-chunk lookups for queries.

pub mod retriever;
pub mod schema;
pub mod store;
pub mod table;
pub mod writer;

pub use retriever::Retriever;
pub use store::{cosine_similarity, ChunkIndex, IndexedChunk};
pub use writer::{build_index, write_index};
