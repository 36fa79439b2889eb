//! Chunk vector store with exact cosine top-K search.
//!
//! Every chunk and its embedding stay resident; queries scan them all. The
//! backing file is append-only JSON lines and is replayed once on open.

pub mod similarity;
pub mod store;
pub mod types;

pub use similarity::cosine_similarity;
pub use store::ChunkVectorStore;
pub use types::{ScoredChunk, VectorChunk};
