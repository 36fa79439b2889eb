use serde::{Deserialize, Serialize};

/// One embedded text chunk, exactly as persisted in the vector file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorChunk {
    pub id: String,
    /// Source document the chunk was cut from.
    pub path: String,
    /// Position of the chunk within its `add` batch.
    #[serde(rename = "chunkIndex")]
    pub chunk_index: usize,
    pub text: String,
    #[serde(rename = "vec")]
    pub vector: Vec<f32>,
}

/// A search hit: the chunk plus its cosine similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub chunk: VectorChunk,
    pub score: f64,
}

impl ScoredChunk {
    /// `path#chunk<index>`, the citation target rendered into context blocks.
    pub fn citation(&self) -> String {
        format!("{}#chunk{}", self.chunk.path, self.chunk.chunk_index)
    }
}
