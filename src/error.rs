//! Error types for the record log, the chunk vector store, and retrieval.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors raised by the record log and the chunk vector store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Opening, appending to, or reading from a backing file failed.
    #[error("storage I/O error on {}: {source}", path.display())]
    StorageIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// `add` was called with differing chunk and vector counts.
    #[error("argument mismatch: {chunks} chunks but {vectors} vectors")]
    ArgumentMismatch { chunks: usize, vectors: usize },
    /// `add` was given an empty embedding for the chunk at `index`.
    #[error("chunk {index} has an empty embedding vector")]
    EmptyVector { index: usize },
    /// `add` was given a NaN or infinite component for the chunk at `index`.
    #[error("chunk {index} has a non-finite embedding component")]
    NonFiniteVector { index: usize },
    /// Category tags are written unencoded, so delimiters are not allowed.
    #[error("invalid category {0:?}: must be non-empty without '|', ',', '=' or line breaks")]
    InvalidCategory(String),
    /// The bounded read pool could not be started.
    #[error("failed to start read worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
    /// A record line could not be read back or decoded.
    #[error("degraded record {id}: {reason}")]
    DegradedRecord { id: String, reason: String },
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::StorageIo {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn degraded(id: &str, reason: impl Into<String>) -> Self {
        Self::DegradedRecord {
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while composing retrieval context.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// The embedding collaborator failed. Never retried here.
    #[error("embedding failed: {0}")]
    Embedding(String),
    /// The embedding collaborator returned the wrong number of vectors.
    #[error("embedding returned {got} vectors for {expected} inputs")]
    EmbeddingShape { expected: usize, got: usize },
}
