//! Text-to-vector embedding seam.
//!
//! Provides the [`EmbeddingProvider`] trait and two implementations: an HTTP
//! client for an Ollama-compatible `/api/embed` endpoint, and a deterministic
//! feature-hashing embedder that needs no model. The provider is created via
//! [`create_provider`] from configuration.

pub mod hash;
pub mod http;

use anyhow::Result;

/// Trait for embedding text into vectors.
///
/// All methods are synchronous. Callers in async contexts should use
/// `tokio::task::spawn_blocking`.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of text strings, one vector per input in input order.
    /// Implementations may override for batched inference.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Vector length this provider produces, if known up front.
    fn dimensions(&self) -> Option<usize> {
        None
    }
}

/// Create an embedding provider from config.
///
/// `"http"` talks to `config.url`; `"hash"` embeds locally with `config.hash_dim`
/// dimensions.
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "http" => Ok(Box::new(http::HttpEmbeddingProvider::new(config)?)),
        "hash" => Ok(Box::new(hash::HashEmbeddingProvider::new(config.hash_dim)?)),
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: http, hash"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingConfig;

    #[test]
    fn creates_hash_provider() {
        let config = EmbeddingConfig {
            provider: "hash".into(),
            hash_dim: 24,
            ..Default::default()
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.dimensions(), Some(24));
        assert_eq!(provider.embed("hello").unwrap().len(), 24);
    }

    #[test]
    fn rejects_unknown_provider() {
        let config = EmbeddingConfig {
            provider: "onnx".into(),
            ..Default::default()
        };
        let err = create_provider(&config).err().unwrap();
        assert!(err.to_string().contains("unknown embedding provider"));
    }
}
