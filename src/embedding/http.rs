//! HTTP embedding provider for an Ollama-compatible `/api/embed` endpoint.
//!
//! Request: `{"model": "...", "input": ["...", ...]}`.
//! Response: `{"embeddings": [[...], ...]}`, one vector per input in order.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::EmbeddingProvider;
use crate::config::EmbeddingConfig;

/// Longest slice of an error body echoed back in error messages.
const ERROR_BODY_PREVIEW: usize = 240;

pub struct HttpEmbeddingProvider {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl HttpEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build embedding client")?;
        Ok(Self {
            client,
            endpoint: embed_endpoint(&config.url),
            model: config.model.clone(),
        })
    }
}

impl EmbeddingProvider for HttpEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])?
            .pop()
            .context("embedding response was empty")
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbedRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .with_context(|| format!("embedding request to {} failed", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            anyhow::bail!(
                "embedding request failed with status {}: {}",
                status.as_u16(),
                body.chars().take(ERROR_BODY_PREVIEW).collect::<String>()
            );
        }

        let payload: EmbedResponse = response
            .json()
            .context("failed to parse embedding response JSON")?;
        tracing::debug!(
            model = %self.model,
            inputs = texts.len(),
            returned = payload.embeddings.len(),
            "embedding batch complete"
        );
        Ok(payload.embeddings)
    }
}

/// `base` with `/api/embed` appended, unless it already names that path.
fn embed_endpoint(base: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.ends_with("/api/embed") {
        base.to_string()
    } else {
        format!("{base}/api/embed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_normalization() {
        assert_eq!(
            embed_endpoint("http://localhost:11434"),
            "http://localhost:11434/api/embed"
        );
        assert_eq!(
            embed_endpoint("http://localhost:11434/"),
            "http://localhost:11434/api/embed"
        );
        assert_eq!(
            embed_endpoint("http://host/api/embed"),
            "http://host/api/embed"
        );
    }

    #[test]
    fn request_body_shape() {
        let body = serde_json::to_value(EmbedRequest {
            model: "embeddinggemma",
            input: &["a", "b"],
        })
        .unwrap();
        assert_eq!(body["model"], "embeddinggemma");
        assert_eq!(body["input"][1], "b");
    }

    #[test]
    fn empty_batch_skips_network() {
        let provider = HttpEmbeddingProvider::new(&EmbeddingConfig {
            url: "http://127.0.0.1:9".into(),
            ..Default::default()
        })
        .unwrap();
        assert!(provider.embed_batch(&[]).unwrap().is_empty());
    }
}
