//! Deterministic feature-hashing embedder.
//!
//! Each lowercased alphanumeric token is hashed with SHA-256 into one signed
//! bucket, so texts sharing words land near each other. Text with no tokens
//! falls back to a counter-mode digest of the raw bytes. Output is L2-normalized.

use anyhow::Result;
use sha2::{Digest, Sha256};

use super::EmbeddingProvider;

#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    dim: usize,
}

impl HashEmbeddingProvider {
    pub fn new(dim: usize) -> Result<Self> {
        anyhow::ensure!(dim > 0, "hash embedder needs at least one dimension");
        Ok(Self { dim })
    }

    fn bag_of_words(&self, text: &str) -> Vec<f32> {
        let mut out = vec![0.0f32; self.dim];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let bucket = u64::from_le_bytes([
                digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6],
                digest[7],
            ]) % self.dim as u64;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            out[bucket as usize] += sign;
        }
        out
    }

    fn raw_digest(&self, text: &str) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.dim);
        let mut counter: u64 = 0;
        while out.len() < self.dim {
            let mut h = Sha256::new();
            h.update(text.as_bytes());
            h.update(counter.to_le_bytes());
            for chunk in h.finalize().chunks_exact(4) {
                if out.len() == self.dim {
                    break;
                }
                let raw = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                out.push(((raw as f64) / (u32::MAX as f64 + 1.0)) as f32);
            }
            counter = counter.saturating_add(1);
        }
        out
    }
}

impl EmbeddingProvider for HashEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut out = self.bag_of_words(text);
        if out.iter().all(|&x| x == 0.0) {
            out = self.raw_digest(text);
        }
        l2_normalize(&mut out);
        Ok(out)
    }

    fn dimensions(&self) -> Option<usize> {
        Some(self.dim)
    }
}

fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
