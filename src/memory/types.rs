//! Core record type definitions.
//!
//! Defines [`MemoryRecord`] (one immutable log entry), the well-known category
//! tags, and the content digest used for integrity spot-checks.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const CAT_EVENT: &str = "EVENT";
pub const CAT_PATTERN: &str = "PATTERN";
pub const CAT_KNOWLEDGE: &str = "KNOWLEDGE";
pub const CAT_CODE: &str = "CODE";
pub const CAT_QUESTION: &str = "QUESTION";
pub const CAT_ANSWER: &str = "ANSWER";
pub const CAT_GENOME: &str = "GENOME";
pub const CAT_LEARNING: &str = "LEARNING";

/// A single entry in the record log.
///
/// Every field is fixed at creation. The serialized line and its byte offset in
/// the log never change after the append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// 12 hex chars, unique across the lifetime of the log.
    pub id: String,
    /// Milliseconds since the Unix epoch, non-decreasing in insertion order.
    pub timestamp: i64,
    /// Short tag such as `EVENT` or `KNOWLEDGE`. Used for indexing only.
    pub category: String,
    /// Free UTF-8 text.
    pub content: String,
    /// Auxiliary ranking metadata in no fixed range. Not a similarity score.
    pub relevance_score: f64,
    /// Owning entity, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,
    /// Ordered key/value annotations.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub metadata: BTreeMap<String, String>,
    /// Digest of `(category, content, timestamp)`; see [`content_hash`].
    pub content_hash: String,
}

impl MemoryRecord {
    /// Recompute the digest and compare it with the stored one.
    pub fn verify_hash(&self) -> bool {
        content_hash(&self.category, &self.content, self.timestamp) == self.content_hash
    }

    /// One-line preview for terminal output.
    pub fn preview(&self, max_chars: usize) -> String {
        let snippet = truncate_preview(&self.content, max_chars);
        format!(
            "[{}] {}: {} (score={:.4})",
            self.id, self.category, snippet, self.relevance_score
        )
    }
}

/// First 8 bytes of SHA-256 over `category ++ content ++ timestamp`, hex encoded.
pub fn content_hash(category: &str, content: &str, timestamp: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(category.as_bytes());
    hasher.update(content.as_bytes());
    hasher.update(timestamp.to_string().as_bytes());
    let digest = hasher.finalize();
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}

/// Category tags go into the log and the sidecar unencoded.
pub fn is_valid_category(category: &str) -> bool {
    !category.is_empty()
        && !category
            .chars()
            .any(|c| matches!(c, '|' | ',' | '=' | '\n' | '\r'))
}

/// Truncate on a char boundary, appending `...` when shortened.
pub fn truncate_preview(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    let cut: String = content.chars().take(max_chars).collect();
    format!("{cut}...")
}
