//! Line codec for the record log.
//!
//! One record per line, eight `|`-separated fields:
//!
//! ```text
//! id|timestamp|category|b64(content)|score|b64(entity)|hash|b64(k)=b64(v),...
//! ```
//!
//! Free-text fields use unpadded standard base64, whose alphabet contains none of
//! `|`, `,`, `=` or newline, so embedded delimiters cannot break a line.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine as _;

use super::types::MemoryRecord;

const FIELD_COUNT: usize = 8;

/// Serialize a record without the trailing newline.
pub fn encode_line(record: &MemoryRecord) -> String {
    let meta = record
        .metadata
        .iter()
        .map(|(k, v)| format!("{}={}", encode_text(k), encode_text(v)))
        .collect::<Vec<_>>()
        .join(",");

    format!(
        "{}|{}|{}|{}|{}|{}|{}|{}",
        record.id,
        record.timestamp,
        record.category,
        encode_text(&record.content),
        record.relevance_score,
        record.entity_name.as_deref().map(encode_text).unwrap_or_default(),
        record.content_hash,
        meta,
    )
}

/// Parse one line (with or without its trailing newline).
///
/// Returns a human-readable reason on failure; callers wrap it into a
/// degraded-record error with the id they expected.
pub fn decode_line(line: &str) -> Result<MemoryRecord, String> {
    let line = line.trim_end_matches(['\n', '\r']);
    let parts: Vec<&str> = line.split('|').collect();
    if parts.len() != FIELD_COUNT {
        return Err(format!(
            "expected {FIELD_COUNT} fields, found {}",
            parts.len()
        ));
    }

    let id = parts[0];
    if id.is_empty() {
        return Err("empty id".into());
    }
    let timestamp: i64 = parts[1]
        .parse()
        .map_err(|e| format!("bad timestamp {:?}: {e}", parts[1]))?;
    let category = parts[2];
    if category.is_empty() {
        return Err("empty category".into());
    }
    let content = decode_text(parts[3]).map_err(|e| format!("bad content: {e}"))?;
    let relevance_score: f64 = parts[4]
        .parse()
        .map_err(|e| format!("bad score {:?}: {e}", parts[4]))?;
    let entity_name = if parts[5].is_empty() {
        None
    } else {
        Some(decode_text(parts[5]).map_err(|e| format!("bad entity: {e}"))?)
    };
    let content_hash = parts[6].to_string();

    let mut metadata = BTreeMap::new();
    if !parts[7].is_empty() {
        for entry in parts[7].split(',') {
            let (k, v) = entry
                .split_once('=')
                .ok_or_else(|| format!("bad metadata entry {entry:?}"))?;
            let key = decode_text(k).map_err(|e| format!("bad metadata key: {e}"))?;
            let value = decode_text(v).map_err(|e| format!("bad metadata value: {e}"))?;
            metadata.insert(key, value);
        }
    }

    Ok(MemoryRecord {
        id: id.to_string(),
        timestamp,
        category: category.to_string(),
        content,
        relevance_score,
        entity_name,
        metadata,
        content_hash,
    })
}

fn encode_text(text: &str) -> String {
    STANDARD_NO_PAD.encode(text.as_bytes())
}

fn decode_text(encoded: &str) -> Result<String, String> {
    let bytes = STANDARD_NO_PAD
        .decode(encoded)
        .map_err(|e| e.to_string())?;
    String::from_utf8(bytes).map_err(|e| e.to_string())
}
