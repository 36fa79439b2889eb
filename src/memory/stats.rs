use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::store::RecordLog;

/// Summary of a record log, as shown by `mnemos stats`.
#[derive(Debug, Serialize)]
pub struct LogStats {
    pub records: usize,
    pub total_records_ever: u64,
    pub categories: BTreeMap<String, usize>,
    pub average_relevance: f64,
    pub log_bytes: u64,
    pub index_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_record: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_record: Option<String>,
}

/// Collect statistics for `log`.
///
/// File sizes are best-effort: a missing sidecar reports zero bytes.
pub fn log_stats(log: &RecordLog) -> LogStats {
    let paths = log.paths();
    let file_len = |p: &std::path::Path| std::fs::metadata(p).map(|m| m.len()).unwrap_or(0);
    let (oldest, newest) = log.boundary_records();

    LogStats {
        records: log.record_count(),
        total_records_ever: log.total_records_ever(),
        categories: log.category_counts(),
        average_relevance: log.average_relevance(),
        log_bytes: file_len(&paths.log),
        index_bytes: file_len(&paths.index),
        oldest_record: oldest.map(|r| format_timestamp(r.timestamp)),
        newest_record: newest.map(|r| format_timestamp(r.timestamp)),
    }
}

/// RFC 3339 rendering of a millisecond timestamp.
pub fn format_timestamp(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| millis.to_string())
}
