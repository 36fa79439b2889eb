//! In-memory record index and its sidecar file.
//!
//! The index maps record ids to byte offsets in the log and groups ids by
//! category. It is the only way records are located; the log itself is only
//! rescanned by an explicit or startup repair.
//!
//! Sidecar layout:
//!
//! ```text
//! MNEMOS_INDEX_V1
//! <total records ever>
//! <category>|<id>,<id>,...
//! OFFSETS
//! <id>|<offset>
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

const SIDECAR_HEADER: &str = "MNEMOS_INDEX_V1";
const OFFSETS_MARKER: &str = "OFFSETS";

/// Location of one record in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub id: String,
    pub offset: u64,
}

#[derive(Debug, Default, Clone)]
pub struct RecordIndex {
    /// Insertion order, which is also ascending offset order.
    entries: Vec<IndexEntry>,
    /// id → position in `entries`.
    positions: HashMap<String, usize>,
    /// category → positions in `entries`, in insertion order.
    categories: BTreeMap<String, Vec<usize>>,
    total_records_ever: u64,
    last_timestamp: i64,
}

impl RecordIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly appended record. Callers hold the log's write lock.
    pub fn insert(&mut self, id: &str, category: &str, offset: u64, timestamp: i64) {
        let position = self.entries.len();
        self.entries.push(IndexEntry {
            id: id.to_string(),
            offset,
        });
        self.positions.insert(id.to_string(), position);
        self.categories
            .entry(category.to_string())
            .or_default()
            .push(position);
        self.total_records_ever += 1;
        self.observe_timestamp(timestamp);
    }

    pub fn observe_timestamp(&mut self, timestamp: i64) {
        self.last_timestamp = self.last_timestamp.max(timestamp);
    }

    pub fn last_timestamp(&self) -> i64 {
        self.last_timestamp
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn offset(&self, id: &str) -> Option<u64> {
        self.positions.get(id).map(|&p| self.entries[p].offset)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_records_ever(&self) -> u64 {
        self.total_records_ever
    }

    pub fn first_entry(&self) -> Option<&IndexEntry> {
        self.entries.first()
    }

    /// The record with the highest offset, if any.
    pub fn last_entry(&self) -> Option<&IndexEntry> {
        self.entries.last()
    }

    /// Every entry in insertion order.
    pub fn snapshot(&self) -> Vec<IndexEntry> {
        self.entries.clone()
    }

    /// Entries for one category in insertion order.
    pub fn category_snapshot(&self, category: &str) -> Vec<IndexEntry> {
        self.categories
            .get(category)
            .map(|positions| positions.iter().map(|&p| self.entries[p].clone()).collect())
            .unwrap_or_default()
    }

    /// The last `n` entries in insertion order.
    pub fn recent_snapshot(&self, n: usize) -> Vec<IndexEntry> {
        let start = self.entries.len().saturating_sub(n);
        self.entries[start..].to_vec()
    }

    pub fn category_counts(&self) -> BTreeMap<String, usize> {
        self.categories
            .iter()
            .map(|(category, positions)| (category.clone(), positions.len()))
            .collect()
    }

    /// Keep the larger of the current and a previous lifetime count.
    pub fn carry_lifetime_total(&mut self, previous: u64) {
        self.total_records_ever = self.total_records_ever.max(previous);
    }

    /// Drop every entry. The lifetime counter survives a purge.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.positions.clear();
        self.categories.clear();
        self.last_timestamp = 0;
    }

    // ── Sidecar ───────────────────────────────────────────────────────────────

    pub fn to_sidecar(&self) -> String {
        let mut out = String::with_capacity(64 + self.entries.len() * 32);
        out.push_str(SIDECAR_HEADER);
        out.push('\n');
        out.push_str(&self.total_records_ever.to_string());
        out.push('\n');
        for (category, positions) in &self.categories {
            let ids: Vec<&str> = positions
                .iter()
                .map(|&p| self.entries[p].id.as_str())
                .collect();
            out.push_str(category);
            out.push('|');
            out.push_str(&ids.join(","));
            out.push('\n');
        }
        out.push_str(OFFSETS_MARKER);
        out.push('\n');
        for entry in &self.entries {
            out.push_str(&entry.id);
            out.push('|');
            out.push_str(&entry.offset.to_string());
            out.push('\n');
        }
        out
    }

    /// Parse a sidecar. Malformed lines are skipped. A wrong header, or an offset
    /// entry that no category lists, is an error.
    pub fn from_sidecar(text: &str) -> Result<Self, String> {
        let mut lines = text.lines();
        match lines.next() {
            Some(header) if header.starts_with("MNEMOS_INDEX") => {}
            other => return Err(format!("unrecognized sidecar header: {other:?}")),
        }
        let total_ever: u64 = lines
            .next()
            .and_then(|l| l.trim().parse().ok())
            .unwrap_or(0);

        let mut category_ids: Vec<(String, Vec<String>)> = Vec::new();
        let mut offsets: Vec<IndexEntry> = Vec::new();
        let mut in_offsets = false;
        let mut skipped = 0usize;

        for line in lines {
            if line == OFFSETS_MARKER {
                in_offsets = true;
                continue;
            }
            let Some((left, right)) = line.split_once('|') else {
                skipped += 1;
                continue;
            };
            if in_offsets {
                match right.parse::<u64>() {
                    Ok(offset) if !left.is_empty() => offsets.push(IndexEntry {
                        id: left.to_string(),
                        offset,
                    }),
                    _ => skipped += 1,
                }
            } else {
                let ids = right
                    .split(',')
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
                    .collect();
                category_ids.push((left.to_string(), ids));
            }
        }

        offsets.sort_by_key(|e| e.offset);

        let mut index = RecordIndex::new();
        for entry in offsets {
            if index.positions.contains_key(&entry.id) {
                skipped += 1;
                continue;
            }
            index.positions.insert(entry.id.clone(), index.entries.len());
            index.entries.push(entry);
        }
        for (category, ids) in category_ids {
            let mut positions: Vec<usize> = ids
                .iter()
                .filter_map(|id| index.positions.get(id).copied())
                .collect();
            skipped += ids.len() - positions.len();
            positions.sort_unstable();
            if !positions.is_empty() {
                index.categories.insert(category, positions);
            }
        }
        index.total_records_ever = total_ever.max(index.entries.len() as u64);

        let mut categorized = vec![false; index.entries.len()];
        for &p in index.categories.values().flatten() {
            categorized[p] = true;
        }
        let orphans = categorized.iter().filter(|c| !**c).count();
        if orphans > 0 {
            return Err(format!("{orphans} indexed records have no category"));
        }

        if skipped > 0 {
            tracing::warn!(skipped, "ignored malformed sidecar entries");
        }
        Ok(index)
    }

    /// Write the sidecar atomically. See [`write_sidecar`].
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        write_sidecar(path, &self.to_sidecar())
    }

    /// Load the sidecar, or `Ok(None)` when it does not exist.
    pub fn load(path: &Path) -> std::io::Result<Option<Self>> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        Self::from_sidecar(&text)
            .map(Some)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

/// Temp file, fsync, rename. A crash leaves either the old or the new sidecar.
pub fn write_sidecar(path: &Path, text: &str) -> std::io::Result<()> {
    let tmp_path = path.with_extension("idx.tmp");
    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(text.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)
}
