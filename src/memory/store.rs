//! Append-only record log with a lazily-read offset index.
//!
//! [`RecordLog::store`] is the single write path: validate, append one line under
//! the writer lock, then publish the offset to the in-memory index and nudge the
//! background sidecar writer. Reads never take the writer lock. They snapshot the
//! index, then fetch each record with one seek + line read on a shared reader
//! handle, fanned out over a fixed-size worker pool.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rayon::prelude::*;
use serde::Serialize;

use super::codec::{decode_line, encode_line};
use super::index::{IndexEntry, RecordIndex};
use super::persist::IndexPersister;
use super::types::{content_hash, is_valid_category, MemoryRecord};
use crate::durable::{append_line, seal_torn_tail};
use crate::error::{Result, StoreError};

/// Upper bound on a single line read; anything longer is treated as corrupt.
const MAX_LINE_BYTES: u64 = 64 * 1024 * 1024;

// ── Public types ──────────────────────────────────────────────────────────────

/// File locations owned by one [`RecordLog`].
#[derive(Debug, Clone)]
pub struct LogPaths {
    pub log: PathBuf,
    pub index: PathBuf,
}

impl LogPaths {
    /// `memory.log` and `memory.idx` inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            log: dir.join("memory.log"),
            index: dir.join("memory.idx"),
        }
    }
}

/// Tuning knobs for [`RecordLog::open`].
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Size of the read fan-out pool.
    pub read_workers: usize,
    /// `fdatasync` after every append.
    pub sync_writes: bool,
    /// Rescan the log on open when the sidecar is missing or behind.
    pub repair_on_open: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            read_workers: 4,
            sync_writes: true,
            repair_on_open: true,
        }
    }
}

/// Outcome of a log rescan.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RepairReport {
    /// Records in the index after the rescan.
    pub indexed: usize,
    /// Records in the index before the rescan.
    pub previously_indexed: usize,
    /// Lines that could not be decoded.
    pub degraded_lines: usize,
    /// Lines whose id was already indexed.
    pub duplicate_ids: usize,
    /// The log ended without a newline.
    pub torn_tail: bool,
}

/// Outcome of reading back every indexed record.
#[derive(Debug, Default, Clone, Serialize)]
pub struct VerifyReport {
    pub checked: usize,
    pub healthy: usize,
    /// Ids whose line could not be read or decoded.
    pub degraded: Vec<String>,
    /// Ids whose stored content hash does not match their fields.
    pub hash_mismatches: Vec<String>,
}

impl VerifyReport {
    pub fn is_healthy(&self) -> bool {
        self.degraded.is_empty() && self.hash_mismatches.is_empty()
    }
}

// ── Record log ────────────────────────────────────────────────────────────────

pub struct RecordLog {
    paths: LogPaths,
    options: LogOptions,
    /// Append handle. Holding this lock is the write lock.
    writer: Mutex<File>,
    /// Positioned-read handle, locked for exactly one seek + line read.
    reader: Mutex<File>,
    index: Arc<RwLock<RecordIndex>>,
    persister: IndexPersister,
    pool: rayon::ThreadPool,
}

impl RecordLog {
    /// Open (or create) the log at `paths`, loading the sidecar index.
    pub fn open(paths: LogPaths, options: LogOptions) -> Result<Self> {
        for file in [&paths.log, &paths.index] {
            if let Some(parent) = file.parent() {
                fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
            }
        }

        let mut writer = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&paths.log)
            .map_err(|e| StoreError::io(&paths.log, e))?;
        let torn = seal_torn_tail(&mut writer, &paths.log)?;
        let mut reader = File::open(&paths.log).map_err(|e| StoreError::io(&paths.log, e))?;
        let log_len = writer
            .metadata()
            .map_err(|e| StoreError::io(&paths.log, e))?
            .len();

        let loaded = match RecordIndex::load(&paths.index) {
            Ok(loaded) => loaded,
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                tracing::warn!(path = %paths.index.display(), error = %e, "ignoring unreadable index sidecar");
                None
            }
            Err(e) => return Err(StoreError::io(&paths.index, e)),
        };
        let sidecar_found = loaded.is_some();
        let mut index = loaded.unwrap_or_default();

        if options.repair_on_open {
            if let Some(start) = repair_start(&mut reader, &index, log_len) {
                if start == 0 && !index.is_empty() {
                    tracing::warn!("index sidecar does not match the log, rebuilding");
                    let lifetime = index.total_records_ever();
                    index = RecordIndex::new();
                    index.carry_lifetime_total(lifetime);
                }
                let outcome = scan_log(&paths.log, start, &mut index)?;
                tracing::info!(
                    from_offset = start,
                    recovered = outcome.added,
                    degraded = outcome.degraded,
                    "recovered records missing from the index sidecar"
                );
                index
                    .save(&paths.index)
                    .map_err(|e| StoreError::io(&paths.index, e))?;
            }
        } else if !sidecar_found && log_len > 0 {
            tracing::warn!(
                log = %paths.log.display(),
                "no index sidecar; existing records stay unreachable until `repair` runs"
            );
        }

        if let Some(last) = index.last_entry().cloned() {
            if let Ok(record) = read_record(&mut reader, &last) {
                index.observe_timestamp(record.timestamp);
            }
        }

        let record_count = index.len();
        let index = Arc::new(RwLock::new(index));
        let persister = IndexPersister::spawn(paths.index.clone(), Arc::clone(&index))
            .map_err(|e| StoreError::io(&paths.index, e))?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.read_workers.max(1))
            .thread_name(|i| format!("mnemos-read-{i}"))
            .build()?;

        tracing::info!(
            log = %paths.log.display(),
            records = record_count,
            sealed_torn_tail = torn,
            "record log opened"
        );

        Ok(Self {
            paths,
            options,
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
            index,
            persister,
            pool,
        })
    }

    /// Open with default options.
    pub fn open_default(paths: LogPaths) -> Result<Self> {
        Self::open(paths, LogOptions::default())
    }

    pub fn paths(&self) -> &LogPaths {
        &self.paths
    }

    // ── Write path ────────────────────────────────────────────────────────────

    /// Append a new record.
    ///
    /// The offset is taken before the write and published to the index only after
    /// the line is fully on disk; a failed write leaves the index untouched.
    pub fn store(
        &self,
        category: &str,
        content: &str,
        relevance_score: f64,
        entity_name: Option<&str>,
        metadata: Option<BTreeMap<String, String>>,
    ) -> Result<MemoryRecord> {
        if !is_valid_category(category) {
            return Err(StoreError::InvalidCategory(category.to_string()));
        }

        let mut writer = lock(&self.writer);

        let (id, timestamp) = {
            let index = self.read_index();
            let mut id = new_record_id();
            while index.contains(&id) {
                id = new_record_id();
            }
            let now = chrono::Utc::now().timestamp_millis();
            (id, now.max(index.last_timestamp()))
        };

        let record = MemoryRecord {
            content_hash: content_hash(category, content, timestamp),
            id,
            timestamp,
            category: category.to_string(),
            content: content.to_string(),
            relevance_score,
            entity_name: entity_name.filter(|e| !e.is_empty()).map(str::to_string),
            metadata: metadata.unwrap_or_default(),
        };

        let mut line = encode_line(&record);
        line.push('\n');
        let offset = append_line(
            &mut writer,
            &self.paths.log,
            line.as_bytes(),
            self.options.sync_writes,
        )?;

        self.write_index()
            .insert(&record.id, &record.category, offset, record.timestamp);
        drop(writer);

        self.persister.notify();
        tracing::debug!(id = %record.id, category = %record.category, offset, "record stored");
        Ok(record)
    }

    // ── Read path ─────────────────────────────────────────────────────────────

    /// Fetch one record by id. `Ok(None)` if the id is not indexed.
    pub fn get(&self, id: &str) -> Result<Option<MemoryRecord>> {
        let Some(offset) = self.read_index().offset(id) else {
            return Ok(None);
        };
        let entry = IndexEntry {
            id: id.to_string(),
            offset,
        };
        self.load_record(&entry).map(Some)
    }

    /// All records in `category`, in insertion order. One read per record.
    pub fn get_by_category(&self, category: &str) -> Vec<MemoryRecord> {
        let entries = self.read_index().category_snapshot(category);
        self.fetch_matching(&entries, |_| true)
    }

    /// All records owned by `entity_name`, in insertion order.
    pub fn get_by_entity(&self, entity_name: &str) -> Vec<MemoryRecord> {
        let entries = self.read_index().snapshot();
        self.fetch_matching(&entries, |r| r.entity_name.as_deref() == Some(entity_name))
    }

    /// Case-insensitive substring match over content, category, and entity name.
    pub fn search(&self, query: &str) -> Vec<MemoryRecord> {
        let needle = query.to_lowercase();
        let entries = self.read_index().snapshot();
        self.fetch_matching(&entries, |r| {
            r.content.to_lowercase().contains(&needle)
                || r.category.to_lowercase().contains(&needle)
                || r.entity_name
                    .as_deref()
                    .is_some_and(|e| e.to_lowercase().contains(&needle))
        })
    }

    /// Records with `min <= relevance_score <= max`, in insertion order.
    pub fn get_by_score_range(&self, min: f64, max: f64) -> Vec<MemoryRecord> {
        let entries = self.read_index().snapshot();
        self.fetch_matching(&entries, |r| r.relevance_score >= min && r.relevance_score <= max)
    }

    /// The `n` most recently inserted records, oldest first.
    pub fn get_recent(&self, n: usize) -> Vec<MemoryRecord> {
        let entries = self.read_index().recent_snapshot(n);
        let mut records = self.fetch_matching(&entries, |_| true);
        records.sort_by_key(|r| r.timestamp);
        records
    }

    /// Number of indexed records.
    pub fn record_count(&self) -> usize {
        self.read_index().len()
    }

    /// Records appended over the lifetime of the log, including purged ones.
    pub fn total_records_ever(&self) -> u64 {
        self.read_index().total_records_ever()
    }

    pub fn category_counts(&self) -> BTreeMap<String, usize> {
        self.read_index().category_counts()
    }

    /// The oldest and newest indexed records, when readable.
    pub(crate) fn boundary_records(&self) -> (Option<MemoryRecord>, Option<MemoryRecord>) {
        let (first, last) = {
            let index = self.read_index();
            (index.first_entry().cloned(), index.last_entry().cloned())
        };
        let load = |entry: Option<IndexEntry>| entry.and_then(|e| self.load_record(&e).ok());
        (load(first), load(last))
    }

    /// Mean relevance score over readable records, `0.0` when there are none.
    pub fn average_relevance(&self) -> f64 {
        let entries = self.read_index().snapshot();
        let scores = self.fan_out(&entries, |r| Some(r.relevance_score));
        if scores.is_empty() {
            return 0.0;
        }
        scores.iter().sum::<f64>() / scores.len() as f64
    }

    // ── Maintenance ───────────────────────────────────────────────────────────

    /// Write the sidecar now and wait for it.
    pub fn flush_index(&self) -> Result<()> {
        self.persister
            .flush()
            .map_err(|e| StoreError::io(&self.paths.index, e))
    }

    /// Truncate the log and drop every index entry.
    pub fn purge(&self) -> Result<()> {
        let writer = lock(&self.writer);
        writer
            .set_len(0)
            .and_then(|()| writer.sync_all())
            .map_err(|e| StoreError::io(&self.paths.log, e))?;

        let removed = {
            let mut index = self.write_index();
            let removed = index.len();
            index.clear();
            removed
        };
        self.flush_index()?;
        drop(writer);

        tracing::info!(removed, "record log purged");
        Ok(())
    }

    /// Rebuild the index by rescanning the whole log. Blocks writers meanwhile.
    pub fn repair(&self) -> Result<RepairReport> {
        let _writer = lock(&self.writer);
        let (previously_indexed, lifetime) = {
            let index = self.read_index();
            (index.len(), index.total_records_ever())
        };

        let mut rebuilt = RecordIndex::new();
        let outcome = scan_log(&self.paths.log, 0, &mut rebuilt)?;
        rebuilt.carry_lifetime_total(lifetime);
        let indexed = rebuilt.len();
        *self.write_index() = rebuilt;
        self.flush_index()?;

        tracing::info!(previously_indexed, indexed, degraded = outcome.degraded, "record log repaired");
        Ok(RepairReport {
            indexed,
            previously_indexed,
            degraded_lines: outcome.degraded,
            duplicate_ids: outcome.duplicates,
            torn_tail: outcome.torn_tail,
        })
    }

    /// Read back every indexed record and check its content hash.
    pub fn verify(&self) -> VerifyReport {
        let entries = self.read_index().snapshot();
        let outcomes: Vec<(String, Option<bool>)> = self.pool.install(|| {
            entries
                .par_iter()
                .map(|entry| {
                    let status = self.load_record(entry).ok().map(|r| r.verify_hash());
                    (entry.id.clone(), status)
                })
                .collect()
        });

        let mut report = VerifyReport {
            checked: outcomes.len(),
            ..Default::default()
        };
        for (id, status) in outcomes {
            match status {
                Some(true) => report.healthy += 1,
                Some(false) => report.hash_mismatches.push(id),
                None => report.degraded.push(id),
            }
        }
        report
    }

    /// Flush the sidecar and stop the background writer.
    pub fn close(self) -> Result<()> {
        self.flush_index()
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn read_index(&self) -> RwLockReadGuard<'_, RecordIndex> {
        self.index.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_index(&self) -> RwLockWriteGuard<'_, RecordIndex> {
        self.index.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seek + read one line under the reader lock, then decode outside it.
    fn load_record(&self, entry: &IndexEntry) -> Result<MemoryRecord> {
        let bytes = read_line_at(&mut lock(&self.reader), entry.offset)
            .map_err(|e| StoreError::io(&self.paths.log, e))?;
        decode_entry(entry, &bytes)
    }

    /// Load `entries` on the worker pool, keeping order. Unreadable records are
    /// logged and skipped.
    fn fan_out<T, F>(&self, entries: &[IndexEntry], map: F) -> Vec<T>
    where
        T: Send,
        F: Fn(MemoryRecord) -> Option<T> + Sync,
    {
        self.pool.install(|| {
            entries
                .par_iter()
                .filter_map(|entry| match self.load_record(entry) {
                    Ok(record) => map(record),
                    Err(e) => {
                        tracing::warn!(id = %entry.id, offset = entry.offset, error = %e, "skipping degraded record");
                        None
                    }
                })
                .collect()
        })
    }

    fn fetch_matching<F>(&self, entries: &[IndexEntry], predicate: F) -> Vec<MemoryRecord>
    where
        F: Fn(&MemoryRecord) -> bool + Sync,
    {
        self.fan_out(entries, |record| predicate(&record).then_some(record))
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn lock(file: &Mutex<File>) -> MutexGuard<'_, File> {
    file.lock().unwrap_or_else(PoisonError::into_inner)
}

fn new_record_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..12].to_string()
}

fn read_line_at(file: &mut File, offset: u64) -> std::io::Result<Vec<u8>> {
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = Vec::new();
    BufReader::new(file)
        .take(MAX_LINE_BYTES)
        .read_until(b'\n', &mut buf)?;
    Ok(buf)
}

fn read_record(file: &mut File, entry: &IndexEntry) -> Result<MemoryRecord> {
    let bytes = read_line_at(file, entry.offset)
        .map_err(|e| StoreError::degraded(&entry.id, e.to_string()))?;
    decode_entry(entry, &bytes)
}

fn decode_entry(entry: &IndexEntry, bytes: &[u8]) -> Result<MemoryRecord> {
    if bytes.is_empty() {
        return Err(StoreError::degraded(
            &entry.id,
            format!("offset {} is past the end of the log", entry.offset),
        ));
    }
    if bytes.last() != Some(&b'\n') {
        return Err(StoreError::degraded(&entry.id, "truncated line"));
    }
    let line = std::str::from_utf8(bytes)
        .map_err(|e| StoreError::degraded(&entry.id, format!("invalid UTF-8: {e}")))?;
    let record = decode_line(line).map_err(|reason| StoreError::degraded(&entry.id, reason))?;
    if record.id != entry.id {
        return Err(StoreError::degraded(
            &entry.id,
            format!("offset {} holds record {}", entry.offset, record.id),
        ));
    }
    Ok(record)
}

/// Where a startup repair should begin scanning, if anywhere.
///
/// Empty or missing sidecar: from the start. Otherwise from the end of the last
/// indexed line, if the log extends past it. A sidecar pointing at garbage or
/// past the end of the log: from the start again.
fn repair_start(reader: &mut File, index: &RecordIndex, log_len: u64) -> Option<u64> {
    let Some(last) = index.last_entry() else {
        return (log_len > 0).then_some(0);
    };
    match read_line_at(reader, last.offset) {
        Ok(bytes) if decode_entry(last, &bytes).is_ok() => {
            let end = last.offset + bytes.len() as u64;
            (end < log_len).then_some(end)
        }
        _ => Some(0),
    }
}

#[derive(Debug, Default)]
struct ScanOutcome {
    added: usize,
    degraded: usize,
    duplicates: usize,
    torn_tail: bool,
}

/// Linear scan from `start`, adding every decodable, not-yet-indexed line.
fn scan_log(path: &Path, start: u64, index: &mut RecordIndex) -> Result<ScanOutcome> {
    let mut file = File::open(path).map_err(|e| StoreError::io(path, e))?;
    file.seek(SeekFrom::Start(start))
        .map_err(|e| StoreError::io(path, e))?;
    let mut reader = BufReader::new(file);

    let mut outcome = ScanOutcome::default();
    let mut offset = start;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| StoreError::io(path, e))?;
        if n == 0 {
            break;
        }
        let line_offset = offset;
        offset += n as u64;

        if buf.last() != Some(&b'\n') {
            outcome.torn_tail = true;
            tracing::warn!(offset = line_offset, "log ends with a partial line");
            break;
        }
        if buf.len() == 1 {
            continue;
        }

        let decoded = std::str::from_utf8(&buf)
            .map_err(|e| e.to_string())
            .and_then(decode_line);
        match decoded {
            Ok(record) if index.contains(&record.id) => outcome.duplicates += 1,
            Ok(record) => {
                index.insert(&record.id, &record.category, line_offset, record.timestamp);
                outcome.added += 1;
            }
            Err(reason) => {
                outcome.degraded += 1;
                tracing::warn!(offset = line_offset, %reason, "skipping unreadable log line");
            }
        }
    }
    Ok(outcome)
}
