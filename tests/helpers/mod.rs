#![allow(dead_code)]

use std::path::Path;

use mnemos::memory::{LogOptions, LogPaths, RecordLog};
use mnemos::vector::ChunkVectorStore;

/// Options for tests: no fsync, small pool, startup repair on.
pub fn test_options() -> LogOptions {
    LogOptions {
        read_workers: 2,
        sync_writes: false,
        repair_on_open: true,
    }
}

/// Open (or reopen) the record log in `dir`.
pub fn open_log(dir: &Path) -> RecordLog {
    RecordLog::open(LogPaths::in_dir(dir), test_options()).unwrap()
}

/// Open (or reopen) the vector store in `dir`.
pub fn open_vectors(dir: &Path) -> ChunkVectorStore {
    ChunkVectorStore::open_with(dir.join("vectors.jsonl"), false).unwrap()
}

/// A unit vector with a spike at `seed % dim`.
pub fn spike(seed: usize, dim: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; dim];
    v[seed % dim] = 1.0;
    v
}

pub fn texts(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
