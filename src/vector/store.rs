//! Append-only JSON-lines chunk store.
//!
//! ```text
//! {"id":"…","path":"notes.md","chunkIndex":0,"text":"…","vec":[0.1,…]}
//! ```
//!
//! Writers serialize on one mutex and publish to the resident chunk list only
//! after the lines are on disk. Searches scan the list under a read lock.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::similarity::{cosine_similarity, top_k_positions};
use super::types::{ScoredChunk, VectorChunk};
use crate::durable::{append_line, seal_torn_tail};
use crate::error::{Result, StoreError};

pub struct ChunkVectorStore {
    path: PathBuf,
    sync_writes: bool,
    chunks: RwLock<Vec<VectorChunk>>,
    /// Append handle, opened lazily and dropped by `clear`.
    writer: Mutex<Option<File>>,
}

impl ChunkVectorStore {
    /// Open the store at `path`, fsyncing every append.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with(path, true)
    }

    /// Open the store at `path`, replaying any existing file.
    pub fn open_with(path: impl Into<PathBuf>, sync_writes: bool) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        let chunks = if path.exists() {
            load_chunks(&path)?
        } else {
            Vec::new()
        };
        tracing::info!(path = %path.display(), chunks = chunks.len(), "vector store loaded");

        Ok(Self {
            path,
            sync_writes,
            chunks: RwLock::new(chunks),
            writer: Mutex::new(None),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one chunk per `(text, vector)` pair from the document at `path`.
    ///
    /// Lengths must match, and every vector must be non-empty with finite
    /// components. All of it is checked before anything is written. Returns the
    /// stored chunks.
    pub fn add(
        &self,
        path: &str,
        chunks: &[String],
        vectors: &[Vec<f32>],
    ) -> Result<Vec<VectorChunk>> {
        if chunks.len() != vectors.len() {
            return Err(StoreError::ArgumentMismatch {
                chunks: chunks.len(),
                vectors: vectors.len(),
            });
        }
        if let Some(index) = vectors.iter().position(Vec::is_empty) {
            return Err(StoreError::EmptyVector { index });
        }
        // JSON has no NaN or infinity; serde_json would write them as null.
        if let Some(index) = vectors
            .iter()
            .position(|v| v.iter().any(|x| !x.is_finite()))
        {
            return Err(StoreError::NonFiniteVector { index });
        }
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(expected) = self.dimensions() {
            if let Some(odd) = vectors.iter().find(|v| v.len() != expected) {
                tracing::warn!(
                    path,
                    expected,
                    got = odd.len(),
                    "vector length differs from the stored chunks; similarity uses the shared prefix"
                );
            }
        }

        let new_chunks: Vec<VectorChunk> = chunks
            .iter()
            .zip(vectors)
            .enumerate()
            .map(|(chunk_index, (text, vector))| VectorChunk {
                id: uuid::Uuid::new_v4().to_string(),
                path: path.to_string(),
                chunk_index,
                text: text.clone(),
                vector: vector.clone(),
            })
            .collect();

        let mut payload = String::new();
        for chunk in &new_chunks {
            let line = serde_json::to_string(chunk).map_err(|e| {
                StoreError::io(&self.path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
            })?;
            payload.push_str(&line);
            payload.push('\n');
        }

        let mut writer = self.lock_writer();
        let file = match writer.as_mut() {
            Some(file) => file,
            None => writer.insert(self.open_append()?),
        };
        append_line(file, &self.path, payload.as_bytes(), self.sync_writes)?;

        self.write_chunks().extend(new_chunks.iter().cloned());
        drop(writer);

        tracing::debug!(path, added = new_chunks.len(), "chunks stored");
        Ok(new_chunks)
    }

    /// Up to `k` chunks by descending cosine similarity to `query`.
    pub fn top_k(&self, query: &[f32], k: usize) -> Vec<ScoredChunk> {
        if query.is_empty() || k == 0 {
            return Vec::new();
        }
        let chunks = self.read_chunks();
        let scores = chunks.iter().map(|c| cosine_similarity(query, &c.vector));
        let hits: Vec<ScoredChunk> = top_k_positions(scores, k)
            .into_iter()
            .map(|(position, score)| ScoredChunk {
                chunk: chunks[position].clone(),
                score,
            })
            .collect();
        tracing::debug!(k, scanned = chunks.len(), hits = hits.len(), "vector search");
        hits
    }

    pub fn size(&self) -> usize {
        self.read_chunks().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_chunks().is_empty()
    }

    /// Vector length of the first stored chunk.
    pub fn dimensions(&self) -> Option<usize> {
        self.read_chunks().first().map(|c| c.vector.len())
    }

    /// Chunk counts per source path.
    pub fn sources(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for chunk in self.read_chunks().iter() {
            *counts.entry(chunk.path.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Drop every chunk and delete the backing file.
    pub fn clear(&self) -> Result<()> {
        let mut writer = self.lock_writer();
        writer.take();
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::io(&self.path, e)),
        }
        let removed = {
            let mut chunks = self.write_chunks();
            let removed = chunks.len();
            chunks.clear();
            removed
        };
        drop(writer);

        tracing::info!(path = %self.path.display(), removed, "vector store cleared");
        Ok(())
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn open_append(&self) -> Result<File> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StoreError::io(&self.path, e))?;
        seal_torn_tail(&mut file, &self.path)?;
        Ok(file)
    }

    fn lock_writer(&self) -> MutexGuard<'_, Option<File>> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_chunks(&self) -> RwLockReadGuard<'_, Vec<VectorChunk>> {
        self.chunks.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_chunks(&self) -> RwLockWriteGuard<'_, Vec<VectorChunk>> {
        self.chunks.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Replay the file. Lines that are not UTF-8, do not parse, or carry an empty
/// vector are skipped.
fn load_chunks(path: &Path) -> Result<Vec<VectorChunk>> {
    let file = File::open(path).map_err(|e| StoreError::io(path, e))?;
    let mut reader = BufReader::new(file);
    let mut chunks = Vec::new();
    let mut skipped = 0usize;
    let mut buf = Vec::new();
    let mut line_no = 0usize;

    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| StoreError::io(path, e))?;
        if read == 0 {
            break;
        }
        line_no += 1;

        let Ok(line) = std::str::from_utf8(&buf) else {
            skipped += 1;
            tracing::warn!(line = line_no, "skipping vector line that is not valid UTF-8");
            continue;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<VectorChunk>(line) {
            Ok(chunk) if !chunk.vector.is_empty() => chunks.push(chunk),
            Ok(chunk) => {
                skipped += 1;
                tracing::warn!(line = line_no, id = %chunk.id, "skipping chunk with empty vector");
            }
            Err(e) => {
                skipped += 1;
                tracing::warn!(line = line_no, error = %e, "skipping unreadable vector line");
            }
        }
    }

    if skipped > 0 {
        tracing::warn!(path = %path.display(), skipped, "vector file had unreadable lines");
    }
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn open_store(dir: &tempfile::TempDir) -> ChunkVectorStore {
        ChunkVectorStore::open_with(dir.path().join("vectors.jsonl"), false).unwrap()
    }

    #[test]
    fn test_three_vector_scenario() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = open_store(&tmp);
        store
            .add(
                "doc.txt",
                &texts(&["east", "north", "northeast"]),
                &[vec![1.0, 0.0], vec![0.0, 1.0], vec![0.7, 0.7]],
            )
            .unwrap();

        let hits = store.top_k(&[1.0, 0.0], 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.text, "east");
        assert!((hits[0].score - 1.0).abs() < 1e-9);
        assert_eq!(hits[1].chunk.text, "northeast");
        assert!((hits[1].score - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn test_mismatch_rejected_before_write() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = open_store(&tmp);

        let err = store
            .add("a", &texts(&["one", "two"]), &[vec![1.0]])
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::ArgumentMismatch {
                chunks: 2,
                vectors: 1
            }
        ));

        let err = store
            .add("a", &texts(&["one", "two"]), &[vec![1.0], vec![]])
            .unwrap_err();
        assert!(matches!(err, StoreError::EmptyVector { index: 1 }));

        assert_eq!(store.size(), 0);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_non_finite_components_rejected() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = open_store(&tmp);
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let err = store
                .add("a", &texts(&["ok", "bad"]), &[vec![1.0, 0.0], vec![bad, 1.0]])
                .unwrap_err();
            assert!(matches!(err, StoreError::NonFiniteVector { index: 1 }));
        }
        assert_eq!(store.size(), 0);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_add_assigns_sequential_indices() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = open_store(&tmp);
        let added = store
            .add("notes.md", &texts(&["a", "b", "c"]), &[vec![1.0], vec![2.0], vec![3.0]])
            .unwrap();
        let indices: Vec<usize> = added.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_ne!(added[0].id, added[1].id);
        assert_eq!(store.sources().get("notes.md"), Some(&3));
        assert_eq!(store.dimensions(), Some(1));
    }

    #[test]
    fn test_empty_query_and_zero_k() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = open_store(&tmp);
        assert!(store.top_k(&[1.0], 3).is_empty());
        store.add("a", &texts(&["x"]), &[vec![1.0]]).unwrap();
        assert!(store.top_k(&[], 3).is_empty());
        assert!(store.top_k(&[1.0], 0).is_empty());
    }

    #[test]
    fn test_clear_then_search() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = open_store(&tmp);
        store.add("a", &texts(&["x", "y"]), &[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        store.clear().unwrap();
        assert_eq!(store.size(), 0);
        assert!(store.top_k(&[1.0, 0.0], 5).is_empty());
        assert!(!store.path().exists());

        // Writable again after a clear.
        store.add("b", &texts(&["z"]), &[vec![1.0, 1.0]]).unwrap();
        assert_eq!(store.size(), 1);
    }

    #[test]
    fn test_persisted_line_format() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = open_store(&tmp);
        store.add("p", &texts(&["hi"]), &[vec![0.5]]).unwrap();
        let text = fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(value["path"], "p");
        assert_eq!(value["chunkIndex"], 0);
        assert_eq!(value["text"], "hi");
        assert_eq!(value["vec"][0], 0.5);
        assert!(value["id"].is_string());
    }

    #[test]
    fn test_reload_skips_bad_lines() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("vectors.jsonl");
        let good = r#"{"id":"1","path":"p","chunkIndex":0,"text":"ok","vec":[1.0]}"#;
        let empty = r#"{"id":"2","path":"p","chunkIndex":1,"text":"empty","vec":[]}"#;
        let null = r#"{"id":"3","path":"p","chunkIndex":2,"text":"null","vec":null}"#;
        fs::write(&path, format!("{good}\nnot json\n{empty}\n{null}\n")).unwrap();

        let store = ChunkVectorStore::open_with(&path, false).unwrap();
        assert_eq!(store.size(), 1);
        assert_eq!(store.top_k(&[1.0], 5)[0].chunk.text, "ok");
    }
}
