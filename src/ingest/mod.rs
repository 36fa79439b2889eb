//! Document ingestion into the chunk vector store.
//!
//! Read, cleanse, chunk, one embedding batch and one `add` per file. A file either
//! lands in the store completely or not at all.

pub mod chunk;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use walkdir::WalkDir;

pub use chunk::{chunk, cleanse};

use crate::config::IngestConfig;
use crate::embedding::EmbeddingProvider;
use crate::vector::ChunkVectorStore;

/// Totals for one ingestion run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub files: usize,
    pub chunks: usize,
    pub skipped: usize,
}

/// What happened to a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Ingested { chunks: usize },
    Skipped { reason: String },
}

/// Embed and store one file.
///
/// Non-UTF-8 files and files that cleanse to nothing are skipped, not errors.
pub fn ingest_file(
    path: &Path,
    store: &ChunkVectorStore,
    embedder: &dyn EmbeddingProvider,
    config: &IngestConfig,
) -> Result<FileOutcome> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let Ok(raw) = String::from_utf8(bytes) else {
        tracing::warn!(path = %path.display(), "skipping non-UTF-8 file");
        return Ok(FileOutcome::Skipped {
            reason: "not valid UTF-8".into(),
        });
    };

    let pieces = chunk(&cleanse(&raw), config.chunk_size, config.chunk_overlap);
    if pieces.is_empty() {
        return Ok(FileOutcome::Skipped {
            reason: "no text after cleansing".into(),
        });
    }

    let refs: Vec<&str> = pieces.iter().map(String::as_str).collect();
    let vectors = embedder
        .embed_batch(&refs)
        .with_context(|| format!("failed to embed {}", path.display()))?;
    anyhow::ensure!(
        vectors.len() == pieces.len(),
        "embedder returned {} vectors for {} chunks of {}",
        vectors.len(),
        pieces.len(),
        path.display()
    );

    let source = path.display().to_string();
    let added = store
        .add(&source, &pieces, &vectors)
        .with_context(|| format!("failed to store chunks for {source}"))?;
    tracing::info!(path = %source, chunks = added.len(), "file ingested");
    Ok(FileOutcome::Ingested {
        chunks: added.len(),
    })
}

/// Every regular file under `root` (or `root` itself), sorted, skipping hidden
/// entries below the root.
pub fn collect_files(root: &Path) -> Result<Vec<PathBuf>> {
    anyhow::ensure!(root.exists(), "path not found: {}", root.display());
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));
    for entry in walker {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|s| s.starts_with('.'))
}

/// Ingest a file or a directory tree. `on_file` is called after each file.
pub fn ingest_path(
    root: &Path,
    store: &ChunkVectorStore,
    embedder: &dyn EmbeddingProvider,
    config: &IngestConfig,
    mut on_file: impl FnMut(&Path, &FileOutcome),
) -> Result<IngestReport> {
    let mut report = IngestReport::default();
    for file in collect_files(root)? {
        let outcome = ingest_file(&file, store, embedder, config)?;
        match &outcome {
            FileOutcome::Ingested { chunks } => {
                report.files += 1;
                report.chunks += chunks;
            }
            FileOutcome::Skipped { .. } => report.skipped += 1,
        }
        on_file(&file, &outcome);
    }
    tracing::info!(
        root = %root.display(),
        files = report.files,
        chunks = report.chunks,
        skipped = report.skipped,
        "ingestion complete"
    );
    Ok(report)
}
