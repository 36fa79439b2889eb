pub mod doctor;
pub mod maintenance;
pub mod records;
pub mod stats;
pub mod vectors;

use anyhow::{bail, Context, Result};
use std::io::Write;

use mnemos::config::MnemosConfig;
use mnemos::memory::RecordLog;
use mnemos::vector::ChunkVectorStore;

/// Open the record log described by `config`.
pub fn open_log(config: &MnemosConfig) -> Result<RecordLog> {
    let paths = config.log_paths();
    RecordLog::open(paths.clone(), config.log_options())
        .with_context(|| format!("failed to open record log at {}", paths.log.display()))
}

/// Open the chunk vector store described by `config`.
pub fn open_vectors(config: &MnemosConfig) -> Result<ChunkVectorStore> {
    let path = config.vector_path();
    ChunkVectorStore::open_with(&path, config.storage.sync_writes)
        .with_context(|| format!("failed to open vector store at {}", path.display()))
}

/// Print `warning`, then require the user to type YES.
pub fn confirm(warning: &str, what: &str) -> Result<()> {
    println!("WARNING: {warning}");
    print!("\nType YES to confirm: ");
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;

    if input.trim() != "YES" {
        bail!("{what} cancelled");
    }
    Ok(())
}

/// Print `value` as pretty JSON.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
