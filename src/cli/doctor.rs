//! CLI `doctor` command — check both stores and print a health report.

use anyhow::Result;

use mnemos::config::MnemosConfig;

use super::{format_bytes, open_log, open_vectors};

/// Re-read every record, check its hash, and summarize the vector store.
pub fn doctor(config: &MnemosConfig) -> Result<()> {
    let paths = config.log_paths();
    let vector_path = config.vector_path();

    if !paths.log.exists() && !vector_path.exists() {
        println!("Data directory: nothing stored yet in {}", config.resolved_data_dir().display());
        println!("Run `mnemos remember` or `mnemos ingest` to initialize.");
        return Ok(());
    }

    let file_len = |p: &std::path::Path| std::fs::metadata(p).map(|m| m.len()).unwrap_or(0);

    let log = open_log(config)?;
    let report = log.verify();
    let vectors = open_vectors(config)?;

    println!("Mnemos Health Report");
    println!("====================");
    println!();
    println!("Record log:        {}", paths.log.display());
    println!("  File size:       {}", format_bytes(file_len(&paths.log)));
    println!("Index sidecar:     {}", paths.index.display());
    if paths.index.exists() {
        println!("  File size:       {}", format_bytes(file_len(&paths.index)));
    } else {
        println!("  Status:          MISSING (run `mnemos repair`)");
    }
    println!();
    println!("Records:");
    println!("  Checked:         {}", report.checked);
    println!("  Healthy:         {}", report.healthy);
    println!("  Unreadable:      {}", report.degraded.len());
    println!("  Hash mismatch:   {}", report.hash_mismatches.len());
    for id in report.degraded.iter().chain(&report.hash_mismatches) {
        println!("    - {id}");
    }
    println!();
    println!("Vector store:      {}", vector_path.display());
    println!("  Chunks:          {}", vectors.size());
    match vectors.dimensions() {
        Some(d) => println!("  Dimensions:      {d}"),
        None => println!("  Dimensions:      (empty)"),
    }
    if let (Some(stored), Some(configured)) = (vectors.dimensions(), configured_dimensions(config)) {
        if stored != configured {
            println!(
                "  WARNING: stored vectors have {stored} dimensions but the configured embedder produces {configured}."
            );
        }
    }
    println!();
    println!("Embedding:");
    println!("  Provider:        {}", config.embedding.provider);
    println!("  Model:           {}", config.embedding.model);
    println!();
    if report.is_healthy() {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED");
        println!();
        println!("Recovery steps:");
        println!("  1. Run `mnemos repair` to rebuild the index from the log.");
        println!("  2. Unreadable records are skipped by every query; restore the log from a backup to recover them.");
    }

    Ok(())
}

fn configured_dimensions(config: &MnemosConfig) -> Option<usize> {
    (config.embedding.provider == "hash").then_some(config.embedding.hash_dim)
}
