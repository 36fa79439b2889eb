//! CLI `ingest`, `context` and `query` commands.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

use mnemos::config::MnemosConfig;
use mnemos::embedding::create_provider;
use mnemos::ingest::{collect_files, ingest_path, FileOutcome};
use mnemos::retrieval::ContextBuilder;

use super::{open_vectors, print_json};

/// Chunk, embed, and store a file or directory with a progress bar.
pub fn ingest(config: &MnemosConfig, path: &Path, json: bool) -> Result<()> {
    let store = open_vectors(config)?;
    let embedder = create_provider(&config.embedding)?;
    let total = collect_files(path)?.len();

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:40.cyan/blue} {pos}/{len} files ({eta}) {msg}")
            .context("invalid progress template")?
            .progress_chars("##-"),
    );

    let result = ingest_path(path, &store, embedder.as_ref(), &config.ingest, |file, outcome| {
        if let FileOutcome::Skipped { reason } = outcome {
            pb.println(format!("  skipped {}: {reason}", file.display()));
        }
        pb.set_message(file.display().to_string());
        pb.inc(1);
    });
    let report = match result {
        Ok(report) => report,
        Err(e) => {
            pb.abandon();
            return Err(e);
        }
    };
    pb.finish_and_clear();

    if json {
        return print_json(&report);
    }
    println!(
        "Ingested {} file(s), {} chunk(s); skipped {}.",
        report.files, report.chunks, report.skipped
    );
    Ok(())
}

/// Print the composed retrieval context for `query`.
pub fn context(config: &MnemosConfig, query: &str, k: Option<usize>, max_chars: Option<usize>) -> Result<()> {
    let store = open_vectors(config)?;
    let embedder = create_provider(&config.embedding)?;
    let builder = ContextBuilder::new(&store, embedder.as_ref());

    let text = builder.build_context(
        query,
        k.unwrap_or(config.retrieval.top_k),
        max_chars.unwrap_or(config.retrieval.max_chars),
    )?;
    print!("{text}");
    Ok(())
}

/// Print the raw top-K hits with their scores.
pub fn query(config: &MnemosConfig, query: &str, k: Option<usize>, json: bool) -> Result<()> {
    let store = open_vectors(config)?;
    let embedder = create_provider(&config.embedding)?;
    let hits = ContextBuilder::new(&store, embedder.as_ref())
        .retrieve(query, k.unwrap_or(config.retrieval.top_k))?;

    if json {
        return print_json(&hits);
    }
    if hits.is_empty() {
        println!("No results found.");
        return Ok(());
    }
    for (i, hit) in hits.iter().enumerate() {
        let preview = mnemos::memory::types::truncate_preview(&hit.chunk.text, 120);
        println!("  {}. {} (score: {:.4})", i + 1, hit.citation(), hit.score);
        println!("     {}", preview.replace('\n', " "));
    }
    Ok(())
}
