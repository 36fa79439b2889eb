use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;

use mnemos::config::MnemosConfig;
use mnemos::memory::{log_stats, LogStats};

use super::{format_bytes, open_log, open_vectors, print_json};

#[derive(Serialize)]
struct StatsReport {
    records: LogStats,
    chunks: usize,
    dimensions: Option<usize>,
    sources: BTreeMap<String, usize>,
}

/// Display record log and vector store statistics in the terminal.
pub fn stats(config: &MnemosConfig, json: bool) -> Result<()> {
    let records = log_stats(&open_log(config)?);
    let vectors = open_vectors(config)?;
    let report = StatsReport {
        records,
        chunks: vectors.size(),
        dimensions: vectors.dimensions(),
        sources: vectors.sources(),
    };

    if json {
        return print_json(&report);
    }

    let r = &report.records;
    println!("Memory Statistics");
    println!("{}", "=".repeat(40));
    println!("  Records:             {}", r.records);
    println!("  Records ever:        {}", r.total_records_ever);
    println!("  Average relevance:   {:.4}", r.average_relevance);
    println!("  Log size:            {}", format_bytes(r.log_bytes));
    println!("  Index size:          {}", format_bytes(r.index_bytes));
    if let Some(ref oldest) = r.oldest_record {
        println!("  Oldest record:       {oldest}");
    }
    if let Some(ref newest) = r.newest_record {
        println!("  Newest record:       {newest}");
    }
    println!();

    println!("By Category:");
    if r.categories.is_empty() {
        println!("  (none)");
    }
    for (category, count) in &r.categories {
        println!("  {category:<12} {count}");
    }
    println!();

    println!("Vector Store:");
    println!("  Chunks:              {}", report.chunks);
    match report.dimensions {
        Some(d) => println!("  Dimensions:          {d}"),
        None => println!("  Dimensions:          (empty)"),
    }
    println!("  Sources:             {}", report.sources.len());

    Ok(())
}
