//! CLI record commands: `remember`, `get`, `recent`, `category`, `entity`,
//! `search`, `score-range`.

use anyhow::{bail, Result};
use std::collections::BTreeMap;

use mnemos::config::MnemosConfig;
use mnemos::memory::stats::format_timestamp;
use mnemos::memory::MemoryRecord;

use super::{open_log, print_json};

const PREVIEW_CHARS: usize = 120;

/// Parse `key=value` pairs from the command line.
pub fn parse_metadata(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    let mut metadata = BTreeMap::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("metadata must be key=value, got {pair:?}");
        };
        metadata.insert(key.trim().to_string(), value.to_string());
    }
    Ok(metadata)
}

pub fn remember(
    config: &MnemosConfig,
    category: &str,
    content: &str,
    score: f64,
    entity: Option<&str>,
    metadata: &[String],
    json: bool,
) -> Result<()> {
    let metadata = parse_metadata(metadata)?;
    let log = open_log(config)?;
    let record = log.store(category, content, score, entity, Some(metadata))?;
    log.close()?;

    if json {
        return print_json(&record);
    }
    println!("Stored {} ({})", record.id, record.category);
    Ok(())
}

pub fn get(config: &MnemosConfig, id: &str, json: bool) -> Result<()> {
    let log = open_log(config)?;
    let Some(record) = log.get(id)? else {
        bail!("no record with id {id}");
    };

    if json {
        return print_json(&record);
    }
    println!("Record: {}", record.id);
    println!("{}", "=".repeat(50));
    println!("  Category:       {}", record.category);
    println!("  Timestamp:      {}", format_timestamp(record.timestamp));
    println!("  Relevance:      {}", record.relevance_score);
    if let Some(ref entity) = record.entity_name {
        println!("  Entity:         {entity}");
    }
    println!("  Hash:           {}", record.content_hash);
    for (key, value) in &record.metadata {
        println!("  {key:<15} {value}");
    }
    println!();
    println!("Content:");
    println!("  {}", record.content);
    Ok(())
}

pub fn recent(config: &MnemosConfig, n: usize, json: bool) -> Result<()> {
    let records = open_log(config)?.get_recent(n);
    print_records(&records, json)
}

pub fn category(config: &MnemosConfig, category: &str, json: bool) -> Result<()> {
    let records = open_log(config)?.get_by_category(category);
    print_records(&records, json)
}

pub fn entity(config: &MnemosConfig, entity: &str, json: bool) -> Result<()> {
    let records = open_log(config)?.get_by_entity(entity);
    print_records(&records, json)
}

pub fn search(config: &MnemosConfig, query: &str, json: bool) -> Result<()> {
    let records = open_log(config)?.search(query);
    print_records(&records, json)
}

pub fn score_range(config: &MnemosConfig, min: f64, max: f64, json: bool) -> Result<()> {
    if min > max {
        bail!("min ({min}) is greater than max ({max})");
    }
    let records = open_log(config)?.get_by_score_range(min, max);
    print_records(&records, json)
}

fn print_records(records: &[MemoryRecord], json: bool) -> Result<()> {
    if json {
        return print_json(&records);
    }
    if records.is_empty() {
        println!("No records found.");
        return Ok(());
    }
    println!("Found {} record(s)\n", records.len());
    for (i, record) in records.iter().enumerate() {
        println!("  {}. {}", i + 1, record.preview(PREVIEW_CHARS));
    }
    Ok(())
}
