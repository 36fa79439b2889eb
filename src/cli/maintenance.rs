//! CLI `repair`, `purge` and `clear-vectors` commands.

use anyhow::Result;

use mnemos::config::MnemosConfig;

use super::{confirm, open_log, open_vectors, print_json};

/// Rebuild the record index from a full scan of the log.
pub fn repair(config: &MnemosConfig, json: bool) -> Result<()> {
    let log = open_log(config)?;
    let report = log.repair()?;
    log.close()?;

    if json {
        return print_json(&report);
    }
    println!("Repair complete.");
    println!("  Indexed before:      {}", report.previously_indexed);
    println!("  Indexed now:         {}", report.indexed);
    println!("  Unreadable lines:    {}", report.degraded_lines);
    println!("  Duplicate ids:       {}", report.duplicate_ids);
    if report.torn_tail {
        println!("  Log ended mid-line; the partial record was skipped.");
    }
    Ok(())
}

/// Delete every record after user confirmation.
pub fn purge(config: &MnemosConfig, yes: bool) -> Result<()> {
    let paths = config.log_paths();
    if !yes {
        confirm(
            &format!(
                "This will permanently delete ALL records in {}.",
                paths.log.display()
            ),
            "purge",
        )?;
    }

    let log = open_log(config)?;
    let removed = log.record_count();
    log.purge()?;
    log.close()?;

    println!("Purged {removed} record(s).");
    Ok(())
}

/// Delete every stored chunk after user confirmation.
pub fn clear_vectors(config: &MnemosConfig, yes: bool) -> Result<()> {
    let store = open_vectors(config)?;
    if !yes {
        confirm(
            &format!(
                "This will permanently delete ALL {} chunk(s) in {}.",
                store.size(),
                store.path().display()
            ),
            "clear-vectors",
        )?;
    }

    let removed = store.size();
    store.clear()?;
    println!("Cleared {removed} chunk(s).");
    Ok(())
}
