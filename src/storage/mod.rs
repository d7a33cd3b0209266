//! Persistence layer.
//!
//! Saves and loads the escrow event journal to/from a JSON file. The
//! journal is the only durable record of settled and cancelled matches
//! (the Match objects themselves are destroyed), so the service persists
//! it on shutdown and restores it on startup.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};

use crate::events::RecordedEvent;

/// Default journal file path.
const DEFAULT_JOURNAL_FILE: &str = "arena_journal.json";

/// Save the event journal to a JSON file.
pub fn save_journal(entries: &[RecordedEvent], path: Option<&str>) -> Result<()> {
    let path = path.unwrap_or(DEFAULT_JOURNAL_FILE);
    let json = serde_json::to_string_pretty(entries)
        .context("Failed to serialise event journal")?;

    std::fs::write(path, &json)
        .context(format!("Failed to write journal to {path}"))?;

    debug!(path, entries = entries.len(), "Journal saved");
    Ok(())
}

/// Load the event journal from a JSON file.
/// Returns an empty journal if the file doesn't exist (fresh start).
pub fn load_journal(path: Option<&str>) -> Result<Vec<RecordedEvent>> {
    let path = path.unwrap_or(DEFAULT_JOURNAL_FILE);

    if !Path::new(path).exists() {
        info!(path, "No saved journal found, starting fresh");
        return Ok(Vec::new());
    }

    let json = std::fs::read_to_string(path)
        .context(format!("Failed to read journal from {path}"))?;

    let entries: Vec<RecordedEvent> = serde_json::from_str(&json)
        .context(format!("Failed to parse journal from {path}"))?;

    info!(path, entries = entries.len(), "Journal loaded from disk");
    Ok(entries)
}

/// Delete the journal file (for testing or reset).
pub fn delete_journal(path: Option<&str>) -> Result<()> {
    let path = path.unwrap_or(DEFAULT_JOURNAL_FILE);
    if Path::new(path).exists() {
        std::fs::remove_file(path)
            .context(format!("Failed to delete journal file {path}"))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
