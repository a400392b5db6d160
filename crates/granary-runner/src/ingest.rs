//! Change-event batch ingestion.
//!
//! The wire decoder collaborator delivers already-validated batches as
//! NDJSON: one change event per line. Decoding failures abort the read —
//! a malformed line means the producer contract is broken, not a condition
//! to skip past.

use anyhow::{Context, Result};
use granary_core::ChangeEvent;
use std::path::Path;
use tokio::fs;
use tracing::info;

/// Read a change-event batch from an NDJSON file.
pub async fn read_events(path: impl AsRef<Path>) -> Result<Vec<ChangeEvent>> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("reading event batch {}", path.display()))?;

    let mut events = Vec::new();
    for (lineno, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let event: ChangeEvent =
            serde_json::from_str(line).with_context(|| {
                format!(
                    "parsing change event at {}:{}",
                    path.display(),
                    lineno + 1
                )
            })?;
        events.push(event);
    }

    info!(events = events.len(), file = %path.display(), "event batch read");
    Ok(events)
}
