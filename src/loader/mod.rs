//! Reads persisted state: the previous snapshot and raw text dumps.

use crate::errors::ScrapeError;
use crate::models::MetricsSnapshot;
use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info};

/// Load the previous snapshot. A missing file is not an error; a file that
/// does not parse is.
pub fn load_snapshot(path: &Path) -> Result<Option<MetricsSnapshot>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("No previous snapshot at {:?}", path);
            return Ok(None);
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read snapshot {:?}", path));
        }
    };

    let snapshot: MetricsSnapshot =
        serde_json::from_str(&raw).map_err(|source| ScrapeError::CorruptSnapshot {
            path: path.to_path_buf(),
            source,
        })?;

    debug!(
        "Loaded snapshot from {:?} (updated {}, {} rows)",
        path,
        snapshot.updated_at,
        snapshot.filled_slots()
    );
    Ok(Some(snapshot))
}

/// Read a text dump written by a previous `run` with `dump_raw_text` set.
pub fn load_text_dump(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read text dump {:?}", path))
}
