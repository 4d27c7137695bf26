//! Pipeline orchestrator: ties report source → parser → snapshot file together.
//!
//! ## Run
//!
//! `run()`: one scrape (cron use):
//!   1. Load the previous snapshot (missing is fine, corrupt is fatal)
//!   2. Fetch the rendered report text from the source
//!   3. Parse "Select Row" blocks → rows; zero rows is fatal
//!   4. Build the snapshot and write it only if the week rows changed
//!   Idempotent: re-running against an unchanged report writes nothing.
//!
//! `publish()`: steps 3–4 on text already in hand; `sheep-index parse` uses
//!   it to replay a text dump without a browser.

use crate::config::{AppConfig, PipelineConfig};
use crate::errors::ScrapeError;
use crate::loader::load_snapshot;
use crate::models::{MetricsSnapshot, WeeklyRow};
use crate::scraper::parsers::parse_rows;
use crate::scraper::ReportSource;
use crate::storage::{ensure_parent_dir, SnapshotStore, WriteOutcome};
use crate::utils::row_preview;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

pub struct Pipeline<S> {
    config: AppConfig,
    source: S,
}

impl<S: ReportSource> Pipeline<S> {
    pub fn new(config: AppConfig, source: S) -> Self {
        Self { config, source }
    }

    pub async fn run(&self) -> Result<RunOutcome> {
        let store = SnapshotStore::new(&self.config.storage.output_path);

        // ── 1. Previous snapshot ──────────────────────────────────────────────
        info!("=== Step 1: Loading previous snapshot ===");
        let previous = load_snapshot(store.path())?;

        // ── 2. Rendered report text ───────────────────────────────────────────
        info!("=== Step 2: Fetching report text ===");
        let text = self.source.fetch_report_text().await?;
        info!("Raw frame text:\n{}", text);

        if let Some(dump) = &self.config.pipeline.dump_raw_text {
            ensure_parent_dir(dump)?;
            std::fs::write(dump, &text)
                .with_context(|| format!("Failed to write text dump {:?}", dump))?;
            info!("Raw text dumped to {:?}", dump);
        }

        // ── 3/4. Parse, build, persist ────────────────────────────────────────
        publish(&self.config.pipeline, &store, &text, previous.as_ref(), Utc::now())
    }
}

/// Parse `text` into a snapshot stamped `now`.
pub fn build_snapshot(
    config: &PipelineConfig,
    text: &str,
    now: DateTime<Utc>,
) -> Result<(MetricsSnapshot, usize)> {
    info!("=== Step 3: Parsing rows ===");
    let rows: Vec<WeeklyRow> = parse_rows(text);

    if rows.is_empty() {
        return Err(ScrapeError::NoRows.into());
    }
    if let Some(msg) = row_count_warning(config.expected_rows, rows.len()) {
        warn!("{}", msg);
    }
    for (i, row) in rows.iter().enumerate() {
        info!("  Row {}: {}", i, row_preview(row));
    }

    let parsed = rows.len();
    Ok((MetricsSnapshot::from_rows(rows, now), parsed))
}

/// Non-fatal complaint about a row count other than `expected`.
pub fn row_count_warning(expected: usize, found: usize) -> Option<String> {
    (found != expected).then(|| {
        format!("Expected {} rows, found {}; continuing with what was parsed", expected, found)
    })
}

/// Parse, build and write-if-changed.
pub fn publish(
    config: &PipelineConfig,
    store: &SnapshotStore,
    text: &str,
    previous: Option<&MetricsSnapshot>,
    now: DateTime<Utc>,
) -> Result<RunOutcome> {
    let (snapshot, rows_parsed) = build_snapshot(config, text, now)?;

    info!("=== Step 4: Persisting snapshot ===");
    info!(
        "{}",
        serde_json::to_string_pretty(&snapshot).context("Failed to serialize snapshot")?
    );
    let write = store.write_if_changed(&snapshot, previous)?;

    Ok(RunOutcome {
        snapshot,
        rows_parsed,
        warning: row_count_warning(config.expected_rows, rows_parsed),
        write,
    })
}

#[derive(Debug)]
pub struct RunOutcome {
    pub snapshot: MetricsSnapshot,
    pub rows_parsed: usize,
    pub warning: Option<String>,
    pub write: WriteOutcome,
}
