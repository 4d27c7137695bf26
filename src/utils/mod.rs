use crate::models::WeeklyRow;
use std::time::{Duration, Instant};
use tracing::info;

/// A simple wall-clock timer for logging elapsed time.
pub struct Timer {
    label: String,
    start: Instant,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        let label = label.into();
        info!("⏱  Starting: {}", label);
        Self {
            label,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        info!(
            "⏱  Finished: {} (took {:.2?})",
            self.label,
            self.elapsed()
        );
    }
}

/// One-line summary of a row for log output.
pub fn row_preview(row: &WeeklyRow) -> String {
    format!(
        "{} | head {} | clearance {} | over reserve {} | ARLI {} | Δ {}/{}/{}/{}",
        row.sheep_index,
        row.total_head_inc_reoffers,
        row.clearance_rate_mm,
        row.amount_over_reserve,
        row.arli_ckg_dw,
        row.arl_change_sheep_index,
        row.total_head_change_sheep_index,
        row.clearance_rate_change_sheep_index,
        row.vor_change_sheep_index,
    )
}
