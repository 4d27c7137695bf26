use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Weekly row ────────────────────────────────────────────────────────────────

/// One table row of the sheep index report.
///
/// Every field except `sheep_index` holds the cell text reduced to ASCII digits
/// and `-`. Values are kept as strings: "0012" and "--5" survive untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyRow {
    pub sheep_index: String,
    pub total_head_inc_reoffers: String,
    pub clearance_rate_mm: String,
    pub amount_over_reserve: String,
    pub arli_ckg_dw: String,
    pub arl_change_sheep_index: String,
    pub total_head_change_sheep_index: String,
    pub clearance_rate_change_sheep_index: String,
    pub vor_change_sheep_index: String,
}

// ── Snapshot ──────────────────────────────────────────────────────────────────

/// The single persisted result of one scrape run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub updated_at: DateTime<Utc>,
    pub this_week: Option<WeeklyRow>,
    pub last_week: Option<WeeklyRow>,
    pub two_weeks_ago: Option<WeeklyRow>,
    pub three_weeks_ago: Option<WeeklyRow>,
}

/// Borrowed view of the four week slots, without the timestamp.
/// Used as the canonical form for change detection.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRows<'a> {
    pub this_week: Option<&'a WeeklyRow>,
    pub last_week: Option<&'a WeeklyRow>,
    pub two_weeks_ago: Option<&'a WeeklyRow>,
    pub three_weeks_ago: Option<&'a WeeklyRow>,
}

impl MetricsSnapshot {
    /// Assign rows to slots strictly by parse order. Rows past the fourth are
    /// ignored; missing rows leave trailing slots empty.
    pub fn from_rows(rows: Vec<WeeklyRow>, updated_at: DateTime<Utc>) -> Self {
        let mut rows = rows.into_iter();
        Self {
            updated_at,
            this_week: rows.next(),
            last_week: rows.next(),
            two_weeks_ago: rows.next(),
            three_weeks_ago: rows.next(),
        }
    }

    pub fn rows(&self) -> SnapshotRows<'_> {
        SnapshotRows {
            this_week: self.this_week.as_ref(),
            last_week: self.last_week.as_ref(),
            two_weeks_ago: self.two_weeks_ago.as_ref(),
            three_weeks_ago: self.three_weeks_ago.as_ref(),
        }
    }

    /// Slots paired with their labels, in display order.
    pub fn slots(&self) -> [(&'static str, Option<&WeeklyRow>); 4] {
        [
            ("This week", self.this_week.as_ref()),
            ("Last week", self.last_week.as_ref()),
            ("Two weeks ago", self.two_weeks_ago.as_ref()),
            ("Three weeks ago", self.three_weeks_ago.as_ref()),
        ]
    }

    pub fn filled_slots(&self) -> usize {
        self.slots().iter().filter(|(_, r)| r.is_some()).count()
    }
}
