use crate::models::MetricsSnapshot;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

// ── Change detection ──────────────────────────────────────────────────────────

/// Canonical text used to decide whether the report changed: the four week
/// slots as compact JSON. `updatedAt` is left out, since every run stamps a
/// fresh one.
pub fn canonical_rows(snapshot: &MetricsSnapshot) -> Result<String> {
    serde_json::to_string(&snapshot.rows()).context("Failed to serialize snapshot rows")
}

pub fn has_changed(previous: Option<&MetricsSnapshot>, current: &MetricsSnapshot) -> Result<bool> {
    match previous {
        None => Ok(true),
        Some(prev) => Ok(canonical_rows(prev)? != canonical_rows(current)?),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written(PathBuf),
    Unchanged,
}

/// Create the parent directory of `path`, if it has one.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Could not create dir {:?}", parent))?;
    }
    Ok(())
}

// ── Store ─────────────────────────────────────────────────────────────────────

/// The snapshot file. Holds exactly one snapshot; each write replaces it.
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pretty-print `snapshot` to a sibling temp file, then rename it over the
    /// target so readers never see a half-written file.
    pub fn write(&self, snapshot: &MetricsSnapshot) -> Result<()> {
        ensure_parent_dir(&self.path)?;

        let json = serde_json::to_string_pretty(snapshot).context("Failed to serialize snapshot")?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, json + "\n").with_context(|| format!("Failed to write {:?}", tmp))?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e).with_context(|| format!("Failed to replace {:?}", self.path));
        }
        Ok(())
    }

    /// Write only when the week rows differ from `previous`.
    pub fn write_if_changed(
        &self,
        current: &MetricsSnapshot,
        previous: Option<&MetricsSnapshot>,
    ) -> Result<WriteOutcome> {
        if !has_changed(previous, current)? {
            if let Some(prev) = previous {
                info!("Report unchanged since {}; skipping write", prev.updated_at);
            }
            return Ok(WriteOutcome::Unchanged);
        }

        self.write(current)?;
        info!("Snapshot written to {:?}", self.path);
        Ok(WriteOutcome::Written(self.path.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_snapshot;
    use crate::models::WeeklyRow;
    use chrono::{Duration, Utc};

    fn rows(head: &str) -> Vec<WeeklyRow> {
        ["W4", "W3", "W2", "W1"]
            .iter()
            .map(|w| WeeklyRow {
                sheep_index: w.to_string(),
                total_head_inc_reoffers: head.to_string(),
                clearance_rate_mm: "85".into(),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_timestamp_alone_is_not_a_change() {
        let a = MetricsSnapshot::from_rows(rows("1500"), Utc::now());
        let b = MetricsSnapshot::from_rows(rows("1500"), Utc::now() + Duration::hours(6));
        assert!(!has_changed(Some(&a), &b).unwrap());
    }

    #[test]
    fn test_row_value_change_detected() {
        let a = MetricsSnapshot::from_rows(rows("1500"), Utc::now());
        let b = MetricsSnapshot::from_rows(rows("1501"), Utc::now());
        assert!(has_changed(Some(&a), &b).unwrap());
        assert!(has_changed(None, &b).unwrap());
    }

    #[test]
    fn test_lost_slot_is_a_change() {
        let mut fewer = rows("1500");
        fewer.pop();
        let a = MetricsSnapshot::from_rows(rows("1500"), Utc::now());
        let b = MetricsSnapshot::from_rows(fewer, Utc::now());
        assert!(has_changed(Some(&a), &b).unwrap());
    }

    #[test]
    fn test_write_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("nested/out.json"));
        let snap = MetricsSnapshot::from_rows(rows("1500"), Utc::now());

        store.write(&snap).unwrap();
        assert_eq!(load_snapshot(store.path()).unwrap(), Some(snap));
        assert!(!dir.path().join("nested/out.json.tmp").exists());
    }

    #[test]
    fn test_write_if_changed_skips_identical_rows() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("out.json"));
        let first = MetricsSnapshot::from_rows(rows("1500"), Utc::now());

        assert_eq!(
            store.write_if_changed(&first, None).unwrap(),
            WriteOutcome::Written(store.path().to_path_buf())
        );

        let second = MetricsSnapshot::from_rows(rows("1500"), Utc::now() + Duration::days(1));
        assert_eq!(
            store.write_if_changed(&second, Some(&first)).unwrap(),
            WriteOutcome::Unchanged
        );
        // File still carries the first timestamp.
        assert_eq!(load_snapshot(store.path()).unwrap().unwrap().updated_at, first.updated_at);
    }

    #[test]
    fn test_write_replaces_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("out.json"));
        let first = MetricsSnapshot::from_rows(rows("1500"), Utc::now());
        let second = MetricsSnapshot::from_rows(rows("900"), Utc::now());

        store.write(&first).unwrap();
        store.write_if_changed(&second, Some(&first)).unwrap();

        let stored = load_snapshot(store.path()).unwrap().unwrap();
        assert_eq!(stored, second);
    }

    #[test]
    fn test_failed_replace_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.json");
        // A non-empty directory where the file should go makes the rename fail.
        std::fs::create_dir_all(target.join("occupied")).unwrap();
        let store = SnapshotStore::new(&target);

        let snap = MetricsSnapshot::from_rows(rows("1500"), Utc::now());
        assert!(store.write(&snap).is_err());
        assert!(!dir.path().join("out.json.tmp").exists());
        assert!(target.is_dir());
    }

    #[test]
    fn test_ensure_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/raw.txt");
        ensure_parent_dir(&path).unwrap();
        assert!(dir.path().join("a/b").is_dir());

        ensure_parent_dir(Path::new("bare.txt")).unwrap();
    }
}
