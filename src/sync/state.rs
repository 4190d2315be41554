//! Client sync state.
//!
//! One explicit container owns the dirty-date set and the displayed status;
//! every change goes through a named transition, so the status can never
//! disagree with the dirty set. Dates edited while a sync is in flight stay
//! dirty after that sync completes, because completion only clears the dates
//! the server confirmed.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Displayed sync status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// No sync attempted yet this session.
    #[default]
    Unknown,
    /// Last sync succeeded and nothing is pending.
    Green,
    /// Last sync failed.
    Red,
    /// Local changes are waiting to be uploaded.
    Gray,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncStatus::Unknown => "unknown",
            SyncStatus::Green => "synced",
            SyncStatus::Red => "sync failed",
            SyncStatus::Gray => "pending changes",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncState {
    status: SyncStatus,
    dirty: BTreeSet<NaiveDate>,
    last_success: Option<DateTime<Utc>>,
    #[serde(skip)]
    in_flight: bool,
}

impl SyncState {
    pub fn status(&self) -> SyncStatus {
        self.status
    }

    pub fn dirty_dates(&self) -> &BTreeSet<NaiveDate> {
        &self.dirty
    }

    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        self.last_success
    }

    pub fn is_syncing(&self) -> bool {
        self.in_flight
    }

    /// Records a local edit to `date`.
    pub fn apply_local_edit(&mut self, date: NaiveDate) {
        self.dirty.insert(date);
        self.status = SyncStatus::Gray;
    }

    /// Starts a sync cycle, returning the snapshot of dates to upload.
    /// Edits that land after this snapshot belong to the next cycle.
    pub fn begin_sync(&mut self) -> BTreeSet<NaiveDate> {
        self.in_flight = true;
        self.dirty.clone()
    }

    /// Finishes a cycle, clearing only the dates the server confirmed.
    pub fn complete_sync(&mut self, applied: &[NaiveDate], now: DateTime<Utc>) {
        for date in applied {
            self.dirty.remove(date);
        }
        self.in_flight = false;
        self.last_success = Some(now);
        self.status = if self.dirty.is_empty() {
            SyncStatus::Green
        } else {
            SyncStatus::Gray
        };
    }

    /// Records a failed cycle. The dirty set is untouched so every pending
    /// date is retried next time.
    pub fn fail_sync(&mut self) {
        self.in_flight = false;
        self.status = SyncStatus::Red;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn t(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn test_starts_unknown() {
        let state = SyncState::default();
        assert_eq!(state.status(), SyncStatus::Unknown);
        assert!(state.dirty_dates().is_empty());
    }

    #[test]
    fn test_edit_then_successful_sync() {
        let mut state = SyncState::default();
        state.apply_local_edit(d("2026-03-02"));
        assert_eq!(state.status(), SyncStatus::Gray);

        let snapshot = state.begin_sync();
        assert_eq!(snapshot.len(), 1);
        state.complete_sync(&[d("2026-03-02")], t("2026-03-02T10:00:00Z"));

        assert_eq!(state.status(), SyncStatus::Green);
        assert!(state.dirty_dates().is_empty());
        assert_eq!(state.last_success(), Some(t("2026-03-02T10:00:00Z")));
    }

    #[test]
    fn test_failure_keeps_dirty_set() {
        let mut state = SyncState::default();
        state.apply_local_edit(d("2026-03-02"));
        state.apply_local_edit(d("2026-03-03"));

        state.begin_sync();
        state.fail_sync();

        assert_eq!(state.status(), SyncStatus::Red);
        assert_eq!(state.dirty_dates().len(), 2);
    }

    #[test]
    fn test_edit_after_failure_shows_pending() {
        let mut state = SyncState::default();
        state.apply_local_edit(d("2026-03-02"));
        state.begin_sync();
        state.fail_sync();

        state.apply_local_edit(d("2026-03-03"));
        assert_eq!(state.status(), SyncStatus::Gray);
    }

    #[test]
    fn test_mid_flight_edit_stays_dirty() {
        let mut state = SyncState::default();
        state.apply_local_edit(d("2026-03-02"));

        let snapshot = state.begin_sync();
        assert!(state.is_syncing());
        // Edit lands while the upload is in flight.
        state.apply_local_edit(d("2026-03-03"));

        let applied: Vec<_> = snapshot.into_iter().collect();
        state.complete_sync(&applied, t("2026-03-02T10:00:00Z"));

        assert_eq!(state.status(), SyncStatus::Gray);
        assert_eq!(state.dirty_dates().iter().copied().collect::<Vec<_>>(), vec![d("2026-03-03")]);
    }

    #[test]
    fn test_partial_server_acceptance_keeps_rejected_dates() {
        let mut state = SyncState::default();
        state.apply_local_edit(d("2026-03-02"));
        state.apply_local_edit(d("2026-03-03"));

        state.begin_sync();
        // Server only confirmed one of the two dates.
        state.complete_sync(&[d("2026-03-02")], t("2026-03-02T10:00:00Z"));

        assert_eq!(state.status(), SyncStatus::Gray);
        assert!(state.dirty_dates().contains(&d("2026-03-03")));
    }

    #[test]
    fn test_state_survives_serialization() {
        let mut state = SyncState::default();
        state.apply_local_edit(d("2026-03-02"));
        state.begin_sync();

        let json = serde_json::to_string(&state).unwrap();
        let restored: SyncState = serde_json::from_str(&json).unwrap();

        // in_flight is transient and resets on load.
        assert!(!restored.is_syncing());
        assert_eq!(restored.status(), SyncStatus::Gray);
        assert_eq!(restored.dirty_dates().len(), 1);
    }
}
