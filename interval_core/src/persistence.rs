//! Typed records on top of a key-value store.
//!
//! Two records exist: the in-progress session snapshot and the workout
//! history. Every operation returns a `Result`; callers decide whether a
//! failure matters (for this app it never does beyond logging).

use crate::store::KeyValueStore;
use crate::types::{
    HistoryEntry, Phase, SessionSnapshot, TimingConfig, MAX_HISTORY_ENTRIES,
};
use crate::{Error, Result};

/// Key of the session snapshot record
pub const SESSION_KEY: &str = "session";

/// Key of the history record
pub const HISTORY_KEY: &str = "history";

/// Session and history records backed by a store
#[derive(Debug)]
pub struct Persistence<S: KeyValueStore> {
    store: S,
    timing: TimingConfig,
}

impl<S: KeyValueStore> Persistence<S> {
    pub fn new(store: S, timing: TimingConfig) -> Self {
        Self { store, timing }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    // ── Session snapshot ─────────────────────────────────────────────

    /// Load the session snapshot
    ///
    /// `Ok(None)` when there is no session. A record that does not parse or
    /// fails validation is an `InvalidSnapshot` error; see
    /// [`Persistence::load_session_or_discard`].
    pub fn load_session(&self) -> Result<Option<SessionSnapshot>> {
        let Some(raw) = self.store.get(SESSION_KEY)? else {
            return Ok(None);
        };
        let snapshot: SessionSnapshot = serde_json::from_str(&raw)
            .map_err(|e| Error::InvalidSnapshot(format!("unreadable record: {}", e)))?;
        validate_snapshot(&snapshot, &self.timing).map_err(Error::InvalidSnapshot)?;
        Ok(Some(snapshot))
    }

    /// Load the session snapshot, deleting it if it is invalid
    ///
    /// Storage failures and invalid records both come back as `None`, which
    /// puts the app in configuration mode.
    pub fn load_session_or_discard(&mut self) -> Option<SessionSnapshot> {
        match self.load_session() {
            Ok(snapshot) => snapshot,
            Err(Error::InvalidSnapshot(reason)) => {
                tracing::warn!("Discarding stored session: {}", reason);
                if let Err(e) = self.clear_session() {
                    tracing::warn!("Failed to remove invalid session: {}", e);
                }
                None
            }
            Err(e) => {
                tracing::warn!("Failed to read stored session: {}. Starting fresh.", e);
                None
            }
        }
    }

    pub fn save_session(&mut self, snapshot: &SessionSnapshot) -> Result<()> {
        // Compact JSON; the record is rewritten on every phase change
        let contents = serde_json::to_string(snapshot)?;
        self.store.set(SESSION_KEY, &contents)?;
        tracing::debug!("Saved session snapshot");
        Ok(())
    }

    pub fn clear_session(&mut self) -> Result<()> {
        self.store.remove(SESSION_KEY)
    }

    // ── History ──────────────────────────────────────────────────────

    /// Load history, newest first
    ///
    /// Entries that fail to parse are skipped with a warning; a record that
    /// is not a JSON array at all is an error.
    pub fn load_history(&self) -> Result<Vec<HistoryEntry>> {
        let Some(raw) = self.store.get(HISTORY_KEY)? else {
            return Ok(Vec::new());
        };
        let values: Vec<serde_json::Value> = serde_json::from_str(&raw)?;

        let mut entries = Vec::with_capacity(values.len());
        for (idx, value) in values.into_iter().enumerate() {
            match serde_json::from_value::<HistoryEntry>(value) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!("Failed to parse history entry {}: {}", idx, e);
                    // Continue reading, don't fail completely
                }
            }
        }
        entries.truncate(MAX_HISTORY_ENTRIES);
        tracing::debug!("Loaded {} history entries", entries.len());
        Ok(entries)
    }

    /// Replace history, keeping at most the newest `MAX_HISTORY_ENTRIES`
    pub fn save_history(&mut self, entries: &[HistoryEntry]) -> Result<()> {
        let kept = &entries[..entries.len().min(MAX_HISTORY_ENTRIES)];
        let contents = serde_json::to_string(kept)?;
        self.store.set(HISTORY_KEY, &contents)?;
        tracing::debug!("Saved {} history entries", kept.len());
        Ok(())
    }

    pub fn clear_history(&mut self) -> Result<()> {
        self.save_history(&[])
    }
}

/// Check a snapshot against the data-model invariants
pub fn validate_snapshot(
    snapshot: &SessionSnapshot,
    timing: &TimingConfig,
) -> std::result::Result<(), String> {
    let config = &snapshot.config;
    let live = &snapshot.live;

    config.validate()?;

    let longest = timing
        .prep_seconds
        .max(config.work_seconds)
        .max(config.rest_seconds);
    if live.remaining_seconds > longest {
        return Err(format!(
            "remaining_seconds {} exceeds longest phase {}",
            live.remaining_seconds, longest
        ));
    }
    if live.sets_remaining > config.total_sets {
        return Err(format!(
            "sets_remaining {} exceeds total_sets {}",
            live.sets_remaining, config.total_sets
        ));
    }
    // Rest follows a finished work phase; work and prep follow a finished rest
    let expected_work = match live.phase {
        Phase::Rest => live.rest_phases_completed + 1,
        Phase::Work | Phase::Prep => live.rest_phases_completed,
    };
    if live.work_phases_completed != expected_work {
        return Err(format!(
            "inconsistent counters in {:?}: {} work / {} rest",
            live.phase, live.work_phases_completed, live.rest_phases_completed
        ));
    }
    if live.phase == Phase::Prep && (live.work_phases_completed > 0 || !live.in_progress) {
        return Err("prep phase outside the start of a workout".into());
    }
    if live.running != live.phase_end_ms.is_some() {
        return Err("deadline must be present exactly while running".into());
    }
    if live.running && !live.in_progress {
        return Err("running without a workout in progress".into());
    }
    if live.in_progress && live.sets_remaining == 0 {
        return Err("in progress with no sets remaining".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FileStore, MemoryStore};
    use crate::types::{LiveState, WorkoutConfig};
    use chrono::Utc;
    use uuid::Uuid;

    fn running_snapshot() -> SessionSnapshot {
        let config = WorkoutConfig::default();
        let mut live = LiveState::idle(&config);
        live.running = true;
        live.in_progress = true;
        live.phase_end_ms = Some(1_700_000_030_000);
        SessionSnapshot { config, live }
    }

    fn entry(work: u32) -> HistoryEntry {
        HistoryEntry {
            id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            work_seconds: work,
            rest_seconds: 60,
            completed_work: 3,
            completed_rest: 3,
            total_sets: 3,
            full: true,
            preset_label: None,
        }
    }

    #[test]
    fn test_session_roundtrip_on_disk() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut persistence =
            Persistence::new(FileStore::new(temp_dir.path()), TimingConfig::default());

        let snapshot = running_snapshot();
        persistence.save_session(&snapshot).unwrap();
        assert_eq!(persistence.load_session().unwrap(), Some(snapshot));

        persistence.clear_session().unwrap();
        assert_eq!(persistence.load_session().unwrap(), None);
    }

    #[test]
    fn test_unknown_phase_is_discarded() {
        let mut persistence = Persistence::new(MemoryStore::new(), TimingConfig::default());
        let mut value = serde_json::to_value(running_snapshot()).unwrap();
        value["live"]["phase"] = serde_json::json!("cooldown");
        persistence
            .store_mut()
            .set(SESSION_KEY, &value.to_string())
            .unwrap();

        assert!(matches!(
            persistence.load_session(),
            Err(Error::InvalidSnapshot(_))
        ));
        assert_eq!(persistence.load_session_or_discard(), None);
        assert_eq!(persistence.store().get(SESSION_KEY).unwrap(), None);
    }

    #[test]
    fn test_non_numeric_duration_is_discarded() {
        let mut persistence = Persistence::new(MemoryStore::new(), TimingConfig::default());
        let mut value = serde_json::to_value(running_snapshot()).unwrap();
        value["config"]["work_seconds"] = serde_json::json!("thirty");
        persistence
            .store_mut()
            .set(SESSION_KEY, &value.to_string())
            .unwrap();

        assert_eq!(persistence.load_session_or_discard(), None);
        assert_eq!(persistence.store().get(SESSION_KEY).unwrap(), None);
    }

    #[test]
    fn test_validation_rejects_out_of_range_values() {
        let timing = TimingConfig::default();

        let mut snapshot = running_snapshot();
        snapshot.live.remaining_seconds = 61;
        assert!(validate_snapshot(&snapshot, &timing).is_err());

        let mut snapshot = running_snapshot();
        snapshot.live.sets_remaining = 6;
        assert!(validate_snapshot(&snapshot, &timing).is_err());

        let mut snapshot = running_snapshot();
        snapshot.config.rest_seconds = 0;
        assert!(validate_snapshot(&snapshot, &timing).is_err());

        let mut snapshot = running_snapshot();
        snapshot.live.work_phases_completed = 3;
        snapshot.live.rest_phases_completed = 1;
        assert!(validate_snapshot(&snapshot, &timing).is_err());

        let mut snapshot = running_snapshot();
        snapshot.live.phase_end_ms = None;
        assert!(validate_snapshot(&snapshot, &timing).is_err());

        let mut snapshot = running_snapshot();
        snapshot.live.phase = Phase::Prep;
        snapshot.live.work_phases_completed = 1;
        assert!(validate_snapshot(&snapshot, &timing).is_err());

        assert!(validate_snapshot(&running_snapshot(), &timing).is_ok());
    }

    #[test]
    fn test_validation_ties_counters_to_phase() {
        let timing = TimingConfig::default();

        // Rest always follows a finished work phase
        let mut snapshot = running_snapshot();
        snapshot.live.phase = Phase::Rest;
        assert!(validate_snapshot(&snapshot, &timing).is_err());
        snapshot.live.work_phases_completed = 1;
        assert!(validate_snapshot(&snapshot, &timing).is_ok());

        // Work never starts with an unmatched work phase behind it
        let mut snapshot = running_snapshot();
        snapshot.live.work_phases_completed = 2;
        snapshot.live.rest_phases_completed = 1;
        assert!(validate_snapshot(&snapshot, &timing).is_err());
        snapshot.live.rest_phases_completed = 2;
        snapshot.live.sets_remaining = 3;
        assert!(validate_snapshot(&snapshot, &timing).is_ok());
    }

    #[test]
    fn test_validation_bounds_total_sets() {
        let timing = TimingConfig::default();

        let mut snapshot = running_snapshot();
        snapshot.config.total_sets = 100;
        assert!(validate_snapshot(&snapshot, &timing).is_err());

        snapshot.config.total_sets = 99;
        assert!(validate_snapshot(&snapshot, &timing).is_ok());
    }

    #[test]
    fn test_rest_without_finished_work_is_discarded_on_first_load() {
        let mut snapshot = running_snapshot();
        snapshot.live.phase = Phase::Rest;
        snapshot.live.phase_end_ms = Some(1_700_000_000_000);
        let mut store = MemoryStore::new();
        store
            .set(SESSION_KEY, &serde_json::to_string(&snapshot).unwrap())
            .unwrap();

        let mut persistence = Persistence::new(store, TimingConfig::default());
        assert_eq!(persistence.load_session_or_discard(), None);
        assert_eq!(persistence.store().get(SESSION_KEY).unwrap(), None);
    }

    #[test]
    fn test_store_failure_reads_as_no_session() {
        let mut store = MemoryStore::new();
        store.set_unavailable(true);
        let mut persistence = Persistence::new(store, TimingConfig::default());

        assert!(persistence.load_session().is_err());
        assert_eq!(persistence.load_session_or_discard(), None);
    }

    #[test]
    fn test_history_skips_bad_entries() {
        let mut persistence = Persistence::new(MemoryStore::new(), TimingConfig::default());
        let good = serde_json::to_value(entry(30)).unwrap();
        let raw = serde_json::json!([good, {"work_seconds": "x"}, 42]).to_string();
        persistence.store_mut().set(HISTORY_KEY, &raw).unwrap();

        let history = persistence.load_history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].work_seconds, 30);
    }

    #[test]
    fn test_history_that_is_not_a_list_is_an_error() {
        let mut persistence = Persistence::new(MemoryStore::new(), TimingConfig::default());
        persistence
            .store_mut()
            .set(HISTORY_KEY, "{ invalid json }")
            .unwrap();
        assert!(persistence.load_history().is_err());
    }

    #[test]
    fn test_save_history_caps_entries() {
        let mut persistence = Persistence::new(MemoryStore::new(), TimingConfig::default());
        let entries: Vec<_> = (1..=60).map(entry).collect();
        persistence.save_history(&entries).unwrap();

        let loaded = persistence.load_history().unwrap();
        assert_eq!(loaded.len(), MAX_HISTORY_ENTRIES);
        assert_eq!(loaded[0].work_seconds, 1);
        assert_eq!(loaded[49].work_seconds, 50);
    }
}
