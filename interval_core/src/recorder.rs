//! Session recorder: turns finished and abandoned workouts into history.
//!
//! Durable history is best-effort. Nothing here returns an error; every
//! storage failure is logged and treated as "no data".

use crate::clock::Clock;
use crate::persistence::Persistence;
use crate::presets::preset_label;
use crate::store::KeyValueStore;
use crate::timer::IntervalTimer;
use crate::types::{HistoryEntry, SessionSnapshot, TimerEvent, WorkoutSummary};
use crate::Result;
use chrono::{DateTime, TimeZone, Utc};
use std::path::Path;
use uuid::Uuid;

/// Writes history entries and the session snapshot
#[derive(Debug)]
pub struct SessionRecorder<S: KeyValueStore> {
    persistence: Persistence<S>,
}

impl<S: KeyValueStore> SessionRecorder<S> {
    pub fn new(persistence: Persistence<S>) -> Self {
        Self { persistence }
    }

    pub fn persistence(&self) -> &Persistence<S> {
        &self.persistence
    }

    pub fn persistence_mut(&mut self) -> &mut Persistence<S> {
        &mut self.persistence
    }

    /// Prepend an entry for `summary`, trim to the cap and persist
    pub fn record_completion(&mut self, summary: &WorkoutSummary) -> HistoryEntry {
        let entry = history_entry(summary);
        let mut history = self.history();
        history.insert(0, entry.clone());

        match self.persistence.save_history(&history) {
            Ok(()) => tracing::info!(
                "Recorded {} workout: {} work / {} rest",
                if entry.full { "full" } else { "partial" },
                entry.completed_work,
                entry.completed_rest
            ),
            Err(e) => tracing::warn!("Failed to save history: {}", e),
        }
        entry
    }

    /// Record whatever the abandoned session achieved, then drop its snapshot
    ///
    /// The timer is interrupted; an entry with `full = false` is written only
    /// when at least one work or rest phase had completed. Leaving inside the
    /// final rest window finishes the workout, so that entry is `full`.
    pub fn record_partial_if_any<C: Clock>(
        &mut self,
        timer: &mut IntervalTimer<C>,
    ) -> (Vec<TimerEvent>, Option<HistoryEntry>) {
        let events = timer.interrupt();
        let recorded = self.observe(&events).into_iter().next();
        if recorded.is_none() {
            tracing::debug!("Leaving session with no completed phases; nothing recorded");
        }
        self.clear_session();
        (events, recorded)
    }

    /// Record an entry for every completion or interruption in `events`
    pub fn observe(&mut self, events: &[TimerEvent]) -> Vec<HistoryEntry> {
        events
            .iter()
            .filter_map(|event| match event {
                TimerEvent::WorkoutCompleted { summary }
                | TimerEvent::WorkoutInterrupted { summary } => {
                    Some(self.record_completion(summary))
                }
                _ => None,
            })
            .collect()
    }

    /// Stored history, newest first; empty if unreadable
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.persistence.load_history().unwrap_or_else(|e| {
            tracing::warn!("Failed to load history: {}. Treating as empty.", e);
            Vec::new()
        })
    }

    pub fn clear_history(&mut self) {
        match self.persistence.clear_history() {
            Ok(()) => tracing::info!("History cleared"),
            Err(e) => tracing::warn!("Failed to clear history: {}", e),
        }
    }

    pub fn save_session(&mut self, snapshot: &SessionSnapshot) {
        if let Err(e) = self.persistence.save_session(snapshot) {
            tracing::warn!("Failed to save session snapshot: {}", e);
        }
    }

    pub fn clear_session(&mut self) {
        if let Err(e) = self.persistence.clear_session() {
            tracing::warn!("Failed to clear session snapshot: {}", e);
        }
    }

    /// Write the history to a CSV file, returning the number of rows
    pub fn export_csv(&self, path: &Path) -> Result<usize> {
        crate::export::write_history_csv(&self.history(), path)
    }
}

/// Build the immutable history record for a summary
pub fn history_entry(summary: &WorkoutSummary) -> HistoryEntry {
    HistoryEntry {
        id: Uuid::new_v4(),
        recorded_at: timestamp(summary.finished_at_ms),
        work_seconds: summary.work_seconds,
        rest_seconds: summary.rest_seconds,
        completed_work: summary.completed_work,
        completed_rest: summary.completed_rest,
        total_sets: summary.total_sets,
        full: summary.full,
        preset_label: summary
            .preset_id
            .as_deref()
            .map(|id| preset_label(id).unwrap_or(id).to_string()),
    }
}

fn timestamp(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::persistence::SESSION_KEY;
    use crate::store::MemoryStore;
    use crate::types::{TimingConfig, WorkoutConfig, MAX_HISTORY_ENTRIES};

    fn recorder() -> SessionRecorder<MemoryStore> {
        SessionRecorder::new(Persistence::new(MemoryStore::new(), TimingConfig::default()))
    }

    fn summary(work: u32, rest: u32, full: bool) -> WorkoutSummary {
        WorkoutSummary {
            work_seconds: 30,
            rest_seconds: 60,
            total_sets: 3,
            completed_work: work,
            completed_rest: rest,
            full,
            preset_id: None,
            finished_at_ms: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_record_completion_prepends() {
        let mut recorder = recorder();
        recorder.record_completion(&summary(1, 0, false));
        recorder.record_completion(&summary(3, 3, true));

        let history = recorder.history();
        assert_eq!(history.len(), 2);
        assert!(history[0].full);
        assert_eq!(history[1].completed_work, 1);
        assert_eq!(
            history[0].recorded_at.timestamp_millis(),
            1_700_000_000_000
        );
    }

    #[test]
    fn test_history_capped_at_fifty() {
        let mut recorder = recorder();
        for i in 0..MAX_HISTORY_ENTRIES as u32 {
            recorder.record_completion(&summary(i, i, false));
        }
        assert_eq!(recorder.history().len(), MAX_HISTORY_ENTRIES);

        recorder.record_completion(&summary(99, 99, true));
        let history = recorder.history();
        assert_eq!(history.len(), MAX_HISTORY_ENTRIES);
        assert_eq!(history[0].completed_work, 99);
        // The oldest (completed_work == 0) is gone
        assert_eq!(history.last().unwrap().completed_work, 1);
    }

    #[test]
    fn test_preset_label_resolved() {
        let mut s = summary(8, 8, true);
        s.preset_id = Some("tabata".into());
        assert_eq!(history_entry(&s).preset_label.as_deref(), Some("Tabata"));

        s.preset_id = Some("custom-thing".into());
        assert_eq!(
            history_entry(&s).preset_label.as_deref(),
            Some("custom-thing")
        );
    }

    #[test]
    fn test_partial_recorded_only_with_progress() {
        let clock = ManualClock::new(1_700_000_000_000);
        let cfg = WorkoutConfig {
            work_seconds: 5,
            rest_seconds: 5,
            total_sets: 3,
            preset_id: None,
        };
        let mut timer = IntervalTimer::new(clock.clone(), TimingConfig::default(), cfg.clone());
        let mut recorder = recorder();

        // No completed phase yet: nothing recorded, snapshot cleared
        timer.start(cfg.clone()).unwrap();
        recorder.save_session(&timer.snapshot());
        clock.advance_secs(4);
        let (_, recorded) = recorder.record_partial_if_any(&mut timer);
        assert!(recorded.is_none());
        assert!(recorder.history().is_empty());
        assert_eq!(
            recorder.persistence().store().get(SESSION_KEY).unwrap(),
            None
        );

        // One work phase done
        timer.start(cfg).unwrap();
        clock.advance_ms(3_000 + 5_000 + 1_200 + 1_000);
        timer.tick();
        let (_, recorded) = recorder.record_partial_if_any(&mut timer);
        let entry = recorded.unwrap();
        assert!(!entry.full);
        assert_eq!(entry.completed_work, 1);
        assert_eq!(entry.completed_rest, 0);
        assert_eq!(recorder.history().len(), 1);
    }

    #[test]
    fn test_failures_never_surface() {
        let mut recorder = recorder();
        recorder.record_completion(&summary(1, 1, false));
        recorder.persistence_mut().store_mut().set_unavailable(true);

        let entry = recorder.record_completion(&summary(2, 2, false));
        assert_eq!(entry.completed_work, 2);
        assert!(recorder.history().is_empty());
        recorder.clear_history();
        recorder.clear_session();

        recorder.persistence_mut().store_mut().set_unavailable(false);
        assert_eq!(recorder.history().len(), 1);
    }
}
