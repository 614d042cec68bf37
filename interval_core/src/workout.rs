//! Workout controller.
//!
//! Wires the data flow: a command goes to the state machine, the resulting
//! events go to the recorder, and the session snapshot is written back
//! (while a workout is in progress) or removed (otherwise).

use crate::clock::Clock;
use crate::persistence::Persistence;
use crate::recorder::SessionRecorder;
use crate::store::KeyValueStore;
use crate::timer::IntervalTimer;
use crate::types::{
    ConfigChange, ConfigField, HistoryEntry, TimerEvent, TimingConfig, WorkoutConfig,
    WorkoutStatus,
};
use crate::Result;
use std::path::Path;

/// A timer bound to durable storage
#[derive(Debug)]
pub struct Workout<C: Clock, S: KeyValueStore> {
    timer: IntervalTimer<C>,
    recorder: SessionRecorder<S>,
}

impl<C: Clock, S: KeyValueStore> Workout<C, S> {
    /// Restore the stored session, or start idle with `defaults`
    ///
    /// Returns the events produced while catching up with the clock, which
    /// may include a completion recorded during the reload.
    pub fn load(
        clock: C,
        timing: TimingConfig,
        defaults: WorkoutConfig,
        store: S,
    ) -> (Self, Vec<TimerEvent>) {
        let mut persistence = Persistence::new(store, timing);
        let (timer, events) = match persistence.load_session_or_discard() {
            Some(snapshot) => {
                tracing::debug!("Restoring stored session");
                IntervalTimer::restore(clock, timing, snapshot)
            }
            None => (IntervalTimer::new(clock, timing, defaults), Vec::new()),
        };

        let mut workout = Self {
            timer,
            recorder: SessionRecorder::new(persistence),
        };
        workout.after(&events);
        (workout, events)
    }

    pub fn timer(&self) -> &IntervalTimer<C> {
        &self.timer
    }

    pub fn recorder(&self) -> &SessionRecorder<S> {
        &self.recorder
    }

    pub fn status(&self) -> WorkoutStatus {
        self.timer.status()
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self, config: WorkoutConfig) -> Result<Vec<TimerEvent>> {
        let events = self.timer.start(config)?;
        self.after(&events);
        Ok(events)
    }

    pub fn pause(&mut self) -> Vec<TimerEvent> {
        let events = self.timer.pause();
        self.after(&events);
        events
    }

    pub fn resume(&mut self) -> Result<Vec<TimerEvent>> {
        let events = self.timer.resume()?;
        self.after(&events);
        Ok(events)
    }

    pub fn tick(&mut self) -> Vec<TimerEvent> {
        let events = self.timer.tick();
        if events
            .iter()
            .any(|e| !matches!(e, TimerEvent::TickUpdated { .. }))
        {
            self.after(&events);
        }
        events
    }

    pub fn complete_transition(&mut self, token: u64) -> Vec<TimerEvent> {
        let events = self.timer.complete_transition(token);
        self.after(&events);
        events
    }

    pub fn reconfigure(&mut self, change: ConfigChange) -> Result<()> {
        self.timer.reconfigure(change)?;
        self.sync_session();
        Ok(())
    }

    pub fn reconfigure_input(&mut self, field: ConfigField, text: &str) -> Result<()> {
        self.timer.reconfigure_input(field, text)?;
        self.sync_session();
        Ok(())
    }

    pub fn reset(&mut self) -> Vec<TimerEvent> {
        let events = self.timer.reset();
        self.after(&events);
        events
    }

    /// Leave the session for configuration, keeping a partial record
    pub fn leave(&mut self) -> (Vec<TimerEvent>, Option<HistoryEntry>) {
        self.recorder.record_partial_if_any(&mut self.timer)
    }

    // ── History ──────────────────────────────────────────────────────

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.recorder.history()
    }

    pub fn clear_history(&mut self) {
        self.recorder.clear_history();
    }

    pub fn export_history(&self, path: &Path) -> Result<usize> {
        self.recorder.export_csv(path)
    }

    // ── Internals ────────────────────────────────────────────────────

    fn after(&mut self, events: &[TimerEvent]) {
        self.recorder.observe(events);
        self.sync_session();
    }

    fn sync_session(&mut self) {
        if self.timer.live().in_progress {
            self.recorder.save_session(&self.timer.snapshot());
        } else {
            self.recorder.clear_session();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::persistence::SESSION_KEY;
    use crate::store::{FileStore, MemoryStore};
    use crate::types::Phase;

    const T0: i64 = 1_700_000_000_000;

    fn config(sets: u32) -> WorkoutConfig {
        WorkoutConfig {
            work_seconds: 10,
            rest_seconds: 5,
            total_sets: sets,
            preset_id: None,
        }
    }

    fn load_file(
        clock: &ManualClock,
        dir: &Path,
    ) -> (Workout<ManualClock, FileStore>, Vec<TimerEvent>) {
        Workout::load(
            clock.clone(),
            TimingConfig::default(),
            config(3),
            FileStore::new(dir),
        )
    }

    #[test]
    fn test_snapshot_saved_while_in_progress() {
        let temp_dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(T0);
        let (mut workout, _) = load_file(&clock, temp_dir.path());

        workout.start(config(3)).unwrap();
        assert!(temp_dir.path().join("session.json").exists());

        workout.reset();
        assert!(!temp_dir.path().join("session.json").exists());
    }

    #[test]
    fn test_reload_resumes_running_workout() {
        let temp_dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(T0);
        {
            let (mut workout, _) = load_file(&clock, temp_dir.path());
            workout.start(config(3)).unwrap();
        }

        // prep + work + window + 2s into rest
        clock.advance_ms(3_000 + 10_000 + 1_200 + 2_000);
        let (workout, events) = load_file(&clock, temp_dir.path());
        assert_eq!(workout.status(), WorkoutStatus::Running);
        assert_eq!(workout.timer().live().phase, Phase::Rest);
        assert_eq!(workout.timer().live().remaining_seconds, 3);
        assert!(events.iter().any(|e| matches!(
            e,
            TimerEvent::PhaseChanged { phase: Phase::Rest, .. }
        )));
    }

    #[test]
    fn test_reload_after_long_absence_records_completion() {
        let temp_dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(T0);
        {
            let (mut workout, _) = load_file(&clock, temp_dir.path());
            workout.start(config(3)).unwrap();
        }

        clock.advance_secs(3_600);
        let (workout, _) = load_file(&clock, temp_dir.path());
        assert_eq!(workout.status(), WorkoutStatus::Completed);
        assert!(!temp_dir.path().join("session.json").exists());

        let history = workout.history();
        assert_eq!(history.len(), 1);
        assert!(history[0].full);
        assert_eq!(history[0].completed_work, 3);
        assert_eq!(history[0].completed_rest, 3);
    }

    #[test]
    fn test_reload_while_paused_keeps_remaining() {
        let temp_dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(T0);
        {
            let (mut workout, _) = load_file(&clock, temp_dir.path());
            workout.start(config(3)).unwrap();
            clock.advance_secs(7);
            workout.tick();
            workout.pause();
        }

        clock.advance_secs(86_400);
        let (workout, events) = load_file(&clock, temp_dir.path());
        assert!(events.is_empty());
        assert_eq!(workout.status(), WorkoutStatus::Paused);
        assert_eq!(workout.timer().live().phase, Phase::Work);
        assert_eq!(workout.timer().live().remaining_seconds, 6);
    }

    #[test]
    fn test_leave_records_partial_and_clears_session() {
        let temp_dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(T0);
        let (mut workout, _) = load_file(&clock, temp_dir.path());
        workout.start(config(3)).unwrap();

        clock.advance_ms(3_000 + 10_000 + 1_200 + 5_000 + 1_200 + 1_000);
        workout.tick();
        let (_, entry) = workout.leave();
        let entry = entry.unwrap();
        assert!(!entry.full);
        assert_eq!(entry.completed_work, 1);
        assert_eq!(entry.completed_rest, 1);
        assert_eq!(workout.status(), WorkoutStatus::Idle);
        assert!(!temp_dir.path().join("session.json").exists());

        // Leaving again has nothing left to record
        let (_, entry) = workout.leave();
        assert!(entry.is_none());
        assert_eq!(workout.history().len(), 1);
    }

    #[test]
    fn test_corrupt_session_falls_back_to_defaults() {
        let mut store = MemoryStore::new();
        store.set(SESSION_KEY, "{ invalid json }").unwrap();

        let clock = ManualClock::new(T0);
        let (workout, events) =
            Workout::load(clock, TimingConfig::default(), config(4), store);
        assert!(events.is_empty());
        assert_eq!(workout.status(), WorkoutStatus::Idle);
        assert_eq!(workout.timer().config(), &config(4));
        assert_eq!(
            workout
                .recorder()
                .persistence()
                .store()
                .get(SESSION_KEY)
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_unavailable_store_does_not_break_workout() {
        let mut store = MemoryStore::new();
        store.set_unavailable(true);
        let clock = ManualClock::new(T0);
        let (mut workout, _) =
            Workout::load(clock.clone(), TimingConfig::default(), config(1), store);

        workout.start(config(1)).unwrap();
        clock.advance_secs(60);
        let events = workout.tick();
        assert!(events
            .iter()
            .any(|e| matches!(e, TimerEvent::WorkoutCompleted { .. })));
        assert_eq!(workout.status(), WorkoutStatus::Completed);
        assert!(workout.history().is_empty());
    }

    #[test]
    fn test_reconfigure_persists_paused_session() {
        let temp_dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(T0);
        {
            let (mut workout, _) = load_file(&clock, temp_dir.path());
            workout.start(config(3)).unwrap();
            clock.advance_secs(5);
            workout.tick();
            workout.pause();
            workout
                .reconfigure_input(ConfigField::WorkSeconds, "25")
                .unwrap();
        }

        let (workout, _) = load_file(&clock, temp_dir.path());
        assert_eq!(workout.timer().config().work_seconds, 25);
        assert_eq!(workout.timer().live().remaining_seconds, 25);
    }
}
