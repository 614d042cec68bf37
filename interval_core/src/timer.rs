//! Phase state machine for work/rest interval workouts.
//!
//! The timer is wall-clock based and has no internal threads: the caller
//! invokes `tick()` (or `complete_transition()`) when `next_wakeup_ms()`
//! says so. The only authoritative timing state is the absolute deadline of
//! the current phase; remaining seconds are always derived from it, so a
//! process that was suspended for an hour catches up exactly on its next tick.
//!
//! ## Phases
//!
//! ```text
//! Prep -> Work -> Rest -> Work -> Rest -> ... -> (sets_remaining == 0)
//! ```
//!
//! Work and rest ends open a short transition window before the next phase
//! starts. The window is an explicit pending value carrying a token; every
//! command resolves or cancels it first, so a late deferred callback can never
//! act on state that has since moved on.

use crate::clock::Clock;
use crate::input::parse_change;
use crate::types::{
    check_phase_seconds, ConfigChange, ConfigField, LiveState, Phase, SessionSnapshot,
    TimerEvent, TimingConfig, WorkoutConfig, WorkoutStatus, WorkoutSummary,
};
use crate::{Error, Result};

/// A phase-end transition waiting for its window to close
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingTransition {
    /// Phase that just ran out
    pub phase: Phase,
    pub token: u64,
    /// When the next phase begins
    pub resolve_at_ms: i64,
}

/// Interval workout state machine
#[derive(Debug)]
pub struct IntervalTimer<C: Clock> {
    clock: C,
    timing: TimingConfig,
    config: WorkoutConfig,
    live: LiveState,
    pending: Option<PendingTransition>,
    next_token: u64,
}

impl<C: Clock> IntervalTimer<C> {
    /// Create an idle timer in configuration mode
    pub fn new(clock: C, timing: TimingConfig, config: WorkoutConfig) -> Self {
        let live = LiveState::idle(&config);
        Self {
            clock,
            timing,
            config,
            live,
            pending: None,
            next_token: 1,
        }
    }

    /// Rebuild a timer from a persisted snapshot
    ///
    /// A running snapshot is reconciled against the clock before returning,
    /// so every phase boundary that passed while the process was away is
    /// applied. Paused snapshots come back unchanged.
    pub fn restore(clock: C, timing: TimingConfig, snapshot: SessionSnapshot) -> (Self, Vec<TimerEvent>) {
        let mut timer = Self {
            clock,
            timing,
            config: snapshot.config,
            live: snapshot.live,
            pending: None,
            next_token: 1,
        };
        let events = timer.tick();
        (timer, events)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn config(&self) -> &WorkoutConfig {
        &self.config
    }

    pub fn live(&self) -> &LiveState {
        &self.live
    }

    pub fn timing(&self) -> TimingConfig {
        self.timing
    }

    pub fn pending(&self) -> Option<PendingTransition> {
        self.pending
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    pub fn status(&self) -> WorkoutStatus {
        if self.live.in_progress {
            if self.live.running {
                WorkoutStatus::Running
            } else {
                WorkoutStatus::Paused
            }
        } else if self.live.sets_remaining == 0 {
            WorkoutStatus::Completed
        } else {
            WorkoutStatus::Idle
        }
    }

    /// Full length of the given phase in seconds
    pub fn phase_total_seconds(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Prep => self.timing.prep_seconds,
            Phase::Work => self.config.work_seconds,
            Phase::Rest => self.config.rest_seconds,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            config: self.config.clone(),
            live: self.live.clone(),
        }
    }

    /// The next instant the driver should call back, if any
    ///
    /// While a transition window is open this is the end of the window;
    /// while counting down it is the next time the displayed second changes.
    pub fn next_wakeup_ms(&self) -> Option<i64> {
        if let Some(pending) = self.pending {
            return Some(pending.resolve_at_ms);
        }
        if !self.live.running {
            return None;
        }
        let end = self.live.phase_end_ms?;
        let now = self.now_ms();
        let left = end - now;
        if left <= 0 {
            return Some(now);
        }
        let step = left % 1000;
        Some(now + if step == 0 { 1000 } else { step })
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a new workout with the given configuration
    pub fn start(&mut self, config: WorkoutConfig) -> Result<Vec<TimerEvent>> {
        if self.live.running {
            return Err(Error::State("a workout is already running".into()));
        }
        config.validate().map_err(Error::InvalidInput)?;

        let now = self.now_ms();
        let mut events = Vec::new();
        if self.live.in_progress {
            self.push_interrupted(now, &mut events);
        }

        self.pending = None;
        self.config = config;
        let prep = self.timing.prep_seconds;
        self.live = LiveState {
            phase: Phase::Prep,
            remaining_seconds: prep,
            phase_end_ms: Some(now + secs_to_ms(prep)),
            sets_remaining: self.config.total_sets,
            work_phases_completed: 0,
            rest_phases_completed: 0,
            running: true,
            in_progress: true,
        };

        tracing::info!(
            "Workout started: {} sets of {}s work / {}s rest",
            self.config.total_sets,
            self.config.work_seconds,
            self.config.rest_seconds
        );

        events.push(TimerEvent::WorkoutStarted {
            total_sets: self.config.total_sets,
            at_ms: now,
        });
        events.push(TimerEvent::PhaseChanged {
            phase: Phase::Prep,
            remaining_seconds: prep,
            total_seconds: prep,
        });
        Ok(events)
    }

    /// Stop the countdown, keeping phase and remaining time
    ///
    /// A transition window that is still open is resolved first, so pausing
    /// at that instant applies the phase change (and may finish the workout).
    pub fn pause(&mut self) -> Vec<TimerEvent> {
        if !self.live.running {
            return Vec::new();
        }
        let now = self.now_ms();
        let mut events = self.advance(now);

        if let Some(pending) = self.pending.take() {
            tracing::debug!(
                "Pause inside transition window {}; applying transition now",
                pending.token
            );
            self.apply_transition(pending.resolve_at_ms, &mut events);
        }
        if !self.live.running {
            return events;
        }

        self.freeze(now);
        tracing::info!(
            "Paused in {:?} with {}s remaining",
            self.live.phase,
            self.live.remaining_seconds
        );
        events.push(TimerEvent::Paused {
            remaining_seconds: self.live.remaining_seconds,
        });
        events
    }

    /// Continue a paused workout
    pub fn resume(&mut self) -> Result<Vec<TimerEvent>> {
        if self.live.running {
            return Ok(Vec::new());
        }
        if !self.live.in_progress {
            return Err(Error::State("no workout in progress to resume".into()));
        }

        let now = self.now_ms();
        self.live.phase_end_ms = Some(now + secs_to_ms(self.live.remaining_seconds));
        self.live.running = true;
        tracing::info!(
            "Resumed in {:?} with {}s remaining",
            self.live.phase,
            self.live.remaining_seconds
        );

        let mut events = vec![TimerEvent::Resumed {
            remaining_seconds: self.live.remaining_seconds,
        }];
        events.extend(self.advance(now));
        Ok(events)
    }

    /// Recompute remaining time from the deadline and handle phase ends
    pub fn tick(&mut self) -> Vec<TimerEvent> {
        if !self.live.running {
            return Vec::new();
        }
        let now = self.now_ms();
        let mut events = self.advance(now);
        if self.live.running && self.pending.is_none() {
            events.push(TimerEvent::TickUpdated {
                remaining_seconds: self.live.remaining_seconds,
            });
        }
        events
    }

    /// Deferred callback closing a transition window
    ///
    /// Tokens from windows that were cancelled or already resolved are ignored.
    pub fn complete_transition(&mut self, token: u64) -> Vec<TimerEvent> {
        match self.pending {
            Some(pending) if pending.token == token => {
                let now = self.now_ms();
                self.pending = None;
                let mut events = Vec::new();
                self.apply_transition(pending.resolve_at_ms, &mut events);
                events.extend(self.advance(now));
                events
            }
            _ => {
                tracing::debug!("Ignoring stale transition token {}", token);
                Vec::new()
            }
        }
    }

    /// Edit the configuration; rejected while running
    pub fn reconfigure(&mut self, change: ConfigChange) -> Result<()> {
        if self.live.running {
            return Err(Error::State(
                "configuration cannot change while the timer is running".into(),
            ));
        }

        let mut config = self.config.clone();
        let (work_changed, rest_changed) = match change {
            ConfigChange::WorkSeconds(seconds) => {
                check_phase_seconds("work_seconds", seconds).map_err(Error::InvalidInput)?;
                config.work_seconds = seconds;
                config.preset_id = None;
                (true, false)
            }
            ConfigChange::RestSeconds(seconds) => {
                check_phase_seconds("rest_seconds", seconds).map_err(Error::InvalidInput)?;
                config.rest_seconds = seconds;
                config.preset_id = None;
                (false, true)
            }
            ConfigChange::TotalSets(sets) => {
                config.total_sets = sets;
                config.preset_id = None;
                (false, false)
            }
            ConfigChange::Preset {
                id,
                work_seconds,
                rest_seconds,
                total_sets,
            } => {
                config.work_seconds = work_seconds;
                config.rest_seconds = rest_seconds;
                config.total_sets = total_sets;
                config.preset_id = Some(id);
                (true, true)
            }
        };
        config.validate().map_err(Error::InvalidInput)?;

        if self.status() == WorkoutStatus::Completed {
            self.live = LiveState::idle(&config);
        }
        self.config = config;

        match self.live.phase {
            Phase::Work if work_changed => self.live.remaining_seconds = self.config.work_seconds,
            Phase::Rest if rest_changed => self.live.remaining_seconds = self.config.rest_seconds,
            _ => {}
        }

        self.live.sets_remaining = if self.live.in_progress {
            self.config
                .total_sets
                .saturating_sub(self.live.rest_phases_completed)
                .max(1)
        } else {
            self.config.total_sets
        };

        tracing::debug!("Reconfigured: {:?}", self.config);
        Ok(())
    }

    /// Apply raw user input to one field; malformed input leaves the old value
    pub fn reconfigure_input(&mut self, field: ConfigField, text: &str) -> Result<()> {
        if self.live.running {
            return Err(Error::State(
                "configuration cannot change while the timer is running".into(),
            ));
        }
        let change = parse_change(field, text)?;
        self.reconfigure(change)
    }

    /// Abandon any workout and return to configuration mode
    ///
    /// Progress made so far is reported in a `WorkoutInterrupted` event when
    /// at least one phase completed.
    pub fn reset(&mut self) -> Vec<TimerEvent> {
        let now = self.now_ms();
        let mut events = Vec::new();
        if self.live.running {
            events.extend(self.advance(now));
        }
        if let Some(pending) = self.pending.take() {
            self.apply_transition(pending.resolve_at_ms, &mut events);
        }
        if self.live.in_progress {
            self.push_interrupted(now, &mut events);
            tracing::info!(
                "Workout reset after {} work / {} rest phases",
                self.live.work_phases_completed,
                self.live.rest_phases_completed
            );
        }

        self.config.preset_id = None;
        self.live = LiveState::idle(&self.config);
        events.push(TimerEvent::Reset);
        events
    }

    /// Pause then reset; used when the user leaves an in-progress session
    pub fn interrupt(&mut self) -> Vec<TimerEvent> {
        let mut events = self.pause();
        events.extend(self.reset());
        events
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Apply every phase boundary up to `now`
    fn advance(&mut self, now: i64) -> Vec<TimerEvent> {
        let mut events = Vec::new();

        if let Some(pending) = self.pending {
            if now < pending.resolve_at_ms {
                return events;
            }
            self.pending = None;
            self.apply_transition(pending.resolve_at_ms, &mut events);
        }

        while self.live.running {
            let Some(end) = self.live.phase_end_ms else {
                break;
            };
            if now < end {
                let total = self.phase_total_seconds(self.live.phase);
                self.live.remaining_seconds = remaining_secs(end, now).min(total);
                break;
            }

            match self.live.phase {
                Phase::Prep => self.enter_phase(Phase::Work, end, &mut events),
                Phase::Work | Phase::Rest => {
                    let resolve_at = end + self.timing.transition_ms as i64;
                    if now >= resolve_at {
                        tracing::debug!(
                            "Transition window after {:?} already passed; fast-forwarding",
                            self.live.phase
                        );
                        self.apply_transition(resolve_at, &mut events);
                    } else {
                        self.open_transition(resolve_at, &mut events);
                        break;
                    }
                }
            }
        }

        events
    }

    fn open_transition(&mut self, resolve_at_ms: i64, events: &mut Vec<TimerEvent>) {
        let token = self.next_token;
        self.next_token += 1;
        let phase = self.live.phase;
        self.pending = Some(PendingTransition {
            phase,
            token,
            resolve_at_ms,
        });
        self.live.remaining_seconds = 0;
        tracing::debug!("{:?} ended; transition {} until {}", phase, token, resolve_at_ms);
        events.push(TimerEvent::PhaseEnding {
            phase,
            token,
            resolve_at_ms,
        });
    }

    /// The transition rule; the next phase starts at `start_ms`
    fn apply_transition(&mut self, start_ms: i64, events: &mut Vec<TimerEvent>) {
        match self.live.phase {
            Phase::Prep => self.enter_phase(Phase::Work, start_ms, events),
            Phase::Work => {
                self.live.work_phases_completed += 1;
                self.enter_phase(Phase::Rest, start_ms, events);
            }
            Phase::Rest => {
                self.live.rest_phases_completed += 1;
                self.live.sets_remaining = self.live.sets_remaining.saturating_sub(1);
                if self.live.sets_remaining == 0 {
                    self.finish(start_ms, events);
                } else {
                    self.enter_phase(Phase::Work, start_ms, events);
                }
            }
        }
    }

    fn enter_phase(&mut self, phase: Phase, start_ms: i64, events: &mut Vec<TimerEvent>) {
        let total = self.phase_total_seconds(phase);
        self.live.phase = phase;
        self.live.remaining_seconds = total;
        self.live.phase_end_ms = Some(start_ms + secs_to_ms(total));
        tracing::debug!(
            "Entered {:?} ({}s, {} sets remaining)",
            phase,
            total,
            self.live.sets_remaining
        );
        events.push(TimerEvent::PhaseChanged {
            phase,
            remaining_seconds: total,
            total_seconds: total,
        });
    }

    fn finish(&mut self, at_ms: i64, events: &mut Vec<TimerEvent>) {
        self.pending = None;
        self.live.running = false;
        self.live.in_progress = false;
        self.live.phase_end_ms = None;
        self.live.remaining_seconds = 0;
        tracing::info!(
            "Workout complete: {} sets",
            self.live.rest_phases_completed
        );
        events.push(TimerEvent::WorkoutCompleted {
            summary: self.summary(at_ms, true),
        });
    }

    fn freeze(&mut self, now: i64) {
        let total = self.phase_total_seconds(self.live.phase);
        let remaining = self
            .live
            .phase_end_ms
            .map(|end| remaining_secs(end, now))
            .unwrap_or(self.live.remaining_seconds);
        self.live.remaining_seconds = remaining.min(total);
        self.live.phase_end_ms = None;
        self.live.running = false;
    }

    fn push_interrupted(&self, now: i64, events: &mut Vec<TimerEvent>) {
        if self.live.has_completed_phases() {
            events.push(TimerEvent::WorkoutInterrupted {
                summary: self.summary(now, false),
            });
        }
    }

    fn summary(&self, at_ms: i64, full: bool) -> WorkoutSummary {
        WorkoutSummary {
            work_seconds: self.config.work_seconds,
            rest_seconds: self.config.rest_seconds,
            total_sets: self.config.total_sets,
            completed_work: self.live.work_phases_completed,
            completed_rest: self.live.rest_phases_completed,
            full,
            preset_id: self.config.preset_id.clone(),
            finished_at_ms: at_ms,
        }
    }
}

fn secs_to_ms(secs: u32) -> i64 {
    i64::from(secs) * 1000
}

/// Whole seconds left until `end_ms`, rounded up, never negative
fn remaining_secs(end_ms: i64, now_ms: i64) -> u32 {
    let left = end_ms - now_ms;
    if left <= 0 {
        return 0;
    }
    u32::try_from((left + 999) / 1000).unwrap_or(u32::MAX)
}
