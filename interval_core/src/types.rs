//! Core domain types for the interval timer.
//!
//! This module defines the fundamental types used throughout the system:
//! - Workout configuration and timing parameters
//! - Phases and live session progress
//! - Persisted session snapshots and history entries
//! - Events emitted to the presentation layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shortest allowed work or rest phase, in seconds
pub const MIN_PHASE_SECONDS: u32 = 1;

/// Longest allowed work or rest phase, in seconds
pub const MAX_PHASE_SECONDS: u32 = 600;

/// Most sets a single workout may plan
pub const MAX_TOTAL_SETS: u32 = 99;

/// Number of history entries kept; older entries are dropped
pub const MAX_HISTORY_ENTRIES: usize = 50;

// ============================================================================
// Configuration Types
// ============================================================================

/// Workout shape chosen by the user
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkoutConfig {
    pub work_seconds: u32,
    pub rest_seconds: u32,
    pub total_sets: u32,
    /// Named preset this configuration came from; cleared on manual edits
    #[serde(default)]
    pub preset_id: Option<String>,
}

impl Default for WorkoutConfig {
    fn default() -> Self {
        Self {
            work_seconds: 30,
            rest_seconds: 60,
            total_sets: 5,
            preset_id: None,
        }
    }
}

impl WorkoutConfig {
    /// Check ranges, returning a description of the first violation
    pub fn validate(&self) -> std::result::Result<(), String> {
        check_phase_seconds("work_seconds", self.work_seconds)?;
        check_phase_seconds("rest_seconds", self.rest_seconds)?;
        if !(1..=MAX_TOTAL_SETS).contains(&self.total_sets) {
            return Err(format!(
                "total_sets must be between 1 and {} (got {})",
                MAX_TOTAL_SETS, self.total_sets
            ));
        }
        Ok(())
    }
}

pub(crate) fn check_phase_seconds(name: &str, value: u32) -> std::result::Result<(), String> {
    if !(MIN_PHASE_SECONDS..=MAX_PHASE_SECONDS).contains(&value) {
        return Err(format!(
            "{} must be between {} and {} (got {})",
            name, MIN_PHASE_SECONDS, MAX_PHASE_SECONDS, value
        ));
    }
    Ok(())
}

/// Fixed timing parameters of the state machine
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimingConfig {
    /// Length of the "get ready" phase
    pub prep_seconds: u32,
    /// Length of the phase-end transition window between work and rest
    pub transition_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            prep_seconds: 3,
            transition_ms: 1200,
        }
    }
}

/// A configuration field that can be edited from user input
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigField {
    WorkSeconds,
    RestSeconds,
    TotalSets,
}

impl std::str::FromStr for ConfigField {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "work" | "work_seconds" => Ok(ConfigField::WorkSeconds),
            "rest" | "rest_seconds" => Ok(ConfigField::RestSeconds),
            "sets" | "total_sets" => Ok(ConfigField::TotalSets),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown field '{}' (expected work, rest or sets)",
                other
            ))),
        }
    }
}

/// A single configuration edit
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigChange {
    WorkSeconds(u32),
    RestSeconds(u32),
    TotalSets(u32),
    /// Apply all values of a named preset at once
    Preset {
        id: String,
        work_seconds: u32,
        rest_seconds: u32,
        total_sets: u32,
    },
}

// ============================================================================
// Phase and Live State Types
// ============================================================================

/// A timed segment of a workout
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Prep,
    Work,
    Rest,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Prep => "Get ready",
            Phase::Work => "Work",
            Phase::Rest => "Rest",
        }
    }
}

/// Live progress of the current workout
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LiveState {
    pub phase: Phase,
    pub remaining_seconds: u32,
    /// Epoch milliseconds at which the current phase ends; set only while running
    #[serde(default)]
    pub phase_end_ms: Option<i64>,
    pub sets_remaining: u32,
    pub work_phases_completed: u32,
    pub rest_phases_completed: u32,
    pub running: bool,
    /// A workout was started and has not yet completed or been abandoned
    pub in_progress: bool,
}

impl LiveState {
    /// Configuration-mode defaults for the given workout
    pub fn idle(config: &WorkoutConfig) -> Self {
        Self {
            phase: Phase::Work,
            remaining_seconds: config.work_seconds,
            phase_end_ms: None,
            sets_remaining: config.total_sets,
            work_phases_completed: 0,
            rest_phases_completed: 0,
            running: false,
            in_progress: false,
        }
    }

    pub fn has_completed_phases(&self) -> bool {
        self.work_phases_completed > 0 || self.rest_phases_completed > 0
    }
}

/// Coarse lifecycle status derived from live state
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutStatus {
    Idle,
    Running,
    Paused,
    Completed,
}

/// Everything needed to restore a session after a reload
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub config: WorkoutConfig,
    pub live: LiveState,
}

// ============================================================================
// History and Event Types
// ============================================================================

/// Outcome of a finished or abandoned workout
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkoutSummary {
    pub work_seconds: u32,
    pub rest_seconds: u32,
    pub total_sets: u32,
    pub completed_work: u32,
    pub completed_rest: u32,
    pub full: bool,
    pub preset_id: Option<String>,
    pub finished_at_ms: i64,
}

/// A recorded workout; never mutated after being written
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub work_seconds: u32,
    pub rest_seconds: u32,
    pub completed_work: u32,
    pub completed_rest: u32,
    pub total_sets: u32,
    pub full: bool,
    #[serde(default)]
    pub preset_label: Option<String>,
}

/// Every observable state change produces an event for the presentation layer
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimerEvent {
    WorkoutStarted {
        total_sets: u32,
        at_ms: i64,
    },
    PhaseChanged {
        phase: Phase,
        remaining_seconds: u32,
        total_seconds: u32,
    },
    /// A work or rest phase ran out; the next phase begins at `resolve_at_ms`
    /// unless the transition is resolved earlier by a command.
    PhaseEnding {
        phase: Phase,
        token: u64,
        resolve_at_ms: i64,
    },
    TickUpdated {
        remaining_seconds: u32,
    },
    Paused {
        remaining_seconds: u32,
    },
    Resumed {
        remaining_seconds: u32,
    },
    WorkoutCompleted {
        summary: WorkoutSummary,
    },
    WorkoutInterrupted {
        summary: WorkoutSummary,
    },
    Reset,
}
