#![forbid(unsafe_code)]

//! Core domain model and state machine for the interval workout timer.
//!
//! This crate provides:
//! - Domain types (configuration, phases, live state, history, events)
//! - The phase state machine with wall-clock reconciliation
//! - Persistence (key-value store, session snapshot, history)
//! - Session recording and CSV export
//! - Presets, input parsing and configuration

pub mod types;
pub mod error;
pub mod clock;
pub mod config;
pub mod logging;
pub mod presets;
pub mod input;
pub mod timer;
pub mod store;
pub mod persistence;
pub mod recorder;
pub mod export;
pub mod workout;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use presets::{find_preset, presets, WorkoutPreset};
pub use timer::{IntervalTimer, PendingTransition};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use persistence::Persistence;
pub use recorder::SessionRecorder;
pub use workout::Workout;
