//! Built-in workout presets.
//!
//! A preset fills in work, rest and set count in one step and is remembered
//! on the configuration until a field is edited by hand.

use crate::types::{check_phase_seconds, ConfigChange, MAX_TOTAL_SETS};
use once_cell::sync::Lazy;

/// A named workout shape
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkoutPreset {
    pub id: &'static str,
    pub label: &'static str,
    pub work_seconds: u32,
    pub rest_seconds: u32,
    pub total_sets: u32,
}

impl WorkoutPreset {
    /// The configuration edit that selects this preset
    pub fn as_change(&self) -> ConfigChange {
        ConfigChange::Preset {
            id: self.id.to_string(),
            work_seconds: self.work_seconds,
            rest_seconds: self.rest_seconds,
            total_sets: self.total_sets,
        }
    }
}

/// Cached preset list, in display order
static PRESETS: Lazy<Vec<WorkoutPreset>> = Lazy::new(build_presets);

fn build_presets() -> Vec<WorkoutPreset> {
    vec![
        WorkoutPreset {
            id: "tabata",
            label: "Tabata",
            work_seconds: 20,
            rest_seconds: 10,
            total_sets: 8,
        },
        WorkoutPreset {
            id: "hiit",
            label: "HIIT 40/20",
            work_seconds: 40,
            rest_seconds: 20,
            total_sets: 10,
        },
        WorkoutPreset {
            id: "strength",
            label: "Strength sets",
            work_seconds: 45,
            rest_seconds: 90,
            total_sets: 5,
        },
        WorkoutPreset {
            id: "endurance",
            label: "Endurance",
            work_seconds: 120,
            rest_seconds: 60,
            total_sets: 6,
        },
    ]
}

/// All built-in presets
pub fn presets() -> &'static [WorkoutPreset] {
    &PRESETS
}

/// Look up a preset by id (case-insensitive)
pub fn find_preset(id: &str) -> Option<&'static WorkoutPreset> {
    PRESETS.iter().find(|p| p.id.eq_ignore_ascii_case(id.trim()))
}

/// Display label for a preset id, if it names a known preset
pub fn preset_label(id: &str) -> Option<&'static str> {
    find_preset(id).map(|p| p.label)
}

/// Validate the preset list, returning a list of problems
pub fn validate_presets(presets: &[WorkoutPreset]) -> Vec<String> {
    let mut errors = Vec::new();

    for (idx, preset) in presets.iter().enumerate() {
        if let Err(e) = check_phase_seconds("work_seconds", preset.work_seconds) {
            errors.push(format!("Preset '{}': {}", preset.id, e));
        }
        if let Err(e) = check_phase_seconds("rest_seconds", preset.rest_seconds) {
            errors.push(format!("Preset '{}': {}", preset.id, e));
        }
        if !(1..=MAX_TOTAL_SETS).contains(&preset.total_sets) {
            errors.push(format!(
                "Preset '{}': total_sets must be between 1 and {}",
                preset.id, MAX_TOTAL_SETS
            ));
        }
        if presets[..idx].iter().any(|p| p.id == preset.id) {
            errors.push(format!("Duplicate preset id '{}'", preset.id));
        }
    }

    errors
}
