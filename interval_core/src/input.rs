//! Parsing of free-form configuration input.
//!
//! Durations accept plain seconds (`45`, `45s`) or minutes and seconds
//! (`1:30`, `2m`). Anything malformed or out of range is rejected so the
//! caller can keep the last valid value.

use crate::types::{check_phase_seconds, ConfigChange, ConfigField, MAX_TOTAL_SETS};
use crate::{Error, Result};

/// Parse a phase duration in seconds
pub fn parse_duration(text: &str) -> Result<u32> {
    let text = text.trim().to_lowercase();
    let invalid = || Error::InvalidInput(format!("'{}' is not a duration", text));

    let seconds = if let Some((minutes, seconds)) = text.split_once(':') {
        let minutes: u32 = minutes.trim().parse().map_err(|_| invalid())?;
        let seconds: u32 = seconds.trim().parse().map_err(|_| invalid())?;
        if seconds >= 60 {
            return Err(invalid());
        }
        minutes
            .checked_mul(60)
            .and_then(|m| m.checked_add(seconds))
            .ok_or_else(invalid)?
    } else if let Some(minutes) = text.strip_suffix('m') {
        let minutes: u32 = minutes.trim().parse().map_err(|_| invalid())?;
        minutes.checked_mul(60).ok_or_else(invalid)?
    } else {
        let digits = text.strip_suffix('s').unwrap_or(&text);
        digits.trim().parse().map_err(|_| invalid())?
    };

    check_phase_seconds("duration", seconds).map_err(Error::InvalidInput)?;
    Ok(seconds)
}

/// Parse a set count
pub fn parse_sets(text: &str) -> Result<u32> {
    let sets: u32 = text
        .trim()
        .parse()
        .map_err(|_| Error::InvalidInput(format!("'{}' is not a set count", text.trim())))?;
    if !(1..=MAX_TOTAL_SETS).contains(&sets) {
        return Err(Error::InvalidInput(format!(
            "set count must be between 1 and {}",
            MAX_TOTAL_SETS
        )));
    }
    Ok(sets)
}

/// Turn a field name and raw text into a configuration change
pub fn parse_change(field: ConfigField, text: &str) -> Result<ConfigChange> {
    Ok(match field {
        ConfigField::WorkSeconds => ConfigChange::WorkSeconds(parse_duration(text)?),
        ConfigField::RestSeconds => ConfigChange::RestSeconds(parse_duration(text)?),
        ConfigField::TotalSets => ConfigChange::TotalSets(parse_sets(text)?),
    })
}
