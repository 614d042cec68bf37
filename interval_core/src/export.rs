//! CSV export of workout history.
//!
//! The export is written to a temp file next to the target and renamed into
//! place, so a crash never leaves a half-written CSV behind.

use crate::{Error, HistoryEntry, Result};
use std::path::Path;
use tempfile::NamedTempFile;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    id: String,
    recorded_at: String,
    work_seconds: u32,
    rest_seconds: u32,
    completed_work: u32,
    completed_rest: u32,
    total_sets: u32,
    full: bool,
    preset: Option<String>,
}

impl From<&HistoryEntry> for CsvRow {
    fn from(entry: &HistoryEntry) -> Self {
        CsvRow {
            id: entry.id.to_string(),
            recorded_at: entry.recorded_at.to_rfc3339(),
            work_seconds: entry.work_seconds,
            rest_seconds: entry.rest_seconds,
            completed_work: entry.completed_work,
            completed_rest: entry.completed_rest,
            total_sets: entry.total_sets,
            full: entry.full,
            preset: entry.preset_label.clone(),
        }
    }
}

/// Write history entries (newest first) to `path`, replacing any existing file
pub fn write_history_csv(entries: &[HistoryEntry], path: &Path) -> Result<usize> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::env::current_dir()?,
    };
    std::fs::create_dir_all(&parent)?;

    let temp = NamedTempFile::new_in(&parent)?;
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(true)
            .from_writer(temp.as_file());
        for entry in entries {
            writer.serialize(CsvRow::from(entry))?;
        }
        // Headers come from the first row; an empty export still gets them
        if entries.is_empty() {
            writer.write_record([
                "id",
                "recorded_at",
                "work_seconds",
                "rest_seconds",
                "completed_work",
                "completed_rest",
                "total_sets",
                "full",
                "preset",
            ])?;
        }
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    tracing::info!("Exported {} history entries to {:?}", entries.len(), path);
    Ok(entries.len())
}
