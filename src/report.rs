//! Run summary rendering

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::models::RunOutcome;

/// Machine-readable wrapper around an outcome, with run timestamps.
#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    started_at: String,
    finished_at: String,
    #[serde(flatten)]
    outcome: &'a RunOutcome,
}

/// Render the human-readable summary block.
pub fn render_summary(outcome: &RunOutcome) -> String {
    let stats = &outcome.stats;
    let rule = "=".repeat(50);
    let mut out = String::new();

    out.push_str(&format!("{}\n", rule));
    out.push_str(&format!("Media gallery entries: {}\n", outcome.catalog_entries));
    out.push_str(&format!("Files in directory: {}\n", stats.total_files));
    out.push_str(&format!("Cached images: {}\n", stats.cached_files));
    out.push_str(&format!("Unused files: {}\n", stats.unused_files));
    out.push_str(&format!("Missing files: {}\n", stats.missing_files));
    out.push_str(&format!("Duplicated files: {}\n", stats.duplicate_files));
    out.push_str(&format!("{}\n", rule));

    if stats.removed_unused > 0 {
        out.push_str(&format!("Removed unused files: {}\n", stats.removed_unused));
    }
    if stats.removed_orphans > 0 {
        out.push_str(&format!("Removed orphaned rows: {}\n", stats.removed_orphans));
    }
    if stats.removed_duplicates > 0 {
        out.push_str(&format!(
            "Removed duplicated files: {}\n",
            stats.removed_duplicates
        ));
        out.push_str(&format!(
            "Updated attribute rows: {}\n",
            stats.updated_attribute_rows
        ));
        out.push_str(&format!(
            "Updated gallery rows: {}\n",
            stats.updated_gallery_rows
        ));
    }
    if stats.bytes_freed > 0 {
        out.push_str(&format!(
            "Disk space freed: {:.2} MB\n",
            stats.bytes_freed as f64 / 1024.0 / 1024.0
        ));
    }
    out.push_str(&rule);
    out
}

/// Render the outcome as pretty JSON with run timestamps.
pub fn render_json(
    outcome: &RunOutcome,
    started: DateTime<Local>,
    finished: DateTime<Local>,
) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonReport {
        started_at: started.to_rfc3339(),
        finished_at: finished.to_rfc3339(),
        outcome,
    })
}
