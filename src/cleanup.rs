//! Flag-gated destructive operations
//!
//! Each operation is independent and idempotent at the level of "already
//! removed" being a non-error no-op. Statistics reflect verified successes
//! only.

use log::{debug, info, warn};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use crate::db::{CatalogDb, REWRITE_BATCH};
use crate::models::{DuplicateGroup, RunStats};

/// Join a catalog-relative path (leading-slash form) onto the media root.
fn absolute_path(root: &Path, relative: &str) -> PathBuf {
    root.join(relative.trim_start_matches('/'))
}

/// Delete every unused file under the root. Size is observed immediately
/// before deletion; bytes freed and the removed count reflect verified
/// deletions only. Already-gone files and deletion failures are skipped.
pub fn remove_unused(root: &Path, unused: &[String], stats: &RunStats) {
    for relative in unused {
        let path = absolute_path(root, relative);

        let size = match fs::metadata(&path) {
            Ok(metadata) => metadata.len(),
            Err(err) if err.kind() == ErrorKind::NotFound => continue,
            Err(err) => {
                debug!("cannot stat {:?}, skipping: {}", path, err);
                continue;
            }
        };

        match fs::remove_file(&path) {
            Ok(()) => {
                stats.removed_unused.fetch_add(1, Ordering::Relaxed);
                stats.bytes_freed.fetch_add(size, Ordering::Relaxed);
                info!("removed unused file {}", relative);
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                debug!("cannot remove {:?}, skipping: {}", path, err);
            }
        }
    }
}

/// Delete every gallery row referencing a missing path. Batching and
/// early abort live in the database layer; the accumulated total counts
/// either way.
pub fn remove_orphans(db: &mut CatalogDb, missing: &[String], stats: &RunStats) -> u64 {
    let outcome = db.delete_gallery_rows(missing);
    if let Some(err) = outcome.error {
        warn!(
            "orphan removal stopped after {} batches: {}",
            outcome.batches_issued, err
        );
    }
    stats
        .removed_orphans
        .fetch_add(outcome.rows_affected, Ordering::Relaxed);
    outcome.rows_affected
}

/// Remove duplicate files: for each group the first-discovered record is
/// the retained original; every other member has its references rewritten
/// to the original and is then deleted.
///
/// Each batch is rewrite-then-delete: both table updates commit in one
/// transaction before any file is touched, so the catalog never points at
/// a path that no longer exists. A failed batch rolls back, keeps its
/// files, and aborts the remaining batches; retryable next run.
pub fn remove_duplicates(
    db: &mut CatalogDb,
    root: &Path,
    groups: &[DuplicateGroup],
    stats: &RunStats,
) {
    let mut mappings: Vec<(String, String, i64)> = Vec::new();
    for group in groups {
        let Some((original, duplicates)) = group.files.split_first() else {
            continue;
        };
        for duplicate in duplicates {
            mappings.push((
                duplicate.relative_path.clone(),
                original.relative_path.clone(),
                duplicate.size,
            ));
        }
    }

    for batch in mappings.chunks(REWRITE_BATCH) {
        let pairs: Vec<(String, String)> = batch
            .iter()
            .map(|(duplicate, original, _)| (duplicate.clone(), original.clone()))
            .collect();

        let (attribute_rows, gallery_rows) = match db.rewrite_references(&pairs) {
            Ok(rows) => rows,
            Err(err) => {
                // Rolled back: the batch's files stay on disk untouched.
                warn!("duplicate rewrite batch failed, keeping files: {}", err);
                return;
            }
        };
        stats
            .updated_attribute_rows
            .fetch_add(attribute_rows, Ordering::Relaxed);
        stats
            .updated_gallery_rows
            .fetch_add(gallery_rows, Ordering::Relaxed);

        // References are committed; deleting the files is best-effort.
        for (duplicate, original, size) in batch {
            let path = absolute_path(root, duplicate);
            match fs::remove_file(&path) {
                Ok(()) => {
                    stats.removed_duplicates.fetch_add(1, Ordering::Relaxed);
                    stats.bytes_freed.fetch_add((*size).max(0) as u64, Ordering::Relaxed);
                    info!("removed duplicate {} -> {}", duplicate, original);
                }
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => {
                    debug!("cannot remove {:?}, skipping: {}", path, err);
                }
            }
        }
    }
}
