//! Scan engine: one discovery stage feeding a pool of hashing workers
//!
//! Each worker owns a private partial index; nothing is shared on the
//! per-file hot path except the atomic counters. Partials merge on the
//! control thread once every worker has drained.

use crossbeam_channel::{bounded, Receiver};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

use crate::config::Config;
use crate::error::{ReconcileError, Result};
use crate::hasher;
use crate::models::{FileRecord, RunStats, ScanIndex};
use crate::walker;

/// Bound on discovered-but-unhashed file paths
const FILE_QUEUE_DEPTH: usize = 1024;

/// Scan the media tree and build the filesystem and digest indexes.
///
/// Fatal if the media root cannot be stat'ed. Returns only after the
/// discovery stage and every hashing worker have fully drained; no file
/// discovered before channel closure is dropped.
pub fn scan(config: &Config, stats: &Arc<RunStats>) -> Result<ScanIndex> {
    if let Err(err) = fs::metadata(&config.media_root) {
        return Err(ReconcileError::io_error(
            Some(config.media_root.clone()),
            format!("cannot open media root: {}", err),
        ));
    }

    let (file_tx, file_rx) = bounded::<PathBuf>(FILE_QUEUE_DEPTH);
    let walkers = walker::spawn(config, file_tx, Arc::clone(stats));

    let workers: Vec<_> = (0..config.effective_workers())
        .map(|id| {
            let file_rx = file_rx.clone();
            let stats = Arc::clone(stats);
            let root = config.media_root.clone();
            let prefix_limit = config.hash_prefix_limit;

            thread::Builder::new()
                .name(format!("hasher-{}", id))
                .spawn(move || hash_worker(&file_rx, &root, prefix_limit, &stats))
                .expect("failed to spawn hashing worker")
        })
        .collect();
    drop(file_rx);

    // The file channel disconnects when the last walker exits, which ends
    // every worker's receive loop.
    walkers.join();

    let mut index = ScanIndex::default();
    for worker in workers {
        if let Ok(partial) = worker.join() {
            index.merge(partial);
        }
    }

    // Tallied once over the merged index; per-worker counting would miss
    // groups that only form at merge time.
    stats
        .duplicate_files
        .store(index.duplicate_count(), Ordering::Relaxed);

    Ok(index)
}

/// Consume file paths until the channel closes, building a private index.
fn hash_worker(
    file_rx: &Receiver<PathBuf>,
    root: &Path,
    prefix_limit: u64,
    stats: &RunStats,
) -> ScanIndex {
    let mut partial = ScanIndex::default();
    for path in file_rx.iter() {
        if let Some(record) = process_file(&path, root, prefix_limit) {
            stats.total_files.fetch_add(1, Ordering::Relaxed);
            partial.insert(record);
        }
    }
    partial
}

/// Hash and stat one file. Any failure excludes the file from every index
/// and every statistic; totals understate rather than the run crashing.
fn process_file(path: &Path, root: &Path, prefix_limit: u64) -> Option<FileRecord> {
    let relative_path = relative_to_root(path, root)?;

    let digest = match hasher::digest_file(path, prefix_limit) {
        Ok(digest) => digest,
        Err(err) => {
            debug!("skipping unhashable file {:?}: {}", path, err);
            return None;
        }
    };

    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(err) => {
            debug!("skipping unstatable file {:?}: {}", path, err);
            return None;
        }
    };

    Some(FileRecord {
        relative_path,
        digest,
        size: metadata.len() as i64,
    })
}

/// Strip the root prefix, yielding the catalog's path form: forward slashes
/// with a leading separator. Empty and non-UTF-8 results are discarded.
fn relative_to_root(path: &Path, root: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let rel = rel.to_str()?;
    if rel.is_empty() {
        return None;
    }
    Some(format!("/{}", rel.replace('\\', "/")))
}
