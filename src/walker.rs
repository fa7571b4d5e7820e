//! Parallel directory discovery with dynamic fan-out
//!
//! Directories are themselves units of work: each listing can enqueue more
//! listings, so the total is unknown up front. An in-flight counter tracks
//! outstanding units; when it reaches zero every walker returns, the last
//! file sender drops, and the downstream file channel closes exactly once.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use log::debug;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::{Config, CACHE_DIR_NAME};
use crate::models::RunStats;

/// Bound on pending directory listings
const DIR_QUEUE_DEPTH: usize = 1024;

/// How long an idle walker waits before re-checking the in-flight counter
const IDLE_POLL: Duration = Duration::from_millis(50);

/// One directory listing waiting to happen.
#[derive(Debug, Clone)]
struct DirWork {
    path: PathBuf,
    depth: usize,
    /// Inside the reserved top-level cache subtree
    cached: bool,
}

/// Handle to a running walker pool.
pub struct WalkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WalkerPool {
    /// Block until every walker thread has exited.
    pub fn join(self) {
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

/// Start the discovery stage: a pool of walker threads that list the media
/// root recursively and emit each qualifying file path exactly once into
/// `file_tx`. Files under a top-level directory named exactly `cache` are
/// counted in `stats.cached_files` and never emitted; deeper directories
/// with that name are ordinary. Unreadable directories are skipped.
///
/// The pool owns every clone of `file_tx`; the channel disconnects when the
/// last walker exits.
pub fn spawn(config: &Config, file_tx: Sender<PathBuf>, stats: Arc<RunStats>) -> WalkerPool {
    let (dir_tx, dir_rx) = bounded::<DirWork>(DIR_QUEUE_DEPTH);
    let in_flight = Arc::new(AtomicUsize::new(0));

    // Seed the root. The counter is incremented strictly before any unit is
    // handed to a worker, the root included.
    in_flight.fetch_add(1, Ordering::SeqCst);
    let _ = dir_tx.send(DirWork {
        path: config.media_root.clone(),
        depth: 0,
        cached: false,
    });

    let handles = (0..config.walker_threads())
        .map(|id| {
            let dir_rx = dir_rx.clone();
            let dir_tx = dir_tx.clone();
            let file_tx = file_tx.clone();
            let in_flight = Arc::clone(&in_flight);
            let stats = Arc::clone(&stats);
            let config = config.clone();

            thread::Builder::new()
                .name(format!("walker-{}", id))
                .spawn(move || {
                    walker_loop(&dir_rx, &dir_tx, &file_tx, &in_flight, &config, &stats);
                })
                .expect("failed to spawn walker thread")
        })
        .collect();

    // Drop the originals: once the walkers finish, both channels disconnect.
    drop(dir_tx);
    drop(file_tx);

    WalkerPool { handles }
}

/// Worker loop: pull a directory, list it, mark the unit complete. Exits
/// when the in-flight counter reads zero (no listing can enqueue more work)
/// or the directory channel disconnects.
fn walker_loop(
    dir_rx: &Receiver<DirWork>,
    dir_tx: &Sender<DirWork>,
    file_tx: &Sender<PathBuf>,
    in_flight: &AtomicUsize,
    config: &Config,
    stats: &RunStats,
) {
    loop {
        match dir_rx.recv_timeout(IDLE_POLL) {
            Ok(work) => {
                list_directory(&work, dir_tx, file_tx, in_flight, config, stats);
                // Decremented strictly after this unit's listing is done;
                // subdirectories it spawned are already counted.
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }
            Err(RecvTimeoutError::Timeout) => {
                if in_flight.load(Ordering::SeqCst) == 0 {
                    return;
                }
            }
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}

/// List one directory: emit qualifying files, enqueue subdirectories.
fn list_directory(
    work: &DirWork,
    dir_tx: &Sender<DirWork>,
    file_tx: &Sender<PathBuf>,
    in_flight: &AtomicUsize,
    config: &Config,
    stats: &RunStats,
) {
    let entries = match fs::read_dir(&work.path) {
        Ok(entries) => entries,
        Err(err) => {
            // Permission problems and race-deleted directories are skipped,
            // not retried.
            debug!("skipping unreadable directory {:?}: {}", work.path, err);
            return;
        }
    };

    for entry in entries {
        let Ok(entry) = entry else {
            continue;
        };
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let path = entry.path();

        if file_type.is_dir() {
            // The reserved name only applies at the top level of the root.
            let cached =
                work.cached || (work.depth == 0 && entry.file_name() == CACHE_DIR_NAME);

            in_flight.fetch_add(1, Ordering::SeqCst);
            let queued = DirWork {
                path,
                depth: work.depth + 1,
                cached,
            };
            if dir_tx.send(queued).is_err() {
                in_flight.fetch_sub(1, Ordering::SeqCst);
                return;
            }
        } else if file_type.is_file() {
            if work.cached {
                stats.cached_files.fetch_add(1, Ordering::Relaxed);
                continue;
            }

            let extension = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_lowercase())
                .unwrap_or_default();
            if !config.should_include_extension(&extension) {
                continue;
            }

            if file_tx.send(path).is_err() {
                return;
            }
        }
        // Symlinks and other entry types are ignored.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs::{create_dir_all, File};
    use std::path::Path;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        File::create(path).unwrap();
    }

    fn collect_walk(config: &Config) -> (HashSet<PathBuf>, u64) {
        let stats = Arc::new(RunStats::default());
        let (file_tx, file_rx) = bounded::<PathBuf>(1024);
        let pool = spawn(config, file_tx, Arc::clone(&stats));
        let found: HashSet<PathBuf> = file_rx.iter().collect();
        pool.join();
        let cached = stats.cached_files.load(Ordering::Relaxed);
        (found, cached)
    }

    #[test]
    fn test_discovers_media_files_once() {
        let root = TempDir::new().unwrap();
        create_dir_all(root.path().join("a/b")).unwrap();
        touch(&root.path().join("top.jpg"));
        touch(&root.path().join("a/one.png"));
        touch(&root.path().join("a/b/two.jpeg"));
        touch(&root.path().join("a/b/notes.txt"));

        let config = Config::builder()
            .media_root(root.path().to_path_buf())
            .workers(4)
            .build();
        let (found, cached) = collect_walk(&config);

        assert_eq!(found.len(), 3);
        assert!(found.contains(&root.path().join("top.jpg")));
        assert!(found.contains(&root.path().join("a/one.png")));
        assert!(found.contains(&root.path().join("a/b/two.jpeg")));
        assert_eq!(cached, 0);
    }

    #[test]
    fn test_top_level_cache_counted_not_emitted() {
        let root = TempDir::new().unwrap();
        create_dir_all(root.path().join("cache/resized/deep")).unwrap();
        create_dir_all(root.path().join("a/cache")).unwrap();
        touch(&root.path().join("cache/c1.jpg"));
        touch(&root.path().join("cache/resized/c2.jpg"));
        touch(&root.path().join("cache/resized/deep/c3.txt"));
        // Nested directory that merely shares the name is ordinary.
        touch(&root.path().join("a/cache/real.jpg"));
        touch(&root.path().join("a/kept.jpg"));

        let config = Config::builder()
            .media_root(root.path().to_path_buf())
            .workers(4)
            .build();
        let (found, cached) = collect_walk(&config);

        assert_eq!(found.len(), 2);
        assert!(found.contains(&root.path().join("a/cache/real.jpg")));
        assert!(found.contains(&root.path().join("a/kept.jpg")));
        // Every regular file under the cache subtree counts, media or not.
        assert_eq!(cached, 3);
    }

    #[test]
    fn test_extension_filter_case_insensitive() {
        let root = TempDir::new().unwrap();
        touch(&root.path().join("upper.JPG"));
        touch(&root.path().join("noext"));
        touch(&root.path().join("script.php"));

        let config = Config::builder()
            .media_root(root.path().to_path_buf())
            .workers(2)
            .build();
        let (found, _) = collect_walk(&config);

        assert_eq!(found.len(), 1);
        assert!(found.contains(&root.path().join("upper.JPG")));
    }

    #[test]
    fn test_empty_root() {
        let root = TempDir::new().unwrap();
        let config = Config::builder()
            .media_root(root.path().to_path_buf())
            .workers(2)
            .build();
        let (found, cached) = collect_walk(&config);
        assert!(found.is_empty());
        assert_eq!(cached, 0);
    }
}
