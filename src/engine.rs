//! Top-level orchestration: scan, read, classify, clean up

use log::info;
use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::cleanup;
use crate::config::Config;
use crate::db::CatalogDb;
use crate::error::Result;
use crate::models::{RunOutcome, RunStats};
use crate::reconcile;
use crate::scanner;

/// Execute one reconciliation run: scan the media tree, read the catalog,
/// classify, then apply whichever removal operations the config enables.
///
/// Cleanup batches run sequentially on the single shared connection. A
/// fatal error (unreachable root, failed catalog query) propagates before
/// any mutation; the caller renders the outcome and decides the exit.
pub fn run(config: &Config, db: &mut CatalogDb) -> Result<RunOutcome> {
    let stats = Arc::new(RunStats::default());

    info!(
        "scanning {:?} with {} workers",
        config.media_root,
        config.effective_workers()
    );
    let index = scanner::scan(config, &stats)?;

    info!("querying catalog");
    let referenced = db.referenced_paths()?;
    let catalog_entries = referenced.len() as u64;
    let catalog: HashSet<String> = referenced.into_iter().collect();

    let (unused, missing) = reconcile::classify(&index.files, &catalog);
    let duplicate_groups = reconcile::duplicate_groups(&index);
    stats
        .unused_files
        .store(unused.len() as u64, Ordering::Relaxed);
    stats
        .missing_files
        .store(missing.len() as u64, Ordering::Relaxed);

    if config.remove_unused {
        info!("removing {} unused files", unused.len());
        cleanup::remove_unused(&config.media_root, &unused, &stats);
    }

    if config.remove_orphans {
        info!("removing orphan rows for {} missing paths", missing.len());
        cleanup::remove_orphans(db, &missing, &stats);
    }

    if config.remove_duplicates {
        info!(
            "removing duplicates across {} groups",
            duplicate_groups.len()
        );
        cleanup::remove_duplicates(db, &config.media_root, &duplicate_groups, &stats);
    }

    Ok(RunOutcome {
        unused,
        missing,
        duplicate_groups,
        catalog_entries,
        stats: stats.snapshot(),
    })
}
