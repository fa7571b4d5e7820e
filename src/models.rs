//! Core data models for the media reconciler

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// One filesystem entity considered for reconciliation.
///
/// Created once per discovered file during a scan pass and immutable
/// afterwards. Files under the top-level cache subdirectory never become
/// records; they are only counted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path relative to the media root (root prefix stripped)
    pub relative_path: String,
    /// 64-bit content digest over the leading bytes of the file
    pub digest: u64,
    /// File size in bytes at scan time
    pub size: i64,
}

/// Result of a filesystem scan: the path index and the digest index.
#[derive(Debug, Default)]
pub struct ScanIndex {
    /// relative path -> record, one entry per distinct path
    pub files: HashMap<String, FileRecord>,
    /// digest -> records sharing that digest, in discovery order.
    ///
    /// The first record of each list is treated as the retained original
    /// during duplicate cleanup. Discovery order is nondeterministic across
    /// worker counts; this tie-break is a documented policy, not semantic
    /// precedence.
    pub by_digest: HashMap<u64, Vec<FileRecord>>,
}

impl ScanIndex {
    /// Fold a worker's partial index into this one. Path entries insert
    /// plainly (identical paths are never discovered twice by a correct
    /// walker); digest lists concatenate per digest.
    pub fn merge(&mut self, partial: ScanIndex) {
        self.files.extend(partial.files);
        for (digest, mut records) in partial.by_digest {
            self.by_digest.entry(digest).or_default().append(&mut records);
        }
    }

    /// Insert a single record into both maps.
    pub fn insert(&mut self, record: FileRecord) {
        self.by_digest
            .entry(record.digest)
            .or_default()
            .push(record.clone());
        self.files.insert(record.relative_path.clone(), record);
    }

    /// Count duplicates over the merged index: for every digest shared by
    /// more than one file, all but the first count. Only valid after the
    /// full merge; tallying during per-worker processing would double-count
    /// files that the merge later groups together.
    pub fn duplicate_count(&self) -> u64 {
        self.by_digest
            .values()
            .filter(|records| records.len() > 1)
            .map(|records| (records.len() - 1) as u64)
            .sum()
    }
}

/// A group of files sharing one content digest.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateGroup {
    /// The shared digest
    pub digest: u64,
    /// Members in discovery order; the first is the retained original
    pub files: Vec<FileRecord>,
}

/// Counters mutated concurrently during scanning and cleanup.
///
/// The only state shared between threads on the per-file hot path; all
/// increments are relaxed atomics, read once at the end via `snapshot`.
#[derive(Debug, Default)]
pub struct RunStats {
    /// Files that entered the filesystem index
    pub total_files: AtomicU64,
    /// Files under the top-level cache subtree (counted, never indexed)
    pub cached_files: AtomicU64,
    /// Files on disk with no catalog reference
    pub unused_files: AtomicU64,
    /// Catalog references with no file on disk
    pub missing_files: AtomicU64,
    /// Files sharing a digest with an earlier-discovered file
    pub duplicate_files: AtomicU64,
    /// Unused files verifiably deleted
    pub removed_unused: AtomicU64,
    /// Duplicate files verifiably deleted
    pub removed_duplicates: AtomicU64,
    /// Orphaned catalog rows deleted
    pub removed_orphans: AtomicU64,
    /// Bytes reclaimed by verified deletions
    pub bytes_freed: AtomicU64,
    /// Rows rewritten in the attribute-value table
    pub updated_attribute_rows: AtomicU64,
    /// Rows rewritten in the media-gallery table
    pub updated_gallery_rows: AtomicU64,
}

impl RunStats {
    /// Take a point-in-time copy of every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_files: self.total_files.load(Ordering::Relaxed),
            cached_files: self.cached_files.load(Ordering::Relaxed),
            unused_files: self.unused_files.load(Ordering::Relaxed),
            missing_files: self.missing_files.load(Ordering::Relaxed),
            duplicate_files: self.duplicate_files.load(Ordering::Relaxed),
            removed_unused: self.removed_unused.load(Ordering::Relaxed),
            removed_duplicates: self.removed_duplicates.load(Ordering::Relaxed),
            removed_orphans: self.removed_orphans.load(Ordering::Relaxed),
            bytes_freed: self.bytes_freed.load(Ordering::Relaxed),
            updated_attribute_rows: self.updated_attribute_rows.load(Ordering::Relaxed),
            updated_gallery_rows: self.updated_gallery_rows.load(Ordering::Relaxed),
        }
    }
}

/// Plain copy of the run counters for reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_files: u64,
    pub cached_files: u64,
    pub unused_files: u64,
    pub missing_files: u64,
    pub duplicate_files: u64,
    pub removed_unused: u64,
    pub removed_duplicates: u64,
    pub removed_orphans: u64,
    pub bytes_freed: u64,
    pub updated_attribute_rows: u64,
    pub updated_gallery_rows: u64,
}

/// Everything a run hands back to its caller: the classification sets plus
/// the final statistics. Rendering and process exit belong to the caller.
#[derive(Debug, Serialize)]
pub struct RunOutcome {
    /// Paths on disk with no catalog reference
    pub unused: Vec<String>,
    /// Catalog references with no file on disk
    pub missing: Vec<String>,
    /// Digest groups with more than one member
    pub duplicate_groups: Vec<DuplicateGroup>,
    /// Number of rows returned by the catalog query (before collapsing)
    pub catalog_entries: u64,
    /// Final counters
    pub stats: StatsSnapshot,
}
