//! Configuration for the media reconciler

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Default number of hashing workers
pub const DEFAULT_WORKERS: usize = 10;

/// Default cap on how many leading bytes of a file are hashed (4 MB)
pub const DEFAULT_HASH_PREFIX_LIMIT: u64 = 4 * 1024 * 1024;

/// Name of the reserved cache subdirectory at the top level of the media
/// root. Files below it are counted but never indexed.
pub const CACHE_DIR_NAME: &str = "cache";

/// Configuration for a reconciliation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root of the media asset tree
    pub media_root: PathBuf,

    /// Path to the catalog database file
    pub db_path: PathBuf,

    /// Table name prefix applied to every catalog table
    pub table_prefix: String,

    /// Number of parallel hashing workers
    pub workers: usize,

    /// How many leading bytes of each file feed the content digest.
    ///
    /// Two files identical up to this limit but differing beyond it hash
    /// identically and are grouped as duplicates. Raising the limit trades
    /// scan speed for identity precision.
    pub hash_prefix_limit: u64,

    /// File extensions treated as media assets (lowercase, no dot)
    pub extensions: HashSet<String>,

    /// Print the unused-file list
    pub list_unused: bool,
    /// Print the missing-file list
    pub list_missing: bool,
    /// Print duplicate groups
    pub list_duplicates: bool,
    /// Delete files with no catalog reference
    pub remove_unused: bool,
    /// Delete catalog rows referencing files that no longer exist
    pub remove_orphans: bool,
    /// Rewrite references to duplicates and delete the duplicate files
    pub remove_duplicates: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            media_root: PathBuf::new(),
            db_path: PathBuf::new(),
            table_prefix: String::new(),
            workers: DEFAULT_WORKERS,
            hash_prefix_limit: DEFAULT_HASH_PREFIX_LIMIT,
            extensions: Self::default_extensions(),
            list_unused: false,
            list_missing: false,
            list_duplicates: false,
            remove_unused: false,
            remove_orphans: false,
            remove_duplicates: false,
        }
    }
}

impl Config {
    /// Create a config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Get the default image extensions
    pub fn default_image_extensions() -> HashSet<String> {
        ["jpg", "jpeg", "png", "gif", "webp", "bmp", "tiff", "tif"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Get the default video extensions
    pub fn default_video_extensions() -> HashSet<String> {
        [
            "mp4", "mkv", "avi", "wmv", "flv", "mov", "webm", "m4v", "ts", "rmvb",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    /// Get all default media extensions
    pub fn default_extensions() -> HashSet<String> {
        let mut extensions = Self::default_image_extensions();
        extensions.extend(Self::default_video_extensions());
        extensions
    }

    /// Check if an extension belongs to a media asset
    pub fn should_include_extension(&self, ext: &str) -> bool {
        self.extensions.contains(&ext.to_lowercase())
    }

    /// Get the effective number of hashing workers (at least 1)
    pub fn effective_workers(&self) -> usize {
        self.workers.max(1)
    }

    /// Get the size of the directory-discovery pool: roughly half the
    /// hashing worker count, never fewer than 2.
    pub fn walker_threads(&self) -> usize {
        (self.effective_workers() / 2).max(2)
    }
}

/// Builder for Config
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the media root directory
    pub fn media_root(mut self, root: PathBuf) -> Self {
        self.config.media_root = root;
        self
    }

    /// Set the catalog database path
    pub fn db_path(mut self, path: PathBuf) -> Self {
        self.config.db_path = path;
        self
    }

    /// Set the catalog table name prefix
    pub fn table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.table_prefix = prefix.into();
        self
    }

    /// Set the number of hashing workers
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Set the hash prefix limit in bytes
    pub fn hash_prefix_limit(mut self, limit: u64) -> Self {
        self.config.hash_prefix_limit = limit;
        self
    }

    /// Set the extension allow-list
    pub fn extensions(mut self, extensions: HashSet<String>) -> Self {
        self.config.extensions = extensions;
        self
    }

    /// Restrict to image extensions only
    pub fn images_only(mut self) -> Self {
        self.config.extensions = Config::default_image_extensions();
        self
    }

    /// Enable or disable listing of unused files
    pub fn list_unused(mut self, enabled: bool) -> Self {
        self.config.list_unused = enabled;
        self
    }

    /// Enable or disable listing of missing files
    pub fn list_missing(mut self, enabled: bool) -> Self {
        self.config.list_missing = enabled;
        self
    }

    /// Enable or disable listing of duplicate groups
    pub fn list_duplicates(mut self, enabled: bool) -> Self {
        self.config.list_duplicates = enabled;
        self
    }

    /// Enable or disable deletion of unused files
    pub fn remove_unused(mut self, enabled: bool) -> Self {
        self.config.remove_unused = enabled;
        self
    }

    /// Enable or disable deletion of orphaned catalog rows
    pub fn remove_orphans(mut self, enabled: bool) -> Self {
        self.config.remove_orphans = enabled;
        self
    }

    /// Enable or disable duplicate removal
    pub fn remove_duplicates(mut self, enabled: bool) -> Self {
        self.config.remove_duplicates = enabled;
        self
    }

    /// Build the config
    pub fn build(self) -> Config {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.workers, DEFAULT_WORKERS);
        assert_eq!(config.hash_prefix_limit, DEFAULT_HASH_PREFIX_LIMIT);
        assert!(!config.remove_unused);
        assert!(!config.remove_orphans);
        assert!(!config.remove_duplicates);
    }

    #[test]
    fn test_default_extensions() {
        let extensions = Config::default_extensions();
        assert!(extensions.contains("jpg"));
        assert!(extensions.contains("png"));
        assert!(extensions.contains("mp4"));
        assert!(!extensions.contains("txt"));
    }

    #[test]
    fn test_should_include_extension() {
        let config = Config::default();
        assert!(config.should_include_extension("jpg"));
        assert!(config.should_include_extension("JPG"));
        assert!(!config.should_include_extension("php"));
        assert!(!config.should_include_extension(""));
    }

    #[test]
    fn test_config_builder() {
        let config = Config::builder()
            .media_root(PathBuf::from("/media/catalog/product"))
            .db_path(PathBuf::from("catalog.db"))
            .table_prefix("mg2_")
            .workers(4)
            .images_only()
            .remove_unused(true)
            .build();

        assert_eq!(config.media_root, PathBuf::from("/media/catalog/product"));
        assert_eq!(config.table_prefix, "mg2_");
        assert_eq!(config.workers, 4);
        assert!(config.remove_unused);
        assert!(config.extensions.contains("jpg"));
        assert!(!config.extensions.contains("mp4"));
    }

    #[test]
    fn test_worker_derivation() {
        let config = Config::builder().workers(10).build();
        assert_eq!(config.effective_workers(), 10);
        assert_eq!(config.walker_threads(), 5);

        // Walker pool never drops below 2, even for tiny worker counts
        let small = Config::builder().workers(1).build();
        assert_eq!(small.walker_threads(), 2);

        // Zero workers still hash on one thread
        let zero = Config::builder().workers(0).build();
        assert_eq!(zero.effective_workers(), 1);
        assert_eq!(zero.walker_threads(), 2);
    }
}
