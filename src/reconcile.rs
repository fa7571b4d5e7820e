//! Pure classification of scan results against the catalog
//!
//! No side effects; fully deterministic for identical inputs. Emitted
//! order follows map iteration and is not a contract; callers sort when
//! they need stable output.

use std::collections::{HashMap, HashSet};

use crate::models::{DuplicateGroup, FileRecord, ScanIndex};

/// Partition paths into (unused, missing):
/// unused = filesystem keys not referenced by the catalog,
/// missing = catalog references with no file on disk.
pub fn classify(
    files: &HashMap<String, FileRecord>,
    catalog: &HashSet<String>,
) -> (Vec<String>, Vec<String>) {
    let unused = files
        .keys()
        .filter(|path| !catalog.contains(*path))
        .cloned()
        .collect();

    let missing = catalog
        .iter()
        .filter(|path| !files.contains_key(*path))
        .cloned()
        .collect();

    (unused, missing)
}

/// Extract every digest group with more than one member. Member order is
/// the index's discovery order; the first entry is the retained original.
pub fn duplicate_groups(index: &ScanIndex) -> Vec<DuplicateGroup> {
    index
        .by_digest
        .iter()
        .filter(|(_, records)| records.len() > 1)
        .map(|(digest, records)| DuplicateGroup {
            digest: *digest,
            files: records.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(path: &str, digest: u64) -> FileRecord {
        FileRecord {
            relative_path: path.to_string(),
            digest,
            size: 1,
        }
    }

    fn index_of(records: Vec<FileRecord>) -> ScanIndex {
        let mut index = ScanIndex::default();
        for rec in records {
            index.insert(rec);
        }
        index
    }

    #[test]
    fn test_concrete_scenario() {
        // Filesystem {a, b, c} with digests {1, 1, 2}; catalog {a, d}.
        let index = index_of(vec![
            record("/a.jpg", 1),
            record("/b.jpg", 1),
            record("/c.jpg", 2),
        ]);
        let catalog: HashSet<String> =
            ["/a.jpg", "/d.jpg"].iter().map(|s| s.to_string()).collect();

        let (mut unused, missing) = classify(&index.files, &catalog);
        unused.sort();
        assert_eq!(unused, vec!["/b.jpg", "/c.jpg"]);
        assert_eq!(missing, vec!["/d.jpg"]);

        let groups = duplicate_groups(&index);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].digest, 1);
        assert_eq!(groups[0].files.len(), 2);
        // One member survives as the original, the rest are removable.
        // Which one survives is discovery-order dependent.
        let members: HashSet<&str> = groups[0]
            .files
            .iter()
            .map(|f| f.relative_path.as_str())
            .collect();
        assert_eq!(members, ["/a.jpg", "/b.jpg"].into_iter().collect());
    }

    #[test]
    fn test_empty_catalog_marks_everything_unused() {
        let index = index_of(vec![record("/a.jpg", 1), record("/b.jpg", 2)]);
        let (mut unused, missing) = classify(&index.files, &HashSet::new());
        unused.sort();
        assert_eq!(unused, vec!["/a.jpg", "/b.jpg"]);
        assert!(missing.is_empty());
    }

    #[test]
    fn test_no_groups_without_collisions() {
        let index = index_of(vec![record("/a.jpg", 1), record("/b.jpg", 2)]);
        assert!(duplicate_groups(&index).is_empty());
    }

    proptest! {
        #[test]
        fn prop_classify_is_exact_set_difference(
            fs_paths in proptest::collection::hash_set("[a-z]{1,8}", 0..40),
            catalog in proptest::collection::hash_set("[a-z]{1,8}", 0..40),
        ) {
            let files: HashMap<String, FileRecord> = fs_paths
                .iter()
                .map(|p| (p.clone(), record(p, 0)))
                .collect();

            let (unused, missing) = classify(&files, &catalog);
            let unused: HashSet<String> = unused.into_iter().collect();
            let missing: HashSet<String> = missing.into_iter().collect();

            let expected_unused: HashSet<String> =
                fs_paths.difference(&catalog).cloned().collect();
            let expected_missing: HashSet<String> =
                catalog.difference(&fs_paths).cloned().collect();

            prop_assert_eq!(&unused, &expected_unused);
            prop_assert_eq!(&missing, &expected_missing);

            // Partition sanity: nothing unused is referenced, nothing
            // missing exists on disk.
            prop_assert!(unused.is_disjoint(&catalog));
            prop_assert!(missing.is_disjoint(&fs_paths));
        }
    }
}
