//! Bounded-prefix content hashing

use std::fs::File;
use std::hash::Hasher as _;
use std::io::{self, Read};
use std::path::Path;
use twox_hash::XxHash64;

/// Read size for streaming the prefix through the hasher
const READ_CHUNK: usize = 64 * 1024;

/// Compute a 64-bit content digest (XxHash64, seed 0) over at most
/// `prefix_limit` leading bytes of the file.
///
/// The bounded prefix is a deliberate performance/identity trade-off: two
/// files that agree on their first `prefix_limit` bytes but differ beyond
/// it produce the same digest and will be grouped as duplicates. Callers
/// choose the cap via `Config::hash_prefix_limit`.
pub fn digest_file(path: &Path, prefix_limit: u64) -> io::Result<u64> {
    let file = File::open(path)?;
    let mut reader = file.take(prefix_limit);
    let mut hasher = XxHash64::with_seed(0);
    let mut buffer = vec![0u8; READ_CHUNK];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.write(&buffer[..bytes_read]);
    }

    Ok(hasher.finish())
}

/// Digest an in-memory byte slice with the same hasher the file path takes.
pub fn digest_bytes(data: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(data);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_same_content_same_digest() {
        let a = write_temp(b"identical bytes");
        let b = write_temp(b"identical bytes");
        let da = digest_file(a.path(), 1024).unwrap();
        let db = digest_file(b.path(), 1024).unwrap();
        assert_eq!(da, db);
        assert_eq!(da, digest_bytes(b"identical bytes"));
    }

    #[test]
    fn test_different_content_different_digest() {
        let a = write_temp(b"first file");
        let b = write_temp(b"second file");
        assert_ne!(
            digest_file(a.path(), 1024).unwrap(),
            digest_file(b.path(), 1024).unwrap()
        );
    }

    #[test]
    fn test_prefix_cap_collides_past_limit() {
        // Files identical within the cap but different beyond it collide.
        // This is the documented trade-off, not a bug.
        let mut head = vec![0xABu8; 256];
        let a = write_temp(&head);
        head.extend_from_slice(b"tail only in b");
        let b = write_temp(&head);

        assert_eq!(
            digest_file(a.path(), 256).unwrap(),
            digest_file(b.path(), 256).unwrap()
        );
        // With a larger cap the tail participates and they diverge.
        assert_ne!(
            digest_file(a.path(), 4096).unwrap(),
            digest_file(b.path(), 4096).unwrap()
        );
    }

    #[test]
    fn test_missing_file_errors() {
        let err = digest_file(Path::new("/no/such/file.jpg"), 1024).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_empty_file() {
        let file = write_temp(b"");
        let digest = digest_file(file.path(), 1024).unwrap();
        assert_eq!(digest, digest_bytes(b""));
    }
}
