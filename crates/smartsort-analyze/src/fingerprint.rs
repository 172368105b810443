//! Content fingerprints.
//!
//! Small files are hashed in full. Files at or above the sample threshold are
//! hashed from their size plus a window at each end, which is much cheaper but
//! cannot see differences in the middle of the file. Callers that need
//! certainty for large files re-hash them with [`full_hash`].

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use blake3::Hasher;

use smartsort_core::{AnalyzeConfig, ContentFingerprint, DEFAULT_SAMPLE_THRESHOLD};

const READ_BUFFER: usize = 64 * 1024;

/// Buffers at least this large are hashed with BLAKE3's rayon backend.
const PARALLEL_HASH_MIN: usize = 128 * 1024;

/// Size-dependent hashing policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerprintPolicy {
    /// Files at or above this size are sampled.
    pub sample_threshold: u64,
    /// Bytes read from each end of a sampled file.
    pub sample_window: usize,
}

impl Default for FingerprintPolicy {
    fn default() -> Self {
        Self {
            sample_threshold: DEFAULT_SAMPLE_THRESHOLD,
            sample_window: 8 * 1024,
        }
    }
}

impl FingerprintPolicy {
    pub fn from_config(config: &AnalyzeConfig) -> Self {
        Self {
            sample_threshold: config.sample_threshold,
            sample_window: config.sample_window,
        }
    }

    /// Check if a file of this size gets a sampled fingerprint.
    pub fn is_sampled(&self, size_bytes: u64) -> bool {
        size_bytes >= self.sample_threshold
    }
}

/// Compute the fingerprint of a file of known size.
pub fn fingerprint(
    path: &Path,
    size_bytes: u64,
    policy: &FingerprintPolicy,
) -> io::Result<ContentFingerprint> {
    if policy.is_sampled(size_bytes) {
        sampled_hash(path, size_bytes, policy.sample_window)
    } else {
        full_hash(path)
    }
}

/// BLAKE3 over the whole file content.
pub fn full_hash(path: &Path) -> io::Result<ContentFingerprint> {
    let mut file = File::open(path)?;
    let mut hasher = Hasher::new();
    let mut buffer = vec![0u8; READ_BUFFER * 4];

    loop {
        let bytes_read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if bytes_read >= PARALLEL_HASH_MIN {
            hasher.update_rayon(&buffer[..bytes_read]);
        } else {
            hasher.update(&buffer[..bytes_read]);
        }
    }

    Ok(ContentFingerprint::from_bytes(hasher.finalize().as_bytes()))
}

fn sampled_hash(path: &Path, size_bytes: u64, window: usize) -> io::Result<ContentFingerprint> {
    let mut file = File::open(path)?;
    let mut hasher = Hasher::new();
    hasher.update(&size_bytes.to_le_bytes());

    let mut head = Vec::with_capacity(window);
    (&mut file).take(window as u64).read_to_end(&mut head)?;
    hasher.update(&head);

    let actual_len = file.metadata()?.len();
    let tail_len = (window as u64).min(actual_len);
    if tail_len > 0 {
        file.seek(SeekFrom::End(-(tail_len as i64)))?;
        let mut tail = Vec::with_capacity(tail_len as usize);
        (&mut file).take(tail_len).read_to_end(&mut tail)?;
        hasher.update(&tail);
    }

    Ok(ContentFingerprint::from_bytes(hasher.finalize().as_bytes()))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn small_policy() -> FingerprintPolicy {
        FingerprintPolicy {
            sample_threshold: 64,
            sample_window: 8,
        }
    }

    #[test]
    fn test_full_hash_is_stable_and_content_based() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("one.txt"), "duplicate content here").unwrap();
        fs::write(temp.path().join("two.md"), "duplicate content here").unwrap();
        fs::write(temp.path().join("three.txt"), "unique content").unwrap();

        let policy = FingerprintPolicy::default();
        let one = fingerprint(&temp.path().join("one.txt"), 22, &policy).unwrap();
        let again = fingerprint(&temp.path().join("one.txt"), 22, &policy).unwrap();
        let two = fingerprint(&temp.path().join("two.md"), 22, &policy).unwrap();
        let three = fingerprint(&temp.path().join("three.txt"), 14, &policy).unwrap();

        assert_eq!(one, again);
        assert_eq!(one, two);
        assert_ne!(one, three);
        assert_eq!(one, full_hash(&temp.path().join("one.txt")).unwrap());
    }

    #[test]
    fn test_sampled_hash_ignores_middle() {
        let temp = TempDir::new().unwrap();
        let mut a = vec![b'x'; 128];
        let mut b = a.clone();
        a[64] = b'a';
        b[64] = b'b';
        fs::write(temp.path().join("a.bin"), &a).unwrap();
        fs::write(temp.path().join("b.bin"), &b).unwrap();

        let policy = small_policy();
        assert!(policy.is_sampled(128));
        let fa = fingerprint(&temp.path().join("a.bin"), 128, &policy).unwrap();
        let fb = fingerprint(&temp.path().join("b.bin"), 128, &policy).unwrap();
        assert_eq!(fa, fb);

        assert_ne!(
            full_hash(&temp.path().join("a.bin")).unwrap(),
            full_hash(&temp.path().join("b.bin")).unwrap()
        );
    }

    #[test]
    fn test_sampled_hash_includes_size() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.bin"), vec![b'x'; 100]).unwrap();
        fs::write(temp.path().join("b.bin"), vec![b'x'; 120]).unwrap();

        let policy = small_policy();
        let fa = fingerprint(&temp.path().join("a.bin"), 100, &policy).unwrap();
        let fb = fingerprint(&temp.path().join("b.bin"), 120, &policy).unwrap();
        assert_ne!(fa, fb);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp = TempDir::new().unwrap();
        let err = fingerprint(&temp.path().join("gone"), 10, &FingerprintPolicy::default())
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
