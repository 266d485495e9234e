//! SHA-256 checksum helpers for snapshot files
//!
//! Checksums are stored in manifests in tagged form (`sha256:<hex>`) so the
//! algorithm travels with the digest.

use crate::error::{CommonError, Result};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Tag prepended to hex digests in manifests
pub const SHA256_TAG: &str = "sha256:";

/// Hex-encoded SHA-256 of an in-memory buffer
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Compute a hex-encoded SHA-256 for any readable source
pub fn compute_checksum<R: Read>(reader: &mut R) -> Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compute a hex-encoded SHA-256 for a file
pub fn compute_file_checksum(path: impl AsRef<Path>) -> Result<String> {
    let mut file = std::fs::File::open(path)?;
    compute_checksum(&mut file)
}

/// `sha256:<hex>` form of a hex digest
pub fn tagged(hex_digest: &str) -> String {
    format!("{SHA256_TAG}{hex_digest}")
}

/// Strip the algorithm tag if present
pub fn untagged(checksum: &str) -> &str {
    checksum.strip_prefix(SHA256_TAG).unwrap_or(checksum)
}

/// Verify a file against an expected digest, tagged or bare
pub fn verify_file_checksum(path: impl AsRef<Path>, expected: &str) -> Result<()> {
    let actual = compute_file_checksum(path)?;
    let expected = untagged(expected);
    if actual == expected {
        Ok(())
    } else {
        Err(CommonError::ChecksumMismatch {
            expected: expected.to_string(),
            actual,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    const HELLO_WORLD: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn test_compute_checksum_sha256() {
        let mut cursor = Cursor::new(b"hello world");
        assert_eq!(compute_checksum(&mut cursor).unwrap(), HELLO_WORLD);
        assert_eq!(sha256_hex(b"hello world"), HELLO_WORLD);
    }

    #[test]
    fn test_tagging() {
        let tagged = tagged(HELLO_WORLD);
        assert!(tagged.starts_with("sha256:"));
        assert_eq!(untagged(&tagged), HELLO_WORLD);
        assert_eq!(untagged(HELLO_WORLD), HELLO_WORLD);
    }

    #[test]
    fn test_verify_file_checksum() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello world").unwrap();
        file.flush().unwrap();

        verify_file_checksum(file.path(), &tagged(HELLO_WORLD)).unwrap();

        let err = verify_file_checksum(file.path(), "deadbeef").unwrap_err();
        assert!(matches!(err, CommonError::ChecksumMismatch { .. }));
    }
}
