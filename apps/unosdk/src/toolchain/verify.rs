//! SHA-256 checksums for downloaded archives.

use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::errors::SdkError;

/// Computes the SHA-256 of a file as lowercase hex.
///
/// # Errors
///
/// Returns [`SdkError::Io`] if the file cannot be opened or read.
pub fn compute_sha256(file_path: &Path) -> Result<String, SdkError> {
    let mut file = std::fs::File::open(file_path).map_err(|e| {
        SdkError::io(
            format!("failed to open {} for checksum", file_path.display()),
            e,
        )
    })?;

    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer).map_err(|e| {
            SdkError::io(
                format!("failed to read {} for checksum", file_path.display()),
                e,
            )
        })?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Verifies a file against an expected hex digest and returns the digest.
///
/// The comparison ignores case.
///
/// # Errors
///
/// Returns [`SdkError::ChecksumMismatch`] when the digests differ.
pub fn verify_checksum(file_path: &Path, expected: &str) -> Result<String, SdkError> {
    let computed = compute_sha256(file_path)?;
    if !computed.eq_ignore_ascii_case(expected.trim()) {
        return Err(SdkError::checksum_mismatch(expected.trim(), computed));
    }
    Ok(computed)
}
