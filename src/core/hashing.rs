use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use crate::core::error::{ManifestError, Result};

/// Hex-encoded SHA-256 of `bytes`.
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Hex-encoded SHA-256 of a file's raw contents.
pub fn hash_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|err| ManifestError::io(path, err))?;
    Ok(hash_bytes(&bytes))
}
