//! Streaming SHA-256 content digests.

use crate::constants::HASH_BUFFER_SIZE;
use crate::core::SyncError;
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Lowercase hex SHA-256 of a file, read in 1 MiB chunks.
pub fn hash_file(path: &Path) -> Result<String> {
    let failure = |e: std::io::Error| SyncError::HashFailure {
        path: path.display().to_string(),
        reason: e.to_string(),
    };

    let file = File::open(path).map_err(failure)?;
    let mut reader = BufReader::with_capacity(HASH_BUFFER_SIZE, file);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];

    loop {
        let read = reader.read(&mut buffer).map_err(failure)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// [`hash_file`] on the blocking pool.
pub async fn hash_file_async(path: &Path) -> Result<String> {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || hash_file(&owned))
        .await
        .with_context(|| format!("Hash task for {} panicked", path.display()))?
}

/// Lowercase hex SHA-256 of a byte slice.
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
