//! Checksum computation for box files
//!
//! Box files are hashed with SHA-256 before upload. The digest is recorded in
//! the manifest for downstream consumers; it is never re-verified here.

use crate::error::{BoxshelfError, Result};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Checksum type recorded next to every digest
pub const CHECKSUM_TYPE: &str = "sha256";

const BUFFER_SIZE: usize = 8192;

/// Compute the hex SHA-256 digest of a file.
///
/// The file is opened here and closed on return, so a later reader of the
/// same path starts from byte zero.
pub fn digest(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let mut file = std::fs::File::open(path).map_err(|e| BoxshelfError::io(path, e))?;
    digest_reader(&mut file).map_err(|e| BoxshelfError::io(path, e))
}

/// Compute the hex SHA-256 digest of any readable source
pub fn digest_reader<R: Read>(reader: &mut R) -> std::io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; BUFFER_SIZE];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Run [`digest`] on the blocking pool
pub async fn digest_file(path: impl Into<PathBuf>) -> Result<String> {
    let path = path.into();
    let task_path = path.clone();

    tokio::task::spawn_blocking(move || digest(&task_path))
        .await
        .map_err(|e| BoxshelfError::io(path, std::io::Error::other(e)))?
}
