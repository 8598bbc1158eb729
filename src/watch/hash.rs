// src/watch/hash.rs

use std::io::Read;
use std::path::Path;

use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;

/// Hex-encoded content digest of a file.
pub type Digest = String;

/// Digest reported for a file that cannot be opened or read.
///
/// Real digests are always 64 hex characters (including the digest of an empty
/// file), so this never collides with an existing file's value.
pub const EMPTY_DIGEST: &str = "";

const CHUNK_SIZE: usize = 8192;

/// Compute the digest of a single file, streaming it in fixed-size chunks.
///
/// Never fails: a missing or unreadable file yields [`EMPTY_DIGEST`].
pub fn compute_file_digest(fs: &dyn FileSystem, path: &Path) -> Digest {
    match try_compute_file_digest(fs, path) {
        Ok(digest) => digest,
        Err(err) => {
            debug!(path = ?path, error = %err, "file unreadable; using empty digest");
            EMPTY_DIGEST.to_string()
        }
    }
}

fn try_compute_file_digest(fs: &dyn FileSystem, path: &Path) -> anyhow::Result<Digest> {
    let mut hasher = Hasher::new();
    let mut file = fs.open_read(path)?;
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}
