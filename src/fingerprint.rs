//! Per-file fingerprints and the cheap-then-expensive change check.

use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HoldError, Result};
use crate::hashing::{file_metadata, hash_file};
use crate::timestamp::mtime_nanos;

/// Observed state of one file at the time it was recorded.
///
/// Fingerprints are never patched: a changed file gets a freshly captured
/// fingerprint that replaces the old one.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FileFingerprint {
    /// Modification time in nanoseconds since UNIX_EPOCH.
    pub mtime_nanos: u128,

    /// Size in bytes. Checked together with the mtime before hashing.
    pub size: u64,

    /// Hex-encoded BLAKE3 hash of the file's contents.
    pub hash: String,
}

impl FileFingerprint {
    /// Captures the current fingerprint of the file at `path`.
    pub fn capture(path: &Path) -> Result<Self> {
        let metadata = file_metadata(path)?;
        let mtime_nanos = mtime_nanos(path, &metadata)?;
        let hash = hash_file(path)?;

        Ok(Self {
            mtime_nanos,
            size: metadata.len(),
            hash,
        })
    }
}

/// Reports whether the file at `path` differs from `recorded`.
///
/// Matching mtime and size short-circuit to "unchanged" without reading the
/// file. Otherwise the content hash decides, so a file that was rewritten with
/// identical bytes is still unchanged. A file that no longer exists counts as
/// changed.
pub fn has_changed(path: &Path, recorded: &FileFingerprint) -> Result<bool> {
    let metadata = match file_metadata(path) {
        Ok(metadata) => metadata,
        Err(HoldError::IoError { source, .. }) if source.kind() == ErrorKind::NotFound => {
            return Ok(true);
        }
        Err(err) => return Err(err),
    };

    if mtime_nanos(path, &metadata)? == recorded.mtime_nanos && metadata.len() == recorded.size {
        return Ok(false);
    }

    match hash_file(path) {
        Ok(hash) => Ok(hash != recorded.hash),
        // Deleted between the stat and the read.
        Err(HoldError::IoError { source, .. }) if source.kind() == ErrorKind::NotFound => Ok(true),
        Err(err) => Err(err),
    }
}
