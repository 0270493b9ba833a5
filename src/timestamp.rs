use std::fs::Metadata;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::{HoldError, Result};

/// Convert SystemTime to nanoseconds since UNIX_EPOCH.
///
/// Times before the epoch clamp to zero.
pub fn system_time_to_nanos(time: SystemTime) -> u128 {
    time.duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_nanos()
}

/// Modification time recorded in `metadata`, in nanoseconds since UNIX_EPOCH.
pub fn mtime_nanos(path: &Path, metadata: &Metadata) -> Result<u128> {
    let modified = metadata
        .modified()
        .map_err(|source| HoldError::io(path, source))?;
    Ok(system_time_to_nanos(modified))
}
