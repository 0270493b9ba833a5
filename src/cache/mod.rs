use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use serde::Deserialize;

use crate::error::{HoldError, Result};
use crate::logging::Logger;
use crate::state::{BuildCache, CACHE_VERSION};


/// Just enough of the cache document to read its version when the full
/// document does not parse.
#[derive(Deserialize)]
struct VersionProbe {
    version: u32,
}

/// Loads the build cache from disk.
///
/// A missing or empty cache file yields an empty cache. A cache that cannot be
/// parsed is treated as lost: a warning is logged, the file is removed and an
/// empty cache is returned, so every source gets recompiled.
///
/// # Errors
///
/// Returns an error if:
/// - The cache file exists but cannot be read due to I/O issues
/// - The cache was written by a newer cairo-hold
pub fn load_cache(cache_path: &Path, log: &Logger) -> Result<BuildCache> {
    load_or_recover(cache_path, log, true)
}

/// Loads the build cache without touching anything on disk.
///
/// Same as [`load_cache`], except that an unparsable cache file is left in
/// place.
pub fn read_cache(cache_path: &Path, log: &Logger) -> Result<BuildCache> {
    load_or_recover(cache_path, log, false)
}

fn load_or_recover(cache_path: &Path, log: &Logger, remove_unreadable: bool) -> Result<BuildCache> {
    match load_cache_inner(cache_path) {
        Ok(cache) => Ok(cache),
        Err(HoldError::DeserializationError { source, .. }) => {
            log.warn(format!(
                "Could not read build cache '{}' ({source}); starting with an empty cache",
                cache_path.display()
            ));

            if remove_unreadable && let Err(remove_err) = fs::remove_file(cache_path) {
                log.warn(format!("Could not remove unreadable cache file: {remove_err}"));
            }

            Ok(BuildCache::new())
        }
        Err(other) => Err(other),
    }
}

/// Internal function that loads the cache without automatic recovery.
fn load_cache_inner(cache_path: &Path) -> Result<BuildCache> {
    if !cache_path.exists() {
        return Ok(BuildCache::new());
    }

    let bytes = fs::read(cache_path).map_err(|source| HoldError::io(cache_path, source))?;

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(BuildCache::new());
    }

    let cache = match serde_json::from_slice::<BuildCache>(&bytes) {
        Ok(cache) => cache,
        Err(source) => {
            // A newer layout may not parse at all; report the version instead.
            if let Ok(probe) = serde_json::from_slice::<VersionProbe>(&bytes) {
                check_version(probe.version)?;
            }
            return Err(HoldError::DeserializationError {
                path: cache_path.to_path_buf(),
                source,
            });
        }
    };

    check_version(cache.version)?;

    Ok(cache)
}

fn check_version(version: u32) -> Result<()> {
    if version > CACHE_VERSION {
        return Err(HoldError::ConfigError {
            message: format!(
                "Cache version {version} is newer than supported version {CACHE_VERSION}. Please \
                 update cairo-hold."
            ),
        });
    }
    Ok(())
}

/// Saves the build cache to disk atomically as pretty-printed JSON.
///
/// The document is written to a temporary file first and then renamed over
/// the final location, so the cache file is never left partially written.
/// The parent directory is created if it doesn't exist.
///
/// # Errors
///
/// Every failure is reported as [`HoldError::CacheWriteFailed`].
pub fn save_cache(cache: &BuildCache, cache_path: &Path) -> Result<()> {
    let write_failed = |source: Box<dyn std::error::Error + Send + Sync>| {
        HoldError::CacheWriteFailed {
            path: cache_path.to_path_buf(),
            source,
        }
    };

    if let Some(parent) = cache_path.parent() {
        fs::create_dir_all(parent).map_err(|source| {
            write_failed(Box::new(HoldError::CreateDirError {
                path: parent.to_path_buf(),
                source,
            }))
        })?;
    }

    let mut bytes = serde_json::to_vec_pretty(cache).map_err(|e| write_failed(Box::new(e)))?;
    bytes.push(b'\n');

    let temp_path = cache_path.with_extension("tmp");

    let mut temp_file = File::create(&temp_path).map_err(|e| write_failed(Box::new(e)))?;
    temp_file
        .write_all(&bytes)
        .map_err(|e| write_failed(Box::new(e)))?;
    temp_file.sync_all().map_err(|e| write_failed(Box::new(e)))?;

    fs::rename(&temp_path, cache_path).map_err(|e| write_failed(Box::new(e)))?;

    Ok(())
}

/// Removes the cache file from disk.
///
/// This function is idempotent - it succeeds even if the cache file doesn't
/// exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be removed (e.g., due to
/// permission issues).
pub fn clean_cache(cache_path: &Path) -> Result<()> {
    if cache_path.exists() {
        fs::remove_file(cache_path).map_err(|source| HoldError::io(cache_path, source))?;
    }
    Ok(())
}
