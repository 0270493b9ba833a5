//! Bilge command implementation.

use std::path::Path;

use crate::cache::clean_cache;
use crate::error::Result;
use crate::logging::Logger;

/// Executes the bilge command (remove the build cache).
pub fn bilge(cache_path: &Path, verbose: u8, quiet: bool) -> Result<()> {
    let log = Logger::new(verbose, quiet);
    log.verbose(1, format!("Bilging out build cache at {cache_path:?}"));

    clean_cache(cache_path)?;

    log.verbose(1, "Build cache bilged successfully");

    Ok(())
}
