//! Reading the dependency manifest the compiler writes for each job.
//!
//! The compiler emits a CMake-style list:
//!
//! ```text
//! SET (DEPENDENCIES
//! contracts/token/erc20.cairo
//! contracts/token/library.cairo
//! )
//! ```
//!
//! Framing lines and blank lines are dropped; every other line is a path.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{HoldError, Result};

/// Opening framing line of a dependency manifest.
pub const MANIFEST_OPEN: &str = "SET (DEPENDENCIES";

/// Closing framing line of a dependency manifest.
pub const MANIFEST_CLOSE: &str = ")";

/// Reads and parses the manifest at `path`.
///
/// The file is left in place; removing the scratch file is up to the caller.
///
/// # Errors
///
/// Returns [`HoldError::ManifestParseFailed`] if the file is missing,
/// unreadable, not UTF-8 or malformed.
pub fn read_dependency_manifest(path: &Path) -> Result<Vec<PathBuf>> {
    let bytes = fs::read(path).map_err(|e| HoldError::ManifestParseFailed {
        path: path.to_path_buf(),
        message: format!("could not read manifest: {e}"),
    })?;

    let text = String::from_utf8(bytes).map_err(|_| HoldError::ManifestParseFailed {
        path: path.to_path_buf(),
        message: "manifest is not valid UTF-8".to_string(),
    })?;

    parse_dependency_manifest(path, &text)
}

/// Parses manifest text into dependency paths, in order of first appearance.
///
/// `path` only labels errors. A manifest whose opening line is never closed
/// was cut short and is rejected, as is one that opens twice.
pub fn parse_dependency_manifest(path: &Path, text: &str) -> Result<Vec<PathBuf>> {
    let malformed = |message: &str| HoldError::ManifestParseFailed {
        path: path.to_path_buf(),
        message: message.to_string(),
    };

    let mut dependencies: Vec<PathBuf> = Vec::new();
    let mut open = false;

    for line in text.lines().map(str::trim) {
        match line {
            "" => {}
            MANIFEST_OPEN => {
                if open {
                    return Err(malformed("opening marker appears twice"));
                }
                open = true;
            }
            MANIFEST_CLOSE => open = false,
            dependency => {
                let dependency = PathBuf::from(dependency);
                if !dependencies.contains(&dependency) {
                    dependencies.push(dependency);
                }
            }
        }
    }

    if open {
        return Err(malformed("missing closing marker"));
    }

    Ok(dependencies)
}
