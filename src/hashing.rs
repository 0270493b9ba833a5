use std::fs::{self, File, Metadata};
use std::path::Path;

use blake3::Hasher;
use memmap2::Mmap;

use crate::error::HoldError;

/// Computes the BLAKE3 hash of a file using memory mapping and parallel
/// processing.
///
/// Symbolic links are followed: compiler dependencies frequently live in
/// virtualenvs where library sources are linked in. Directories are rejected.
///
/// # Arguments
///
/// * `path` - Path to the file to hash
///
/// # Returns
///
/// A hex-encoded string of the file's BLAKE3 hash.
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be read
/// - The path points to a directory
/// - Memory mapping fails
pub fn hash_file(path: &Path) -> Result<String, HoldError> {
    let metadata = file_metadata(path)?;

    // Handle empty files without memory mapping
    if metadata.len() == 0 {
        let hasher = Hasher::new();
        return Ok(hasher.finalize().to_hex().to_string());
    }

    let file = File::open(path).map_err(|source| HoldError::io(path, source))?;

    let mmap = unsafe { Mmap::map(&file) }.map_err(|source| HoldError::io(path, source))?;

    let mut hasher = Hasher::new();
    hasher.update_rayon(&mmap);

    Ok(hasher.finalize().to_hex().to_string())
}

/// Reads the metadata of a regular file, following symbolic links.
///
/// # Errors
///
/// Returns an error if the file cannot be accessed or is a directory.
pub fn file_metadata(path: &Path) -> Result<Metadata, HoldError> {
    let metadata = fs::metadata(path).map_err(|source| HoldError::io(path, source))?;

    if metadata.is_dir() {
        return Err(HoldError::InvalidFileType {
            path: path.to_path_buf(),
            message: "Directories are not supported".to_string(),
        });
    }

    Ok(metadata)
}
