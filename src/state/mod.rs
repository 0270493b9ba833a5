use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HoldError, Result};
use crate::fingerprint::FileFingerprint;


/// Current version of the cache file format.
///
/// The tool refuses to load a cache with a version higher than this constant.
pub const CACHE_VERSION: u32 = 1;

/// Everything known about one source file's last successful compilation.
///
/// An entry is created the first time a file compiles and replaced wholesale
/// by every later successful compile. Failed compiles never touch it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct FileCacheEntry {
    /// Fingerprint of every file that participated in the compile, keyed by
    /// the path the compiler reported. Always contains the source itself.
    pub dependencies: BTreeMap<String, FileFingerprint>,

    /// `--version` output of the compiler that produced the artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiler_version: Option<String>,
}

impl FileCacheEntry {
    /// Creates an empty entry tagged with `compiler_version`.
    pub fn new(compiler_version: Option<String>) -> Self {
        Self {
            dependencies: BTreeMap::new(),
            compiler_version,
        }
    }

    /// Records the fingerprint of one dependency.
    ///
    /// Returns an error if the path contains invalid UTF-8.
    pub fn insert_dependency(&mut self, path: &Path, fingerprint: FileFingerprint) -> Result<()> {
        self.dependencies.insert(path_key(path)?, fingerprint);
        Ok(())
    }

    /// Checks whether `path` is one of the recorded dependencies.
    pub fn depends_on(&self, path: &Path) -> bool {
        path.to_str()
            .is_some_and(|key| self.dependencies.contains_key(key))
    }
}

/// The build cache: source path to the entry of its last successful compile.
///
/// Loaded once at the start of a build, mutated as jobs succeed and written
/// back once at the end of the build attempt.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BuildCache {
    /// Version of the cache format.
    pub version: u32,

    /// Entries keyed by UTF-8 source path. A `BTreeMap` keeps the persisted
    /// JSON stable between runs so it diffs cleanly.
    pub files: BTreeMap<String, FileCacheEntry>,
}

impl BuildCache {
    /// Creates a new empty cache with the current format version.
    pub fn new() -> Self {
        Self {
            version: CACHE_VERSION,
            files: BTreeMap::new(),
        }
    }

    /// Replaces the entry for `source`, returning the previous one.
    ///
    /// Returns an error if the path contains invalid UTF-8.
    pub fn insert(
        &mut self,
        source: &Path,
        entry: FileCacheEntry,
    ) -> Result<Option<FileCacheEntry>> {
        Ok(self.files.insert(path_key(source)?, entry))
    }

    /// Gets the entry for `source`, if it compiled successfully before.
    ///
    /// Returns an error if the path contains invalid UTF-8.
    pub fn get(&self, source: &Path) -> Result<Option<&FileCacheEntry>> {
        Ok(self.files.get(path_key(source)?.as_str()))
    }

    /// Removes the entry for `source`.
    ///
    /// Returns an error if the path contains invalid UTF-8.
    pub fn remove(&mut self, source: &Path) -> Result<Option<FileCacheEntry>> {
        Ok(self.files.remove(path_key(source)?.as_str()))
    }

    /// Checks if `source` has an entry.
    ///
    /// Returns an error if the path contains invalid UTF-8.
    pub fn contains(&self, source: &Path) -> Result<bool> {
        Ok(self.files.contains_key(path_key(source)?.as_str()))
    }

    /// Returns the number of cached source files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns `true` if nothing has been cached.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl Default for BuildCache {
    fn default() -> Self {
        Self::new()
    }
}

fn path_key(path: &Path) -> Result<String> {
    path.to_str()
        .map(str::to_string)
        .ok_or_else(|| HoldError::InvalidUtf8Path(path.to_path_buf()))
}
