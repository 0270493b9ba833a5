//! Error types for cairo-hold.
//!
//! This module defines all error types used throughout cairo-hold, using
//! a combination of `thiserror` for ergonomic error definitions and `miette`
//! for rich diagnostic output.
//!
//! # Error Handling Strategy
//!
//! - All errors derive from [`HoldError`]
//! - Per-file compiler failures are collected by the dispatcher and surface
//!   once, as [`HoldError::CompilationFailed`], after the cache was persisted
//! - Cache write failures are reported on their own and never folded into the
//!   compiler diagnostics
//! - Errors are automatically converted to `miette::Result` for CLI output
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use cairo_hold::error::{HoldError, Result};
//!
//! fn check_sources(path: &Path) -> Result<()> {
//!     if !path.is_dir() {
//!         return Err(HoldError::ConfigError {
//!             message: format!("'{}' is not a directory", path.display()),
//!         });
//!     }
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Error types that can occur in cairo-hold operations
#[derive(Error, Debug, Diagnostic)]
pub enum HoldError {
    /// The compiler executable could not be started.
    ///
    /// Raised by the `--version` query that runs once at the start of every
    /// build, before any job is dispatched.
    #[error("Starknet compiler '{program}' not found")]
    #[diagnostic(
        code(cairo_hold::compiler::not_found),
        help(
            "Did you forget to activate your venv? Use --compiler or CAIRO_HOLD_COMPILER to \
             point at the executable."
        )
    )]
    CompilerNotFound {
        /// The executable that was looked up
        program: PathBuf,
        /// The underlying spawn error
        #[source]
        source: std::io::Error,
    },

    /// The compiler started but its `--version` query failed.
    #[error("Failed to query version of compiler '{program}': {message}")]
    #[diagnostic(code(cairo_hold::compiler::version_error))]
    CompilerVersionError {
        /// The executable that was queried
        program: PathBuf,
        /// What went wrong
        message: String,
    },

    /// One or more compile jobs failed.
    ///
    /// This is the aggregate of every failed job of a build. It is raised only
    /// after all jobs finished and the cache was written back.
    #[error("compilation of cairo contracts failed:\n{report}")]
    #[diagnostic(
        code(cairo_hold::compile::failed),
        help("Files that compiled successfully were recorded in the cache.")
    )]
    CompilationFailed {
        /// Number of files that failed to compile
        failed: usize,
        /// Every failed file's cleaned diagnostic, one block per file
        report: String,
    },

    /// The compiler reported success but its dependency manifest could not be
    /// used.
    ///
    /// The dispatcher turns this into a failure of the affected job; it never
    /// aborts sibling jobs.
    #[error("Malformed dependency manifest '{path}': {message}")]
    #[diagnostic(code(cairo_hold::manifest::parse_error))]
    ManifestParseFailed {
        /// The manifest scratch file
        path: PathBuf,
        /// Description of the problem
        message: String,
    },

    /// Writing the build cache failed.
    ///
    /// Results of this run are not durable. Kept apart from compile failures
    /// so the two are never confused.
    #[error("Failed to write build cache '{path}'")]
    #[diagnostic(
        code(cairo_hold::cache::write_failed),
        help("Ensure you have write permissions for the cache directory.")
    )]
    CacheWriteFailed {
        /// The cache file that could not be written
        path: PathBuf,
        /// The underlying error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to deserialize the build cache.
    ///
    /// Loading recovers from this by starting over with an empty cache.
    #[error("Failed to deserialize build cache '{path}'")]
    #[diagnostic(
        code(cairo_hold::cache::deserialization_error),
        help("The cache file may be corrupted. Run 'cairo-hold bilge' to reset it.")
    )]
    DeserializationError {
        /// The cache file
        path: PathBuf,
        /// The underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// File system I/O error during cairo-hold operations.
    #[error("I/O error accessing '{path}'")]
    #[diagnostic(code(cairo_hold::io_error))]
    IoError {
        /// The path that caused the I/O error
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to create a directory for artifacts or the cache.
    #[error("Failed to create directory '{path}'")]
    #[diagnostic(
        code(cairo_hold::fs::create_dir_error),
        help("Ensure you have write permissions for the parent directory.")
    )]
    CreateDirError {
        /// The directory path that couldn't be created
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Attempted to fingerprint a non-regular file (symlink or directory).
    #[error("Invalid file type for '{path}': {message}")]
    #[diagnostic(
        code(cairo_hold::file::invalid_type),
        help("Only regular files can be tracked as dependencies.")
    )]
    InvalidFileType {
        /// The path of the invalid file
        path: PathBuf,
        /// Description of the file type issue
        message: String,
    },

    /// Walking the sources directory failed.
    #[error("Failed to discover sources under '{path}'")]
    #[diagnostic(
        code(cairo_hold::discovery::error),
        help("Check that --sources-dir points at a readable directory.")
    )]
    DiscoveryError {
        /// The root of the walk
        path: PathBuf,
        /// The underlying walk error
        #[source]
        source: walkdir::Error,
    },

    /// Invalid configuration, or a cache written by a newer cairo-hold.
    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(cairo_hold::config::error),
        help("Check the required configuration parameters.")
    )]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// A path cannot be stored in the cache because it is not UTF-8.
    #[error("Invalid UTF-8 in path: {0}")]
    #[diagnostic(
        code(cairo_hold::path::invalid_utf8),
        help("Source and dependency paths must be valid UTF-8 to be cached.")
    )]
    InvalidUtf8Path(
        /// The path containing invalid UTF-8
        PathBuf,
    ),
}

impl HoldError {
    /// Shorthand for an [`HoldError::IoError`] on `path`.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HoldError::IoError {
            path: path.into(),
            source,
        }
    }

    /// This error and its sources on one line, `outer: inner: ...`.
    ///
    /// Used where an error becomes plain diagnostic text, such as a job
    /// failure in the aggregate report.
    pub fn chain_message(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            message.push_str(": ");
            message.push_str(&err.to_string());
            source = err.source();
        }
        message
    }
}

/// Type alias for Results in this crate
pub type Result<T> = std::result::Result<T, HoldError>;
