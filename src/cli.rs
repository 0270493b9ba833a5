//! Command-line interface definitions for cairo-hold.
//!
//! This module defines the CLI structure using clap, including all subcommands
//! and their arguments. The main entry point is the [`Cli`] struct.
//!
//! # Example
//!
//! ```no_run
//! use cairo_hold::cli::{Cli, Commands};
//!
//! // Parse command-line arguments
//! let cli = Cli::parse_args();
//!
//! // Access the parsed command
//! match &cli.command() {
//!     Commands::Compile => println!("Compiling {:?}", cli.global_opts().sources_dir()),
//!     Commands::Survey => println!("Listing stale sources"),
//!     Commands::Bilge => println!("Removing the cache"),
//! }
//! ```

use std::path::{Component, Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::error::{HoldError, Result};


const DEFAULT_SOURCES_DIR: &str = "contracts";
const DEFAULT_ARTIFACTS_DIR: &str = "artifacts-starknet";
const DEFAULT_CACHE_PATH: &str = "cache/cairo-files-cache.json";
const DEFAULT_COMPILER: &str = "starknet-compile";
const DEFAULT_EXTENSION: &str = "cairo";

/// Main command-line interface for cairo-hold.
///
/// This struct represents the top-level CLI configuration, containing both
/// global options that apply to all commands and the specific subcommand
/// to execute.
#[derive(Parser)]
#[command(
    name = "cairo-hold",
    bin_name = "cairo-hold",
    author,
    version,
    about = "Incremental compilation of Cairo contracts",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    global_opts: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

/// Global options that apply to all cairo-hold commands.
///
/// Relative paths are interpreted against the working directory, which is
/// also where the compiler runs.
#[derive(Parser)]
pub struct GlobalOpts {
    /// Directory searched recursively for sources
    #[arg(
        long,
        global = true,
        default_value = DEFAULT_SOURCES_DIR,
        env = "CAIRO_HOLD_SOURCES_DIR"
    )]
    sources_dir: PathBuf,

    /// Directory compiled artifacts are written to
    #[arg(
        long,
        global = true,
        default_value = DEFAULT_ARTIFACTS_DIR,
        env = "CAIRO_HOLD_ARTIFACTS_DIR"
    )]
    artifacts_dir: PathBuf,

    /// Path to the build cache file
    #[arg(
        long,
        global = true,
        default_value = DEFAULT_CACHE_PATH,
        env = "CAIRO_HOLD_CACHE_PATH"
    )]
    cache_path: PathBuf,

    /// Compiler executable, looked up on PATH unless it contains a separator
    #[arg(
        long,
        global = true,
        default_value = DEFAULT_COMPILER,
        env = "CAIRO_HOLD_COMPILER"
    )]
    compiler: PathBuf,

    /// Additional import search paths passed to the compiler (comma-separated)
    #[arg(
        long,
        global = true,
        value_delimiter = ',',
        env = "CAIRO_HOLD_CAIRO_PATH"
    )]
    cairo_path: Vec<PathBuf>,

    /// Extension of the source files to track
    #[arg(
        long,
        global = true,
        default_value = DEFAULT_EXTENSION,
        env = "CAIRO_HOLD_EXTENSION"
    )]
    extension: String,

    /// Also write an ABI file next to every artifact
    #[arg(long, global = true, env = "CAIRO_HOLD_ABI")]
    abi: bool,

    /// Maximum number of concurrent compiler processes (defaults to the
    /// number of CPUs)
    #[arg(short, long, global = true, env = "CAIRO_HOLD_JOBS")]
    jobs: Option<usize>,

    /// Enable verbose output (use multiple times for more verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count, env = "CAIRO_HOLD_VERBOSE")]
    verbose: u8,

    /// Silence all output except for errors
    #[arg(
        short,
        long,
        global = true,
        conflicts_with = "verbose",
        env = "CAIRO_HOLD_QUIET"
    )]
    quiet: bool,
}

impl GlobalOpts {
    /// Create a new builder for constructing `GlobalOpts` programmatically.
    pub fn builder() -> GlobalOptsBuilder {
        GlobalOptsBuilder::default()
    }

    /// The sources directory, cleaned and made relative to `working_dir` when
    /// it lies inside it.
    ///
    /// Discovered sources keep this prefix, which makes the cache keys
    /// independent of where the project is checked out.
    pub fn get_sources_dir(&self, working_dir: &Path) -> PathBuf {
        let sources_dir = clean_path(&self.sources_dir);
        match sources_dir.strip_prefix(clean_path(working_dir)) {
            Ok(relative) => relative.to_path_buf(),
            Err(_) => sources_dir,
        }
    }

    /// The artifacts directory, cleaned but still relative when given relative.
    pub fn get_artifacts_dir(&self) -> PathBuf {
        clean_path(&self.artifacts_dir)
    }

    /// The absolute cache path.
    pub fn get_cache_path(&self, working_dir: &Path) -> PathBuf {
        normalize_path(working_dir, &self.cache_path)
    }

    /// The compiler to run: a bare name is kept for a PATH lookup, anything
    /// with a directory part is resolved against `working_dir`.
    pub fn get_compiler(&self, working_dir: &Path) -> PathBuf {
        if self.compiler.components().count() > 1 {
            normalize_path(working_dir, &self.compiler)
        } else {
            self.compiler.clone()
        }
    }

    /// The compiler search paths, cleaned.
    pub fn get_cairo_paths(&self) -> Vec<PathBuf> {
        self.cairo_path.iter().map(clean_path).collect()
    }

    /// Concurrency cap handed to the dispatcher; `0` means one job per CPU.
    pub fn get_jobs(&self) -> usize {
        self.jobs.unwrap_or(0)
    }

    pub fn sources_dir(&self) -> &Path {
        &self.sources_dir
    }

    pub fn artifacts_dir(&self) -> &Path {
        &self.artifacts_dir
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    pub fn compiler(&self) -> &Path {
        &self.compiler
    }

    pub fn cairo_path(&self) -> &[PathBuf] {
        &self.cairo_path
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn abi(&self) -> bool {
        self.abi
    }

    pub fn jobs(&self) -> Option<usize> {
        self.jobs
    }

    /// Get the verbose level
    pub fn verbose(&self) -> u8 {
        self.verbose
    }

    /// Check if quiet mode is enabled
    pub fn quiet(&self) -> bool {
        self.quiet
    }
}

/// Builder for constructing `GlobalOpts` programmatically.
///
/// Unset options take the same defaults as on the command line.
#[derive(Debug, Default)]
pub struct GlobalOptsBuilder {
    sources_dir: Option<PathBuf>,
    artifacts_dir: Option<PathBuf>,
    cache_path: Option<PathBuf>,
    compiler: Option<PathBuf>,
    cairo_path: Vec<PathBuf>,
    extension: Option<String>,
    abi: bool,
    jobs: Option<usize>,
    verbose: u8,
    quiet: bool,
}

impl GlobalOptsBuilder {
    pub fn sources_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.sources_dir = Some(dir.into());
        self
    }

    pub fn artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = Some(dir.into());
        self
    }

    pub fn cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = Some(path.into());
        self
    }

    pub fn compiler(mut self, compiler: impl Into<PathBuf>) -> Self {
        self.compiler = Some(compiler.into());
        self
    }

    pub fn cairo_path(mut self, paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.cairo_path = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    pub fn abi(mut self, abi: bool) -> Self {
        self.abi = abi;
        self
    }

    pub fn jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs;
        self
    }

    /// Set the verbosity level (0 = normal, 1+ = verbose).
    pub fn verbose(mut self, level: u8) -> Self {
        self.verbose = level;
        self
    }

    /// Enable or disable quiet mode.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Build the `GlobalOpts` instance with the configured values.
    pub fn build(self) -> GlobalOpts {
        GlobalOpts {
            sources_dir: self
                .sources_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCES_DIR)),
            artifacts_dir: self
                .artifacts_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ARTIFACTS_DIR)),
            cache_path: self
                .cache_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_PATH)),
            compiler: self
                .compiler
                .unwrap_or_else(|| PathBuf::from(DEFAULT_COMPILER)),
            cairo_path: self.cairo_path,
            extension: self
                .extension
                .unwrap_or_else(|| DEFAULT_EXTENSION.to_string()),
            abi: self.abi,
            jobs: self.jobs,
            verbose: self.verbose,
            quiet: self.quiet,
        }
    }
}

impl Cli {
    /// Get the global options
    pub fn global_opts(&self) -> &GlobalOpts {
        &self.global_opts
    }

    /// Get the command
    pub fn command(&self) -> &Commands {
        &self.command
    }

    /// Create a builder for programmatic construction
    pub fn builder() -> CliBuilder {
        CliBuilder::default()
    }

    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Builder for [`Cli`]
#[derive(Debug, Default)]
pub struct CliBuilder {
    global: GlobalOptsBuilder,
    command: Option<Commands>,
}

impl CliBuilder {
    /// Set every global option at once
    pub fn global_opts(mut self, global: GlobalOptsBuilder) -> Self {
        self.global = global;
        self
    }

    /// Set the sources directory
    pub fn sources_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.global = self.global.sources_dir(dir);
        self
    }

    /// Set the artifacts directory
    pub fn artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.global = self.global.artifacts_dir(dir);
        self
    }

    /// Set the cache path
    pub fn cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.global = self.global.cache_path(path);
        self
    }

    /// Set the compiler executable
    pub fn compiler(mut self, compiler: impl Into<PathBuf>) -> Self {
        self.global = self.global.compiler(compiler);
        self
    }

    /// Set the verbose level
    pub fn verbose(mut self, level: u8) -> Self {
        self.global = self.global.verbose(level);
        self
    }

    /// Enable quiet mode
    pub fn quiet(mut self, enabled: bool) -> Self {
        self.global = self.global.quiet(enabled);
        self
    }

    /// Set the command
    pub fn command(mut self, command: Commands) -> Self {
        self.command = Some(command);
        self
    }

    /// Build the Cli instance
    pub fn build(self) -> Result<Cli> {
        let command = self.command.ok_or(HoldError::ConfigError {
            message: "Command is required".to_string(),
        })?;

        Ok(Cli {
            global_opts: self.global.build(),
            command,
        })
    }
}

/// Resolves `path` against `base` and cleans it, without requiring it to
/// exist.
///
/// Absolute paths ignore `base`. Symlinks are not resolved.
pub(crate) fn normalize_path(base: &Path, path: impl AsRef<Path>) -> PathBuf {
    clean_path(base.join(path))
}

/// Removes `.` components and folds `..` into its parent where possible.
///
/// Purely lexical: relative paths stay relative and leading `..` components
/// are kept.
pub(crate) fn clean_path(path: impl AsRef<Path>) -> PathBuf {
    let mut components = Vec::new();
    for component in path.as_ref().components() {
        match component {
            Component::ParentDir => {
                match components.last() {
                    Some(Component::Normal(_)) => {
                        components.pop();
                    }
                    // `..` at the root stays at the root
                    Some(Component::RootDir | Component::Prefix(_)) => {}
                    _ => components.push(component),
                }
            }
            Component::CurDir => continue,
            _ => components.push(component),
        }
    }

    components.into_iter().collect()
}

/// Available cairo-hold subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compile every stale source (recommended CI command)
    ///
    /// Discovers sources, decides which ones are stale against the build
    /// cache, compiles those concurrently and writes the cache back:
    /// - Sources whose recorded dependencies are unchanged are skipped
    /// - A missing artifact or a different compiler version forces a compile
    /// - Results of files that compiled are kept even when others fail
    Compile,

    /// Survey which sources are stale, and why
    ///
    /// Runs discovery and the staleness check only. Nothing is compiled and
    /// the cache is not written.
    Survey,

    /// Bilge out the build cache
    ///
    /// Removes the cache file, so the next compile rebuilds everything.
    /// Use this when the cache is suspected to be out of sync with the
    /// artifacts on disk.
    Bilge,
}
