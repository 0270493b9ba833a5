//! # cairo-hold
//!
//! Incremental compilation of Cairo contracts: only sources whose inputs
//! changed since their last successful compile are handed to the compiler.
//!
//! ## Overview
//!
//! Every successful compile records a fingerprint (modification time, size and
//! BLAKE3 content hash) of each file the compiler reported as a dependency.
//! On the next build a source is recompiled only if one of those files
//! changed in content, its artifact is missing, or the compiler version
//! differs. A file that was merely touched is not recompiled.
//!
//! ## Key Features
//!
//! - **Content-based change detection**: mtime and size as a cheap check,
//!   BLAKE3 hashing when they differ
//! - **Partial-failure tolerance**: one file failing to compile never stops
//!   the others, and every success is kept in the cache
//! - **Durable cache**: written back atomically after every dispatch, even when
//!   jobs failed
//! - **Parallel processing**: compiler processes run on a bounded rayon pool
//!
//! ## Architecture
//!
//! - [`cli`]: Command-line interface definitions using clap
//! - [`commands`]: Implementation of the cairo-hold subcommands
//! - [`build`]: The build coordinator tying the pieces together
//! - [`staleness`]: Deciding which sources must be compiled
//! - [`dispatch`]: Running compile jobs concurrently
//! - [`compiler`]: The external compiler and its diagnostics
//! - [`cache`]: Loading and saving the build cache
//! - [`state`]: The in-memory build cache
//! - [`fingerprint`]: Per-file fingerprints and the change check
//! - [`error`]: Error types and handling with thiserror + miette
//!
//! ## Usage in CI
//!
//! ```bash
//! # Restore cache/ and artifacts-starknet/ from the CI cache, then:
//! cairo-hold compile
//! ```
//!
//! ## Library Usage
//!
//! ```no_run
//! use cairo_hold::cli::{Cli, Commands};
//! use cairo_hold::commands;
//!
//! // Create CLI instance programmatically using the builder
//! let cli = Cli::builder()
//!     .sources_dir("contracts")
//!     .verbose(1)
//!     .command(Commands::Compile)
//!     .build()?;
//!
//! // Execute the command
//! commands::execute(&cli)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Error Handling
//!
//! The crate uses a combination of:
//! - `thiserror` for strongly-typed errors
//! - `miette` for rich diagnostic output in CLI
//!
//! All public functions return `Result` types with descriptive error variants.

// Re-export public modules for library usage
pub mod build;
pub mod cache;
pub mod cli;
pub mod commands;
pub mod compiler;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod fingerprint;
pub mod job;
pub mod logging;
pub mod manifest;
pub mod staleness;
pub mod state;

// Internal modules
mod hashing;
mod timestamp;
