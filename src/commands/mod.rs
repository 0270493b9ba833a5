//! Implementation of cairo-hold subcommands.
//!
//! `mod.rs` is a thin dispatcher; command logic lives in dedicated modules
//! (`compile`, `survey`, `bilge`).

use std::path::{Path, PathBuf};

use crate::build::Build;
use crate::cli::{Cli, Commands, GlobalOpts};
use crate::compiler::ExternalCompiler;
use crate::discovery::DirectorySources;
use crate::error::{HoldError, Result};
use crate::job::ArtifactLayout;
use crate::logging::Logger;

pub(crate) mod bilge;
pub(crate) mod compile;
pub(crate) mod survey;

pub use bilge::bilge;
pub use compile::compile;
pub use survey::survey;


/// Execute commands based on the parsed CLI arguments.
pub fn execute(cli: &Cli) -> Result<()> {
    execute_with_dir(cli, None)
}

/// Execute commands with an explicit working directory.
///
/// The working directory anchors every relative path and is where the
/// compiler runs.
pub fn execute_with_dir(cli: &Cli, working_dir: Option<&Path>) -> Result<()> {
    let opts = cli.global_opts();

    let current_dir = if let Some(dir) = working_dir {
        dir.to_path_buf()
    } else {
        std::env::current_dir().map_err(|source| HoldError::IoError {
            path: PathBuf::from("."),
            source,
        })?
    };

    match cli.command() {
        Commands::Compile => compile(opts, &current_dir).map(|_| ()),
        Commands::Survey => survey(opts, &current_dir).map(|_| ()),
        Commands::Bilge => bilge(
            &opts.get_cache_path(&current_dir),
            opts.verbose(),
            opts.quiet(),
        ),
    }
}

/// Wires the global options into a [`Build`] rooted at `working_dir`.
pub(crate) fn configure_build(opts: &GlobalOpts, working_dir: &Path) -> Result<Build> {
    let log = Logger::new(opts.verbose(), opts.quiet());
    // Shared by discovery and the artifact layout.
    let sources_dir = opts.get_sources_dir(working_dir);

    let compiler = ExternalCompiler::new(
        opts.get_compiler(working_dir),
        &opts.get_cairo_paths(),
        working_dir,
    )?;

    Build::builder()
        .sources(DirectorySources::new(&sources_dir, opts.extension()).relative_to(working_dir))
        .compiler(compiler)
        .layout(ArtifactLayout::new(
            sources_dir,
            opts.get_artifacts_dir(),
            opts.abi(),
        ))
        .cache_path(opts.get_cache_path(working_dir))
        .working_dir(working_dir)
        .jobs(opts.get_jobs())
        .logger(log)
        .build()
}
