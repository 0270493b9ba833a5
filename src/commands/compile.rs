//! Compile command implementation.

use std::path::Path;

use crate::build::BuildSummary;
use crate::cli::GlobalOpts;
use crate::commands::configure_build;
use crate::error::Result;

/// Executes the compile command: build every stale source under the sources
/// directory.
pub fn compile(opts: &GlobalOpts, working_dir: &Path) -> Result<BuildSummary> {
    configure_build(opts, working_dir)?.run()
}
