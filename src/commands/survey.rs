//! Survey command implementation.

use std::path::Path;

use crate::cli::GlobalOpts;
use crate::commands::configure_build;
use crate::error::Result;
use crate::logging::{Logger, files};
use crate::staleness::Evaluation;

/// Executes the survey command (list stale sources without compiling).
///
/// Each stale source is printed to stdout as `<source>: <reason>`.
pub fn survey(opts: &GlobalOpts, working_dir: &Path) -> Result<Evaluation> {
    let log = Logger::new(opts.verbose(), opts.quiet());
    let evaluation = configure_build(opts, working_dir)?.survey()?;

    for stale in &evaluation.stale {
        println!("{}: {}", stale.job.source.display(), stale.reason);
    }
    for fresh in &evaluation.fresh {
        log.verbose(1, format!("{}: up to date", fresh.display()));
    }

    if evaluation.is_up_to_date() {
        log.info("No Cairo files to compile");
    } else {
        let total = evaluation.stale.len() + evaluation.fresh.len();
        log.info(format!(
            "{} of {total} Cairo {} would be compiled",
            evaluation.stale.len(),
            files(total)
        ));
    }

    Ok(evaluation)
}
