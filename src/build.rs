//! The build coordinator.
//!
//! One build is a linear pipeline that is never re-entered:
//!
//! ```text
//! Idle -> Discovering -> Evaluating -> Dispatching -> Persisting -> Reporting -> Done
//! ```
//!
//! When evaluation finds nothing to compile the build finishes right after
//! `Evaluating` and the cache is left untouched. Once jobs were dispatched the
//! cache is always written back before anything is reported, including when
//! jobs failed or the dispatch panicked.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use crate::cache::{load_cache, read_cache, save_cache};
use crate::compiler::Compiler;
use crate::discovery::SourceProvider;
use crate::dispatch::Dispatcher;
use crate::error::{HoldError, Result};
use crate::job::ArtifactLayout;
use crate::logging::{Logger, files};
use crate::staleness::{Evaluation, files_to_compile};
use crate::state::BuildCache;


/// Phases of a build, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BuildPhase {
    Idle,
    Discovering,
    Evaluating,
    Dispatching,
    Persisting,
    Reporting,
    Done,
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildPhase::Idle => "idle",
            BuildPhase::Discovering => "discovering",
            BuildPhase::Evaluating => "evaluating",
            BuildPhase::Dispatching => "dispatching",
            BuildPhase::Persisting => "persisting",
            BuildPhase::Reporting => "reporting",
            BuildPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Counts reported at the end of a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub compiled: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// A configured build of one project.
pub struct Build {
    sources: Box<dyn SourceProvider>,
    compiler: Box<dyn Compiler>,
    layout: ArtifactLayout,
    cache_path: PathBuf,
    working_dir: PathBuf,
    jobs: usize,
    log: Logger,
}

/// Builder for [`Build`].
pub struct BuildBuilder {
    sources: Option<Box<dyn SourceProvider>>,
    compiler: Option<Box<dyn Compiler>>,
    layout: Option<ArtifactLayout>,
    cache_path: Option<PathBuf>,
    working_dir: Option<PathBuf>,
    jobs: usize,
    log: Logger,
}

impl Default for BuildBuilder {
    fn default() -> Self {
        Self {
            sources: None,
            compiler: None,
            layout: None,
            cache_path: None,
            working_dir: None,
            jobs: 0,
            log: Logger::new(0, false),
        }
    }
}

impl BuildBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sources(mut self, sources: impl SourceProvider + 'static) -> Self {
        self.sources = Some(Box::new(sources));
        self
    }

    pub fn compiler(mut self, compiler: impl Compiler + 'static) -> Self {
        self.compiler = Some(Box::new(compiler));
        self
    }

    pub fn layout(mut self, layout: ArtifactLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = Some(path.into());
        self
    }

    /// Directory the compiler runs in; relative paths are resolved against it.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Maximum number of concurrent compiler processes, `0` for one per CPU.
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn logger(mut self, log: Logger) -> Self {
        self.log = log;
        self
    }

    pub fn build(self) -> Result<Build> {
        let required = |field: &str| HoldError::ConfigError {
            message: format!("{field} is required"),
        };

        let working_dir = self.working_dir.ok_or_else(|| required("working_dir"))?;
        let cache_path = self.cache_path.ok_or_else(|| required("cache_path"))?;

        Ok(Build {
            sources: self.sources.ok_or_else(|| required("sources"))?,
            compiler: self.compiler.ok_or_else(|| required("compiler"))?,
            layout: self.layout.ok_or_else(|| required("layout"))?,
            cache_path: working_dir.join(cache_path),
            working_dir,
            jobs: self.jobs,
            log: self.log,
        })
    }
}

impl Build {
    pub fn builder() -> BuildBuilder {
        BuildBuilder::new()
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Compiles every stale source and records the results in the cache.
    ///
    /// # Errors
    ///
    /// - [`HoldError::CompilerNotFound`] before any job runs
    /// - [`HoldError::CacheWriteFailed`] if the cache could not be written back
    /// - [`HoldError::CompilationFailed`] once the cache is saved, if any job
    ///   failed
    pub fn run(&self) -> Result<BuildSummary> {
        let candidates = self.discover()?;

        self.enter(BuildPhase::Evaluating);
        if candidates.is_empty() {
            return Ok(self.nothing_to_do(0));
        }

        let compiler_version = self.compiler_version()?;
        let mut cache = load_cache(&self.cache_path, &self.log)?;
        let evaluation = files_to_compile(
            &candidates,
            &cache,
            &self.layout,
            Some(&compiler_version),
            &self.working_dir,
        )?;

        if evaluation.is_up_to_date() {
            return Ok(self.nothing_to_do(evaluation.fresh.len()));
        }

        self.enter(BuildPhase::Dispatching);
        for stale in &evaluation.stale {
            self.log.verbose(
                1,
                format!("{} is stale: {}", stale.job.source.display(), stale.reason),
            );
        }
        for fresh in &evaluation.fresh {
            self.log
                .verbose(1, format!("{} is up to date", fresh.display()));
        }

        let jobs = evaluation.jobs();
        self.log.info(format!(
            "Compiling {} Cairo {}...",
            jobs.len(),
            files(jobs.len())
        ));

        let dispatcher = Dispatcher::new(
            self.compiler.as_ref(),
            Some(compiler_version),
            &self.working_dir,
            self.jobs,
            self.log,
        );
        let dispatched =
            panic::catch_unwind(AssertUnwindSafe(|| dispatcher.run_all(&jobs, &mut cache)));

        self.enter(BuildPhase::Persisting);
        let saved = self.persist(&cache);

        let dispatched = match dispatched {
            Ok(dispatched) => dispatched,
            Err(payload) => panic::resume_unwind(payload),
        };

        self.enter(BuildPhase::Reporting);
        let report = dispatched?;

        if let Err(err) = saved {
            if report.has_failures() {
                self.log.warn(format!(
                    "{} Cairo {} also failed to compile:\n{}",
                    report.failures.len(),
                    files(report.failures.len()),
                    report.error_report()
                ));
            }
            return Err(err);
        }

        let summary = BuildSummary {
            compiled: report.compiled.len(),
            skipped: evaluation.fresh.len(),
            failed: report.failures.len(),
        };
        self.report(&summary);

        if let Some(err) = report.into_error() {
            return Err(err);
        }

        self.enter(BuildPhase::Done);
        Ok(summary)
    }

    /// Works out which sources a build would compile and why, without
    /// compiling anything or writing to disk.
    pub fn survey(&self) -> Result<Evaluation> {
        let candidates = self.discover()?;

        self.enter(BuildPhase::Evaluating);
        if candidates.is_empty() {
            return Ok(Evaluation::default());
        }

        let compiler_version = self.compiler_version()?;
        let cache = read_cache(&self.cache_path, &self.log)?;
        files_to_compile(
            &candidates,
            &cache,
            &self.layout,
            Some(&compiler_version),
            &self.working_dir,
        )
    }

    fn discover(&self) -> Result<Vec<PathBuf>> {
        self.enter(BuildPhase::Idle);
        self.enter(BuildPhase::Discovering);

        let candidates = self.sources.sources()?;
        self.log.verbose(
            1,
            format!(
                "Found {} Cairo source {}",
                candidates.len(),
                files(candidates.len())
            ),
        );
        Ok(candidates)
    }

    fn compiler_version(&self) -> Result<String> {
        let version = self.compiler.version()?;
        self.log.verbose(1, format!("Using compiler {version}"));
        Ok(version)
    }

    fn nothing_to_do(&self, skipped: usize) -> BuildSummary {
        self.log.info("No Cairo files to compile");
        self.enter(BuildPhase::Done);
        BuildSummary {
            skipped,
            ..Default::default()
        }
    }

    fn persist(&self, cache: &BuildCache) -> Result<()> {
        self.log.verbose(
            1,
            format!(
                "Saving {} cache {} to {}",
                cache.len(),
                if cache.len() == 1 { "entry" } else { "entries" },
                self.cache_path.display()
            ),
        );
        save_cache(cache, &self.cache_path)
    }

    fn report(&self, summary: &BuildSummary) {
        if summary.compiled > 0 || summary.failed == 0 {
            self.log.info(format!(
                "Compiled {} Cairo {} successfully",
                summary.compiled,
                files(summary.compiled)
            ));
        }
        if summary.skipped > 0 {
            self.log.verbose(
                1,
                format!(
                    "Skipped {} up-to-date Cairo {}",
                    summary.skipped,
                    files(summary.skipped)
                ),
            );
        }
        if summary.failed > 0 {
            self.log.info(format!(
                "{} Cairo {} failed to compile",
                summary.failed,
                files(summary.failed)
            ));
        }
    }

    fn enter(&self, phase: BuildPhase) {
        self.log.verbose(2, format!("Build phase: {phase}"));
    }
}
