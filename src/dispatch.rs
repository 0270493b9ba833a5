//! Running compile jobs concurrently and recording their results.
//!
//! Every job runs to completion regardless of how its siblings fare. A
//! successful job's cache entry is written into the shared [`BuildCache`] as
//! soon as the job finishes, behind a mutex, so whatever completed is already
//! in the cache object when it gets persisted.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::compiler::Compiler;
use crate::error::{HoldError, Result};
use crate::fingerprint::FileFingerprint;
use crate::job::{CompileJob, JobOutcome};
use crate::logging::Logger;
use crate::manifest::read_dependency_manifest;
use crate::state::{BuildCache, FileCacheEntry};

/// A job that failed, with its cleaned diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    pub source: PathBuf,
    pub diagnostic: String,
}

/// What happened to the dispatched jobs.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Sources compiled successfully; their entries are already in the cache.
    pub compiled: Vec<PathBuf>,
    /// Failed jobs, ordered by source path.
    pub failures: Vec<JobFailure>,
}

impl DispatchReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Every failure's diagnostic, one block per file.
    pub fn error_report(&self) -> String {
        self.failures
            .iter()
            .map(|failure| failure.diagnostic.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// The aggregate error for this dispatch, if any job failed.
    pub fn into_error(self) -> Option<HoldError> {
        self.has_failures().then(|| HoldError::CompilationFailed {
            failed: self.failures.len(),
            report: self.error_report(),
        })
    }
}

/// Runs compile jobs on a bounded worker pool.
pub struct Dispatcher<'a, C: Compiler + ?Sized> {
    compiler: &'a C,
    compiler_version: Option<String>,
    base_dir: PathBuf,
    jobs: usize,
    log: Logger,
}

impl<'a, C: Compiler + ?Sized> Dispatcher<'a, C> {
    /// Creates a dispatcher.
    ///
    /// New cache entries are tagged with `compiler_version`. Relative
    /// dependency paths from the compiler are resolved against `base_dir`.
    /// `jobs` caps the number of concurrent compiler processes; `0` means one
    /// per CPU.
    pub fn new(
        compiler: &'a C,
        compiler_version: Option<String>,
        base_dir: impl Into<PathBuf>,
        jobs: usize,
        log: Logger,
    ) -> Self {
        Self {
            compiler,
            compiler_version,
            base_dir: base_dir.into(),
            jobs,
            log,
        }
    }

    /// Runs every job and applies each success to `cache` as it lands.
    ///
    /// Job failures never abort the dispatch; they are collected into the
    /// returned report.
    ///
    /// # Errors
    ///
    /// Returns an error only if the worker pool cannot be created, before any
    /// job has started.
    pub fn run_all(&self, jobs: &[CompileJob], cache: &mut BuildCache) -> Result<DispatchReport> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .thread_name(|index| format!("cairo-hold-job-{index}"))
            .build()
            .map_err(|e| HoldError::ConfigError {
                message: format!("Failed to start compile workers: {e}"),
            })?;

        let cache = Mutex::new(cache);

        let outcomes: Vec<(PathBuf, Option<String>)> = pool.install(|| {
            jobs.par_iter()
                .map(|job| {
                    let failure = match self.run_job(job) {
                        JobOutcome::Success(entry) => {
                            let mut cache = cache.lock().unwrap_or_else(PoisonError::into_inner);
                            cache
                                .insert(&job.source, entry)
                                .err()
                                .map(|e| e.chain_message())
                        }
                        JobOutcome::Failure(diagnostic) => Some(diagnostic),
                    };
                    (job.source.clone(), failure)
                })
                .collect()
        });

        let mut report = DispatchReport::default();
        for (source, failure) in outcomes {
            match failure {
                None => report.compiled.push(source),
                Some(diagnostic) => report.failures.push(JobFailure { source, diagnostic }),
            }
        }
        report.failures.sort_by(|a, b| a.source.cmp(&b.source));

        Ok(report)
    }

    /// Runs one job to completion.
    ///
    /// On failure every output the job may have written is removed, so no
    /// partial artifact can pass for a valid one on the next build.
    pub fn run_job(&self, job: &CompileJob) -> JobOutcome {
        self.log
            .verbose(1, format!("Compiling {}", job.source.display()));

        match self.compile_and_record(job) {
            Ok(entry) => {
                self.log
                    .verbose(1, format!("Compiled {}", job.source.display()));
                JobOutcome::Success(entry)
            }
            Err(diagnostic) => {
                self.remove_outputs(job);
                JobOutcome::Failure(diagnostic)
            }
        }
    }

    fn compile_and_record(&self, job: &CompileJob) -> std::result::Result<FileCacheEntry, String> {
        let artifact = self.base_dir.join(&job.artifact);
        if let Some(parent) = artifact.parent() {
            fs::create_dir_all(parent).map_err(|source| {
                HoldError::CreateDirError {
                    path: parent.to_path_buf(),
                    source,
                }
                .chain_message()
            })?;
        }

        // A manifest left behind by an interrupted run must not be mistaken
        // for this compile's output.
        self.remove_if_present(&job.manifest);

        let output = self
            .compiler
            .compile(job)
            .map_err(|e| format!("{}: {}", job.source.display(), e.chain_message()))?;

        if !output.success {
            return Err(output.diagnostic(self.compiler.name()));
        }

        let manifest = self.base_dir.join(&job.manifest);
        let dependencies = read_dependency_manifest(&manifest);
        self.remove_if_present(&job.manifest);
        let dependencies =
            dependencies.map_err(|e| format!("{}: {}", job.source.display(), e.chain_message()))?;

        self.build_entry(job, &dependencies)
            .map_err(|e| format!("{}: {}", job.source.display(), e.chain_message()))
    }

    fn build_entry(&self, job: &CompileJob, dependencies: &[PathBuf]) -> Result<FileCacheEntry> {
        let mut entry = FileCacheEntry::new(self.compiler_version.clone());

        for dependency in dependencies {
            let fingerprint = FileFingerprint::capture(&self.base_dir.join(dependency))?;
            self.log.verbose(
                2,
                format!("  {} depends on {}", job.source.display(), dependency.display()),
            );
            entry.insert_dependency(dependency, fingerprint)?;
        }

        // Staleness checks only see recorded dependencies, so the source
        // itself must always be among them.
        let source = self.base_dir.join(&job.source);
        let lists_source = dependencies
            .iter()
            .any(|dependency| self.base_dir.join(dependency) == source);
        if !lists_source {
            self.log.verbose(
                1,
                format!(
                    "Dependency manifest of {} omits the source itself; recording it",
                    job.source.display()
                ),
            );
            entry.insert_dependency(&job.source, FileFingerprint::capture(&source)?)?;
        }

        Ok(entry)
    }

    fn remove_outputs(&self, job: &CompileJob) {
        for output in job.outputs() {
            self.remove_if_present(output);
        }
        self.remove_if_present(&job.manifest);
    }

    fn remove_if_present(&self, path: &Path) {
        let path = self.base_dir.join(path);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => self
                .log
                .warn(format!("Could not remove {}: {e}", path.display())),
        }
    }
}
