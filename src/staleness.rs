//! Deciding which sources must be compiled.

use std::fmt;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::error::Result;
use crate::fingerprint::has_changed;
use crate::job::{ArtifactLayout, CompileJob, check_distinct_outputs};
use crate::state::BuildCache;

/// Why a source has to be compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
    /// An expected build output is missing on disk.
    MissingArtifact(PathBuf),
    /// The source never compiled successfully, or the cache was lost.
    NotCached,
    /// The cache entry was produced by a different compiler.
    CompilerChanged { cached: Option<String> },
    /// A dependency recorded at the last compile changed or disappeared.
    DependencyChanged(PathBuf),
    /// A recorded dependency could not be checked.
    DependencyUnreadable { path: PathBuf, message: String },
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaleReason::MissingArtifact(path) => write!(f, "missing artifact {}", path.display()),
            StaleReason::NotCached => write!(f, "not in cache"),
            StaleReason::CompilerChanged { cached: Some(cached) } => {
                write!(f, "compiled by a different compiler ({cached})")
            }
            StaleReason::CompilerChanged { cached: None } => {
                write!(f, "compiled by an unknown compiler version")
            }
            StaleReason::DependencyChanged(path) => write!(f, "{} changed", path.display()),
            StaleReason::DependencyUnreadable { path, message } => {
                write!(f, "could not check {}: {message}", path.display())
            }
        }
    }
}

/// A source that must be compiled, with the job planned for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleFile {
    pub job: CompileJob,
    pub reason: StaleReason,
}

/// The candidates of a build split into "compile" and "skip".
#[derive(Debug, Default)]
pub struct Evaluation {
    pub stale: Vec<StaleFile>,
    pub fresh: Vec<PathBuf>,
}

impl Evaluation {
    /// The jobs to dispatch.
    pub fn jobs(&self) -> Vec<CompileJob> {
        self.stale.iter().map(|stale| stale.job.clone()).collect()
    }

    /// `true` when nothing needs compiling.
    pub fn is_up_to_date(&self) -> bool {
        self.stale.is_empty()
    }
}

/// Splits `candidates` into sources that must be compiled and sources whose
/// cached artifacts are still valid.
///
/// Per source, in order: a missing artifact, a missing cache entry, or a cache
/// entry from another `compiler_version` each force a compile. Otherwise every
/// dependency recorded at the last compile is checked with [`has_changed`];
/// any change forces a compile. Relative dependency paths are resolved
/// against `base_dir`, the directory the compiler runs in.
///
/// # Errors
///
/// Returns an error if a candidate path is not valid UTF-8, or if two
/// candidates would write the same output file.
pub fn files_to_compile(
    candidates: &[PathBuf],
    cache: &BuildCache,
    layout: &ArtifactLayout,
    compiler_version: Option<&str>,
    base_dir: &Path,
) -> Result<Evaluation> {
    let jobs: Vec<CompileJob> = candidates
        .iter()
        .map(|source| layout.job_for(source))
        .collect();
    check_distinct_outputs(&jobs)?;

    let decisions: Vec<Result<(PathBuf, Option<StaleFile>)>> = jobs
        .into_par_iter()
        .map(|job| {
            let reason = stale_reason(&job, cache, compiler_version, base_dir)?;
            Ok((
                job.source.clone(),
                reason.map(|reason| StaleFile { job, reason }),
            ))
        })
        .collect();

    let mut evaluation = Evaluation::default();
    for decision in decisions {
        match decision? {
            (_, Some(stale)) => evaluation.stale.push(stale),
            (source, None) => evaluation.fresh.push(source),
        }
    }

    Ok(evaluation)
}

fn stale_reason(
    job: &CompileJob,
    cache: &BuildCache,
    compiler_version: Option<&str>,
    base_dir: &Path,
) -> Result<Option<StaleReason>> {
    if let Some(missing) = job.outputs().find(|output| !base_dir.join(output).is_file()) {
        return Ok(Some(StaleReason::MissingArtifact(missing.to_path_buf())));
    }

    let Some(entry) = cache.get(&job.source)? else {
        return Ok(Some(StaleReason::NotCached));
    };

    if entry.compiler_version.as_deref() != compiler_version {
        return Ok(Some(StaleReason::CompilerChanged {
            cached: entry.compiler_version.clone(),
        }));
    }

    for (dependency, fingerprint) in &entry.dependencies {
        let dependency = Path::new(dependency);
        match has_changed(&base_dir.join(dependency), fingerprint) {
            Ok(false) => {}
            Ok(true) => return Ok(Some(StaleReason::DependencyChanged(dependency.to_path_buf()))),
            Err(err) => {
                return Ok(Some(StaleReason::DependencyUnreadable {
                    path: dependency.to_path_buf(),
                    message: err.chain_message(),
                }));
            }
        }
    }

    Ok(None)
}
