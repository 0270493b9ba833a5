//! Compile jobs and the mapping from sources to their output files.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use crate::error::{HoldError, Result};
use crate::state::FileCacheEntry;

/// Decides where a source file's outputs go.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    sources_dir: PathBuf,
    artifacts_dir: PathBuf,
    abi: bool,
}

impl ArtifactLayout {
    /// Artifacts mirror the tree under `sources_dir` inside `artifacts_dir`.
    ///
    /// With `abi` set, every job also produces an ABI file.
    pub fn new(sources_dir: impl Into<PathBuf>, artifacts_dir: impl Into<PathBuf>, abi: bool) -> Self {
        Self {
            sources_dir: sources_dir.into(),
            artifacts_dir: artifacts_dir.into(),
            abi,
        }
    }

    pub fn artifacts_dir(&self) -> &Path {
        &self.artifacts_dir
    }

    /// Plans the job for `source`.
    ///
    /// `contracts/token/erc20.cairo` with sources dir `contracts` compiles to
    /// `<artifacts>/token/erc20.json`, with `erc20_abi.json` next to it when
    /// ABIs are requested and the dependency manifest at `erc20.deps`. Sources
    /// outside the sources dir keep their full relative path.
    pub fn job_for(&self, source: &Path) -> CompileJob {
        let relative: PathBuf = match source.strip_prefix(&self.sources_dir) {
            Ok(relative) => relative.to_path_buf(),
            Err(_) => source
                .components()
                .filter(|component| matches!(component, Component::Normal(_)))
                .collect(),
        };

        let artifact = self.artifacts_dir.join(&relative).with_extension("json");

        let abi = self.abi.then(|| {
            let stem = artifact
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            artifact.with_file_name(format!("{stem}_abi.json"))
        });

        let manifest = artifact.with_extension("deps");

        CompileJob {
            source: source.to_path_buf(),
            artifact,
            abi,
            manifest,
        }
    }
}

/// One planned compile: a source and the files the compiler will write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileJob {
    pub source: PathBuf,
    pub artifact: PathBuf,
    pub abi: Option<PathBuf>,
    /// Scratch file the compiler writes the dependency list into. Unique per
    /// job and removed once read.
    pub manifest: PathBuf,
}

impl CompileJob {
    /// The build outputs of this job (artifact, then ABI when requested).
    pub fn outputs(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.artifact.as_path()).chain(self.abi.as_deref())
    }

    /// Whether every build output is present on disk.
    pub fn outputs_exist(&self) -> bool {
        self.outputs().all(Path::is_file)
    }
}

/// Checks that no two jobs write the same file.
///
/// With ABIs enabled, `token.cairo`'s `token_abi.json` is also the artifact of
/// a `token_abi.cairo` next to it.
///
/// # Errors
///
/// Returns [`HoldError::ConfigError`] naming both sources of the first clash.
pub fn check_distinct_outputs(jobs: &[CompileJob]) -> Result<()> {
    let mut owners: HashMap<&Path, &Path> = HashMap::new();

    for job in jobs {
        for output in job.outputs().chain(std::iter::once(job.manifest.as_path())) {
            if let Some(owner) = owners.insert(output, &job.source)
                && owner != job.source.as_path()
            {
                return Err(HoldError::ConfigError {
                    message: format!(
                        "{} and {} would both write {}; rename one of them",
                        owner.display(),
                        job.source.display(),
                        output.display()
                    ),
                });
            }
        }
    }

    Ok(())
}

/// Result of running one [`CompileJob`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The compile succeeded; the fresh entry replaces the cached one.
    Success(FileCacheEntry),
    /// The compile failed with this user-facing diagnostic.
    Failure(String),
}
