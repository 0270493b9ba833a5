//! The external compiler: version query, per-job invocation and diagnostic
//! cleanup.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{HoldError, Result};
use crate::job::CompileJob;

/// A compiler the dispatcher can run jobs with.
///
/// Implementations are shared across the dispatcher's worker threads.
pub trait Compiler: Sync {
    /// Identifies the compiler build. Cache entries produced by a different
    /// version are recompiled.
    fn version(&self) -> Result<String>;

    /// Compiles `job.source`, writing the artifact, the optional ABI and the
    /// dependency manifest to the paths in `job`.
    ///
    /// An `Err` means the compiler could not be run at all; a compiler that ran
    /// and rejected the source returns `Ok` with `success == false`.
    fn compile(&self, job: &CompileJob) -> Result<CompilerOutput>;

    /// Name used to recognise the compiler in diagnostics.
    fn name(&self) -> &str;
}

/// Captured result of one compiler process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilerOutput {
    pub success: bool,
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CompilerOutput {
    /// The user-actionable diagnostic of a failed compile.
    ///
    /// Uses stderr, or stdout when stderr is empty. A leading
    /// `Command failed: <compiler> ...` line is dropped since the caller
    /// already knows the command failed.
    pub fn diagnostic(&self, compiler_name: &str) -> String {
        let text = if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };

        let lines: Vec<&str> = text.lines().collect();
        let mut cleaned = strip_command_preamble(compiler_name, &lines);
        while let Some((last, rest)) = cleaned.split_last() {
            if !last.trim().is_empty() {
                break;
            }
            cleaned = rest;
        }

        if cleaned.is_empty() {
            return match self.code {
                Some(code) => format!("{compiler_name} exited with status {code} and no output"),
                None => format!("{compiler_name} was terminated by a signal"),
            };
        }

        cleaned.join("\n")
    }
}

/// Drops a leading `Command failed: <program> ...` line naming `compiler_name`.
///
/// Wrappers (shell shims, npx, hardhat) print this line before the compiler's
/// own file/line diagnostics. Only the first line is considered.
pub fn strip_command_preamble<'a, 'b>(compiler_name: &str, lines: &'b [&'a str]) -> &'b [&'a str] {
    static PREAMBLE_RE: OnceLock<Regex> = OnceLock::new();

    let re = PREAMBLE_RE.get_or_init(|| {
        Regex::new(r"^Command failed: (\S+)").expect("command preamble regex should compile")
    });

    let Some((first, rest)) = lines.split_first() else {
        return lines;
    };

    let names_compiler = re.captures(first).is_some_and(|captures| {
        let program = captures[1].trim_matches(['"', '\'']);
        Path::new(program)
            .file_name()
            .is_some_and(|name| name == compiler_name)
    });

    if names_compiler { rest } else { lines }
}

/// The compiler as an external executable, invoked once per job.
#[derive(Debug, Clone)]
pub struct ExternalCompiler {
    program: PathBuf,
    name: String,
    search_path: Option<OsString>,
    working_dir: PathBuf,
}

impl ExternalCompiler {
    /// Creates a compiler running `program` from `working_dir`.
    ///
    /// `search_paths` are passed as `--cairo_path`, joined with the platform
    /// path-list separator.
    ///
    /// # Errors
    ///
    /// Returns an error if a search path contains the separator itself.
    pub fn new(
        program: impl Into<PathBuf>,
        search_paths: &[PathBuf],
        working_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let program = program.into();
        let name = program
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.to_string_lossy().into_owned());

        let search_path = if search_paths.is_empty() {
            None
        } else {
            Some(
                std::env::join_paths(search_paths).map_err(|e| HoldError::ConfigError {
                    message: format!("Invalid --cairo-path entry: {e}"),
                })?,
            )
        };

        Ok(Self {
            program,
            name,
            search_path,
            working_dir: working_dir.into(),
        })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Only a missing executable is [`HoldError::CompilerNotFound`]; anything
    /// else, such as a file without execute permission, is an I/O error.
    fn spawn_error(&self, source: std::io::Error) -> HoldError {
        match source.kind() {
            ErrorKind::NotFound => HoldError::CompilerNotFound {
                program: self.program.clone(),
                source,
            },
            _ => HoldError::io(&self.program, source),
        }
    }

    /// Arguments passed to the compiler for `job`.
    pub fn arguments(&self, job: &CompileJob) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            job.source.clone().into(),
            "--output".into(),
            job.artifact.clone().into(),
            "--cairo_dependencies".into(),
            job.manifest.clone().into(),
        ];

        if let Some(abi) = &job.abi {
            args.push("--abi".into());
            args.push(abi.clone().into());
        }

        if let Some(search_path) = &self.search_path {
            args.push("--cairo_path".into());
            args.push(search_path.clone());
        }

        args
    }
}

impl Compiler for ExternalCompiler {
    fn version(&self) -> Result<String> {
        let output = Command::new(&self.program)
            .arg("--version")
            .current_dir(&self.working_dir)
            .output()
            .map_err(|source| self.spawn_error(source))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(HoldError::CompilerVersionError {
                program: self.program.clone(),
                message: format!("exited with {}: {}", output.status, stderr.trim()),
            });
        }

        let version = if stdout.trim().is_empty() {
            stderr.trim()
        } else {
            stdout.trim()
        };

        if version.is_empty() {
            return Err(HoldError::CompilerVersionError {
                program: self.program.clone(),
                message: "no version reported".to_string(),
            });
        }

        Ok(version.to_string())
    }

    fn compile(&self, job: &CompileJob) -> Result<CompilerOutput> {
        let output = Command::new(&self.program)
            .args(self.arguments(job))
            .current_dir(&self.working_dir)
            .output()
            .map_err(|source| self.spawn_error(source))?;

        Ok(CompilerOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
