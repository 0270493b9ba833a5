//! Shared fixtures for the integration tests.
//!
//! A [`Project`] is a throwaway Cairo project with a fake `starknet-compile`
//! script in `bin/`. The script honours the real compiler's arguments: it
//! writes the artifact, the optional ABI and a framed dependency manifest
//! listing the source itself plus every `%import <path>` line of the source.
//! A source containing a line starting with `FAIL` makes it exit non-zero
//! with a `Command failed:` preamble. Every compile is appended to
//! `bin/invocations.log`, and `--version` prints `bin/version`.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use assert_fs::TempDir;
use assert_fs::prelude::*;
use cairo_hold::cache::load_cache;
use cairo_hold::cli::{Cli, Commands};
use cairo_hold::commands::execute_with_dir;
use cairo_hold::error::Result;
use cairo_hold::logging::Logger;
use cairo_hold::state::BuildCache;
use filetime::FileTime;

pub const CACHE_PATH: &str = "cache/cairo-files-cache.json";

const FAKE_COMPILER: &str = r#"#!/bin/sh
here=$(dirname "$0")
if [ "$1" = "--version" ]; then
    cat "$here/version"
    exit 0
fi

src=$1
shift
out=""
deps=""
abi=""
while [ $# -gt 0 ]; do
    case "$1" in
        --output) out=$2; shift 2 ;;
        --cairo_dependencies) deps=$2; shift 2 ;;
        --abi) abi=$2; shift 2 ;;
        *) shift ;;
    esac
done

echo "$src" >> "$here/invocations.log"
printf 'partial' > "$out"

if grep -q '^FAIL' "$src"; then
    echo "Command failed: starknet-compile $src --output $out" >&2
    echo "$src:1:1: Unexpected token" >&2
    exit 1
fi

printf '{"source": "%s"}\n' "$src" > "$out"
if [ -n "$abi" ]; then
    printf '[]\n' > "$abi"
fi
{
    echo "SET (DEPENDENCIES"
    echo "$src"
    sed -n 's/^%import //p' "$src"
    echo ")"
} > "$deps"
"#;

pub struct Project {
    pub dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        dir.child("contracts").create_dir_all().unwrap();

        let compiler = dir.child("bin/starknet-compile");
        compiler.write_str(FAKE_COMPILER).unwrap();
        fs::set_permissions(compiler.path(), fs::Permissions::from_mode(0o755)).unwrap();

        let project = Self { dir };
        project.set_compiler_version("starknet-compile 0.10.3");
        project
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes `contracts/<name>` and pins its mtime so later edits are
    /// distinguishable on every filesystem.
    pub fn source(&self, name: &str, contents: &str) -> PathBuf {
        self.file(&format!("contracts/{name}"), contents)
    }

    pub fn file(&self, relative: &str, contents: &str) -> PathBuf {
        let child = self.dir.child(relative);
        child.write_str(contents).unwrap();
        filetime::set_file_mtime(child.path(), FileTime::from_unix_time(1_600_000_000, 0))
            .unwrap();
        PathBuf::from(relative)
    }

    pub fn set_compiler_version(&self, version: &str) {
        self.dir.child("bin/version").write_str(version).unwrap();
    }

    pub fn cli(&self, command: Commands) -> Cli {
        Cli::builder()
            .compiler("bin/starknet-compile")
            .quiet(true)
            .command(command)
            .build()
            .unwrap()
    }

    pub fn compile(&self) -> Result<()> {
        execute_with_dir(&self.cli(Commands::Compile), Some(self.path()))
    }

    pub fn run(&self, command: Commands) -> Result<()> {
        execute_with_dir(&self.cli(command), Some(self.path()))
    }

    /// Sources handed to the compiler so far, in invocation order.
    pub fn invocations(&self) -> Vec<String> {
        fs::read_to_string(self.path().join("bin/invocations.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Forgets the recorded invocations.
    pub fn reset_invocations(&self) {
        let _ = fs::remove_file(self.path().join("bin/invocations.log"));
    }

    /// Sorted sources compiled since the last reset.
    pub fn compiled(&self) -> Vec<String> {
        let mut compiled = self.invocations();
        compiled.sort();
        compiled
    }

    pub fn cache(&self) -> BuildCache {
        load_cache(&self.path().join(CACHE_PATH), &Logger::new(0, true)).unwrap()
    }

    pub fn artifact(&self, relative: &str) -> PathBuf {
        self.path().join("artifacts-starknet").join(relative)
    }
}
