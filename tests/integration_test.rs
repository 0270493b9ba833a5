#![cfg(unix)]

mod common;

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_fs::prelude::*;
use cairo_hold::cli::Commands;
use cairo_hold::error::HoldError;
use common::{CACHE_PATH, Project};
use filetime::FileTime;
use predicates::prelude::*;

fn cairo_hold(project: &Project) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_cairo-hold"));
    command
        .current_dir(project.path())
        .env_remove("CAIRO_HOLD_QUIET")
        .env_remove("CAIRO_HOLD_VERBOSE")
        .env("CAIRO_HOLD_COMPILER", "bin/starknet-compile");
    command
}

#[test]
fn test_compile_creates_artifacts_and_cache() {
    let project = Project::new();
    let a = project.source("a.cairo", "func a() {}");
    let b = project.source("token/b.cairo", "func b() {}");

    project.compile().unwrap();

    project
        .dir
        .child("artifacts-starknet/a.json")
        .assert(predicate::str::contains("contracts/a.cairo"));
    project
        .dir
        .child("artifacts-starknet/token/b.json")
        .assert(predicate::path::exists());
    project
        .dir
        .child("artifacts-starknet/a.deps")
        .assert(predicate::path::missing());
    project
        .dir
        .child(CACHE_PATH)
        .assert(predicate::str::contains("\"contracts/token/b.cairo\""));

    let cache = project.cache();
    assert_eq!(cache.len(), 2);
    assert!(cache.get(&a).unwrap().unwrap().depends_on(&a));
    assert!(cache.get(&b).unwrap().unwrap().depends_on(&b));
}

#[test]
fn test_second_compile_is_idempotent() {
    let project = Project::new();
    project.source("a.cairo", "func a() {}");
    project.source("b.cairo", "func b() {}");

    project.compile().unwrap();
    assert_eq!(project.invocations().len(), 2);

    project.compile().unwrap();
    assert_eq!(project.invocations().len(), 2);
}

#[test]
fn test_dependency_change_recompiles_dependents() {
    let project = Project::new();
    let lib = project.file("lib/math.cairo", "func add() {}");
    project.source("a.cairo", "%import lib/math.cairo\nfunc a() {}");
    project.source("b.cairo", "%import lib/math.cairo\nfunc b() {}");
    project.source("c.cairo", "func c() {}");

    project.compile().unwrap();
    assert!(
        project
            .cache()
            .get(Path::new("contracts/a.cairo"))
            .unwrap()
            .unwrap()
            .depends_on(&lib)
    );

    project.reset_invocations();
    project.file("lib/math.cairo", "func add() { ret }");
    project.compile().unwrap();

    assert_eq!(
        project.compiled(),
        vec!["contracts/a.cairo", "contracts/b.cairo"]
    );
}

#[test]
fn test_touch_without_change_is_skipped() {
    let project = Project::new();
    let a = project.source("a.cairo", "func a() {}");
    project.compile().unwrap();

    filetime::set_file_mtime(project.path().join(&a), FileTime::from_unix_time(1_700_000_000, 0))
        .unwrap();
    project.reset_invocations();
    project.compile().unwrap();

    assert!(project.invocations().is_empty());
}

#[test]
fn test_content_change_with_restored_mtime_recompiles() {
    let project = Project::new();
    project.source("a.cairo", "func a() {}");
    project.compile().unwrap();

    // `source` pins the same mtime as before
    project.reset_invocations();
    project.source("a.cairo", "func a() { let x = 1; }");
    project.compile().unwrap();

    assert_eq!(project.compiled(), vec!["contracts/a.cairo"]);
}

#[test]
fn test_missing_artifact_recompiles() {
    let project = Project::new();
    project.source("a.cairo", "func a() {}");
    project.source("b.cairo", "func b() {}");
    project.compile().unwrap();

    fs::remove_file(project.artifact("b.json")).unwrap();
    project.reset_invocations();
    project.compile().unwrap();

    assert_eq!(project.compiled(), vec!["contracts/b.cairo"]);
    assert!(project.artifact("b.json").exists());
}

#[test]
fn test_partial_failure_keeps_successes() {
    let project = Project::new();
    let one = project.source("one.cairo", "func one() {}");
    let two = project.source("two.cairo", "FAIL\nfunc two() {}");
    let three = project.source("three.cairo", "func three() {}");

    let err = project.compile().unwrap_err();
    match &err {
        HoldError::CompilationFailed { failed, report } => {
            assert_eq!(*failed, 1);
            assert_eq!(report, "contracts/two.cairo:1:1: Unexpected token");
        }
        other => panic!("Expected CompilationFailed, got: {other:?}"),
    }
    assert!(
        err.to_string()
            .starts_with("compilation of cairo contracts failed:\n")
    );

    let cache = project.cache();
    assert!(cache.contains(&one).unwrap());
    assert!(cache.contains(&three).unwrap());
    assert!(!cache.contains(&two).unwrap());

    // No partial artifact or scratch manifest is left for the failed file
    assert!(!project.artifact("two.json").exists());
    assert!(!project.artifact("two.deps").exists());

    // Once fixed, only the failed file is compiled again
    project.reset_invocations();
    project.source("two.cairo", "func two() {}");
    project.compile().unwrap();
    assert_eq!(project.compiled(), vec!["contracts/two.cairo"]);
}

#[test]
fn test_compiler_version_change_recompiles_everything() {
    let project = Project::new();
    project.source("a.cairo", "func a() {}");
    project.source("b.cairo", "func b() {}");
    project.compile().unwrap();

    project.set_compiler_version("starknet-compile 0.11.0");
    project.reset_invocations();
    project.compile().unwrap();

    assert_eq!(
        project.compiled(),
        vec!["contracts/a.cairo", "contracts/b.cairo"]
    );
    let cache = project.cache();
    let entry = cache.get(Path::new("contracts/a.cairo")).unwrap().unwrap();
    assert_eq!(
        entry.compiler_version.as_deref(),
        Some("starknet-compile 0.11.0")
    );
}

#[test]
fn test_deleted_dependency_recompiles() {
    let project = Project::new();
    project.file("lib/util.cairo", "func util() {}");
    project.source("a.cairo", "%import lib/util.cairo\nfunc a() {}");
    project.compile().unwrap();

    fs::remove_file(project.path().join("lib/util.cairo")).unwrap();
    project.reset_invocations();

    // The fake compiler still lists the import, which now cannot be
    // fingerprinted, so the recompile fails.
    let err = project.compile().unwrap_err();
    assert!(matches!(err, HoldError::CompilationFailed { .. }));
    assert_eq!(project.compiled(), vec!["contracts/a.cairo"]);
    assert!(!project.artifact("a.json").exists());
}

#[test]
fn test_abi_files_requested() {
    let project = Project::new();
    project.source("a.cairo", "func a() {}");

    let cli = cairo_hold::cli::Cli::builder()
        .global_opts(
            cairo_hold::cli::GlobalOpts::builder()
                .compiler("bin/starknet-compile")
                .abi(true)
                .quiet(true),
        )
        .command(Commands::Compile)
        .build()
        .unwrap();
    cairo_hold::commands::execute_with_dir(&cli, Some(project.path())).unwrap();

    assert!(project.artifact("a_abi.json").exists());

    // Losing the ABI alone forces a recompile
    fs::remove_file(project.artifact("a_abi.json")).unwrap();
    project.reset_invocations();
    cairo_hold::commands::execute_with_dir(&cli, Some(project.path())).unwrap();
    assert_eq!(project.compiled(), vec!["contracts/a.cairo"]);
}

#[test]
fn test_compiler_not_found() {
    let project = Project::new();
    project.source("a.cairo", "func a() {}");

    let cli = cairo_hold::cli::Cli::builder()
        .compiler("bin/missing-compiler")
        .quiet(true)
        .command(Commands::Compile)
        .build()
        .unwrap();
    let err = cairo_hold::commands::execute_with_dir(&cli, Some(project.path())).unwrap_err();

    assert!(matches!(err, HoldError::CompilerNotFound { .. }));
    assert!(!project.path().join("artifacts-starknet").exists());
}

#[test]
fn test_bilge_forces_full_rebuild() {
    let project = Project::new();
    project.source("a.cairo", "func a() {}");
    project.compile().unwrap();

    project.run(Commands::Bilge).unwrap();
    project.dir.child(CACHE_PATH).assert(predicate::path::missing());

    project.reset_invocations();
    project.compile().unwrap();
    assert_eq!(project.compiled(), vec!["contracts/a.cairo"]);
}

#[test]
fn test_corrupt_cache_is_rebuilt() {
    let project = Project::new();
    project.source("a.cairo", "func a() {}");
    project.compile().unwrap();

    project.dir.child(CACHE_PATH).write_str("{ not json").unwrap();
    project.reset_invocations();
    project.compile().unwrap();

    assert_eq!(project.compiled(), vec!["contracts/a.cairo"]);
    assert_eq!(project.cache().len(), 1);
}

#[test]
fn test_survey_compiles_nothing() {
    let project = Project::new();
    project.source("a.cairo", "func a() {}");
    project.source("b.cairo", "func b() {}");
    project.compile().unwrap();
    project.source("b.cairo", "func b() { let changed = 1; }");
    project.reset_invocations();

    let output = cairo_hold(&project).arg("survey").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(predicate::str::contains("contracts/b.cairo: contracts/b.cairo changed").eval(&stdout));
    assert!(!stdout.contains("contracts/a.cairo"));
    assert!(project.invocations().is_empty());
}

#[test]
fn test_binary_reports_counts() {
    let project = Project::new();
    project.source("a.cairo", "func a() {}");

    let output = cairo_hold(&project).arg("compile").output().unwrap();
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(predicate::str::contains("Compiled 1 Cairo file successfully").eval(&stderr));

    let output = cairo_hold(&project).arg("compile").output().unwrap();
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(predicate::str::contains("No Cairo files to compile").eval(&stderr));
}

#[test]
fn test_binary_fails_on_compile_error() {
    let project = Project::new();
    project.source("a.cairo", "func a() {}");
    project.source("bad.cairo", "FAIL");

    let output = cairo_hold(&project).arg("compile").output().unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(predicate::str::contains("compilation of cairo contracts failed").eval(&stderr));
    assert!(predicate::str::contains("contracts/bad.cairo:1:1: Unexpected token").eval(&stderr));
    assert!(!stderr.contains("Command failed"));
    project.dir.child(CACHE_PATH).assert(predicate::str::contains("contracts/a.cairo"));
}

#[test]
fn test_quiet_mode_prints_nothing_on_success() {
    let project = Project::new();
    project.source("a.cairo", "func a() {}");

    let output = cairo_hold(&project).args(["compile", "--quiet"]).output().unwrap();

    assert!(output.status.success());
    assert!(output.stderr.is_empty());
}
